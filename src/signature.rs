// src/signature.rs
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes};

use crate::error::PipelineError;

/// Fixed 32-byte suffix marking an ERC-6492 wrapped signature. The prefix is
/// ABI-encoded `(address factory, bytes factoryCalldata, bytes innerSig)`.
pub const ERC6492_MAGIC: [u8; 32] = [
    0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64,
    0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92, 0x64, 0x92,
    0x64, 0x92,
];

fn is_wrapped(signature: &[u8]) -> bool {
    signature.len() >= 32 && signature[signature.len() - 32..] == ERC6492_MAGIC
}

/// Extracts the raw signature bytes usable by a third-party verifier.
///
/// Signatures from a not-yet-deployed account arrive wrapped in the ERC-6492
/// deployment envelope; anything else passes through unchanged, so the
/// function is idempotent.
pub fn normalize(signature: &Bytes) -> Result<Bytes, PipelineError> {
    if !is_wrapped(signature) {
        return Ok(signature.clone());
    }
    let body = &signature[..signature.len() - 32];
    let tokens = abi::decode(
        &[ParamType::Address, ParamType::Bytes, ParamType::Bytes],
        body,
    )
    .map_err(|e| PipelineError::MalformedSignature(format!("erc-6492 envelope: {e}")))?;

    match tokens.into_iter().nth(2).and_then(|t| t.into_bytes()) {
        Some(inner) => Ok(Bytes::from(inner)),
        None => Err(PipelineError::MalformedSignature(
            "erc-6492 envelope missing inner signature".to_string(),
        )),
    }
}

/// Wraps a raw signature in the ERC-6492 deployment envelope.
pub fn wrap(factory: Address, factory_calldata: &Bytes, inner: &Bytes) -> Bytes {
    let mut wrapped = abi::encode(&[
        Token::Address(factory),
        Token::Bytes(factory_calldata.to_vec()),
        Token::Bytes(inner.to_vec()),
    ]);
    wrapped.extend_from_slice(&ERC6492_MAGIC);
    Bytes::from(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_signature() -> Bytes {
        let mut sig = vec![0xabu8; 64];
        sig.push(0x1c);
        Bytes::from(sig)
    }

    #[test]
    fn raw_signature_passes_through() {
        let sig = raw_signature();
        assert_eq!(normalize(&sig).unwrap(), sig);
    }

    #[test]
    fn unwraps_envelope_to_inner_signature() {
        let inner = raw_signature();
        let factory: Address = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap();
        let wrapped = wrap(factory, &Bytes::from(vec![0x01, 0x02, 0x03]), &inner);

        assert_ne!(wrapped, inner);
        assert_eq!(normalize(&wrapped).unwrap(), inner);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inner = raw_signature();
        let wrapped = wrap(Address::zero(), &Bytes::default(), &inner);
        let once = normalize(&wrapped).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice, inner);
    }

    #[test]
    fn short_signature_is_left_alone() {
        let sig = Bytes::from(vec![0x01, 0x02]);
        assert_eq!(normalize(&sig).unwrap(), sig);
    }

    #[test]
    fn garbage_envelope_is_rejected() {
        let mut bogus = vec![0xffu8; 16];
        bogus.extend_from_slice(&ERC6492_MAGIC);
        let err = normalize(&Bytes::from(bogus)).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSignature(_)));
    }
}
