// src/paymaster.rs
use ethers::types::{Address, Bytes, U256};

use crate::error::PipelineError;

/// Version byte of the payload layout. Reserved, currently always zero.
pub const PAYLOAD_VERSION: u8 = 0;

/// version (1) + feeToken (20) + maxSpend (32). The permit signature follows
/// with no length prefix; its length is the total minus this header.
pub const PAYLOAD_HEADER_LEN: usize = 53;

/// The blob handed to the paymaster contract: which token to pull fees in,
/// the most it may ever draw, and the permit signature authorizing the draw.
///
/// The layout is tightly packed big-endian and independent of which action
/// the operation performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymasterPayload {
    pub version: u8,
    pub fee_token: Address,
    pub max_spend: U256,
    pub signature: Bytes,
}

impl PaymasterPayload {
    pub fn new(fee_token: Address, max_spend: U256, signature: Bytes) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            fee_token,
            max_spend,
            signature,
        }
    }

    /// Packs `uint8 version || address feeToken || uint256 maxSpend || bytes signature`.
    pub fn encode(&self) -> Bytes {
        let mut data = Vec::with_capacity(PAYLOAD_HEADER_LEN + self.signature.len());
        data.push(self.version);
        data.extend_from_slice(self.fee_token.as_bytes());

        let mut max_spend = [0u8; 32];
        self.max_spend.to_big_endian(&mut max_spend);
        data.extend_from_slice(&max_spend);

        data.extend_from_slice(&self.signature);
        Bytes::from(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PipelineError> {
        if data.len() < PAYLOAD_HEADER_LEN {
            return Err(PipelineError::MalformedPaymasterData(format!(
                "{} bytes, header needs {PAYLOAD_HEADER_LEN}",
                data.len()
            )));
        }
        Ok(Self {
            version: data[0],
            fee_token: Address::from_slice(&data[1..21]),
            max_spend: U256::from_big_endian(&data[21..53]),
            signature: Bytes::from(data[PAYLOAD_HEADER_LEN..].to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(signature: Vec<u8>) -> PaymasterPayload {
        PaymasterPayload::new(
            "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d".parse().unwrap(),
            1_000_000.into(),
            Bytes::from(signature),
        )
    }

    #[test]
    fn round_trips_exactly() {
        let mut sig = vec![0x11u8; 64];
        sig.push(0x1b);
        let original = payload(sig);
        let decoded = PaymasterPayload::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn round_trips_empty_signature() {
        let original = payload(vec![]);
        let encoded = original.encode();
        assert_eq!(encoded.len(), PAYLOAD_HEADER_LEN);
        assert_eq!(PaymasterPayload::decode(&encoded).unwrap(), original);
    }

    #[test]
    fn layout_is_tightly_packed() {
        let encoded = payload(vec![0xee; 65]).encode();

        assert_eq!(encoded[0], PAYLOAD_VERSION);
        assert_eq!(
            hex::encode(&encoded[1..21]),
            "75faf114eafb1bdbe2f0316df893fd58ce46aa4d"
        );
        // 1_000_000 = 0x0f4240, right-aligned in the 32-byte word.
        assert_eq!(U256::from_big_endian(&encoded[21..53]), U256::from(1_000_000));
        assert!(encoded[21..50].iter().all(|b| *b == 0));
        assert_eq!(&encoded[53..], vec![0xee; 65].as_slice());
    }

    #[test]
    fn rejects_truncated_payload() {
        let err = PaymasterPayload::decode(&[0u8; 52]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPaymasterData(_)));
    }

    #[test]
    fn max_spend_saturates_full_word() {
        let original = PaymasterPayload::new(Address::zero(), U256::MAX, Bytes::default());
        let decoded = PaymasterPayload::decode(&original.encode()).unwrap();
        assert_eq!(decoded.max_spend, U256::MAX);
    }
}
