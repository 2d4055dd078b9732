// src/permit.rs
use ethers::abi::{encode, Token};
use ethers::providers::Middleware;
use ethers::types::transaction::eip712::EIP712Domain;
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;

use crate::contracts::FeeToken;
use crate::error::PipelineError;

/// EIP-2612 `Permit` type string. Field order is fixed by the standard.
const PERMIT_TYPE: &str =
    "Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

/// Domain scoping a permit signature to one token contract on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl PermitDomain {
    pub fn separator(&self) -> H256 {
        let domain = EIP712Domain {
            name: Some(self.name.clone()),
            version: Some(self.version.clone()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        };
        H256(domain.separator())
    }
}

/// The typed message authorizing `spender` to draw at most `value` from
/// `owner`'s balance. Single-use via the nonce, never expiring by time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitMessage {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignablePermit {
    pub domain: PermitDomain,
    pub message: PermitMessage,
}

impl SignablePermit {
    fn struct_hash(&self) -> [u8; 32] {
        let type_hash = keccak256(PERMIT_TYPE.as_bytes());
        keccak256(encode(&[
            Token::FixedBytes(type_hash.to_vec()),
            Token::Address(self.message.owner),
            Token::Address(self.message.spender),
            Token::Uint(self.message.value),
            Token::Uint(self.message.nonce),
            Token::Uint(self.message.deadline),
        ]))
    }

    /// The EIP-712 digest the account owner signs.
    pub fn signing_hash(&self) -> H256 {
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(self.domain.separator().as_bytes());
        preimage.extend_from_slice(&self.struct_hash());
        H256(keccak256(&preimage))
    }
}

/// Builds the permit for one operation. The three token reads are independent
/// and issued concurrently; the nonce must match the contract's current value
/// at execution time, so the result is never reused.
pub async fn build_permit<M: Middleware + 'static>(
    token: &FeeToken<M>,
    chain_id: u64,
    owner: Address,
    spender: Address,
    value: U256,
) -> Result<SignablePermit, PipelineError> {
    let name = async {
        token
            .name()
            .call()
            .await
            .map_err(|e| PipelineError::ContractRead(format!("token name: {e}")))
    };
    let version = async {
        token
            .version()
            .call()
            .await
            .map_err(|e| PipelineError::ContractRead(format!("token version: {e}")))
    };
    let nonce = async {
        token
            .nonces(owner)
            .call()
            .await
            .map_err(|e| PipelineError::ContractRead(format!("permit nonce: {e}")))
    };
    let (name, version, nonce) = tokio::try_join!(name, version, nonce)?;

    Ok(SignablePermit {
        domain: PermitDomain {
            name,
            version,
            chain_id,
            verifying_contract: token.address(),
        },
        message: PermitMessage {
            owner,
            spender,
            value,
            nonce,
            deadline: U256::MAX,
        },
    })
}
