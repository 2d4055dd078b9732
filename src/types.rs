// src/types.rs
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

/// A single target call carried by a user operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
}

/// The unit of work submitted to the bundler on behalf of a smart account.
///
/// Built in two passes: an estimation pass with floor fee values, then the
/// final pass with the real fee quote and the discovered gas limits.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub calls: Vec<Call>,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub paymaster: Address,
    pub paymaster_data: Bytes,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub signature: Bytes,
}

impl UserOperation {
    /// ABI-encodes every field that the account commits to, with the calls
    /// and paymaster data reduced to their hashes.
    pub fn pack_for_signing(&self) -> Bytes {
        let calls: Vec<Token> = self
            .calls
            .iter()
            .map(|call| Token::Tuple(vec![Token::Address(call.to), Token::Bytes(call.data.to_vec())]))
            .collect();
        let calls_hash = keccak256(encode(&[Token::Array(calls)]));

        let encoded = encode(&[
            Token::Address(self.sender),
            Token::FixedBytes(calls_hash.to_vec()),
            Token::Uint(self.call_gas_limit),
            Token::Uint(self.verification_gas_limit),
            Token::Uint(self.pre_verification_gas),
            Token::Address(self.paymaster),
            Token::FixedBytes(keccak256(&self.paymaster_data).to_vec()),
            Token::Uint(self.paymaster_verification_gas_limit),
            Token::Uint(self.paymaster_post_op_gas_limit),
            Token::Uint(self.max_fee_per_gas),
            Token::Uint(self.max_priority_fee_per_gas),
        ]);
        encoded.into()
    }

    /// Digest the account signs: the packed operation bound to one entry
    /// point and one chain.
    pub fn signing_hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        let op_hash = keccak256(self.pack_for_signing());
        H256(keccak256(encode(&[
            Token::FixedBytes(op_hash.to_vec()),
            Token::Address(entry_point),
            Token::Uint(U256::from(chain_id)),
        ])))
    }
}

/// Gas-limit fields returned by the bundler's estimation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
}

/// A single fee tier as quoted by the bundler, hex quantities on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// The bundler's tiered gas-price quote. Only the standard tier is used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredFeeQuote {
    pub slow: FeeQuote,
    pub standard: FeeQuote,
    pub fast: FeeQuote,
}

/// Terminal outcome of a submitted user operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: H256,
    pub sender: Address,
    pub success: bool,
    pub actual_gas_used: U256,
    pub actual_gas_cost: U256,
    #[serde(default)]
    pub reason: Option<String>,
    pub receipt: BundledTransaction,
}

/// The on-chain transaction the operation was bundled into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundledTransaction {
    pub transaction_hash: H256,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_op() -> UserOperation {
        UserOperation {
            sender: "0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap(),
            calls: vec![Call {
                to: "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d".parse().unwrap(),
                data: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
            }],
            call_gas_limit: 200_000.into(),
            verification_gas_limit: 100_000.into(),
            pre_verification_gas: 21_000.into(),
            paymaster: "0x31BE08D380A21fc740883c0BC434FcFc88740b58".parse().unwrap(),
            paymaster_data: Bytes::from(vec![0u8; 53]),
            paymaster_verification_gas_limit: 50_000.into(),
            paymaster_post_op_gas_limit: 40_000.into(),
            max_fee_per_gas: 1_000_000_000u64.into(),
            max_priority_fee_per_gas: 1_000_000_000u64.into(),
            signature: Bytes::default(),
        }
    }

    #[test]
    fn signing_hash_is_deterministic() {
        let entry_point: Address = "0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap();
        let op = sample_op();
        assert_eq!(
            op.signing_hash(entry_point, 421_614),
            op.signing_hash(entry_point, 421_614)
        );
    }

    #[test]
    fn signing_hash_binds_chain_and_entry_point() {
        let entry_point: Address = "0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap();
        let other_entry: Address = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap();
        let op = sample_op();
        assert_ne!(
            op.signing_hash(entry_point, 421_614),
            op.signing_hash(entry_point, 1)
        );
        assert_ne!(
            op.signing_hash(entry_point, 421_614),
            op.signing_hash(other_entry, 421_614)
        );
    }

    #[test]
    fn signing_hash_covers_paymaster_data() {
        let entry_point: Address = "0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap();
        let op = sample_op();
        let mut tampered = op.clone();
        tampered.paymaster_data = Bytes::from(vec![1u8; 53]);
        assert_ne!(
            op.signing_hash(entry_point, 421_614),
            tampered.signing_hash(entry_point, 421_614)
        );
    }

    #[test]
    fn wire_format_is_camel_case_hex() {
        let op = sample_op();
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["callGasLimit"], "0x30d40");
        assert_eq!(json["maxFeePerGas"], "0x3b9aca00");
        assert!(json["calls"][0]["to"].is_string());
        assert!(json.get("call_gas_limit").is_none());
    }

    #[test]
    fn fee_quote_parses_hex_quantities() {
        let quote: TieredFeeQuote = serde_json::from_str(
            r#"{
                "slow": {"maxFeePerGas": "0x3b9aca00", "maxPriorityFeePerGas": "0x1"},
                "standard": {"maxFeePerGas": "0x77359400", "maxPriorityFeePerGas": "0x2"},
                "fast": {"maxFeePerGas": "0xb2d05e00", "maxPriorityFeePerGas": "0x3"}
            }"#,
        )
        .unwrap();
        assert_eq!(quote.standard.max_fee_per_gas, U256::from(2_000_000_000u64));
        assert_eq!(quote.standard.max_priority_fee_per_gas, U256::from(2));
    }

    #[test]
    fn receipt_ignores_extra_fields() {
        let receipt: UserOperationReceipt = serde_json::from_str(
            r#"{
                "userOpHash": "0x3d61659e0f1a5a2b2b7f1b9b1e4f3e30f1b0c7a1d2e3f4a5b6c7d8e9f0a1b2c3",
                "sender": "0x9c5754De1443984659E1b3a8d1931D83475ba29C",
                "nonce": "0x1",
                "success": true,
                "actualGasUsed": "0x5208",
                "actualGasCost": "0x2e90edd000",
                "logs": [],
                "receipt": {
                    "transactionHash": "0x4d61659e0f1a5a2b2b7f1b9b1e4f3e30f1b0c7a1d2e3f4a5b6c7d8e9f0a1b2c3",
                    "blockNumber": "0x10"
                }
            }"#,
        )
        .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.actual_gas_used, U256::from(21_000));
    }
}
