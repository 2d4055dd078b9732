// src/error.rs
use std::fmt;
use std::time::Duration;

use ethers::abi::{self, ParamType};
use ethers::types::{Bytes, H256, U256};
use thiserror::Error;

/// Selector of the standard `Error(string)` revert.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector the paymaster reverts with when the account's fee-token balance
/// cannot cover the declared maximum spend.
const BALANCE_TOO_LOW_SELECTOR: [u8; 4] = [0x65, 0xc8, 0xfd, 0x4d];

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("contract read failed: {0}")]
    ContractRead(String),

    #[error(
        "insufficient fee-token balance: have {balance}, requested {requested} plus a \
         {buffer} gas buffer (max transferable: {max_transferable})"
    )]
    InsufficientBalance {
        balance: U256,
        requested: U256,
        buffer: U256,
        /// `max(0, balance - buffer)` in native token units.
        max_transferable: U256,
    },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed paymaster data: {0}")]
    MalformedPaymasterData(String),

    #[error("gas estimation reverted: {reason}")]
    GasEstimation { reason: RevertReason },

    #[error("bundler rejected the operation: {reason}")]
    SubmissionRejected { reason: RevertReason },

    #[error("no terminal receipt for operation {op_hash:?} within {timeout:?}")]
    ConfirmationTimeout { op_hash: H256, timeout: Duration },

    #[error("bundler rpc error: {0}")]
    Rpc(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Decoded cause of a simulation or submission revert.
///
/// Known selectors map to closed variants so callers can branch on the cause
/// instead of string-matching raw selector bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    AlreadyClaimed,
    NotEligible,
    FeeTokenBalanceTooLow,
    /// An `Error(string)` revert that matched no known cause.
    Revert(String),
    /// Unknown selector, raw revert bytes preserved.
    Other(Bytes),
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::AlreadyClaimed => write!(f, "airdrop already claimed"),
            RevertReason::NotEligible => write!(f, "account not eligible"),
            RevertReason::FeeTokenBalanceTooLow => {
                write!(f, "fee-token balance below the authorized maximum spend")
            }
            RevertReason::Revert(message) => write!(f, "reverted: {message}"),
            RevertReason::Other(data) => write!(f, "contract error 0x{}", hex::encode(data)),
        }
    }
}

impl RevertReason {
    /// Decodes raw revert bytes returned by a simulation or the bundler.
    pub fn decode(data: &[u8]) -> Self {
        if data.len() >= 4 && data[..4] == BALANCE_TOO_LOW_SELECTOR {
            return RevertReason::FeeTokenBalanceTooLow;
        }
        if data.len() >= 4 && data[..4] == ERROR_STRING_SELECTOR {
            if let Ok(tokens) = abi::decode(&[ParamType::String], &data[4..]) {
                if let Some(message) = tokens.into_iter().next().and_then(|t| t.into_string()) {
                    return Self::classify(&message);
                }
            }
        }
        RevertReason::Other(Bytes::from(data.to_vec()))
    }

    /// Classifies a bundler error message, decoding the first `0x`-prefixed
    /// hex blob embedded in it when the plain text matches no known cause.
    pub fn from_text(text: &str) -> Self {
        let classified = Self::classify(text);
        if !matches!(classified, RevertReason::Revert(_)) {
            return classified;
        }
        if let Some(raw) = extract_hex(text) {
            if raw.len() >= 4 {
                return Self::decode(&raw);
            }
        }
        classified
    }

    fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("already claimed") {
            RevertReason::AlreadyClaimed
        } else if lower.contains("not eligible") {
            RevertReason::NotEligible
        } else {
            RevertReason::Revert(message.to_string())
        }
    }
}

fn extract_hex(text: &str) -> Option<Vec<u8>> {
    let start = text.find("0x")?;
    let digits: String = text[start + 2..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    if digits.len() < 8 || digits.len() % 2 != 0 {
        return None;
    }
    hex::decode(digits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::Token;

    fn error_string(message: &str) -> Vec<u8> {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(abi::encode(&[Token::String(message.to_string())]));
        data
    }

    #[test]
    fn decodes_already_claimed_revert() {
        let data = error_string("Already claimed");
        assert_eq!(RevertReason::decode(&data), RevertReason::AlreadyClaimed);
    }

    #[test]
    fn decodes_not_eligible_revert() {
        let data = error_string("Account is not eligible for the airdrop");
        assert_eq!(RevertReason::decode(&data), RevertReason::NotEligible);
    }

    #[test]
    fn decodes_unrelated_error_string() {
        let data = error_string("transfer amount exceeds allowance");
        assert_eq!(
            RevertReason::decode(&data),
            RevertReason::Revert("transfer amount exceeds allowance".to_string())
        );
    }

    #[test]
    fn decodes_balance_too_low_selector() {
        let data = hex::decode("65c8fd4d").unwrap();
        assert_eq!(
            RevertReason::decode(&data),
            RevertReason::FeeTokenBalanceTooLow
        );
    }

    #[test]
    fn unknown_selector_keeps_raw_bytes() {
        let data = hex::decode("deadbeef00000001").unwrap();
        assert_eq!(
            RevertReason::decode(&data),
            RevertReason::Other(Bytes::from(data.clone()))
        );
    }

    #[test]
    fn extracts_hex_blob_from_message() {
        let text = format!(
            "UserOperation reverted during simulation with reason: 0x{}",
            hex::encode(error_string("Already claimed"))
        );
        assert_eq!(RevertReason::from_text(&text), RevertReason::AlreadyClaimed);
    }

    #[test]
    fn classifies_plain_text_message() {
        assert_eq!(
            RevertReason::from_text("execution failed: Already claimed"),
            RevertReason::AlreadyClaimed
        );
    }

    #[test]
    fn balance_selector_inside_message() {
        let text = "paymaster validation failed 0x65c8fd4d during simulation";
        assert_eq!(
            RevertReason::from_text(text),
            RevertReason::FeeTokenBalanceTooLow
        );
    }
}
