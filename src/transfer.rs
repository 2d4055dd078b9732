// src/transfer.rs
use ethers::types::{Address, U256};
use tracing::info;

use crate::account::SmartAccountProvider;
use crate::client::GaslessClient;
use crate::error::PipelineError;
use crate::types::{Call, UserOperationReceipt};

/// Balance precondition for a transfer, checked before anything is signed.
pub fn check_transfer_preconditions(
    balance: U256,
    amount: U256,
    gas_buffer: U256,
) -> Result<(), PipelineError> {
    if balance < amount.saturating_add(gas_buffer) {
        return Err(PipelineError::InsufficientBalance {
            balance,
            requested: amount,
            buffer: gas_buffer,
            max_transferable: balance.saturating_sub(gas_buffer),
        });
    }
    Ok(())
}

impl<A: SmartAccountProvider> GaslessClient<A> {
    /// Transfers `amount` of the fee token with the network fee itself paid
    /// in the same token.
    pub async fn transfer(
        &self,
        recipient: Address,
        amount: U256,
    ) -> Result<UserOperationReceipt, PipelineError> {
        let _in_flight = self.in_flight.lock().await;

        // 1. Balance precondition, before any signing or network cost.
        let balance = self.fee_token_balance().await?;
        check_transfer_preconditions(balance, amount, self.config.gas_buffer)?;
        info!(
            "transferring {} to {:?} (balance {})",
            amount, recipient, balance
        );

        // 2. The operation carries exactly one call: transfer on the token.
        let data = self
            .fee_token()
            .transfer(recipient, amount)
            .calldata()
            .ok_or_else(|| {
                PipelineError::InvalidParameters("transfer calldata encoding".to_string())
            })?;
        let calls = vec![Call {
            to: self.config.fee_token,
            data,
        }];

        // 3. Permit, price, sign, submit, confirm.
        self.execute(calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Amounts in native token units at 6 decimals.
    fn units(tokens: &str) -> U256 {
        let parsed = ethers::utils::parse_units(tokens, 6).unwrap();
        U256::from(parsed)
    }

    #[test]
    fn fails_when_balance_cannot_cover_amount_plus_buffer() {
        // balance 1.50, transfer 0.10, buffer 2.00
        let err =
            check_transfer_preconditions(units("1.50"), units("0.10"), units("2.00")).unwrap_err();
        match err {
            PipelineError::InsufficientBalance {
                balance,
                requested,
                buffer,
                max_transferable,
            } => {
                assert_eq!(balance, units("1.50"));
                assert_eq!(requested, units("0.10"));
                assert_eq!(buffer, units("2.00"));
                // 1.50 - 2.00 floors at zero.
                assert_eq!(max_transferable, U256::zero());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn passes_when_balance_covers_amount_plus_buffer() {
        // balance 10.00, transfer 3.00, buffer 2.00
        assert!(check_transfer_preconditions(units("10.00"), units("3.00"), units("2.00")).is_ok());
    }

    #[test]
    fn exact_boundary_passes() {
        assert!(check_transfer_preconditions(units("5.00"), units("3.00"), units("2.00")).is_ok());
    }

    #[test]
    fn one_unit_below_boundary_fails() {
        let balance = units("5.00") - U256::one();
        let err = check_transfer_preconditions(balance, units("3.00"), units("2.00")).unwrap_err();
        match err {
            PipelineError::InsufficientBalance {
                max_transferable, ..
            } => assert_eq!(max_transferable, units("3.00") - U256::one()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn huge_amount_does_not_overflow() {
        let err = check_transfer_preconditions(units("10.00"), U256::MAX, units("2.00"));
        assert!(err.is_err());
    }
}
