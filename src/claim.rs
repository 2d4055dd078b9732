// src/claim.rs
use ethers::types::U256;
use tracing::info;

use crate::account::SmartAccountProvider;
use crate::client::GaslessClient;
use crate::error::{PipelineError, RevertReason};
use crate::types::{Call, UserOperationReceipt};

/// Outcome of a claim attempt. `AlreadyClaimed` and `NotEligible` are
/// expected results of idempotent retries, not failures.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(UserOperationReceipt),
    AlreadyClaimed,
    NotEligible,
}

/// Balance precondition for a claim: the claim moves no fee-token value, so
/// only the gas buffer must be covered.
pub fn check_claim_preconditions(balance: U256, gas_buffer: U256) -> Result<(), PipelineError> {
    if balance < gas_buffer {
        return Err(PipelineError::InsufficientBalance {
            balance,
            requested: U256::zero(),
            buffer: gas_buffer,
            max_transferable: balance.saturating_sub(gas_buffer),
        });
    }
    Ok(())
}

/// Short-circuit decision from the two read-only eligibility probes. `None`
/// means the claim should proceed.
pub fn eligibility_outcome(is_eligible: bool, has_claimed: bool) -> Option<ClaimOutcome> {
    if has_claimed {
        Some(ClaimOutcome::AlreadyClaimed)
    } else if !is_eligible {
        Some(ClaimOutcome::NotEligible)
    } else {
        None
    }
}

impl<A: SmartAccountProvider> GaslessClient<A> {
    pub async fn check_eligibility(&self) -> Result<bool, PipelineError> {
        self.claimer()
            .is_eligible(self.account.address())
            .call()
            .await
            .map_err(|e| PipelineError::ContractRead(format!("isEligible: {e}")))
    }

    /// Claims the airdrop with the network fee paid in the fee token.
    pub async fn claim(&self) -> Result<ClaimOutcome, PipelineError> {
        let _in_flight = self.in_flight.lock().await;

        // 1. Balance precondition, before any signing or network cost.
        let balance = self.fee_token_balance().await?;
        check_claim_preconditions(balance, self.config.gas_buffer)?;

        // 2. Eligibility short-circuit: no operation is constructed for an
        //    account that already claimed or was never eligible.
        let claimer = self.claimer();
        let eligible = async {
            claimer
                .is_eligible(self.account.address())
                .call()
                .await
                .map_err(|e| PipelineError::ContractRead(format!("isEligible: {e}")))
        };
        let claimed = async {
            claimer
                .has_claimed(self.account.address())
                .call()
                .await
                .map_err(|e| PipelineError::ContractRead(format!("hasClaimed: {e}")))
        };
        let (is_eligible, has_claimed) = tokio::try_join!(eligible, claimed)?;
        if let Some(outcome) = eligibility_outcome(is_eligible, has_claimed) {
            info!("claim short-circuited: {:?}", outcome);
            return Ok(outcome);
        }

        // 3. The operation carries exactly one call: claimTokens().
        let data = self.claimer().claim_tokens().calldata().ok_or_else(|| {
            PipelineError::InvalidParameters("claimTokens calldata encoding".to_string())
        })?;
        let calls = vec![Call {
            to: self.config.claim_contract,
            data,
        }];

        // 4. A relay-side "already claimed" revert is the idempotent-retry
        //    case, whether it surfaces during simulation or submission.
        match self.execute(calls).await {
            Ok(receipt) => Ok(ClaimOutcome::Claimed(receipt)),
            Err(
                PipelineError::GasEstimation {
                    reason: RevertReason::AlreadyClaimed,
                }
                | PipelineError::SubmissionRejected {
                    reason: RevertReason::AlreadyClaimed,
                },
            ) => Ok(ClaimOutcome::AlreadyClaimed),
            Err(e) => Err(e),
        }
    }
}
