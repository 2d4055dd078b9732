// src/gas.rs
use ethers::providers::Middleware;
use ethers::types::U256;
use tracing::debug;

use crate::bundler::BundlerClient;
use crate::contracts::TokenPaymaster;
use crate::error::PipelineError;
use crate::types::UserOperation;

/// Prices and sizes a draft operation: queries the fee quote and the
/// paymaster's post-op surcharge, runs the estimation pass, then fills in the
/// real values for submission.
///
/// The surcharge is read fresh per operation since it can change on-chain.
pub async fn price_operation<M: Middleware + 'static>(
    bundler: &BundlerClient,
    paymaster: &TokenPaymaster<M>,
    mut op: UserOperation,
) -> Result<UserOperation, PipelineError> {
    // No ordering dependency between the two queries.
    let fees = bundler.fee_quote();
    let surcharge = async {
        paymaster
            .additional_gas_charge()
            .call()
            .await
            .map_err(|e| PipelineError::ContractRead(format!("additionalGasCharge: {e}")))
    };
    let (fees, additional_gas_charge) = tokio::try_join!(fees, surcharge)?;
    debug!(
        "fee quote {}/{} wei, paymaster surcharge {} gas",
        fees.max_fee_per_gas, fees.max_priority_fee_per_gas, additional_gas_charge
    );

    // Estimation pass. 1 wei fee fields keep the simulated fee-token balance
    // check passing while the gas limits are discovered.
    op.max_fee_per_gas = U256::one();
    op.max_priority_fee_per_gas = U256::one();
    op.paymaster_post_op_gas_limit = additional_gas_charge;
    let estimate = bundler.estimate(&op).await?;

    op.call_gas_limit = estimate.call_gas_limit;
    op.verification_gas_limit = estimate.verification_gas_limit;
    op.pre_verification_gas = estimate.pre_verification_gas;
    op.paymaster_verification_gas_limit = estimate.paymaster_verification_gas_limit;
    // The paymaster may need more post-op gas than the generic estimate assumes.
    op.paymaster_post_op_gas_limit =
        reconcile_post_op_gas(estimate.paymaster_post_op_gas_limit, additional_gas_charge);
    op.max_fee_per_gas = fees.max_fee_per_gas;
    op.max_priority_fee_per_gas = fees.max_priority_fee_per_gas;

    Ok(op)
}

/// Final post-op gas limit: never below either the estimator's value or the
/// freshly read surcharge.
pub fn reconcile_post_op_gas(estimated: U256, additional_gas_charge: U256) -> U256 {
    estimated.max(additional_gas_charge)
}
