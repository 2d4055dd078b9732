// src/bundler.rs
use std::time::Duration;

use ethers::types::{Address, H256};
use jsonrpsee::core::Error as RpcError;
use jsonrpsee::core::RpcResult;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::proc_macros::rpc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{PipelineError, RevertReason};
use crate::types::{GasEstimate, FeeQuote, TieredFeeQuote, UserOperation, UserOperationReceipt};

// Bundler RPC surface used by the pipeline.
#[rpc(client, namespace = "eth")]
pub trait BundlerApi {
    #[method(name = "estimateUserOperationGas")]
    async fn estimate_user_operation_gas(
        &self,
        op: UserOperation,
        entry_point: Address,
    ) -> RpcResult<GasEstimate>;

    #[method(name = "sendUserOperation")]
    async fn send_user_operation(
        &self,
        op: UserOperation,
        entry_point: Address,
    ) -> RpcResult<H256>;

    #[method(name = "getUserOperationReceipt")]
    async fn get_user_operation_receipt(
        &self,
        op_hash: H256,
    ) -> RpcResult<Option<UserOperationReceipt>>;
}

#[rpc(client, namespace = "pimlico")]
pub trait BundlerGasPriceApi {
    #[method(name = "getUserOperationGasPrice")]
    async fn get_user_operation_gas_price(&self) -> RpcResult<TieredFeeQuote>;
}

/// HTTP client for one bundler endpoint, bound to one entry point.
pub struct BundlerClient {
    http: HttpClient,
    entry_point: Address,
}

impl BundlerClient {
    pub fn new(url: &str, entry_point: Address) -> Result<Self, PipelineError> {
        let http = HttpClientBuilder::default()
            .build(url)
            .map_err(|e| PipelineError::InvalidParameters(format!("bundler url: {e}")))?;
        Ok(Self { http, entry_point })
    }

    /// Current recommended fee pair, standard tier.
    pub async fn fee_quote(&self) -> Result<FeeQuote, PipelineError> {
        let tiers = self
            .http
            .get_user_operation_gas_price()
            .await
            .map_err(|e| PipelineError::Rpc(format!("gas price quote: {e}")))?;
        Ok(tiers.standard)
    }

    /// Simulates the draft operation to discover its gas-limit fields.
    pub async fn estimate(&self, op: &UserOperation) -> Result<GasEstimate, PipelineError> {
        self.http
            .estimate_user_operation_gas(op.clone(), self.entry_point)
            .await
            .map_err(|e| match revert_of(&e) {
                Some(reason) => PipelineError::GasEstimation { reason },
                None => PipelineError::Rpc(format!("gas estimation: {e}")),
            })
    }

    /// Submits the final operation; the bundler answers with the operation
    /// hash synchronously.
    pub async fn submit(&self, op: &UserOperation) -> Result<H256, PipelineError> {
        self.http
            .send_user_operation(op.clone(), self.entry_point)
            .await
            .map_err(|e| match revert_of(&e) {
                Some(reason) => PipelineError::SubmissionRejected { reason },
                None => PipelineError::Rpc(format!("submission: {e}")),
            })
    }

    /// Polls for a terminal receipt at a fixed interval until `timeout`
    /// elapses. Dropping the returned future cancels the wait; a timeout does
    /// not mean the operation failed on-chain, it may still land later.
    pub async fn wait_for_receipt(
        &self,
        op_hash: H256,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<UserOperationReceipt, PipelineError> {
        let deadline = Instant::now() + timeout;
        loop {
            let receipt = self
                .http
                .get_user_operation_receipt(op_hash)
                .await
                .map_err(|e| PipelineError::Rpc(format!("receipt lookup: {e}")))?;

            if let Some(receipt) = receipt {
                info!(
                    "operation {:?} mined in tx {:?} (success: {})",
                    op_hash, receipt.receipt.transaction_hash, receipt.success
                );
                return Ok(receipt);
            }

            if Instant::now() + poll_interval > deadline {
                return Err(PipelineError::ConfirmationTimeout { op_hash, timeout });
            }
            debug!("operation {:?} not yet mined, polling again", op_hash);
            sleep(poll_interval).await;
        }
    }
}

fn revert_of(err: &RpcError) -> Option<RevertReason> {
    if let RpcError::Call(object) = err {
        let mut text = object.message().to_string();
        if let Some(data) = object.data() {
            text.push(' ');
            text.push_str(data.get());
        }
        Some(RevertReason::from_text(&text))
    } else {
        None
    }
}
