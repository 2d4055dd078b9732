// src/client.rs
use std::sync::Arc;

use ethers::providers::{Http, Provider};
use ethers::types::{Bytes, U256};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::account::SmartAccountProvider;
use crate::bundler::BundlerClient;
use crate::config::NetworkConfig;
use crate::contracts::{AirdropClaimer, FeeToken, TokenPaymaster};
use crate::error::PipelineError;
use crate::paymaster::PaymasterPayload;
use crate::permit;
use crate::signature;
use crate::types::{Call, UserOperation, UserOperationReceipt};

/// Client for executing sponsored operations from one smart account.
///
/// The fee-token permit nonce and the account's execution nonce are both
/// single-threaded resources, so flows take `in_flight` for their full
/// duration: at most one operation per account is ever in flight.
pub struct GaslessClient<A> {
    pub(crate) config: NetworkConfig,
    provider: Arc<Provider<Http>>,
    pub(crate) bundler: BundlerClient,
    pub(crate) account: A,
    pub(crate) in_flight: Mutex<()>,
}

impl<A: SmartAccountProvider> GaslessClient<A> {
    pub fn new(config: NetworkConfig, account: A) -> Result<Self, PipelineError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| PipelineError::InvalidParameters(format!("rpc url: {e}")))?;
        let bundler = BundlerClient::new(&config.bundler_url, config.entry_point)?;

        info!(
            "pipeline ready for account {:?} on chain {} (entry point {})",
            account.address(),
            config.chain_id,
            account.entry_point_version()
        );

        Ok(Self {
            config,
            provider: Arc::new(provider),
            bundler,
            account,
            in_flight: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub(crate) fn fee_token(&self) -> FeeToken<Provider<Http>> {
        FeeToken::new(self.config.fee_token, self.provider.clone())
    }

    pub(crate) fn claimer(&self) -> AirdropClaimer<Provider<Http>> {
        AirdropClaimer::new(self.config.claim_contract, self.provider.clone())
    }

    fn paymaster_contract(&self) -> TokenPaymaster<Provider<Http>> {
        TokenPaymaster::new(self.config.paymaster, self.provider.clone())
    }

    pub async fn fee_token_balance(&self) -> Result<U256, PipelineError> {
        self.fee_token()
            .balance_of(self.account.address())
            .call()
            .await
            .map_err(|e| PipelineError::ContractRead(format!("balanceOf: {e}")))
    }

    /// Builds, signs and packs the permit the paymaster consumes. The
    /// authorized value is the fixed gas allowance, never the full balance.
    async fn signed_paymaster_data(&self) -> Result<Bytes, PipelineError> {
        let permit = permit::build_permit(
            &self.fee_token(),
            self.config.chain_id,
            self.account.address(),
            self.config.paymaster,
            self.config.max_gas_allowance,
        )
        .await?;
        debug!(
            "permit nonce {} for domain {}/{}",
            permit.message.nonce, permit.domain.name, permit.domain.version
        );

        let signed = self.account.sign_typed_data(permit.signing_hash()).await?;
        let signed = signature::normalize(&signed)?;

        Ok(PaymasterPayload::new(
            self.config.fee_token,
            self.config.max_gas_allowance,
            signed,
        )
        .encode())
    }

    /// Shared tail of both flows. Callers must have checked their balance
    /// precondition already and must hold the `in_flight` lock.
    pub(crate) async fn execute(
        &self,
        calls: Vec<Call>,
    ) -> Result<UserOperationReceipt, PipelineError> {
        // 1. Permit: authorize the paymaster to draw fees in the token.
        let paymaster_data = self.signed_paymaster_data().await?;

        // 2. Price and size the operation.
        let draft = UserOperation {
            sender: self.account.address(),
            calls,
            paymaster: self.config.paymaster,
            paymaster_data,
            ..Default::default()
        };
        let mut op =
            crate::gas::price_operation(&self.bundler, &self.paymaster_contract(), draft).await?;

        // 3. Sign the final operation.
        let digest = op.signing_hash(self.config.entry_point, self.config.chain_id);
        op.signature = self.account.sign_user_operation(digest).await?;

        // 4. Submit and wait for a terminal receipt.
        let op_hash = self.bundler.submit(&op).await?;
        info!("submitted user operation {:?}", op_hash);

        self.bundler
            .wait_for_receipt(
                op_hash,
                self.config.poll_interval,
                self.config.confirmation_timeout,
            )
            .await
    }
}
