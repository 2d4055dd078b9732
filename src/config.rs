// src/config.rs
use std::time::Duration;

use ethers::types::{Address, U256};

// Arbitrum Sepolia deployment used by the default CLI wiring.
pub const ARBITRUM_SEPOLIA_CHAIN_ID: u64 = 421_614;
pub const ARBITRUM_SEPOLIA_RPC_URL: &str = "https://sepolia-rollup.arbitrum.io/rpc";
pub const ARBITRUM_SEPOLIA_BUNDLER_URL: &str = "https://public.pimlico.io/v2/421614/rpc";
pub const ARBITRUM_SEPOLIA_USDC: &str = "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d";
pub const ARBITRUM_SEPOLIA_PAYMASTER: &str = "0x31BE08D380A21fc740883c0BC434FcFc88740b58";

/// ERC-4337 v0.7 entry point, deployed at the same address on all supported chains.
pub const ENTRY_POINT_V07: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";

pub const DEFAULT_TOKEN_DECIMALS: u32 = 6;

/// Fee-token units withheld from any requested action so sponsorship stays affordable.
/// 2 tokens at 6 decimals.
pub const DEFAULT_GAS_BUFFER: u64 = 2_000_000;

/// Upper bound on what a single permit ever authorizes the paymaster to draw.
/// 1 token at 6 decimals.
pub const DEFAULT_MAX_GAS_ALLOWANCE: u64 = 1_000_000;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 60;

/// Everything network-specific the pipeline needs, injected at construction so the
/// same code runs against any chain or against mock endpoints in tests.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub bundler_url: String,
    pub fee_token: Address,
    pub paymaster: Address,
    pub claim_contract: Address,
    pub entry_point: Address,
    pub token_decimals: u32,
    pub gas_buffer: U256,
    pub max_gas_allowance: U256,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl NetworkConfig {
    pub fn new(
        chain_id: u64,
        rpc_url: String,
        bundler_url: String,
        fee_token: Address,
        paymaster: Address,
        claim_contract: Address,
        entry_point: Address,
    ) -> Self {
        Self {
            chain_id,
            rpc_url,
            bundler_url,
            fee_token,
            paymaster,
            claim_contract,
            entry_point,
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            gas_buffer: U256::from(DEFAULT_GAS_BUFFER),
            max_gas_allowance: U256::from(DEFAULT_MAX_GAS_ALLOWANCE),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
        }
    }

    pub fn with_gas_buffer(mut self, gas_buffer: U256) -> Self {
        self.gas_buffer = gas_buffer;
        self
    }

    pub fn with_max_gas_allowance(mut self, max_gas_allowance: U256) -> Self {
        self.max_gas_allowance = max_gas_allowance;
        self
    }

    pub fn with_confirmation(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirmation_timeout = timeout;
        self
    }
}
