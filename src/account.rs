// src/account.rs
use std::fmt;

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256};

use crate::error::PipelineError;
use crate::signature;

/// Entry-point revision the account targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointVersion {
    V0_7,
}

impl fmt::Display for EntryPointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPointVersion::V0_7 => write!(f, "0.7"),
        }
    }
}

/// A smart account the pipeline can sign for. One capability set, with the
/// implementation picked by configuration (deployed vs counterfactual).
///
/// Typed-data signatures may come back wrapped in an ERC-6492 envelope when
/// the account is not deployed yet; operation signatures are always raw.
#[async_trait]
pub trait SmartAccountProvider: Send + Sync {
    fn address(&self) -> Address;

    fn entry_point_version(&self) -> EntryPointVersion {
        EntryPointVersion::V0_7
    }

    async fn sign_typed_data(&self, digest: H256) -> Result<Bytes, PipelineError>;

    async fn sign_user_operation(&self, digest: H256) -> Result<Bytes, PipelineError>;
}

/// An already-deployed account controlled by a local owner key.
pub struct LocalOwnerAccount {
    owner: LocalWallet,
    address: Address,
}

impl LocalOwnerAccount {
    pub fn new(owner: LocalWallet, address: Address) -> Self {
        Self { owner, address }
    }

    /// Parses the owner key; the account address defaults to the owner's own
    /// address until an account-factory derived one is supplied.
    pub fn from_owner_key(private_key: &str, chain_id: u64) -> Result<Self, PipelineError> {
        let owner = private_key
            .parse::<LocalWallet>()
            .map_err(|e| PipelineError::InvalidParameters(format!("owner key: {e}")))?
            .with_chain_id(chain_id);
        let address = owner.address();
        Ok(Self { owner, address })
    }

    pub fn with_account_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    fn sign(&self, digest: H256) -> Result<Bytes, PipelineError> {
        let signature = self
            .owner
            .sign_hash(digest)
            .map_err(|e| PipelineError::MalformedSignature(format!("owner signing: {e}")))?;
        Ok(Bytes::from(signature.to_vec()))
    }
}

#[async_trait]
impl SmartAccountProvider for LocalOwnerAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, digest: H256) -> Result<Bytes, PipelineError> {
        self.sign(digest)
    }

    async fn sign_user_operation(&self, digest: H256) -> Result<Bytes, PipelineError> {
        self.sign(digest)
    }
}

/// A counterfactual account: the address is derived but nothing is deployed
/// yet, so typed-data signatures carry the ERC-6492 deployment envelope.
pub struct UndeployedAccount {
    inner: LocalOwnerAccount,
    factory: Address,
    factory_calldata: Bytes,
}

impl UndeployedAccount {
    pub fn new(inner: LocalOwnerAccount, factory: Address, factory_calldata: Bytes) -> Self {
        Self {
            inner,
            factory,
            factory_calldata,
        }
    }
}

#[async_trait]
impl SmartAccountProvider for UndeployedAccount {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_typed_data(&self, digest: H256) -> Result<Bytes, PipelineError> {
        let raw = self.inner.sign(digest)?;
        Ok(signature::wrap(self.factory, &self.factory_calldata, &raw))
    }

    async fn sign_user_operation(&self, digest: H256) -> Result<Bytes, PipelineError> {
        self.inner.sign(digest)
    }
}
