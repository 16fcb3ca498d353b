//! Remote execution gateway.
//!
//! The gateway is the boundary between the orchestrator and the ledger. It
//! owns transport and signing; the orchestrator only hands it bytecode and
//! sanitized [`Message`]s and gets identifiers back.

mod dry_run;
mod rpc;

pub use dry_run::DryRunGateway;
pub use rpc::RpcGateway;

use std::future::Future;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::payload::Message;

/// Ledger-assigned identifier of stored contract code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct CodeId(u64);

impl CodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Address of a live contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct ContractAddress(String);

impl ContractAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContractAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// The account on whose behalf every call of a run is signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a committed execute or migrate transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash reported by the ledger.
    pub tx_hash: String,
    /// Gas consumed by the transaction, when reported.
    #[serde(default)]
    pub gas_used: u64,
}

/// Failure of a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The ledger could not be reached. Whether the call committed is unknown.
    #[error("transport error: {0}")]
    Transport(String),
    /// The ledger or the target contract refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Retrying a rejected call with identical input fails again.
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Rejected(_))
    }
}

/// Operations the orchestrator needs from the ledger.
///
/// Every call is a single remote round-trip. Implementations must not retry on
/// their own: a timed out call may or may not have been committed.
pub trait Gateway: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Store contract bytecode, returning its code id.
    fn upload(
        &self,
        actor: &Actor,
        bytecode: &[u8],
    ) -> impl Future<Output = Result<CodeId, GatewayError>> + Send;

    /// Create a contract instance from stored code.
    ///
    /// Without an `admin` the instance can never be migrated.
    fn instantiate(
        &self,
        actor: &Actor,
        code_id: CodeId,
        label: &str,
        msg: &Message,
        admin: Option<&str>,
    ) -> impl Future<Output = Result<ContractAddress, GatewayError>> + Send;

    /// Execute a message on an existing contract.
    fn execute(
        &self,
        actor: &Actor,
        contract: &ContractAddress,
        msg: &Message,
    ) -> impl Future<Output = Result<Receipt, GatewayError>> + Send;

    /// Move a contract to new code. Only the contract admin may do this.
    fn migrate(
        &self,
        actor: &Actor,
        contract: &ContractAddress,
        new_code_id: CodeId,
        msg: &Message,
    ) -> impl Future<Output = Result<Receipt, GatewayError>> + Send;
}
