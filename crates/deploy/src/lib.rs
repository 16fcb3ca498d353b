//! cosmup-deploy - Deployment library for CosmWasm contracts.
//!
//! This crate provides everything needed to deploy and wire up the presale,
//! vesting, locking and cw20 contracts: payload sanitization and encoding,
//! the gateway to the ledger, declarative deployment recipes and the
//! orchestrator that runs them.

mod artifact;
pub use artifact::{Bytecode, CodeArtifact};

mod config;
pub use config::{
    ArtifactsConfig, CONFIG_FILENAME, CodeIds, DeployConfig, ENV_PREFIX, NetworkConfig, Timestamp,
};

pub mod gateway;
pub use gateway::{
    Actor, CodeId, ContractAddress, DryRunGateway, Gateway, GatewayError, Receipt, RpcGateway,
};

mod orchestrator;
pub use orchestrator::{
    ContractInstance, Orchestrator, RunReport, StepError, StepFailure, StepOutcome, StepOutput,
};

pub mod payload;
pub use payload::Message;

pub mod recipe;
pub use recipe::{
    Recipe, RecipeBuilder, RecipeContext, RecipeError, RecipeKind, Step, StepKind, StepRef,
    Template,
};

mod report;
pub use report::summary_table;
