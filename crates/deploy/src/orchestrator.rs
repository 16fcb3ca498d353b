//! Recipe execution.
//!
//! The [`Orchestrator`] walks a [`Recipe`] front to back. For each step it
//! resolves references against the outputs of the steps already completed,
//! sanitizes and encodes the message, and issues exactly one gateway call. The
//! first failure stops the run; nothing is rolled back, and the returned
//! [`RunReport`] lists every step that did complete.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    artifact::{Bytecode, CodeArtifact},
    gateway::{Actor, CodeId, ContractAddress, Gateway, GatewayError, Receipt},
    payload::{CodecError, Message},
    recipe::{AddressSource, CodeSource, LinkError, Recipe, RecipeStep, Step, StepKind, Template},
};

/// A contract created by an instantiate step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInstance {
    pub address: ContractAddress,
    pub code_id: CodeId,
    pub label: String,
}

/// What a completed step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutput {
    Code(CodeArtifact),
    Contract(ContractInstance),
    Receipt(Receipt),
}

impl StepOutput {
    /// Human readable identifier: code id, contract address or tx hash.
    pub fn identifier(&self) -> String {
        match self {
            StepOutput::Code(artifact) => artifact.code_id.to_string(),
            StepOutput::Contract(instance) => instance.address.to_string(),
            StepOutput::Receipt(receipt) => receipt.tx_hash.clone(),
        }
    }

    pub fn code_id(&self) -> Option<CodeId> {
        match self {
            StepOutput::Code(artifact) => Some(artifact.code_id),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<&ContractAddress> {
        match self {
            StepOutput::Contract(instance) => Some(&instance.address),
            _ => None,
        }
    }

    /// The value spliced into messages that link this output.
    ///
    /// Code ids are numbers and addresses are strings. Receipts cannot be
    /// linked.
    fn link_value(&self) -> Option<Value> {
        match self {
            StepOutput::Code(artifact) => Some(Value::from(artifact.code_id.get())),
            StepOutput::Contract(instance) => Some(Value::from(instance.address.as_str())),
            StepOutput::Receipt(_) => None,
        }
    }
}

/// Why a single step failed.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("failed to encode message: {0}")]
    Encoding(#[from] CodecError),
    #[error("failed to read artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to resolve message: {0}")]
    Link(#[from] LinkError),
}

/// A step that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub name: String,
    pub kind: StepKind,
    pub output: StepOutput,
}

/// The step that stopped a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub index: usize,
    pub name: String,
    pub kind: StepKind,
    /// The error as reported, gateway messages verbatim.
    pub error: String,
    /// Whether the ledger explicitly refused the call. A transport failure
    /// leaves it unknown whether the call committed.
    pub rejected: bool,
}

/// Ordered results of one recipe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub recipe: String,
    pub completed: Vec<StepOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl RunReport {
    pub fn new(recipe: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            completed: Vec::new(),
            failure: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Output of the completed step with the given name.
    pub fn output(&self, step: &str) -> Option<&StepOutput> {
        self.completed
            .iter()
            .find(|outcome| outcome.name == step)
            .map(|outcome| &outcome.output)
    }

    /// Save the report to a file as formatted JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .context(format!("Failed to write run report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report previously written by [`Self::save_to_file`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Run report does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read run report from {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse run report JSON")
    }
}

/// Drives recipes against a [`Gateway`] on behalf of one actor.
pub struct Orchestrator<G> {
    gateway: G,
    actor: Actor,
}

impl<G: Gateway> Orchestrator<G> {
    pub fn new(gateway: G, actor: Actor) -> Self {
        Self { gateway, actor }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Run every step of `recipe` in order, stopping at the first failure.
    pub async fn run(&self, recipe: &Recipe) -> RunReport {
        tracing::info!(
            recipe = recipe.name(),
            steps = recipe.len(),
            gateway = self.gateway.name(),
            actor = %self.actor,
            "Running recipe"
        );
        self.run_from(recipe, RunReport::new(recipe.name())).await
    }

    /// Continue a run that stopped early.
    ///
    /// The outputs recorded in `previous` stand in for the steps it completed;
    /// execution restarts at the first step it did not complete.
    pub async fn resume(&self, recipe: &Recipe, previous: &RunReport) -> Result<RunReport> {
        if previous.recipe != recipe.name() {
            anyhow::bail!(
                "Report belongs to recipe {}, not {}",
                previous.recipe,
                recipe.name()
            );
        }
        if previous.completed.len() > recipe.len() {
            anyhow::bail!(
                "Report lists {} completed steps but recipe {} has only {}",
                previous.completed.len(),
                recipe.name(),
                recipe.len()
            );
        }

        for (index, (outcome, step)) in previous.completed.iter().zip(recipe.steps()).enumerate() {
            if outcome.index != index || outcome.name != step.name || outcome.kind != step.step.kind()
            {
                anyhow::bail!(
                    "Report step {} ({}) does not match recipe step {index} ({})",
                    outcome.index,
                    outcome.name,
                    step.name
                );
            }
        }

        tracing::info!(
            recipe = recipe.name(),
            skipped = previous.completed.len(),
            remaining = recipe.len() - previous.completed.len(),
            gateway = self.gateway.name(),
            "Resuming recipe"
        );

        let report = RunReport {
            recipe: previous.recipe.clone(),
            completed: previous.completed.clone(),
            failure: None,
        };
        Ok(self.run_from(recipe, report).await)
    }

    async fn run_from(&self, recipe: &Recipe, mut report: RunReport) -> RunReport {
        let start = report.completed.len();

        for (index, recipe_step) in recipe.steps().iter().enumerate().skip(start) {
            let kind = recipe_step.step.kind();
            tracing::debug!(index, step = %recipe_step.name, %kind, "Starting step");

            match self.execute_step(recipe_step, &report.completed).await {
                Ok(output) => {
                    tracing::info!(
                        index,
                        step = %recipe_step.name,
                        %kind,
                        id = %output.identifier(),
                        "Step completed"
                    );
                    report.completed.push(StepOutcome {
                        index,
                        name: recipe_step.name.clone(),
                        kind,
                        output,
                    });
                }
                Err(error) => {
                    tracing::error!(
                        index,
                        step = %recipe_step.name,
                        %kind,
                        error = %error,
                        "Step failed, stopping recipe"
                    );
                    let rejected = matches!(&error, StepError::Gateway(e) if e.is_rejection());
                    report.failure = Some(StepFailure {
                        index,
                        name: recipe_step.name.clone(),
                        kind,
                        error: error.to_string(),
                        rejected,
                    });
                    return report;
                }
            }
        }

        tracing::info!(recipe = recipe.name(), "Recipe completed");
        report
    }

    async fn execute_step(
        &self,
        recipe_step: &RecipeStep,
        done: &[StepOutcome],
    ) -> Result<StepOutput, StepError> {
        match &recipe_step.step {
            Step::Upload { source_path } => {
                let bytecode =
                    Bytecode::read(source_path)
                        .await
                        .map_err(|source| StepError::Artifact {
                            path: source_path.clone(),
                            source,
                        })?;
                let code_id = self.gateway.upload(&self.actor, &bytecode.bytes).await?;
                let artifact = CodeArtifact::new(code_id, &bytecode);
                tracing::info!(
                    %code_id,
                    path = %artifact.source_path.display(),
                    checksum = %artifact.checksum,
                    "Code stored"
                );
                Ok(StepOutput::Code(artifact))
            }
            Step::Instantiate {
                code,
                label,
                admin,
                msg,
            } => {
                let code_id = resolve_code(code, done)?;
                let msg = prepare_message(&recipe_step.name, msg, done)?;
                let address = self
                    .gateway
                    .instantiate(&self.actor, code_id, label, &msg, admin.as_deref())
                    .await?;
                Ok(StepOutput::Contract(ContractInstance {
                    address,
                    code_id,
                    label: label.clone(),
                }))
            }
            Step::Execute { contract, msg } => {
                let contract = resolve_address(contract, done)?;
                let msg = prepare_message(&recipe_step.name, msg, done)?;
                let receipt = self.gateway.execute(&self.actor, &contract, &msg).await?;
                Ok(StepOutput::Receipt(receipt))
            }
            Step::Migrate {
                contract,
                new_code,
                msg,
            } => {
                let contract = resolve_address(contract, done)?;
                let new_code_id = resolve_code(new_code, done)?;
                let msg = prepare_message(&recipe_step.name, msg, done)?;
                let receipt = self
                    .gateway
                    .migrate(&self.actor, &contract, new_code_id, &msg)
                    .await?;
                Ok(StepOutput::Receipt(receipt))
            }
        }
    }
}

fn resolve_code(code: &CodeSource, done: &[StepOutcome]) -> Result<CodeId, LinkError> {
    match code {
        CodeSource::Id(code_id) => Ok(*code_id),
        CodeSource::Uploaded(step) => done
            .get(step.index())
            .and_then(|outcome| outcome.output.code_id())
            .ok_or(LinkError::Unresolved(*step)),
    }
}

fn resolve_address(
    contract: &AddressSource,
    done: &[StepOutcome],
) -> Result<ContractAddress, LinkError> {
    match contract {
        AddressSource::Address(address) => Ok(address.clone()),
        AddressSource::Instantiated(step) => done
            .get(step.index())
            .and_then(|outcome| outcome.output.address())
            .cloned()
            .ok_or(LinkError::Unresolved(*step)),
    }
}

fn prepare_message(
    step: &str,
    template: &Template,
    done: &[StepOutcome],
) -> Result<Message, StepError> {
    let body = template.resolve(|from| {
        done.get(from.index())
            .and_then(|outcome| outcome.output.link_value())
    })?;
    let msg = Message::new(&body)?;
    if msg.is_empty() {
        tracing::warn!(step, "Message is empty after sanitization");
    }
    Ok(msg)
}
