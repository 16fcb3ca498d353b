//! Deployment recipes.
//!
//! A [`Recipe`] is an ordered list of steps. Later steps may use what earlier
//! steps produced (a code id or a contract address) through a [`StepRef`]:
//! either as the code to instantiate, as the contract to call, or spliced into
//! a message body through a [`Link`].
//!
//! References may only point backwards. [`Recipe::new`] checks this, so any
//! recipe that exists can be executed front to back without a dependency
//! solver.
//!
//! # Example
//!
//! ```
//! use cosmup_deploy::{CodeId, RecipeBuilder, Template};
//! use serde_json::json;
//!
//! let mut plan = RecipeBuilder::new("example");
//! let vesting = plan.instantiate(
//!     "vesting",
//!     CodeId::new(278),
//!     "vesting",
//!     None,
//!     Template::new(json!({ "reward_token": "juno1reward" })),
//! );
//! plan.execute(
//!     "set_worker",
//!     vesting,
//!     Template::new(json!({ "set_worker": { "worker": null } }))
//!         .link("/set_worker/worker", vesting),
//! );
//! let recipe = plan.build().unwrap();
//! assert_eq!(recipe.len(), 2);
//! ```

mod locking;
mod maintenance;
mod presale;
mod token;
mod upload;

pub use locking::LockingParams;
pub use maintenance::{MigrateParams, PresaleMerkleRootParams, PresaleWithdrawParams};
pub use presale::{PresaleVestingParams, VestingSchedule};
pub use token::{InitialBalance, TokenParams};

use std::{collections::HashSet, path::PathBuf};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::{ArtifactsConfig, CodeIds, DeployConfig},
    gateway::{Actor, CodeId, ContractAddress},
};

/// Position of a step inside its recipe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(transparent)]
#[display("#{_0}")]
pub struct StepRef(usize);

impl StepRef {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Which code an instantiate or migrate step uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    /// Code already stored on chain.
    Id(CodeId),
    /// Code stored by an earlier upload step.
    Uploaded(StepRef),
}

impl From<CodeId> for CodeSource {
    fn from(code_id: CodeId) -> Self {
        CodeSource::Id(code_id)
    }
}

impl From<StepRef> for CodeSource {
    fn from(step: StepRef) -> Self {
        CodeSource::Uploaded(step)
    }
}

/// Which contract an execute or migrate step targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSource {
    /// A contract that existed before the recipe ran.
    Address(ContractAddress),
    /// A contract created by an earlier instantiate step.
    Instantiated(StepRef),
}

impl From<ContractAddress> for AddressSource {
    fn from(address: ContractAddress) -> Self {
        AddressSource::Address(address)
    }
}

impl From<StepRef> for AddressSource {
    fn from(step: StepRef) -> Self {
        AddressSource::Instantiated(step)
    }
}

/// Write the identifier produced by `from` at `pointer` (RFC 6901) in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub pointer: String,
    pub from: StepRef,
}

/// Failure to resolve the links of a message template at run time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("output of step {0} is not available")]
    Unresolved(StepRef),
    #[error("no placeholder at {0}")]
    MissingPlaceholder(String),
}

/// A message body with placeholders filled from earlier step outputs.
///
/// The body must hold a value (typically `null`) at every linked pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub body: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Template {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            links: Vec::new(),
        }
    }

    /// Fill the value at `pointer` with the output of `from`.
    pub fn link(mut self, pointer: impl Into<String>, from: StepRef) -> Self {
        self.links.push(Link {
            pointer: pointer.into(),
            from,
        });
        self
    }

    /// Produce the final body, looking up linked outputs with `lookup`.
    pub fn resolve<F>(&self, lookup: F) -> Result<Value, LinkError>
    where
        F: Fn(StepRef) -> Option<Value>,
    {
        let mut body = self.body.clone();
        for link in &self.links {
            let value = lookup(link.from).ok_or(LinkError::Unresolved(link.from))?;
            let slot = body
                .pointer_mut(&link.pointer)
                .ok_or_else(|| LinkError::MissingPlaceholder(link.pointer.clone()))?;
            *slot = value;
        }
        Ok(body)
    }
}

/// Kind of a deployment step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    Upload,
    Instantiate,
    Execute,
    Migrate,
}

impl StepKind {
    /// Whether later steps can reference what this kind of step produces.
    pub fn produces_identifier(self) -> bool {
        matches!(self, StepKind::Upload | StepKind::Instantiate)
    }
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Upload {
        source_path: PathBuf,
    },
    Instantiate {
        code: CodeSource,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        admin: Option<String>,
        msg: Template,
    },
    Execute {
        contract: AddressSource,
        msg: Template,
    },
    Migrate {
        contract: AddressSource,
        new_code: CodeSource,
        msg: Template,
    },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Upload { .. } => StepKind::Upload,
            Step::Instantiate { .. } => StepKind::Instantiate,
            Step::Execute { .. } => StepKind::Execute,
            Step::Migrate { .. } => StepKind::Migrate,
        }
    }

    /// The message template, if this kind of step carries one.
    pub fn template(&self) -> Option<&Template> {
        match self {
            Step::Upload { .. } => None,
            Step::Instantiate { msg, .. } | Step::Execute { msg, .. } | Step::Migrate { msg, .. } => {
                Some(msg)
            }
        }
    }

    /// Every earlier step this one depends on, with the kind it must have
    /// (`None` when any identifier-producing step will do).
    pub fn references(&self) -> Vec<(StepRef, Option<StepKind>)> {
        let mut refs = Vec::new();

        let code = match self {
            Step::Instantiate { code, .. } => Some(code),
            Step::Migrate { new_code, .. } => Some(new_code),
            _ => None,
        };
        if let Some(CodeSource::Uploaded(step)) = code {
            refs.push((*step, Some(StepKind::Upload)));
        }

        let contract = match self {
            Step::Execute { contract, .. } | Step::Migrate { contract, .. } => Some(contract),
            _ => None,
        };
        if let Some(AddressSource::Instantiated(step)) = contract {
            refs.push((*step, Some(StepKind::Instantiate)));
        }

        if let Some(template) = self.template() {
            refs.extend(template.links.iter().map(|link| (link.from, None)));
        }

        refs
    }
}

/// A named step of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub name: String,
    #[serde(flatten)]
    pub step: Step,
}

/// Reasons a recipe cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    #[error("recipe {0} has no steps")]
    Empty(String),
    #[error("step name {0:?} is used twice")]
    DuplicateStepName(String),
    #[error("step {step:?} ({index}) references step {referenced}, which does not run before it")]
    ForwardReference {
        step: String,
        index: usize,
        referenced: StepRef,
    },
    #[error("step {step:?} needs an {expected} step at {referenced}, found {found}")]
    WrongKind {
        step: String,
        referenced: StepRef,
        expected: StepKind,
        found: StepKind,
    },
    #[error("step {step:?} links {referenced}, which produces no identifier")]
    NoIdentifier { step: String, referenced: StepRef },
    #[error("step {step:?} has no placeholder at {pointer}")]
    MissingPlaceholder { step: String, pointer: String },
    #[error("recipe {recipe} requires {field}")]
    MissingParameter {
        recipe: &'static str,
        field: &'static str,
    },
}

/// An ordered, validated deployment plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    name: String,
    steps: Vec<RecipeStep>,
}

impl Recipe {
    /// Build a recipe, rejecting any reference that does not point to a
    /// strictly earlier step of a suitable kind.
    pub fn new(name: impl Into<String>, steps: Vec<RecipeStep>) -> Result<Self, RecipeError> {
        let recipe = Self {
            name: name.into(),
            steps,
        };
        recipe.validate()?;
        Ok(recipe)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[RecipeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Contracts the recipe expects to exist before it runs.
    pub fn external_contracts(&self) -> Vec<&ContractAddress> {
        self.steps
            .iter()
            .filter_map(|s| match &s.step {
                Step::Execute {
                    contract: AddressSource::Address(address),
                    ..
                }
                | Step::Migrate {
                    contract: AddressSource::Address(address),
                    ..
                } => Some(address),
                _ => None,
            })
            .collect()
    }

    fn validate(&self) -> Result<(), RecipeError> {
        if self.steps.is_empty() {
            return Err(RecipeError::Empty(self.name.clone()));
        }

        let mut names = HashSet::new();
        for (index, recipe_step) in self.steps.iter().enumerate() {
            let name = &recipe_step.name;
            if !names.insert(name.as_str()) {
                return Err(RecipeError::DuplicateStepName(name.clone()));
            }

            for (referenced, expected) in recipe_step.step.references() {
                if referenced.index() >= index {
                    return Err(RecipeError::ForwardReference {
                        step: name.clone(),
                        index,
                        referenced,
                    });
                }

                let found = self.steps[referenced.index()].step.kind();
                match expected {
                    Some(expected) if expected != found => {
                        return Err(RecipeError::WrongKind {
                            step: name.clone(),
                            referenced,
                            expected,
                            found,
                        });
                    }
                    None if !found.produces_identifier() => {
                        return Err(RecipeError::NoIdentifier {
                            step: name.clone(),
                            referenced,
                        });
                    }
                    _ => {}
                }
            }

            if let Some(template) = recipe_step.step.template() {
                for link in &template.links {
                    if template.body.pointer(&link.pointer).is_none() {
                        return Err(RecipeError::MissingPlaceholder {
                            step: name.clone(),
                            pointer: link.pointer.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Incremental construction of a [`Recipe`].
///
/// Each added step returns its [`StepRef`], which is the only handle later
/// steps need to use its output.
#[derive(Debug, Clone)]
pub struct RecipeBuilder {
    name: String,
    steps: Vec<RecipeStep>,
}

impl RecipeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append an arbitrary step.
    pub fn push(&mut self, name: impl Into<String>, step: Step) -> StepRef {
        self.steps.push(RecipeStep {
            name: name.into(),
            step,
        });
        StepRef::new(self.steps.len() - 1)
    }

    pub fn upload(&mut self, name: impl Into<String>, source_path: impl Into<PathBuf>) -> StepRef {
        self.push(
            name,
            Step::Upload {
                source_path: source_path.into(),
            },
        )
    }

    pub fn instantiate(
        &mut self,
        name: impl Into<String>,
        code: impl Into<CodeSource>,
        label: impl Into<String>,
        admin: Option<String>,
        msg: Template,
    ) -> StepRef {
        self.push(
            name,
            Step::Instantiate {
                code: code.into(),
                label: label.into(),
                admin,
                msg,
            },
        )
    }

    pub fn execute(
        &mut self,
        name: impl Into<String>,
        contract: impl Into<AddressSource>,
        msg: Template,
    ) -> StepRef {
        self.push(
            name,
            Step::Execute {
                contract: contract.into(),
                msg,
            },
        )
    }

    pub fn migrate(
        &mut self,
        name: impl Into<String>,
        contract: impl Into<AddressSource>,
        new_code: impl Into<CodeSource>,
        msg: Template,
    ) -> StepRef {
        self.push(
            name,
            Step::Migrate {
                contract: contract.into(),
                new_code: new_code.into(),
                msg,
            },
        )
    }

    pub fn build(self) -> Result<Recipe, RecipeError> {
        Recipe::new(self.name, self.steps)
    }
}

/// Inputs shared by every recipe builder.
#[derive(Debug, Clone)]
pub struct RecipeContext {
    /// The signing account.
    pub actor: Actor,
    /// Admin for instantiated contracts.
    pub admin: Option<String>,
    pub code_ids: CodeIds,
    pub artifacts: ArtifactsConfig,
}

/// The fixed set of recipes, one per product or maintenance task.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum RecipeKind {
    /// Store the contract bytecode of every product.
    Upload,
    /// Vesting and presale contracts wired to each other.
    PresaleVesting,
    /// A standalone locking contract.
    Locking,
    /// A cw20 token.
    Token,
    /// Withdraw raised funds and unsold tokens from a presale.
    PresaleWithdraw,
    /// Replace the whitelist merkle root of a presale.
    PresaleMerkleRoot,
    /// Migrate a contract to new code.
    Migrate,
}

impl RecipeKind {
    pub fn description(self) -> &'static str {
        match self {
            RecipeKind::Upload => "upload presale, vesting, locking and cw20 bytecode",
            RecipeKind::PresaleVesting => {
                "instantiate vesting and presale, then make the presale the vesting worker"
            }
            RecipeKind::Locking => "instantiate a locking contract",
            RecipeKind::Token => "instantiate a cw20 token with initial balances",
            RecipeKind::PresaleWithdraw => "withdraw funds and unsold tokens from a presale",
            RecipeKind::PresaleMerkleRoot => "set the whitelist merkle root of a presale",
            RecipeKind::Migrate => "migrate a contract to a new code id",
        }
    }

    /// Build this recipe from its configured parameters.
    pub fn build(self, config: &DeployConfig, ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        match self {
            RecipeKind::Upload => upload::recipe(ctx),
            RecipeKind::PresaleVesting => config.presale_vesting.recipe(ctx),
            RecipeKind::Locking => config.locking.recipe(ctx),
            RecipeKind::Token => config.token.recipe(ctx),
            RecipeKind::PresaleWithdraw => config.presale_withdraw.recipe(ctx),
            RecipeKind::PresaleMerkleRoot => config.presale_merkle_root.recipe(ctx),
            RecipeKind::Migrate => config.migrate.recipe(ctx),
        }
    }
}
