//! Operations on contracts that already exist: presale administration and
//! migrations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{CodeSource, Recipe, RecipeBuilder, RecipeContext, RecipeError, Template};
use crate::gateway::{CodeId, ContractAddress};

/// Withdraw everything a finished presale holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresaleWithdrawParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presale: Option<ContractAddress>,
    /// Defaults to the signing account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl PresaleWithdrawParams {
    pub const RECIPE_NAME: &str = "presale-withdraw";

    pub fn recipe(&self, ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        let presale = self.presale.clone().ok_or(RecipeError::MissingParameter {
            recipe: Self::RECIPE_NAME,
            field: "presale_withdraw.presale",
        })?;
        let receiver = self.receiver.as_deref().unwrap_or(ctx.actor.as_str());

        let mut plan = RecipeBuilder::new(Self::RECIPE_NAME);
        plan.execute(
            "withdraw_funds",
            presale.clone(),
            Template::new(json!({ "withdraw_funds": { "receiver": receiver } })),
        );
        plan.execute(
            "withdraw_unsold_token",
            presale,
            Template::new(json!({ "withdraw_unsold_token": { "receiver": receiver } })),
        );
        plan.build()
    }
}

/// Replace the whitelist of a presale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresaleMerkleRootParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presale: Option<ContractAddress>,
    /// Hex-encoded merkle root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
}

impl PresaleMerkleRootParams {
    pub const RECIPE_NAME: &str = "presale-merkle-root";

    pub fn recipe(&self, _ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        let presale = self.presale.clone().ok_or(RecipeError::MissingParameter {
            recipe: Self::RECIPE_NAME,
            field: "presale_merkle_root.presale",
        })?;
        let merkle_root = self
            .merkle_root
            .as_deref()
            .filter(|root| !root.is_empty())
            .ok_or(RecipeError::MissingParameter {
                recipe: Self::RECIPE_NAME,
                field: "presale_merkle_root.merkle_root",
            })?;

        let mut plan = RecipeBuilder::new(Self::RECIPE_NAME);
        plan.execute(
            "set_merkle_root",
            presale,
            Template::new(json!({ "set_merkle_root": { "merkle_root": merkle_root } })),
        );
        plan.build()
    }
}

/// Move a contract to new code.
///
/// The new code is either an existing `new_code_id` or, when `artifact` is
/// set, the code id produced by uploading that file first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_code_id: Option<CodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Migrate message sent to the contract.
    pub msg: Value,
}

impl Default for MigrateParams {
    fn default() -> Self {
        Self {
            contract: None,
            new_code_id: None,
            artifact: None,
            msg: Value::Object(Map::new()),
        }
    }
}

impl MigrateParams {
    pub const RECIPE_NAME: &str = "migrate";

    pub fn recipe(&self, _ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        let contract = self.contract.clone().ok_or(RecipeError::MissingParameter {
            recipe: Self::RECIPE_NAME,
            field: "migrate.contract",
        })?;

        let mut plan = RecipeBuilder::new(Self::RECIPE_NAME);
        let new_code: CodeSource = match (&self.artifact, self.new_code_id) {
            (Some(artifact), _) => plan.upload("upload", artifact.clone()).into(),
            (None, Some(code_id)) => code_id.into(),
            (None, None) => {
                return Err(RecipeError::MissingParameter {
                    recipe: Self::RECIPE_NAME,
                    field: "migrate.new_code_id",
                });
            }
        };

        plan.migrate("migrate", contract, new_code, Template::new(self.msg.clone()));
        plan.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DeployConfig,
        gateway::Actor,
        recipe::{AddressSource, Step, StepRef},
    };

    fn ctx() -> RecipeContext {
        DeployConfig::default().recipe_context(Actor::new("juno1deployer"))
    }

    #[test]
    fn test_withdraw_runs_both_messages() {
        let params = PresaleWithdrawParams {
            presale: Some(ContractAddress::from("juno1presale")),
            receiver: None,
        };
        let recipe = params.recipe(&ctx()).expect("recipe");

        let bodies: Vec<_> = recipe
            .steps()
            .iter()
            .map(|s| s.step.template().expect("template").body.clone())
            .collect();
        assert_eq!(
            bodies,
            [
                json!({ "withdraw_funds": { "receiver": "juno1deployer" } }),
                json!({ "withdraw_unsold_token": { "receiver": "juno1deployer" } }),
            ]
        );
        assert_eq!(
            recipe.external_contracts(),
            [&ContractAddress::from("juno1presale"), &ContractAddress::from("juno1presale")]
        );
    }

    #[test]
    fn test_withdraw_requires_presale() {
        assert!(matches!(
            PresaleWithdrawParams::default().recipe(&ctx()),
            Err(RecipeError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_merkle_root_requires_root() {
        let params = PresaleMerkleRootParams {
            presale: Some(ContractAddress::from("juno1presale")),
            merkle_root: Some(String::new()),
        };
        assert!(matches!(
            params.recipe(&ctx()),
            Err(RecipeError::MissingParameter {
                field: "presale_merkle_root.merkle_root",
                ..
            })
        ));
    }

    #[test]
    fn test_migrate_from_uploaded_artifact() {
        let params = MigrateParams {
            contract: Some(ContractAddress::from("juno1vesting")),
            artifact: Some(PathBuf::from("artifacts/vesting.wasm")),
            msg: json!({ "version": "1.1.0" }),
            ..Default::default()
        };
        let recipe = params.recipe(&ctx()).expect("recipe");

        assert_eq!(recipe.len(), 2);
        match &recipe.steps()[1].step {
            Step::Migrate {
                contract, new_code, ..
            } => {
                assert_eq!(
                    contract,
                    &AddressSource::Address(ContractAddress::from("juno1vesting"))
                );
                assert_eq!(new_code, &CodeSource::Uploaded(StepRef::new(0)));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_migrate_requires_code() {
        let params = MigrateParams {
            contract: Some(ContractAddress::from("juno1vesting")),
            ..Default::default()
        };
        assert!(matches!(
            params.recipe(&ctx()),
            Err(RecipeError::MissingParameter {
                field: "migrate.new_code_id",
                ..
            })
        ));
    }
}
