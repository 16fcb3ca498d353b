//! Locking contract deployment: one instantiate, no cross references.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Recipe, RecipeBuilder, RecipeContext, RecipeError, Template};

pub const RECIPE_NAME: &str = "locking";

/// Parameters of the locking deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingParams {
    /// Contract owner. Defaults to the signing account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// cw20 token that gets locked.
    pub token: String,
    /// Seconds during which an early withdrawal is penalized.
    pub penalty_period: u64,
    /// Receiver of penalties. Defaults to the signing account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead: Option<String>,
}

impl Default for LockingParams {
    fn default() -> Self {
        Self {
            owner: None,
            token: "juno12wqe5sx8kc3u3rflu2dw5d6rhfsxuufkrgqaxtsx2srgjfmfd6ps84wh63".to_string(),
            penalty_period: 86_400 * 30,
            dead: None,
        }
    }
}

impl LockingParams {
    pub fn recipe(&self, ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        let actor = ctx.actor.as_str();
        let mut plan = RecipeBuilder::new(RECIPE_NAME);

        plan.instantiate(
            "locking",
            ctx.code_ids.locking,
            "locking",
            ctx.admin.clone(),
            Template::new(json!({
                "owner": self.owner.as_deref().unwrap_or(actor),
                "token": self.token,
                "penalty_period": self.penalty_period,
                "dead": self.dead.as_deref().unwrap_or(actor),
            })),
        );

        plan.build()
    }
}
