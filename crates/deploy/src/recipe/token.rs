//! cw20 token issuance.
//!
//! The `mint` block is always written into the template. When no minter is
//! designated both of its fields are `null`, so sanitization removes the whole
//! block and the token ends up with a fixed supply.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Recipe, RecipeBuilder, RecipeContext, RecipeError, Template};

pub const RECIPE_NAME: &str = "token";

/// Supply credited to the signing account when no balances are configured.
pub const DEFAULT_INITIAL_AMOUNT: &str = "100000000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialBalance {
    pub address: String,
    /// Amount in base units, as a decimal string.
    pub amount: String,
}

/// Parameters of the token deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Account allowed to mint after instantiation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minter: Option<String>,
    /// Maximum total supply the minter may reach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<String>,
    /// Empty means the signing account receives [`DEFAULT_INITIAL_AMOUNT`].
    pub initial_balances: Vec<InitialBalance>,
}

impl Default for TokenParams {
    fn default() -> Self {
        Self {
            name: "Test Token".to_string(),
            symbol: "TEST".to_string(),
            decimals: 6,
            minter: None,
            cap: None,
            initial_balances: Vec::new(),
        }
    }
}

impl TokenParams {
    pub fn recipe(&self, ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        let balances = if self.initial_balances.is_empty() {
            vec![InitialBalance {
                address: ctx.actor.to_string(),
                amount: DEFAULT_INITIAL_AMOUNT.to_string(),
            }]
        } else {
            self.initial_balances.clone()
        };

        let mut plan = RecipeBuilder::new(RECIPE_NAME);
        plan.instantiate(
            "cw20",
            ctx.code_ids.cw20,
            self.symbol.as_str(),
            ctx.admin.clone(),
            Template::new(json!({
                "name": self.name,
                "symbol": self.symbol,
                "decimals": self.decimals,
                "initial_balances": balances,
                "mint": { "minter": self.minter, "cap": self.cap },
            })),
        );
        plan.build()
    }
}
