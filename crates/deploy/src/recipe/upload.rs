//! Store the bytecode of every product contract.

use super::{Recipe, RecipeBuilder, RecipeContext, RecipeError};

pub const RECIPE_NAME: &str = "upload";

pub fn recipe(ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
    let artifacts = &ctx.artifacts;
    let mut plan = RecipeBuilder::new(RECIPE_NAME);
    plan.upload("presale", artifacts.presale_path());
    plan.upload("vesting", artifacts.vesting_path());
    plan.upload("locking", artifacts.locking_path());
    plan.upload("cw20", artifacts.cw20_path());
    plan.build()
}
