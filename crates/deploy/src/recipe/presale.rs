//! Presale + vesting deployment.
//!
//! The presale needs the vesting address at instantiation, and the vesting
//! contract must then accept the presale as its worker:
//!
//! 1. instantiate vesting
//! 2. instantiate presale with `vesting: <1>`
//! 3. `set_worker { worker: <2> }` on vesting
//! 4. `set_start_time { new_start_time }` on vesting
//!
//! With `upload = true` both artifacts are uploaded first and instantiated from
//! the resulting code ids.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{CodeSource, Recipe, RecipeBuilder, RecipeContext, RecipeError, Template};
use crate::config::Timestamp;

pub const RECIPE_NAME: &str = "presale-vesting";

/// Release schedule of the vesting contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VestingSchedule {
    /// Seconds before anything unlocks.
    pub lock_period: u64,
    /// Seconds between two releases.
    pub release_interval: u64,
    /// Percentage released at each interval.
    pub release_rate: u64,
    /// Total vesting duration in seconds.
    pub vesting_period: u64,
    /// Percentage unlocked at start.
    pub initial_unlock: u64,
}

impl Default for VestingSchedule {
    fn default() -> Self {
        Self {
            lock_period: 0,
            release_interval: 60,
            release_rate: 1,
            vesting_period: 1_000_000,
            initial_unlock: 10,
        }
    }
}

/// Parameters of the presale + vesting deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresaleVestingParams {
    /// Upload the vesting and presale artifacts instead of using stored code ids.
    pub upload: bool,
    /// cw20 token distributed by the presale.
    pub reward_token: String,
    /// Native denom accepted as payment.
    pub fund_denom: String,
    /// Hex-encoded merkle root of the whitelist.
    pub whitelist_merkle_root: String,
    /// Reward tokens per fund unit, scaled by 1e8.
    pub exchange_rate: String,
    /// Rewards handed to the vesting contract and sold by the presale.
    pub total_rewards_amount: u64,
    pub private_start_time: Timestamp,
    pub public_start_time: Timestamp,
    /// Length of the public sale in seconds.
    pub presale_period: u64,
    /// When vesting releases begin.
    pub vesting_start_time: Timestamp,
    pub vesting: VestingSchedule,
}

impl Default for PresaleVestingParams {
    fn default() -> Self {
        Self {
            upload: false,
            reward_token: "juno16d9zhs0ja2qawv8vyc03xelsvmf76lqle2yt2zvam6ds9rcll7gsac77tl"
                .to_string(),
            fund_denom: "ujunox".to_string(),
            whitelist_merkle_root:
                "b1e5f5709783df6791e6327458961c81ac685cc89e87803e4197d91a964254ee".to_string(),
            exchange_rate: "800000".to_string(),
            total_rewards_amount: 125_000_000_000,
            // 2022-06-09T03:30:00Z
            private_start_time: Timestamp::from_secs(1_654_745_400),
            // 2022-06-10T03:00:00Z
            public_start_time: Timestamp::from_secs(1_654_830_000),
            presale_period: 3600,
            // 2022-06-13T04:00:00Z
            vesting_start_time: Timestamp::from_secs(1_655_092_800),
            vesting: VestingSchedule::default(),
        }
    }
}

impl PresaleVestingParams {
    pub fn recipe(&self, ctx: &RecipeContext) -> Result<Recipe, RecipeError> {
        if self.reward_token.is_empty() {
            return Err(RecipeError::MissingParameter {
                recipe: RECIPE_NAME,
                field: "reward_token",
            });
        }

        let mut plan = RecipeBuilder::new(RECIPE_NAME);

        let (vesting_code, presale_code): (CodeSource, CodeSource) = if self.upload {
            let vesting = plan.upload("upload_vesting", ctx.artifacts.vesting_path());
            let presale = plan.upload("upload_presale", ctx.artifacts.presale_path());
            (vesting.into(), presale.into())
        } else {
            (ctx.code_ids.vesting.into(), ctx.code_ids.presale.into())
        };

        let schedule = &self.vesting;
        let vesting = plan.instantiate(
            "vesting",
            vesting_code,
            "vesting",
            ctx.admin.clone(),
            Template::new(json!({
                "reward_token": self.reward_token,
                "lock_period": schedule.lock_period,
                "release_interval": schedule.release_interval,
                "release_rate": schedule.release_rate,
                "vesting_period": schedule.vesting_period,
                "initial_unlock": schedule.initial_unlock,
                "distribution_amount": self.total_rewards_amount,
            })),
        );

        let presale = plan.instantiate(
            "presale",
            presale_code,
            "presale",
            ctx.admin.clone(),
            Template::new(json!({
                "fund_denom": self.fund_denom,
                "reward_token": self.reward_token,
                "vesting": null,
                "whitelist_merkle_root": self.whitelist_merkle_root,
                "exchange_rate": self.exchange_rate,
                "private_start_time": self.private_start_time,
                "public_start_time": self.public_start_time,
                "presale_period": self.presale_period,
                "total_rewards_amount": self.total_rewards_amount.to_string(),
            }))
            .link("/vesting", vesting),
        );

        plan.execute(
            "set_worker",
            vesting,
            Template::new(json!({ "set_worker": { "worker": null } }))
                .link("/set_worker/worker", presale),
        );

        plan.execute(
            "set_start_time",
            vesting,
            Template::new(json!({
                "set_start_time": { "new_start_time": self.vesting_start_time }
            })),
        );

        plan.build()
    }
}
