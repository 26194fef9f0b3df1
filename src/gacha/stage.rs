//! Stage progression: rewards for wins and the monotonic cleared frontier.

use serde::{Deserialize, Serialize};

use super::errors::GachaError;
use super::types::Account;

/// Stage whose first clear pays the one-time coin bonus.
pub const BONUS_STAGE: u32 = 5;
pub const BONUS_STAGE_COINS: u64 = 120;
pub const COINS_PER_STAGE: u64 = 80;
pub const EARLY_STAGE_GEMS: u64 = 20;
pub const LATE_STAGE_GEMS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRewards {
    pub coins: u64,
    pub gems: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// None when the stage was lost.
    pub rewards: Option<StageRewards>,
    /// True if this win moved the frontier.
    pub advanced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub max_cleared: u32,
    pub next_allowed: u32,
}

/// Rewards for winning `stage_id`. Replays pay the same amount.
pub fn stage_rewards(stage_id: u32) -> StageRewards {
    let bonus = if stage_id == BONUS_STAGE {
        BONUS_STAGE_COINS
    } else {
        0
    };
    StageRewards {
        coins: COINS_PER_STAGE * u64::from(stage_id) + bonus,
        gems: if stage_id >= BONUS_STAGE {
            LATE_STAGE_GEMS
        } else {
            EARLY_STAGE_GEMS
        },
    }
}

pub fn progress(account: &Account) -> StageProgress {
    StageProgress {
        max_cleared: account.max_cleared,
        next_allowed: account.max_cleared.saturating_add(1),
    }
}

/// Record a stage result. Only a win on `max_cleared + 1` advances the frontier.
/// Stage 0 is played as stage 1.
pub fn complete_stage(
    account: &mut Account,
    stage_id: u32,
    victory: bool,
) -> Result<StageOutcome, GachaError> {
    let stage_id = stage_id.max(1);
    if !victory {
        return Ok(StageOutcome {
            rewards: None,
            advanced: false,
        });
    }

    let rewards = stage_rewards(stage_id);
    account.wallet.credit_coins(rewards.coins);
    account.wallet.credit_gems(rewards.gems);
    let advanced = stage_id == account.max_cleared.saturating_add(1);
    if advanced {
        account.max_cleared = stage_id;
    }
    Ok(StageOutcome {
        rewards: Some(rewards),
        advanced,
    })
}
