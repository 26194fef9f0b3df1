//! Inventory engine: acquiring draws, selling, dismantling and the active team.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::currency::credit_shards;
use super::errors::GachaError;
use super::history::{discover, record_pull};
use super::types::{Account, DrawResult, UnitInstance, TEAM_SIZE};

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub coins_gained: u64,
    pub sold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardGain {
    pub unit_name: String,
    pub shards: u64,
}

// ============================================================================
// Acquire
// ============================================================================

/// Turn a draw into an owned instance and record it in history and the index.
pub fn acquire(account: &mut Account, draw: &DrawResult, now: DateTime<Utc>) -> UnitInstance {
    let instance = UnitInstance::from_draw(draw);
    account.backpack.push(instance.clone());
    record_pull(account, draw, now);
    discover(account, &draw.unit_name);
    instance
}

// ============================================================================
// Removal (sell / dismantle)
// ============================================================================

/// Requested ids that are currently on the team, in request order.
pub fn team_conflicts(account: &Account, ids: &[String]) -> Vec<String> {
    let mut blocked: Vec<String> = Vec::new();
    for id in ids {
        if account.on_team(id) && !blocked.contains(id) {
            blocked.push(id.clone());
        }
    }
    blocked
}

fn ensure_removable(account: &Account, ids: &[String]) -> Result<(), GachaError> {
    let blocked = team_conflicts(account, ids);
    if !blocked.is_empty() {
        return Err(GachaError::TeamConflict { blocked });
    }
    Ok(())
}

fn require_ids(ids: &[String], action: &str) -> Result<(), GachaError> {
    if ids.is_empty() {
        return Err(GachaError::InvalidRequest(format!(
            "provide instance_ids to {}",
            action
        )));
    }
    Ok(())
}

/// Pull every instance whose id is in `ids` out of the backpack, keeping the rest in order.
fn take_matching(account: &mut Account, ids: &[String]) -> Vec<UnitInstance> {
    let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut account.backpack)
        .into_iter()
        .partition(|inst| targets.contains(inst.id.as_str()));
    account.backpack = kept;
    taken
}

/// Sell the listed instances for coins. Unknown ids are ignored.
pub fn sell(
    account: &mut Account,
    catalog: &Catalog,
    ids: &[String],
) -> Result<SaleReceipt, GachaError> {
    require_ids(ids, "sell")?;
    ensure_removable(account, ids)?;

    let sold = take_matching(account, ids);
    let coins_gained = sold.iter().map(|inst| catalog.sale_value(inst)).sum();
    account.wallet.credit_coins(coins_gained);
    Ok(SaleReceipt {
        coins_gained,
        sold: sold.len(),
    })
}

/// Dismantle one instance into shards of its unit.
pub fn dismantle(
    account: &mut Account,
    catalog: &Catalog,
    id: &str,
) -> Result<ShardGain, GachaError> {
    if id.is_empty() {
        return Err(GachaError::InvalidRequest(
            "provide instance_id to dismantle".into(),
        ));
    }
    let ids = [id.to_string()];
    ensure_removable(account, &ids)?;
    if !account.owns(id) {
        return Err(GachaError::InstanceNotFound(id.to_string()));
    }
    let mut gains = dismantle_taken(account, catalog, &ids);
    gains
        .pop()
        .ok_or_else(|| GachaError::Internal(format!("instance {} vanished mid-dismantle", id)))
}

/// Dismantle every listed instance. Unknown ids are ignored.
pub fn dismantle_selected(
    account: &mut Account,
    catalog: &Catalog,
    ids: &[String],
) -> Result<Vec<ShardGain>, GachaError> {
    require_ids(ids, "dismantle")?;
    ensure_removable(account, ids)?;
    Ok(dismantle_taken(account, catalog, ids))
}

fn dismantle_taken(account: &mut Account, catalog: &Catalog, ids: &[String]) -> Vec<ShardGain> {
    take_matching(account, ids)
        .into_iter()
        .map(|inst| {
            let shards = catalog.shard_yield(inst.rarity);
            credit_shards(account, &inst.unit_name, shards);
            ShardGain {
                unit_name: inst.unit_name,
                shards,
            }
        })
        .collect()
}

// ============================================================================
// Team
// ============================================================================

pub fn team(account: &Account) -> &[String] {
    &account.team
}

/// Replace the team with the first [`TEAM_SIZE`] distinct candidates that are in the backpack.
pub fn set_team(account: &mut Account, candidates: &[String]) -> Vec<String> {
    let mut clean: Vec<String> = Vec::with_capacity(TEAM_SIZE);
    for id in candidates {
        if clean.len() == TEAM_SIZE {
            break;
        }
        if account.owns(id) && !clean.contains(id) {
            clean.push(id.clone());
        }
    }
    account.team = clean.clone();
    clean
}
