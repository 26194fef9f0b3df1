//! Economy ledger: gem/coin balances and per-unit shard balances.
//!
//! Balances only change through the inventory, progression, stage and pull
//! operations, so every mutator here is crate-private.

use serde::{Deserialize, Serialize};

use super::errors::GachaError;
use super::types::Account;

// ============================================================================
// Wallet (two denominations)
// ============================================================================

/// Gems pay for draws; coins pay for level-ups and come from sales and stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    gems: u64,
    coins: u64,
}

impl Wallet {
    pub fn new(gems: u64, coins: u64) -> Self {
        Self { gems, coins }
    }

    pub fn gems(&self) -> u64 {
        self.gems
    }

    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub(crate) fn credit_gems(&mut self, amount: u64) {
        self.gems = self.gems.saturating_add(amount);
    }

    pub(crate) fn credit_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Check-then-debit; leaves the wallet untouched on failure.
    pub(crate) fn debit_gems(&mut self, cost: u64) -> Result<(), GachaError> {
        ensure_affordable("gems", self.gems, cost)?;
        self.gems -= cost;
        Ok(())
    }

    pub(crate) fn debit_coins(&mut self, cost: u64) -> Result<(), GachaError> {
        ensure_affordable("coins", self.coins, cost)?;
        self.coins -= cost;
        Ok(())
    }
}

fn ensure_affordable(resource: &str, have: u64, need: u64) -> Result<(), GachaError> {
    if have < need {
        return Err(GachaError::InsufficientFunds {
            resource: resource.to_string(),
            have,
            need,
        });
    }
    Ok(())
}

// ============================================================================
// Shards (per unit name, never fungible)
// ============================================================================

pub(crate) fn credit_shards(account: &mut Account, unit_name: &str, amount: u64) {
    let balance = account.shards.entry(unit_name.to_string()).or_insert(0);
    *balance = balance.saturating_add(amount);
}

pub(crate) fn debit_shards(
    account: &mut Account,
    unit_name: &str,
    amount: u64,
) -> Result<(), GachaError> {
    let have = account.shard_balance(unit_name);
    ensure_affordable(&format!("shards for {}", unit_name), have, amount)?;
    account.shards.insert(unit_name.to_string(), have - amount);
    Ok(())
}
