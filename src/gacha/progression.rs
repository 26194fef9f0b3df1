//! Progression engine: per-instance level and ascension tracks.
//!
//! Each call moves one track up by exactly one step. All checks run before any
//! balance is debited.

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::currency::debit_shards;
use super::errors::GachaError;
use super::types::{Account, UnitInstance, ASCENSION_MAX, LEVEL_MAX};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpReceipt {
    pub cost: u64,
    pub instance: UnitInstance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AscendReceipt {
    pub shards_spent: u64,
    pub instance: UnitInstance,
}

fn locate<'a>(account: &'a Account, id: &str) -> Result<&'a UnitInstance, GachaError> {
    if id.is_empty() {
        return Err(GachaError::InvalidRequest("provide instance_id".into()));
    }
    account
        .find_instance(id)
        .ok_or_else(|| GachaError::InstanceNotFound(id.to_string()))
}

fn bump<F>(account: &mut Account, id: &str, apply: F) -> Result<UnitInstance, GachaError>
where
    F: FnOnce(&mut UnitInstance),
{
    let inst = account
        .find_instance_mut(id)
        .ok_or_else(|| GachaError::InstanceNotFound(id.to_string()))?;
    apply(inst);
    Ok(inst.clone())
}

/// Spend coins to raise an instance's level by one.
pub fn level_up(account: &mut Account, id: &str) -> Result<LevelUpReceipt, GachaError> {
    let current = locate(account, id)?.level;
    if current >= LEVEL_MAX {
        return Err(GachaError::MaxTierReached {
            track: "level",
            max: LEVEL_MAX,
        });
    }
    let cost = Catalog::level_cost(current);
    account.wallet.debit_coins(cost)?;
    let instance = bump(account, id, |inst| inst.level = current + 1)?;
    Ok(LevelUpReceipt { cost, instance })
}

/// Spend shards of the instance's own unit to raise its ascension by one.
pub fn ascend(
    account: &mut Account,
    catalog: &Catalog,
    id: &str,
) -> Result<AscendReceipt, GachaError> {
    let inst = locate(account, id)?;
    let (current, rarity, unit_name) = (inst.ascension, inst.rarity, inst.unit_name.clone());
    if current >= ASCENSION_MAX {
        return Err(GachaError::MaxTierReached {
            track: "ascension",
            max: ASCENSION_MAX,
        });
    }
    let required = catalog.ascension_requirement(rarity);
    debit_shards(account, &unit_name, required)?;
    let instance = bump(account, id, |inst| inst.ascension = current + 1)?;
    Ok(AscendReceipt {
        shards_spent: required,
        instance,
    })
}
