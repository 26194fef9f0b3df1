//! Response payloads returned by [`GachaService`](super::GachaService).
//!
//! Field names follow the JSON the browser client already reads, so the HTTP layer can
//! serialize these directly.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::history::is_discovered;
use super::stage::StageRewards;
use super::types::{Account, DrawResult, PullRecord, Rarity, UnitInstance};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub gems: u64,
    pub coins: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryView {
    pub backpack: Vec<UnitInstance>,
    pub shards: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamView {
    pub team: Vec<String>,
}

/// One drawn unit as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulledUnit {
    pub unit: String,
    pub rarity: Rarity,
    pub shiny: bool,
    pub celestial: bool,
    pub instance_id: String,
}

impl PulledUnit {
    pub(crate) fn new(draw: &DrawResult, instance_id: String) -> Self {
        Self {
            unit: draw.unit_name.clone(),
            rarity: draw.rarity,
            shiny: draw.shiny,
            celestial: draw.celestial,
            instance_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullView {
    #[serde(flatten)]
    pub pulled: PulledUnit,
    pub gems_left: u64,
    pub index_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullTenView {
    pub pulls: Vec<PulledUnit>,
    pub gems_left: u64,
    pub index_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    pub gems: u64,
    pub coins: u64,
    pub pulls: Vec<PullRecord>,
    pub index: Vec<String>,
}

impl HistoryView {
    pub(crate) fn of(account: &Account) -> Self {
        Self {
            gems: account.wallet.gems(),
            coins: account.wallet.coins(),
            pulls: account.history.iter().cloned().collect(),
            index: account.index.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    /// A copy is currently in the backpack.
    pub owned: bool,
    pub owned_normal: bool,
    pub owned_shiny: bool,
    pub discovered: bool,
}

/// Collection book: the whole catalog annotated with what this player owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexData {
    pub order: Vec<Rarity>,
    pub rarities: BTreeMap<Rarity, Vec<IndexEntry>>,
    /// Special text for discovered units only.
    pub specials: BTreeMap<String, String>,
    pub chances: BTreeMap<Rarity, f64>,
    #[serde(rename = "shinyChance")]
    pub shiny_chance: f64,
}

impl IndexData {
    pub(crate) fn build(account: &Account, catalog: &Catalog) -> Self {
        let owns = |name: &str, shiny_only: bool| {
            account
                .backpack
                .iter()
                .any(|inst| inst.unit_name == name && (!shiny_only || inst.shiny))
        };

        let rarities = Rarity::ALL
            .iter()
            .map(|&rarity| {
                let entries = catalog
                    .units(rarity)
                    .iter()
                    .map(|name| {
                        let owned = owns(name, false);
                        IndexEntry {
                            name: name.clone(),
                            owned,
                            owned_normal: owned,
                            owned_shiny: owns(name, true),
                            discovered: is_discovered(account, name),
                        }
                    })
                    .collect();
                (rarity, entries)
            })
            .collect();

        let specials = catalog
            .specials
            .iter()
            .filter(|(name, _)| is_discovered(account, name))
            .map(|(name, text)| (name.clone(), text.clone()))
            .collect();

        Self {
            order: Rarity::ALL.to_vec(),
            rarities,
            specials,
            chances: Rarity::ALL
                .iter()
                .map(|&r| (r, catalog.weight(r)))
                .collect(),
            shiny_chance: catalog.shiny_chance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageView {
    pub ok: bool,
    pub rewards: Option<StageRewards>,
    pub advanced: bool,
    pub gems: u64,
    pub coins: u64,
    pub max_cleared: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleView {
    pub coins_gained: u64,
    pub coins: u64,
    pub backpack: Vec<UnitInstance>,
}

/// Backpack and shard balances after a dismantle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismantleView {
    pub backpack: Vec<UnitInstance>,
    pub shards: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpView {
    pub ok: bool,
    pub coins: u64,
    pub cost: u64,
    pub inst: UnitInstance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AscendView {
    pub ok: bool,
    pub shards_spent: u64,
    pub inst: UnitInstance,
    pub shards: BTreeMap<String, u64>,
}
