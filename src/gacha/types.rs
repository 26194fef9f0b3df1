use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::currency::Wallet;

pub const ACCOUNT_SCHEMA_VERSION: u8 = 1;

/// Pull history keeps only this many of the most recent entries.
pub const HISTORY_LIMIT: usize = 200;
pub const TEAM_SIZE: usize = 3;
pub const LEVEL_MAX: u32 = 50;
pub const ASCENSION_MAX: u32 = 5;

// ============================================================================
// Rarity
// ============================================================================

/// Rarity tiers, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Ultra,
    Mythical,
    Secret,
    Celestial,
}

impl Rarity {
    pub const ALL: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Ultra,
        Rarity::Mythical,
        Rarity::Secret,
        Rarity::Celestial,
    ];

    /// Position in enumeration order (0 = Common).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Ultra => "Ultra",
            Rarity::Mythical => "Mythical",
            Rarity::Secret => "Secret",
            Rarity::Celestial => "Celestial",
        }
    }

    /// Top tier; drawing it sets the celestial flag.
    pub fn is_celestial(self) -> bool {
        self == Rarity::Celestial
    }

    /// Secret units never roll shiny.
    pub fn allows_shiny(self) -> bool {
        self != Rarity::Secret
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Draws and owned instances
// ============================================================================

/// Output of one draw, before it becomes an owned instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub unit_name: String,
    pub rarity: Rarity,
    pub shiny: bool,
    pub celestial: bool,
}

/// An owned copy of a catalog unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub id: String,
    pub unit_name: String,
    /// Display label; the client filters and groups on it.
    #[serde(default)]
    pub unit_label: String,
    pub rarity: Rarity,
    pub shiny: bool,
    pub celestial: bool,
    pub level: u32,
    pub ascension: u32,
}

impl UnitInstance {
    /// Fresh level 1, ascension 0 instance with a newly generated id.
    pub fn from_draw(draw: &DrawResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            unit_name: draw.unit_name.clone(),
            unit_label: draw.unit_name.clone(),
            rarity: draw.rarity,
            shiny: draw.shiny,
            celestial: draw.celestial,
            level: 1,
            ascension: 0,
        }
    }
}

/// Snapshot of a draw kept in the pull history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    pub unit_name: String,
    #[serde(default)]
    pub unit_label: String,
    pub rarity: Rarity,
    pub shiny: bool,
    pub celestial: bool,
    pub pulled_at: DateTime<Utc>,
}

impl PullRecord {
    pub fn new(draw: &DrawResult, pulled_at: DateTime<Utc>) -> Self {
        Self {
            unit_name: draw.unit_name.clone(),
            unit_label: draw.unit_name.clone(),
            rarity: draw.rarity,
            shiny: draw.shiny,
            celestial: draw.celestial,
            pulled_at,
        }
    }
}

// ============================================================================
// Account
// ============================================================================

/// Everything the game knows about one username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub wallet: Wallet,
    #[serde(default)]
    pub backpack: Vec<UnitInstance>,
    /// Up to three instance ids, in slot order.
    #[serde(default)]
    pub team: Vec<String>,
    /// Shard balance per unit name.
    #[serde(default)]
    pub shards: BTreeMap<String, u64>,
    #[serde(default)]
    pub max_cleared: u32,
    #[serde(default)]
    pub history: VecDeque<PullRecord>,
    /// Unit names ever drawn, in first-drawn order.
    #[serde(default)]
    pub index: Vec<String>,
    pub schema_version: u8,
}

impl Account {
    pub fn new(username: &str, wallet: Wallet) -> Self {
        let now = Utc::now();
        Self {
            username: username.to_string(),
            created_at: now,
            updated_at: now,
            wallet,
            backpack: Vec::new(),
            team: Vec::new(),
            shards: BTreeMap::new(),
            max_cleared: 0,
            history: VecDeque::new(),
            index: Vec::new(),
            schema_version: ACCOUNT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn find_instance(&self, id: &str) -> Option<&UnitInstance> {
        self.backpack.iter().find(|inst| inst.id == id)
    }

    pub fn find_instance_mut(&mut self, id: &str) -> Option<&mut UnitInstance> {
        self.backpack.iter_mut().find(|inst| inst.id == id)
    }

    pub fn owns(&self, id: &str) -> bool {
        self.find_instance(id).is_some()
    }

    pub fn on_team(&self, id: &str) -> bool {
        self.team.iter().any(|t| t == id)
    }

    pub fn shard_balance(&self, unit_name: &str) -> u64 {
        self.shards.get(unit_name).copied().unwrap_or(0)
    }
}
