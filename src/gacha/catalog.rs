//! Static unit catalog: tiers, units, draw weights and the economy tables keyed by rarity.
//!
//! The built-in catalog is [`Catalog::standard`]. Operators can replace it with a JSON
//! seed file (see [`Catalog::load_from_json`]) without recompiling; seeds are validated
//! before use.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::GachaError;
use super::types::{Rarity, UnitInstance};

/// Coins per current level for the next level-up.
pub const LEVEL_COST_STEP: u64 = 50;

/// Sale multipliers in percent; celestial takes precedence over shiny.
const CELESTIAL_SALE_PERCENT: u64 = 135;
const SHINY_SALE_PERCENT: u64 = 125;

/// One rarity tier and everything priced by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub rarity: Rarity,
    pub weight: f64,
    pub units: Vec<String>,
    pub sale_value: u64,
    pub shard_yield: u64,
    pub ascension_shards: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Exactly one tier per rarity, in enumeration order.
    pub tiers: Vec<TierSpec>,
    pub shiny_chance: f64,
    /// Special ability text, revealed once a unit has been discovered.
    #[serde(default)]
    pub specials: BTreeMap<String, String>,
}

fn tier(
    rarity: Rarity,
    weight: f64,
    units: &[&str],
    sale_value: u64,
    shard_yield: u64,
    ascension_shards: u64,
) -> TierSpec {
    TierSpec {
        rarity,
        weight,
        units: units.iter().map(|u| u.to_string()).collect(),
        sale_value,
        shard_yield,
        ascension_shards,
    }
}

const STANDARD_SPECIALS: [(&str, &str); 13] = [
    ("Berri", "Strawberry Jell-O: 150% ATK to target; then choose: heal self for 100% of damage dealt OR gain a stacking buff equal to +50% of the target's current ATK (stacks and persists until stage end). CD 2."),
    ("EyexDJ", "Teleport: When activated, gain \"Teleport\": this unit takes 0 damage from all enemy attacks (bosses included) until it negates damage 10 times (10 teleports). CD 20."),
    ("Zimmy", "Ragebait: AOE +25% base ATK damage; Provoke all enemies to target Zimmy, redirect AOE to self, -50% damage taken while active. CD 10."),
    ("admin Zy", "Gamma Burst: AOE 220% ATK, apply DEF Down (-30%, 3t), apply Burn (5% of caster ATK, 4t), self +25% ATK (3t). CD 6."),
    ("Alex", "Gluttony: For 2 waves: each attack deals +10% of target max HP as damage and +15% of target current HP as additional damage; heal self 50% of total damage. Reusable after 2 waves."),
    ("Ted", "Vanish: Become invincible (5t). Enemies you attack are slowed -50% SPD while Vanish lasts. CD 10."),
    ("Deshun", "Pay to Win: Roll a die (1-6) for a random effect (stun all 6t / self +25% ATK 5t / DEF Down all 4t / self heal 30% max HP / invincible 2t / AOE 100% ATK). Once per wave."),
    ("Zafuu", "Severe: 300% ATK to a selected target, apply Corrupt (disables specials) and Bleed (5% ATK, 2t). Once per wave."),
    ("Channon", "Aura: Team +25% ATK (2t) and DEF Down all enemies (-30%, 2t). CD 5."),
    ("Snorlax", "Rest: Restore 100% HP to self; if already at full HP, heal the lowest-HP ally by 100% of Snorlax's base HP. Then apply Sleep (same effect as Stun; bosses immune) to all enemies for 10 turns. Once per wave."),
    ("Fatima Do", "Florish: Heal all allies for 50% of their max HP. CD 15."),
    ("Boa", "Life: Revive a fallen ally at 50% max HP (or heal 50% if alive) and grant +100% ATK (5t). Once per stage."),
    ("Grinch", "Something: (Passive) At 1 HP enter Bloodthirsty (can't die, +25% ATK per turn up to +200%) for 10 turns, then heal 30% max HP. Once per stage."),
];

impl Catalog {
    /// The shipped catalog and rate table.
    pub fn standard() -> Self {
        let tiers = vec![
            tier(
                Rarity::Common,
                0.7,
                &["Yumi", "Fatima", "Jlita", "Minii", "Nva", "Hennessy"],
                50,
                1,
                10,
            ),
            tier(Rarity::Rare, 0.2735, &["Jordan", "Goonie", "Wes", "Shelly"], 150, 2, 20),
            tier(
                Rarity::Ultra,
                0.02,
                &["Snorlax", "Fatima Do", "Boa", "Grinch", "Zimmy", "Berri"],
                400,
                4,
                40,
            ),
            tier(
                Rarity::Mythical,
                0.005,
                &["Deshun", "Zafuu", "Channon", "EyexDJ"],
                1200,
                10,
                80,
            ),
            tier(Rarity::Secret, 0.001, &["Ted"], 5000, 20, 120),
            tier(Rarity::Celestial, 0.0005, &["admin Zy", "Alex"], 8000, 30, 160),
        ];
        let specials = STANDARD_SPECIALS
            .iter()
            .map(|(name, text)| (name.to_string(), text.to_string()))
            .collect();
        Self {
            tiers,
            shiny_chance: 1.0 / 4000.0,
            specials,
        }
    }

    /// Load and validate a catalog seed from JSON.
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, GachaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&contents).map_err(|e| {
            GachaError::InvalidCatalog(format!("failed to parse {}: {}", path.display(), e))
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), GachaError> {
        if self.tiers.len() != Rarity::ALL.len() {
            return Err(GachaError::InvalidCatalog(format!(
                "expected {} tiers, found {}",
                Rarity::ALL.len(),
                self.tiers.len()
            )));
        }
        let mut seen = HashSet::new();
        let mut total = 0.0;
        for (spec, expected) in self.tiers.iter().zip(Rarity::ALL) {
            if spec.rarity != expected {
                return Err(GachaError::InvalidCatalog(format!(
                    "tier {} out of order (expected {})",
                    spec.rarity, expected
                )));
            }
            if spec.units.is_empty() {
                return Err(GachaError::InvalidCatalog(format!(
                    "tier {} has no units",
                    spec.rarity
                )));
            }
            if !spec.weight.is_finite() || spec.weight < 0.0 {
                return Err(GachaError::InvalidCatalog(format!(
                    "tier {} has invalid weight {}",
                    spec.rarity, spec.weight
                )));
            }
            total += spec.weight;
            for unit in &spec.units {
                if !seen.insert(unit.as_str()) {
                    return Err(GachaError::InvalidCatalog(format!(
                        "unit {} listed in more than one tier",
                        unit
                    )));
                }
            }
        }
        if total <= 0.0 {
            return Err(GachaError::InvalidCatalog(
                "draw weights must sum to a positive total".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.shiny_chance) {
            return Err(GachaError::InvalidCatalog(format!(
                "shiny chance {} outside [0, 1]",
                self.shiny_chance
            )));
        }
        Ok(())
    }

    /// Tier spec for `rarity`. Assumes a validated catalog.
    pub fn tier(&self, rarity: Rarity) -> &TierSpec {
        &self.tiers[rarity.index()]
    }

    pub fn units(&self, rarity: Rarity) -> &[String] {
        &self.tier(rarity).units
    }

    pub fn weight(&self, rarity: Rarity) -> f64 {
        self.tier(rarity).weight
    }

    pub fn rarity_of(&self, unit_name: &str) -> Option<Rarity> {
        self.tiers
            .iter()
            .find(|t| t.units.iter().any(|u| u == unit_name))
            .map(|t| t.rarity)
    }

    pub fn special(&self, unit_name: &str) -> Option<&str> {
        self.specials.get(unit_name).map(String::as_str)
    }

    /// Coins paid for selling `inst`: rarity base, x1.35 celestial, else x1.25 shiny, truncated.
    pub fn sale_value(&self, inst: &UnitInstance) -> u64 {
        let base = self.tier(inst.rarity).sale_value;
        if inst.celestial {
            base * CELESTIAL_SALE_PERCENT / 100
        } else if inst.shiny {
            base * SHINY_SALE_PERCENT / 100
        } else {
            base
        }
    }

    pub fn shard_yield(&self, rarity: Rarity) -> u64 {
        self.tier(rarity).shard_yield
    }

    pub fn ascension_requirement(&self, rarity: Rarity) -> u64 {
        self.tier(rarity).ascension_shards
    }

    /// Coins needed to go from `current_level` to the next level.
    pub fn level_cost(current_level: u32) -> u64 {
        LEVEL_COST_STEP * u64::from(current_level.max(1))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
