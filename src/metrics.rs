//! In-process counters for the gacha service.
//!
//! Everything is a relaxed atomic or a small mutex-guarded map; [`snapshot`] copies the
//! current values into a serializable struct served at `GET /metrics`.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use serde::Serialize;

use crate::gacha::Rarity;

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU64 = AtomicU64::new(0);

static PULLS_BY_RARITY: [AtomicU64; 6] = [ZERO; 6];
static SHINY_PULLS: AtomicU64 = AtomicU64::new(0);
static UNITS_SOLD: AtomicU64 = AtomicU64::new(0);
static UNITS_DISMANTLED: AtomicU64 = AtomicU64::new(0);
static LEVEL_UPS: AtomicU64 = AtomicU64::new(0);
static ASCENSIONS: AtomicU64 = AtomicU64::new(0);
static STAGES_WON: AtomicU64 = AtomicU64::new(0);
static STORE_WRITES: AtomicU64 = AtomicU64::new(0);
static STORE_WRITE_FAILURES: AtomicU64 = AtomicU64::new(0);

static REJECTIONS: OnceLock<Mutex<BTreeMap<&'static str, u64>>> = OnceLock::new();

pub fn record_pull(rarity: Rarity, shiny: bool) {
    PULLS_BY_RARITY[rarity.index()].fetch_add(1, Ordering::Relaxed);
    if shiny {
        SHINY_PULLS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn add_units_sold(n: u64) {
    UNITS_SOLD.fetch_add(n, Ordering::Relaxed);
}

pub fn add_units_dismantled(n: u64) {
    UNITS_DISMANTLED.fetch_add(n, Ordering::Relaxed);
}

pub fn inc_level_ups() {
    LEVEL_UPS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_ascensions() {
    ASCENSIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_stages_won() {
    STAGES_WON.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_store_writes() {
    STORE_WRITES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_store_write_failures() {
    STORE_WRITE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

fn rejection_lock() -> &'static Mutex<BTreeMap<&'static str, u64>> {
    REJECTIONS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Count a request refused with a domain error, keyed by [`crate::gacha::GachaError::kind`].
pub fn record_rejection(kind: &'static str) {
    // A poisoned map only loses a counter, never the request.
    if let Ok(mut guard) = rejection_lock().lock() {
        let slot = guard.entry(kind).or_insert(0);
        *slot = slot.saturating_add(1);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub pulls_by_rarity: BTreeMap<String, u64>,
    pub pulls_total: u64,
    pub shiny_pulls: u64,
    pub units_sold: u64,
    pub units_dismantled: u64,
    pub level_ups: u64,
    pub ascensions: u64,
    pub stages_won: u64,
    pub store_writes: u64,
    pub store_write_failures: u64,
    pub rejections: BTreeMap<String, u64>,
}

pub fn snapshot() -> Snapshot {
    let pulls_by_rarity: BTreeMap<String, u64> = Rarity::ALL
        .iter()
        .map(|r| {
            (
                r.as_str().to_string(),
                PULLS_BY_RARITY[r.index()].load(Ordering::Relaxed),
            )
        })
        .collect();
    let pulls_total = pulls_by_rarity.values().sum();
    let rejections = rejection_lock()
        .lock()
        .map(|guard| {
            guard
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect()
        })
        .unwrap_or_default();
    Snapshot {
        pulls_by_rarity,
        pulls_total,
        shiny_pulls: SHINY_PULLS.load(Ordering::Relaxed),
        units_sold: UNITS_SOLD.load(Ordering::Relaxed),
        units_dismantled: UNITS_DISMANTLED.load(Ordering::Relaxed),
        level_ups: LEVEL_UPS.load(Ordering::Relaxed),
        ascensions: ASCENSIONS.load(Ordering::Relaxed),
        stages_won: STAGES_WON.load(Ordering::Relaxed),
        store_writes: STORE_WRITES.load(Ordering::Relaxed),
        store_write_failures: STORE_WRITE_FAILURES.load(Ordering::Relaxed),
        rejections,
    }
}
