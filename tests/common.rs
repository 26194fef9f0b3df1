//! Test utilities & fixtures.
//! Every helper builds on a fresh temp dir so tests never share store files.
#![allow(dead_code)]

use std::path::Path;

use swca::config::{Config, StorageBackendKind};
use swca::gacha::{Catalog, GachaService, Rarity};
use swca::storage::JsonFileBackend;

/// Default config with the store rooted in `dir`.
pub fn config_in(dir: &Path, backend: StorageBackendKind) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.to_string_lossy().to_string();
    config.storage.backend = backend;
    config.logging.file = None;
    config
}

/// Seeded service over a JSON store in `dir`.
pub fn json_service(dir: &Path, seed: u64) -> GachaService {
    service_with_catalog(dir, seed, Catalog::standard())
}

pub fn service_with_catalog(dir: &Path, seed: u64, catalog: Catalog) -> GachaService {
    let backend = JsonFileBackend::open(dir.join("accounts.json")).expect("backend");
    GachaService::builder(Box::new(backend))
        .catalog(catalog)
        .seed(seed)
        .build()
        .expect("service")
}

/// Standard catalog where only `rarity` can be drawn.
pub fn single_tier_catalog(rarity: Rarity) -> Catalog {
    let mut catalog = Catalog::standard();
    for tier in &mut catalog.tiers {
        tier.weight = if tier.rarity == rarity { 1.0 } else { 0.0 };
    }
    catalog
}

/// Ids of every instance in the user's backpack, in backpack order.
pub fn backpack_ids(service: &GachaService, username: &str) -> Vec<String> {
    service
        .inventory(username)
        .expect("inventory")
        .backpack
        .into_iter()
        .map(|inst| inst.id)
        .collect()
}
