mod common;

use swca::config::StorageBackendKind;
use swca::gacha::{Catalog, GachaError, GachaService, Rarity};

#[test]
fn service_uses_catalog_seed_from_config() {
    let tmp = tempfile::tempdir().unwrap();
    let seed_path = tmp.path().join("catalog.json");
    let catalog = common::single_tier_catalog(Rarity::Mythical);
    std::fs::write(&seed_path, serde_json::to_string_pretty(&catalog).unwrap()).unwrap();

    let mut config = common::config_in(tmp.path(), StorageBackendKind::Json);
    config.catalog.path = Some(seed_path.to_string_lossy().to_string());
    let svc = GachaService::from_config(&config).unwrap();

    let pulls = svc.pull_ten("yoshi").unwrap().pulls;
    assert!(pulls.iter().all(|p| p.rarity == Rarity::Mythical));
    assert_eq!(svc.catalog(), &catalog);
}

#[test]
fn invalid_seed_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let seed_path = tmp.path().join("catalog.json");
    let mut catalog = Catalog::standard();
    catalog.tiers[2].units.push("Ted".into());
    std::fs::write(&seed_path, serde_json::to_string(&catalog).unwrap()).unwrap();

    let mut config = common::config_in(tmp.path(), StorageBackendKind::Json);
    config.catalog.path = Some(seed_path.to_string_lossy().to_string());
    assert!(matches!(
        GachaService::from_config(&config),
        Err(GachaError::InvalidCatalog(_))
    ));
}

#[test]
fn engine_rates_match_standard_weights() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::json_service(tmp.path(), 0);
    let rates = svc.engine().rates();
    let total: f64 = Catalog::standard().tiers.iter().map(|t| t.weight).sum();
    assert!((rates[0].1 - 0.7 / total).abs() < 1e-12);
    assert_eq!(rates.last().unwrap().0, Rarity::Celestial);
}
