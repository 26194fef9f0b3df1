mod common;

use swca::gacha::{GachaError, Rarity, ASCENSION_MAX, LEVEL_MAX};

#[test]
fn level_up_runs_to_cap_with_linear_costs() {
    let tmp = tempfile::tempdir().unwrap();
    let mut economy = swca::config::EconomyConfig::default();
    economy.starting_coins = 100_000;
    let backend =
        swca::storage::JsonFileBackend::open(tmp.path().join("accounts.json")).unwrap();
    let svc = swca::gacha::GachaService::builder(Box::new(backend))
        .economy(economy)
        .seed(1)
        .build()
        .unwrap();
    let id = svc.pull_one("kai").unwrap().pulled.instance_id;

    let mut expected_cost = 50;
    for level in 2..=LEVEL_MAX {
        let view = svc.level_up("kai", &id).unwrap();
        assert_eq!(view.cost, expected_cost);
        assert_eq!(view.inst.level, level);
        expected_cost += 50;
    }
    let err = svc.level_up("kai", &id).unwrap_err();
    assert!(matches!(err, GachaError::MaxTierReached { track: "level", max: 50 }));
    // 50 + 100 + ... + 2450
    assert_eq!(svc.profile("kai").unwrap().coins, 100_000 - 50 * (49 * 50 / 2));
}

#[test]
fn level_up_reports_balance_and_cost() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::json_service(tmp.path(), 2);
    let id = svc.pull_one("lia").unwrap().pulled.instance_id;
    // 50 + 100 + 150 + 200 spends all 500 starting coins; the next step costs 250.
    for _ in 0..4 {
        svc.level_up("lia", &id).unwrap();
    }
    let err = svc.level_up("lia", &id).unwrap_err();
    assert_eq!(err.to_string(), "not enough coins (0/250)");
    assert_eq!(svc.account("lia").unwrap().find_instance(&id).unwrap().level, 5);
}

#[test]
fn ascend_uses_only_same_unit_shards() {
    let tmp = tempfile::tempdir().unwrap();
    // Only Ted can be drawn: dismantling Teds gives 20 shards each, ascension needs 120.
    let svc = common::service_with_catalog(
        tmp.path(),
        6,
        common::single_tier_catalog(Rarity::Secret),
    );
    svc.pull_ten("max").unwrap();
    let ids = common::backpack_ids(&svc, "max");
    let keeper = ids[0].clone();

    let err = svc.ascend("max", &keeper).unwrap_err();
    assert_eq!(err.to_string(), "not enough shards for Ted (0/120)");

    svc.dismantle_selected("max", &ids[1..7]).unwrap();
    let view = svc.ascend("max", &keeper).unwrap();
    assert_eq!(view.inst.ascension, 1);
    assert_eq!(view.shards_spent, 120);
    assert_eq!(view.shards["Ted"], 0);
}

#[test]
fn ascension_stops_at_cap() {
    let tmp = tempfile::tempdir().unwrap();
    let mut economy = swca::config::EconomyConfig::default();
    economy.starting_gems = 100_000;
    let backend =
        swca::storage::JsonFileBackend::open(tmp.path().join("accounts.json")).unwrap();
    let svc = swca::gacha::GachaService::builder(Box::new(backend))
        .catalog(common::single_tier_catalog(Rarity::Common))
        .economy(economy)
        .seed(4)
        .build()
        .unwrap();

    // Commons yield 1 shard and need 10 per ascension; 5 ascensions of one name need 50.
    let keeper = svc.pull_one("ned").unwrap().pulled;
    let mut ascended = 0;
    while ascended < ASCENSION_MAX {
        let pulls = svc.pull_ten("ned").unwrap().pulls;
        let same: Vec<String> = pulls
            .into_iter()
            .filter(|p| p.unit == keeper.unit)
            .map(|p| p.instance_id)
            .collect();
        if !same.is_empty() {
            svc.dismantle_selected("ned", &same).unwrap();
        }
        while let Ok(view) = svc.ascend("ned", &keeper.instance_id) {
            ascended = view.inst.ascension;
            if ascended == ASCENSION_MAX {
                break;
            }
        }
    }
    let err = svc.ascend("ned", &keeper.instance_id).unwrap_err();
    assert!(matches!(err, GachaError::MaxTierReached { track: "ascension", max: 5 }));
}

#[test]
fn stage_rules_from_fresh_account() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = common::json_service(tmp.path(), 1);

    let lost = svc.complete_stage("ola", 1, false).unwrap();
    assert_eq!((lost.gems, lost.coins, lost.max_cleared), (2000, 500, 0));
    assert!(lost.rewards.is_none());

    let skipped = svc.complete_stage("ola", 3, true).unwrap();
    assert_eq!(skipped.max_cleared, 0);
    assert_eq!(skipped.coins, 500 + 240);

    for stage in 1..=5 {
        let view = svc.complete_stage("ola", stage, true).unwrap();
        assert!(view.advanced);
        assert_eq!(view.max_cleared, stage);
    }
    let progress = svc.progress("ola").unwrap();
    assert_eq!((progress.max_cleared, progress.next_allowed), (5, 6));

    // Stage 0 replays stage 1.
    let replay = svc.complete_stage("ola", 0, true).unwrap();
    assert!(!replay.advanced);
    assert_eq!(replay.max_cleared, 5);
}
