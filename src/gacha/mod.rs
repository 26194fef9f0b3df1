//! # Gacha core
//!
//! The collection game itself: catalog, random draws, the inventory and progression
//! engines, stage rewards, history and the [`GachaService`] that ties them to a store.
//!
//! The engine modules are plain functions over `&mut Account`; they check everything
//! first and only then mutate, so an `Err` always means nothing changed. The service adds
//! per-account locking and persistence on top.

pub mod catalog;
pub mod currency;
pub mod draw;
pub mod errors;
pub mod history;
pub mod inventory;
pub mod progression;
pub mod service;
pub mod stage;
pub mod types;
pub mod view;

pub use catalog::{Catalog, TierSpec};
pub use currency::Wallet;
pub use draw::DrawEngine;
pub use errors::GachaError;
pub use service::{GachaService, GachaServiceBuilder};
pub use stage::{StageProgress, StageRewards};
pub use types::{
    Account, DrawResult, PullRecord, Rarity, UnitInstance, ACCOUNT_SCHEMA_VERSION,
    ASCENSION_MAX, HISTORY_LIMIT, LEVEL_MAX, TEAM_SIZE,
};
pub use view::{
    AscendView, DismantleView, HistoryView, IndexData, IndexEntry, InventoryView, LevelUpView,
    Profile, PullTenView, PullView, PulledUnit, SaleView, StageView, TeamView,
};
