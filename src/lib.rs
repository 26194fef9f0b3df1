//! # swca - gacha collection game backend
//!
//! Players spend gems to draw characters of six rarities, then sell or dismantle them,
//! level and ascend the keepers, pick a three-unit team and clear stages for rewards.
//! Every player is one account keyed by a bare username; nothing is shared between
//! accounts.
//!
//! ## Features
//!
//! - **Weighted draws**: explicit cumulative rarity table, shiny rolls, seeded RNG for tests.
//! - **Inventory and upgrades**: sell for coins, dismantle for per-unit shards, level-ups and
//!   ascension with all-or-nothing validation.
//! - **Stages**: monotonic cleared frontier with replayable rewards.
//! - **Persistence**: a locked, atomically replaced JSON store or a sled tree.
//! - **HTTP**: `axum` routes for every operation (feature `http`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swca::config::Config;
//! use swca::gacha::GachaService;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let service = GachaService::from_config(&config)?;
//!     let pull = service.pull_one("alice")?;
//!     println!("{} ({}) - {} gems left", pull.pulled.unit, pull.pulled.rarity, pull.gems_left);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`gacha`] - catalog, draw engine, inventory/progression/stage engines and the service
//! - [`storage`] - account backends
//! - [`config`] - TOML configuration
//! - [`server`] - HTTP routes
//! - [`metrics`] - in-process counters
//! - [`validation`] - request normalization
//! - [`logutil`] - log setup and escaping
//!
//! ```text
//! ┌─────────────────┐
//! │  HTTP / CLI     │ ← request parsing, normalization
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  GachaService   │ ← per-account lock, clone → mutate → persist → swap
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Storage        │ ← JSON file or sled
//! └─────────────────┘
//! ```

pub mod config;
pub mod gacha;
pub mod logutil;
pub mod metrics;
#[cfg(feature = "http")]
pub mod server;
pub mod storage;
pub mod validation;
