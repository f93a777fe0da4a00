//! Bundleswap Settlement Engine
//!
//! The engine bundles native-currency, fungible-token, and non-fungible
//! token transfers among three or more parties into one settlement, and
//! guarantees that either every transfer lands or none does. Obligated
//! senders approve (escrowing native funds where required); once the
//! approval set is complete the settlement executes atomically, either
//! automatically or on demand.

pub mod engine;
pub mod config;
pub mod registry;
pub mod escrow;
pub mod adapter;
pub mod executor;
pub mod events;
pub mod metrics;

pub use engine::SettlementEngine;
pub use config::EngineConfig;
pub use events::EventLog;
pub use metrics::{Metrics, MetricsSnapshot};
