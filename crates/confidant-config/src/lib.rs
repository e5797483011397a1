//! Ghost Config Store (spec §4.3 / C3): per-owner configuration gating
//! whether and how other users may read their memories.

pub mod model;
pub mod store;

pub use model::{EnforcementMode, GhostConfig, GhostConfigPatch};
pub use store::{GhostConfigProvider, GhostConfigStore};
