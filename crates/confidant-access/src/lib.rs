//! Access Control & Escalation (spec §4.2 / C2): per-(owner, accessor,
//! memory) permission decisions, attempt counting, and blocking.

pub mod checker;
pub mod model;
pub mod store;

pub use checker::AccessChecker;
pub use model::{AccessLevel, AccessResult, BlockInfo, EscalationRecord};
pub use store::{BLOCK_THRESHOLD, EscalationStore};
