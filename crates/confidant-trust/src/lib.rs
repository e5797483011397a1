//! Trust Enforcement (spec §4.1 / C1): collapsing a continuous trust score
//! into a disclosure tier, redacting a memory down to that tier, and
//! building the query-time filter for "hybrid"/"query" enforcement modes.
//! A leaf component — it has no dependency on any other Confidant crate
//! besides `confidant-core`'s shared data model.

pub mod query;
pub mod redact;
pub mod tier;

pub use query::trust_filter;
pub use redact::{PromptView, format_memory_for_prompt, tier_for_access};
pub use tier::{Tier, is_trust_sufficient};
