//! Query-time trust enforcement (spec §4.1 "query" enforcement mode): build
//! a [`FilterExpr`] that excludes memories the accessor's trust can't clear
//! before the query ever reaches the vector store, rather than filtering
//! client-side after retrieval.

use confidant_core::{FilterExpr, by_property};

/// `trust <= accessor_trust` — a memory is only returned if its own
/// required trust is at or below what the accessor holds.
pub fn trust_filter(accessor_trust: f32) -> FilterExpr {
    by_property("trust").less_or_equal(serde_json::json!(accessor_trust))
}

#[cfg(test)]
mod tests {
    use confidant_core::FilterExpr;

    use super::*;

    #[test]
    fn builds_a_less_or_equal_clause_on_trust() {
        match trust_filter(0.5) {
            FilterExpr::LessOrEqual { property, value } => {
                assert_eq!(property, "trust");
                assert_eq!(value, serde_json::json!(0.5));
            }
            other => panic!("expected LessOrEqual, got {other:?}"),
        }
    }
}
