//! Filter expression tree mirroring the vector store's
//! `filter.byProperty(name).{equal,notEqual,containsAny,greaterOrEqual,lessOrEqual,isNull}`
//! builder plus `and`/`or` combinators (spec §6).

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Equal { property: String, value: Value },
    NotEqual { property: String, value: Value },
    ContainsAny { property: String, values: Vec<Value> },
    GreaterOrEqual { property: String, value: Value },
    LessOrEqual { property: String, value: Value },
    IsNull { property: String },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

/// Entry point mirroring `filter.byProperty(name)`.
pub fn by_property(property: impl Into<String>) -> PropertyFilterBuilder {
    PropertyFilterBuilder { property: property.into() }
}

pub struct PropertyFilterBuilder {
    property: String,
}

impl PropertyFilterBuilder {
    pub fn equal(self, value: impl Into<Value>) -> FilterExpr {
        FilterExpr::Equal { property: self.property, value: value.into() }
    }

    pub fn not_equal(self, value: impl Into<Value>) -> FilterExpr {
        FilterExpr::NotEqual { property: self.property, value: value.into() }
    }

    pub fn contains_any(self, values: Vec<Value>) -> FilterExpr {
        FilterExpr::ContainsAny { property: self.property, values }
    }

    pub fn greater_or_equal(self, value: impl Into<Value>) -> FilterExpr {
        FilterExpr::GreaterOrEqual { property: self.property, value: value.into() }
    }

    pub fn less_or_equal(self, value: impl Into<Value>) -> FilterExpr {
        FilterExpr::LessOrEqual { property: self.property, value: value.into() }
    }

    pub fn is_null(self) -> FilterExpr {
        FilterExpr::IsNull { property: self.property }
    }
}

pub fn and(clauses: Vec<FilterExpr>) -> FilterExpr {
    FilterExpr::And(clauses)
}

pub fn or(clauses: Vec<FilterExpr>) -> FilterExpr {
    FilterExpr::Or(clauses)
}

impl FilterExpr {
    /// Evaluate the expression against a JSON object's properties.
    /// Used by the in-memory `Collection` stub in [`crate::testing`]; real
    /// backends would translate this tree into their own query DSL instead.
    pub fn matches(&self, properties: &Value) -> bool {
        match self {
            FilterExpr::Equal { property, value } => properties.get(property) == Some(value),
            FilterExpr::NotEqual { property, value } => properties.get(property) != Some(value),
            FilterExpr::ContainsAny { property, values } => match properties.get(property) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                Some(other) => values.contains(other),
                None => false,
            },
            FilterExpr::GreaterOrEqual { property, value } => {
                compare_numeric(properties.get(property), value).map(|o| o.is_ge()).unwrap_or(false)
            }
            FilterExpr::LessOrEqual { property, value } => {
                compare_numeric(properties.get(property), value).map(|o| o.is_le()).unwrap_or(false)
            }
            FilterExpr::IsNull { property } => {
                matches!(properties.get(property), None | Some(Value::Null))
            }
            FilterExpr::And(clauses) => clauses.iter().all(|c| c.matches(properties)),
            FilterExpr::Or(clauses) => clauses.iter().any(|c| c.matches(properties)),
        }
    }
}

fn compare_numeric(actual: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let a = actual?.as_f64()?;
    let b = expected.as_f64()?;
    a.partial_cmp(&b)
}
