// Data Value Implementation
//
// This module defines the runtime value type carried by tuples. Values are
// hashable and ordered so they can key join/aggregation hash tables and be
// compared by predicate expressions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::schema::DataType;

/// Possible data types for values in a tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Type discriminant first to avoid collisions between variants
        match self {
            DataValue::Null => {
                0.hash(state);
            }
            DataValue::Integer(i) => {
                1.hash(state);
                i.hash(state);
            }
            DataValue::Float(f) => {
                2.hash(state);
                // Hash the bit pattern; NaN and -0.0 get distinct buckets
                f.to_bits().hash(state);
            }
            DataValue::Text(s) => {
                3.hash(state);
                s.hash(state);
            }
            DataValue::Boolean(b) => {
                4.hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "\"{}\"", s),
            DataValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            // Null is incomparable with anything
            (DataValue::Null, _) | (_, DataValue::Null) => None,

            (DataValue::Integer(a), DataValue::Integer(b)) => a.partial_cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b),

            // Integer and float can be compared
            (DataValue::Integer(a), DataValue::Float(b)) => (*a as f64).partial_cmp(b),
            (DataValue::Float(a), DataValue::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (DataValue::Text(a), DataValue::Text(b)) => a.partial_cmp(b),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.partial_cmp(b),

            // Different types are incomparable (except int/float)
            _ => None,
        }
    }
}

impl DataValue {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            DataValue::Null => None,
            DataValue::Integer(_) => Some(DataType::Integer),
            DataValue::Float(_) => Some(DataType::Float),
            DataValue::Text(_) => Some(DataType::Text),
            DataValue::Boolean(_) => Some(DataType::Boolean),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Numeric addition, used by the update executor's `Add` attribute and
    /// by running SUM aggregates. Adding to NULL yields the other operand.
    pub fn add(&self, other: &DataValue) -> Option<DataValue> {
        match (self, other) {
            (DataValue::Null, v) | (v, DataValue::Null) => Some(v.clone()),
            (DataValue::Integer(a), DataValue::Integer(b)) => {
                a.checked_add(*b).map(DataValue::Integer)
            }
            (DataValue::Float(a), DataValue::Float(b)) => Some(DataValue::Float(a + b)),
            (DataValue::Integer(a), DataValue::Float(b)) => Some(DataValue::Float(*a as f64 + b)),
            (DataValue::Float(a), DataValue::Integer(b)) => Some(DataValue::Float(a + *b as f64)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        assert!(DataValue::Integer(1) < DataValue::Integer(2));
        assert!(DataValue::Integer(2) < DataValue::Float(2.5));
        assert_eq!(
            DataValue::Null.partial_cmp(&DataValue::Integer(1)),
            None
        );
        assert!(DataValue::Text("a".into()) < DataValue::Text("b".into()));
    }

    #[test]
    fn test_add() {
        assert_eq!(
            DataValue::Integer(2).add(&DataValue::Integer(3)),
            Some(DataValue::Integer(5))
        );
        assert_eq!(
            DataValue::Integer(2).add(&DataValue::Float(0.5)),
            Some(DataValue::Float(2.5))
        );
        assert_eq!(
            DataValue::Text("x".into()).add(&DataValue::Integer(1)),
            None
        );
    }
}
