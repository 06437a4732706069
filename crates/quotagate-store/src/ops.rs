//! Mutation and precondition language for conditional updates.
//!
//! This is the closed subset of update expressions the components need:
//! set a field, add to a numeric field with an `if_not_exists` default, and
//! preconditions over field presence and numeric bounds. Anything richer
//! belongs in the backend, not in this contract.

use crate::error::StoreError;
use serde_json::{Map, Value};

/// Raw row fields as they cross the store boundary.
pub type Fields = Map<String, Value>;

/// A single field mutation.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// `SET field = value`.
    Set {
        /// Field name.
        field: String,
        /// New value.
        value: Value,
    },
    /// `SET field = if_not_exists(field, default) + delta`.
    ///
    /// Numeric results saturate at zero: a decrement can never drive a
    /// counter negative through this operation.
    Add {
        /// Field name.
        field: String,
        /// Signed amount to add.
        delta: i64,
        /// Value assumed when the field is absent.
        default: i64,
    },
}

impl Mutation {
    /// Convenience constructor for `Set`.
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        Mutation::Set {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Convenience constructor for `Add`.
    pub fn add(field: &str, delta: i64, default: i64) -> Self {
        Mutation::Add {
            field: field.to_string(),
            delta,
            default,
        }
    }
}

/// A precondition evaluated against the row's current fields.
#[derive(Debug, Clone)]
pub enum Precondition {
    /// The field must be absent.
    Absent(String),
    /// The field must be present.
    Present(String),
    /// The field must be numeric and strictly less than the literal.
    LessThan(String, i64),
    /// Either sub-condition holds.
    Or(Box<Precondition>, Box<Precondition>),
}

impl Precondition {
    /// `attribute_not_exists(field) OR field < max` — the guard used by
    /// every bounded counter increment.
    pub fn absent_or_less_than(field: &str, max: i64) -> Self {
        Precondition::Or(
            Box::new(Precondition::Absent(field.to_string())),
            Box::new(Precondition::LessThan(field.to_string(), max)),
        )
    }

    /// Evaluates this precondition against a row's fields.
    ///
    /// A missing row evaluates as a row with no fields.
    pub fn holds(&self, fields: &Fields) -> bool {
        match self {
            Precondition::Absent(field) => !fields.contains_key(field),
            Precondition::Present(field) => fields.contains_key(field),
            Precondition::LessThan(field, max) => {
                matches!(fields.get(field).and_then(Value::as_i64), Some(v) if v < *max)
            }
            Precondition::Or(a, b) => a.holds(fields) || b.holds(fields),
        }
    }
}

/// Applies mutations to a row's fields in order.
pub fn apply_mutations(fields: &mut Fields, mutations: &[Mutation]) -> Result<(), StoreError> {
    for mutation in mutations {
        match mutation {
            Mutation::Set { field, value } => {
                fields.insert(field.clone(), value.clone());
            }
            Mutation::Add {
                field,
                delta,
                default,
            } => {
                let current = match fields.get(field) {
                    None => *default,
                    Some(value) => value.as_i64().ok_or_else(|| StoreError::Fatal {
                        message: format!("field {field} is not numeric"),
                    })?,
                };
                let next = (current + delta).max(0);
                fields.insert(field.clone(), Value::from(next));
            }
        }
    }
    Ok(())
}
