use std::fmt;
use derive_more::From;
use serde::Serialize;
use crate::language::ast::Number;
use crate::language::symbol::BuiltinType;

/// Runtime value of a variable or expression.
#[derive(Debug, Clone, Copy, PartialEq, From, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Real(f64),
}

impl Value {
    pub fn builtin(&self) -> BuiltinType {
        match self {
            Value::Integer(_) => BuiltinType::Integer,
            Value::Real(_) => BuiltinType::Real,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Integer(value) => value as f64,
            Value::Real(value) => value,
        }
    }

    /// Converts an integer for storage in a REAL slot. Returns `None` when the
    /// value does not fit `target`.
    pub fn coerce_to(self, target: BuiltinType) -> Option<Value> {
        match (self, target) {
            (Value::Integer(_), BuiltinType::Integer) | (Value::Real(_), BuiltinType::Real) => Some(self),
            (Value::Integer(value), BuiltinType::Real) => Some(Value::Real(value as f64)),
            (Value::Real(_), BuiltinType::Integer) => None,
        }
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        match number {
            Number::Integer(value) => Value::Integer(value),
            Number::Real(value) => Value::Real(value),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Real(value) if value.is_finite() && value.fract() == 0.0 => write!(f, "{:.1}", value),
            Value::Real(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reals_keep_a_fraction_digit() {
        assert_eq!(Value::Real(5.0).to_string(), "5.0");
        assert_eq!(Value::Real(30.14).to_string(), "30.14");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
    }

    #[test]
    fn integers_widen_into_real_slots() {
        assert_eq!(Value::Integer(2).coerce_to(BuiltinType::Real), Some(Value::Real(2.0)));
        assert_eq!(Value::Real(2.5).coerce_to(BuiltinType::Integer), None);
    }
}
