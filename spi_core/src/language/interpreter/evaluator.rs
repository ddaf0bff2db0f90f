use log::trace;
use crate::language::error::{Error, ErrorCode, ErrorKind, Result};
use crate::language::token::{Token, TokenType};
use crate::runtime_error;
use super::value::Value;

/// Applies a binary arithmetic operator.
///
/// `+`, `-` and `*` stay integral when both operands are integers and widen
/// to REAL otherwise. `/` always produces a REAL; `DIV` floors and accepts
/// integers only. A REAL result must stay finite.
pub fn binary(op: &Token, lhs: Value, rhs: Value) -> Result<Value> {
    trace!("Binary operation: {} {} {}", lhs, op, rhs);

    match (&op.token_type, lhs, rhs) {
        (TokenType::FloatDiv, _, _) => {
            let divisor = rhs.as_f64();
            if divisor == 0.0 {
                return runtime_error!(ErrorCode::DivisionByZero, "Division by zero", op);
            }
            finite(lhs.as_f64() / divisor, op)
        }
        (TokenType::IntegerDiv, Value::Integer(a), Value::Integer(b)) => {
            if b == 0 {
                return runtime_error!(ErrorCode::DivisionByZero, "Integer division by zero", op);
            }
            floor_div(a, b).map(Value::Integer).ok_or_else(|| overflow(op))
        }
        (TokenType::IntegerDiv, _, _) => runtime_error!(
            ErrorCode::TypeMismatch,
            format!("DIV needs INTEGER operands, found {} and {}", lhs.builtin(), rhs.builtin()),
            op
        ),
        (TokenType::Plus | TokenType::Minus | TokenType::Mul, Value::Integer(a), Value::Integer(b)) => {
            let result = match op.token_type {
                TokenType::Plus => a.checked_add(b),
                TokenType::Minus => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            result.map(Value::Integer).ok_or_else(|| overflow(op))
        }
        (TokenType::Plus, _, _) => finite(lhs.as_f64() + rhs.as_f64(), op),
        (TokenType::Minus, _, _) => finite(lhs.as_f64() - rhs.as_f64(), op),
        (TokenType::Mul, _, _) => finite(lhs.as_f64() * rhs.as_f64(), op),
        _ => runtime_error!(
            ErrorCode::TypeMismatch,
            format!("'{}' is not a binary operator", op),
            op
        ),
    }
}

/// Applies unary `+` or `-`.
pub fn unary(op: &Token, operand: Value) -> Result<Value> {
    match (&op.token_type, operand) {
        (TokenType::Plus, _) => Ok(operand),
        (TokenType::Minus, Value::Integer(value)) => {
            value.checked_neg().map(Value::Integer).ok_or_else(|| overflow(op))
        }
        (TokenType::Minus, Value::Real(value)) => Ok(Value::Real(-value)),
        _ => runtime_error!(
            ErrorCode::TypeMismatch,
            format!("'{}' is not a unary operator", op),
            op
        ),
    }
}

/// Integer division rounding toward negative infinity. `None` on overflow or a zero divisor.
pub fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

fn finite(value: f64, op: &Token) -> Result<Value> {
    if value.is_finite() {
        Ok(Value::Real(value))
    } else {
        runtime_error!(ErrorCode::RealOverflow, format!("REAL result of '{}' is out of range", op), op)
    }
}

fn overflow(op: &Token) -> Error {
    Error::at_token(ErrorKind::Runtime, ErrorCode::IntegerOverflow, format!("Integer overflow in '{}'", op), op)
}
