//! Compile-time constant values.
//!
//! Only literal syntax is evaluated here. The checker layers a few more
//! foldable shapes on top (negation, constant identifiers), but arbitrary
//! expressions such as `1 + 2` are never folded.

use std::fmt;

use kestrel_ast::LiteralKind;

use crate::ty::{PrimitiveKind, Type};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(String),
}

/// Why literal text could not be turned into a [`Value`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralError {
    /// An integer literal that does not fit the evaluator's integer range.
    OutOfRange,
    /// Text the lexer should never have produced.
    Malformed,
}

impl Value {
    /// Evaluate literal text.
    pub fn from_literal(kind: LiteralKind, text: &str) -> Result<Value, LiteralError> {
        match kind {
            LiteralKind::Int => parse_int(text).map(Value::Int),
            LiteralKind::Float => {
                let cleaned: String = text.chars().filter(|&c| c != '_').collect();
                cleaned
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| LiteralError::Malformed)
            }
            LiteralKind::String => unquote(text).map(Value::String),
        }
    }

    /// The untyped primitive a constant of this shape has before any
    /// context narrows it.
    pub fn untyped_type(&self) -> Type {
        Type::Primitive(match self {
            Value::Bool(_) => PrimitiveKind::UntypedBool,
            Value::Int(_) => PrimitiveKind::UntypedInt,
            Value::Float(_) => PrimitiveKind::UntypedFloat,
            Value::String(_) => PrimitiveKind::UntypedString,
        })
    }

    /// Arithmetic negation; `None` for non-numeric values and on overflow.
    pub fn negate(&self) -> Option<Value> {
        match self {
            Value::Int(n) => n.checked_neg().map(Value::Int),
            Value::Float(x) => Some(Value::Float(-x)),
            Value::Bool(_) | Value::String(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

fn parse_int(text: &str) -> Result<i128, LiteralError> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let (radix, digits) = match cleaned.get(..2) {
        Some("0x" | "0X") => (16, &cleaned[2..]),
        Some("0o" | "0O") => (8, &cleaned[2..]),
        Some("0b" | "0B") => (2, &cleaned[2..]),
        _ => (10, cleaned.as_str()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(LiteralError::Malformed);
    }
    i128::from_str_radix(digits, radix).map_err(|_| LiteralError::OutOfRange)
}

fn unquote(text: &str) -> Result<String, LiteralError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or(LiteralError::Malformed)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            _ => return Err(LiteralError::Malformed),
        };
        out.push(escaped);
    }
    Ok(out)
}
