//! Typed scalar values held by the canonical store.
//!
//! # Responsibilities
//! - Closed set of value kinds a configuration key may carry
//! - Coercion of raw override text into an existing kind
//!
//! # Design Decisions
//! - The kind of a key is fixed on first insert; overlays only ever coerce
//!   into that kind, they never change it
//! - Coercion is pure and never logs; callers decide what a failure means

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The kind of a [`TypedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    String,
    Bool,
    UInt16,
    UInt32,
    UInt64,
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueTag::String => "string",
            ValueTag::Bool => "bool",
            ValueTag::UInt16 => "uint16",
            ValueTag::UInt32 => "uint32",
            ValueTag::UInt64 => "uint64",
        };
        f.write_str(name)
    }
}

/// A tagged configuration scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Bool(bool),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
}

/// Reasons raw override text could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// Text is not a literal of the target kind.
    #[error("{text:?} is not a valid {tag}")]
    Invalid { tag: ValueTag, text: String },

    /// Text is an integer literal that does not fit the target width.
    #[error("{text:?} is out of range for {tag}")]
    OutOfRange { tag: ValueTag, text: String },

    /// A structured document supplied a non-string scalar for a string key.
    #[error("expected a quoted string, found {text}")]
    NotAString { text: String },

    /// A structured document supplied a quoted string for a non-string key.
    #[error("expected an unquoted {tag}, found a string {text:?}")]
    UnexpectedString { tag: ValueTag, text: String },

    /// Text has the right kind but is not an acceptable setting for its key.
    #[error("{text:?} rejected: {reason}")]
    Unacceptable { text: String, reason: String },
}

impl CoercionError {
    /// Out-of-range failures are configuration errors rather than mere
    /// unparsable text.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, CoercionError::OutOfRange { .. })
    }
}

impl TypedValue {
    /// The kind of this value.
    pub fn tag(&self) -> ValueTag {
        match self {
            TypedValue::String(_) => ValueTag::String,
            TypedValue::Bool(_) => ValueTag::Bool,
            TypedValue::UInt16(_) => ValueTag::UInt16,
            TypedValue::UInt32(_) => ValueTag::UInt32,
            TypedValue::UInt64(_) => ValueTag::UInt64,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            TypedValue::UInt16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TypedValue::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TypedValue::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse plain (unquoted) text as a value of the same kind as `self`.
    pub fn coerce(&self, raw: &str) -> Result<TypedValue, CoercionError> {
        coerce(self.tag(), raw)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => f.write_str(s),
            TypedValue::Bool(b) => write!(f, "{}", b),
            TypedValue::UInt16(v) => write!(f, "{}", v),
            TypedValue::UInt32(v) => write!(f, "{}", v),
            TypedValue::UInt64(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::String(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::String(s)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Bool(b)
    }
}

impl From<u16> for TypedValue {
    fn from(v: u16) -> Self {
        TypedValue::UInt16(v)
    }
}

impl From<u32> for TypedValue {
    fn from(v: u32) -> Self {
        TypedValue::UInt32(v)
    }
}

impl From<u64> for TypedValue {
    fn from(v: u64) -> Self {
        TypedValue::UInt64(v)
    }
}

/// Parse plain text as a literal of `tag`.
///
/// Used by the environment and remote overlays, whose text is never quoted.
pub fn coerce(tag: ValueTag, raw: &str) -> Result<TypedValue, CoercionError> {
    match tag {
        ValueTag::String => Ok(TypedValue::String(raw.to_string())),
        ValueTag::Bool => parse_bool(raw).map(TypedValue::Bool),
        ValueTag::UInt16 => parse_unsigned(tag, raw, u16::MAX as u64).map(|v| TypedValue::UInt16(v as u16)),
        ValueTag::UInt32 => parse_unsigned(tag, raw, u32::MAX as u64).map(|v| TypedValue::UInt32(v as u32)),
        ValueTag::UInt64 => parse_unsigned(tag, raw, u64::MAX).map(TypedValue::UInt64),
    }
}

fn parse_bool(raw: &str) -> Result<bool, CoercionError> {
    let text = raw.trim();
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CoercionError::Invalid { tag: ValueTag::Bool, text: raw.to_string() })
    }
}

fn parse_unsigned(tag: ValueTag, raw: &str, max: u64) -> Result<u64, CoercionError> {
    let text = raw.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoercionError::Invalid { tag, text: raw.to_string() });
    }

    let out_of_range = || CoercionError::OutOfRange { tag, text: raw.to_string() };

    // "-0" is still zero
    if negative && digits.bytes().any(|b| b != b'0') {
        return Err(out_of_range());
    }

    let value: u64 = digits.parse().map_err(|_| out_of_range())?;
    if value > max {
        return Err(out_of_range());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_keeps_tag() {
        let port = TypedValue::UInt16(59999);
        assert_eq!(port.coerce("8080"), Ok(TypedValue::UInt16(8080)));

        let flag = TypedValue::Bool(false);
        assert_eq!(flag.coerce("TRUE"), Ok(TypedValue::Bool(true)));

        let name = TypedValue::String("a".into());
        assert_eq!(name.coerce(" spaced "), Ok(TypedValue::String(" spaced ".into())));
    }

    #[test]
    fn test_integer_width_checks() {
        assert!(coerce(ValueTag::UInt16, "65536").unwrap_err().is_out_of_range());
        assert_eq!(coerce(ValueTag::UInt16, "65535"), Ok(TypedValue::UInt16(65535)));
        assert!(coerce(ValueTag::UInt32, "-1").unwrap_err().is_out_of_range());
        assert_eq!(coerce(ValueTag::UInt32, "-0"), Ok(TypedValue::UInt32(0)));
        assert!(coerce(ValueTag::UInt64, "99999999999999999999").unwrap_err().is_out_of_range());
        assert_eq!(coerce(ValueTag::UInt64, " 42 "), Ok(TypedValue::UInt64(42)));
    }

    #[test]
    fn test_invalid_literals() {
        assert!(matches!(coerce(ValueTag::UInt16, "80a"), Err(CoercionError::Invalid { .. })));
        assert!(matches!(coerce(ValueTag::UInt32, ""), Err(CoercionError::Invalid { .. })));
        assert!(matches!(coerce(ValueTag::Bool, "yes"), Err(CoercionError::Invalid { .. })));
    }

    #[test]
    fn test_display() {
        assert_eq!(TypedValue::from(true).to_string(), "true");
        assert_eq!(TypedValue::from(7u32).to_string(), "7");
        assert_eq!(TypedValue::from("x").to_string(), "x");
    }
}
