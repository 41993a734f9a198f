use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/*
===========================================
MetadataValue
===========================================
*/

/// A scalar stored in collection or record metadata.
///
/// Values read from the server keep their full 64-bit width. Values parsed from
/// user input must go through [`MetadataValue::infer`] so that every caller
/// agrees on how `"10"`, `"10.0"` and `"true"` are typed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    /// Infers the type of a raw string value.
    ///
    /// The order is fixed: boolean literal, then 32-bit float (only when the
    /// input contains a `.`), then 32-bit integer, then string. `"1e10"` has no
    /// dot and overflows `i32`, so it stays a string.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return MetadataValue::Bool(true),
            "false" => return MetadataValue::Bool(false),
            _ => {}
        }
        if raw.contains('.') {
            if let Ok(value) = raw.parse::<f32>() {
                return MetadataValue::from_f32(value);
            }
        }
        if let Ok(value) = raw.parse::<i32>() {
            return MetadataValue::Int(value.into());
        }
        MetadataValue::Str(raw.to_string())
    }

    /// Widens a 32-bit float through its shortest decimal form, so `1.2f32`
    /// is stored as `1.2` rather than `1.2000000476837158`.
    pub fn from_f32(value: f32) -> Self {
        let widened = value.to_string().parse().unwrap_or(f64::from(value));
        MetadataValue::Float(widened)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(value) => write!(f, "{}", value),
            MetadataValue::Int(value) => write!(f, "{}", value),
            MetadataValue::Float(value) => write!(f, "{}", value),
            MetadataValue::Str(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum MetadataValueConversionError {
    #[error("Invalid metadata value {0}, expected {1}")]
    InvalidValue(String, &'static str),
}

impl TryFrom<&MetadataValue> for i32 {
    type Error = MetadataValueConversionError;

    fn try_from(value: &MetadataValue) -> Result<Self, Self::Error> {
        match value {
            MetadataValue::Int(int) => i32::try_from(*int).map_err(|_| {
                MetadataValueConversionError::InvalidValue(int.to_string(), "a 32-bit integer")
            }),
            other => Err(MetadataValueConversionError::InvalidValue(
                other.to_string(),
                "an integer",
            )),
        }
    }
}

impl TryFrom<&MetadataValue> for f32 {
    type Error = MetadataValueConversionError;

    fn try_from(value: &MetadataValue) -> Result<Self, Self::Error> {
        match value {
            MetadataValue::Float(value) => Ok(*value as f32),
            // JSON does not distinguish 2.0 from 2
            MetadataValue::Int(value) => Ok(*value as f32),
            other => Err(MetadataValueConversionError::InvalidValue(
                other.to_string(),
                "a number",
            )),
        }
    }
}

impl TryFrom<&MetadataValue> for String {
    type Error = MetadataValueConversionError;

    fn try_from(value: &MetadataValue) -> Result<Self, Self::Error> {
        match value {
            MetadataValue::Str(value) => Ok(value.clone()),
            other => Err(MetadataValueConversionError::InvalidValue(
                other.to_string(),
                "a string",
            )),
        }
    }
}

pub type Metadata = HashMap<String, MetadataValue>;

/*
===========================================
Metadata tokens
===========================================
*/

#[derive(Error, Debug, PartialEq)]
pub enum MetadataTokenError {
    #[error("Invalid metadata format '{0}', expected key=value")]
    InvalidFormat(String),
}

/// Splits a `key=value` token and infers the type of the value.
///
/// The token must contain exactly one `=` and a non-empty key.
pub fn parse_metadata_token(token: &str) -> Result<(String, MetadataValue), MetadataTokenError> {
    let mut parts = token.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) if !key.is_empty() => {
            Ok((key.to_string(), MetadataValue::infer(value)))
        }
        _ => Err(MetadataTokenError::InvalidFormat(token.to_string())),
    }
}
