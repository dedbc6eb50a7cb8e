//! JSON decoding for documents whose nesting follows the page structure.
//!
//! Accessibility trees nest as deep as the page does, which easily exceeds
//! serde_json's default recursion limit of 128. These helpers lift the limit
//! and grow the stack on demand instead.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Parses `json` without a nesting limit.
pub(crate) fn from_str_unbounded<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    let mut parser = serde_json::Deserializer::from_str(json);
    parser.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut parser))?;
    parser.end()?;
    Ok(value)
}

/// Converts an already parsed value without overflowing the stack on deep input.
pub(crate) fn from_value_unbounded<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    T::deserialize(serde_stacker::Deserializer::new(value))
}
