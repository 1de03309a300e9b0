//! Ready-made validators built on serde.
//!
//! # Responsibilities
//! - Decode URL parameters and raw strings through `FromStr`
//! - Decode parsed query maps into any `Deserialize` type
//! - Decode JSON bodies and encode JSON outputs
//!
//! # Design Decisions
//! - Each validator is a small value type; endpoints own their instances
//! - Query values stay strings until a field asks for a number or a bool,
//!   so `String` fields never lose their text

mod json;
mod query;

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::pipeline::validation::{EncodedOutput, OutputValidator, StringValidator, ValidationError};

pub use json::{Json, JsonBody, JSON_CONTENT_TYPE};
pub use query::QueryStruct;

/// Parses a string with `T::from_str`.
pub struct FromStrValidator<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> FromStrValidator<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for FromStrValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StringValidator for FromStrValidator<T>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: Display,
{
    type Output = T;

    fn validate(&self, raw: &str) -> Result<T, ValidationError> {
        raw.parse::<T>()
            .map_err(|e| ValidationError::new(format!("`{raw}` is invalid: {e}")))
    }
}

/// Output encoder for handlers that return nothing; answers without a body.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl OutputValidator<()> for NoContent {
    fn encode(&self, _output: ()) -> Result<EncodedOutput, ValidationError> {
        Ok(EncodedOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_validator() {
        let v = FromStrValidator::<u16>::new();
        assert_eq!(v.validate("8080"), Ok(8080));

        let err = v.validate("port").unwrap_err();
        assert!(err.message.starts_with("`port` is invalid"));
    }

    #[test]
    fn test_no_content_has_no_body() {
        let out = NoContent.encode(()).unwrap();
        assert!(out.body.is_none());
    }
}
