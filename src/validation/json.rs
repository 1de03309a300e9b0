//! JSON body decoding and output encoding.

use std::marker::PhantomData;

use bytes::BytesMut;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::pipeline::validation::{
    BodyStream, BodyValidationError, BodyValidator, EncodedOutput, OutputValidator, ValidationError,
};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Whether `content_type` names JSON, ignoring parameters such as `charset`.
fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == JSON_CONTENT_TYPE || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Reads a JSON body and deserializes it into `T`.
pub struct JsonBody<T> {
    max_bytes: Option<usize>,
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonBody<T> {
    pub fn new() -> Self {
        Self {
            max_bytes: None,
            _target: PhantomData,
        }
    }

    /// Reject bodies larger than `max_bytes` without reading further.
    pub fn limit(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

impl<T> Default for JsonBody<T> {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_to_end(mut body: BodyStream, max_bytes: Option<usize>) -> Result<BytesMut, ValidationError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body
        .try_next()
        .await
        .map_err(|e| ValidationError::new(format!("failed to read body: {e}")))?
    {
        if max_bytes.is_some_and(|max| buffer.len() + chunk.len() > max) {
            return Err(ValidationError::new("body exceeds the size limit"));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

impl<T> BodyValidator for JsonBody<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Output = T;

    fn validate(&self, content_type: String, body: BodyStream) -> BoxFuture<'static, Result<T, BodyValidationError>> {
        let max_bytes = self.max_bytes;
        async move {
            if !is_json(&content_type) {
                return Err(BodyValidationError::UnsupportedContentType(content_type));
            }
            let bytes = read_to_end(body, max_bytes)
                .await
                .map_err(BodyValidationError::Invalid)?;
            serde_json::from_slice(&bytes).map_err(|e| {
                BodyValidationError::Invalid(ValidationError::at(
                    format!("line {} column {}", e.line(), e.column()),
                    e.to_string(),
                ))
            })
        }
        .boxed()
    }
}

/// Encodes any `Serialize` output as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl<O: Serialize> OutputValidator<O> for Json {
    fn encode(&self, output: O) -> Result<EncodedOutput, ValidationError> {
        let body = serde_json::to_vec(&output)
            .map_err(|e| ValidationError::new(format!("output is not serializable: {e}")))?;
        Ok(EncodedOutput {
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: Some(body.into()),
            ..Default::default()
        })
    }
}
