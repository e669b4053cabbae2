//! Request payloads and decoded response values.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HttpError;
use crate::http::{FormData, Response};

/// How a valid response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Json,
    Text,
    Blob,
    /// Hand back the undecoded envelope.
    Response,
}

/// Request payload before encoding.
///
/// `Json` values are serialized to JSON text; `Text` and `Form` are sent as
/// they are. A JSON string never becomes `Json`: it is sent raw as `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
    Form(FormData),
}

impl Payload {
    /// Build a payload from any serializable value.
    ///
    /// Values that serialize to a string become [`Payload::Text`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, HttpError> {
        Ok(serde_json::to_value(value)?.into())
    }

    pub fn is_form(&self) -> bool {
        matches!(self, Payload::Form(_))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Payload::Text(text),
            value => Payload::Json(value),
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<FormData> for Payload {
    fn from(value: FormData) -> Self {
        Payload::Form(value)
    }
}

/// A decoded response body.
#[derive(Debug, PartialEq)]
pub enum Decoded {
    Json(serde_json::Value),
    Text(String),
    Blob(Bytes),
    Response(Response),
}

impl Decoded {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Decoded::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Decoded::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Decoded::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Bytes> {
        match self {
            Decoded::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Decoded::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Deserialize the decoded value into `T`.
    ///
    /// JSON values are converted directly; text is parsed as JSON first.
    /// Blobs and raw responses are parsed from their bytes.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let parsed = match self {
            Decoded::Json(value) => serde_json::from_value(value),
            Decoded::Text(text) => serde_json::from_str(&text),
            Decoded::Blob(bytes) => serde_json::from_slice(&bytes),
            Decoded::Response(response) => return response.json(),
        };
        parsed.map_err(|e| HttpError::Decode {
            message: format!("decoded body does not match the expected type: {e}"),
        })
    }
}
