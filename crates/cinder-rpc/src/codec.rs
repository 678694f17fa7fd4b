//! Decoding raw text into request envelopes.
//!
//! Decoding is split in two steps with distinct failure codes: JSON parsing
//! (`ParseError`, nothing further assumed) and envelope shape validation
//! (`InvalidRequest`). Encoding is plain serde serialization — re-checking
//! the outgoing shape is [`crate::validation::finalize_response`]'s job.

use serde_json::Value;

use crate::errors::RpcError;
use crate::types::{RequestId, RpcRequest, Version};

/// A decoded body: one request or an ordered batch of raw items.
///
/// Batch items stay as raw values here; each is decoded independently at
/// dispatch time so one malformed item cannot abort its siblings.
#[derive(Clone, Debug, PartialEq)]
pub enum RpcPayload {
    /// A single raw request value.
    Single(Value),
    /// An ordered batch of raw request values.
    Batch(Vec<Value>),
}

/// Parse a body into a payload.
///
/// Fails with [`RpcError::Parse`] when the body is not valid JSON.
pub fn parse_payload(text: &str) -> Result<RpcPayload, RpcError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| RpcError::parse(err.to_string()))?;
    Ok(match value {
        Value::Array(items) => RpcPayload::Batch(items),
        other => RpcPayload::Single(other),
    })
}

/// Decode one raw value into a request envelope.
///
/// Shape rules: the value must be an object with `jsonrpc` exactly `"2.0"`
/// and a string `method`; `id` may be absent, `null`, a number, or a string;
/// `params` may be absent, `null`, or an array. Anything else fails with
/// [`RpcError::InvalidRequest`]. Member types inside `params` are not
/// checked — that is the provider's domain.
pub fn decode_request(raw: &Value) -> Result<RpcRequest, RpcError> {
    let object = raw
        .as_object()
        .ok_or_else(|| RpcError::invalid_request("request must be an object"))?;

    match object.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => return Err(RpcError::invalid_request("jsonrpc version must be \"2.0\"")),
    }

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_request("method must be a string"))?;

    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => Some(RequestId::Number(v)),
            None => return Err(RpcError::invalid_request("id must be an integer or string")),
        },
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(_) => return Err(RpcError::invalid_request("id must be an integer or string")),
    };

    let params = match object.get("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(RpcError::invalid_request("params must be an array")),
    };

    Ok(RpcRequest {
        version: Version,
        id,
        method: method.to_owned(),
        params,
    })
}

/// Best-effort id recovery from a structurally invalid request.
///
/// Used so error responses can still echo the caller's id when it happens to
/// be a legal id value; otherwise the response reports `null`.
pub fn recover_id(raw: &Value) -> Option<RequestId> {
    match raw.get("id")? {
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        Value::String(s) => Some(RequestId::String(s.clone())),
        _ => None,
    }
}
