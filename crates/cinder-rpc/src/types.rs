//! JSON-RPC 2.0 envelope types.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Protocol version marker.
///
/// Serializes as the literal `"2.0"` and refuses anything else on
/// deserialization, so a decoded envelope is version-checked by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "2.0" {
            Ok(Self)
        } else {
            Err(de::Error::custom(format!(
                "jsonrpc version must be \"2.0\", got {raw:?}"
            )))
        }
    }
}

/// Request identifier. The protocol allows numbers and strings.
///
/// An absent id marks the request as best-effort; a present id obliges
/// exactly one matching response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

/// Incoming request envelope.
///
/// Built by [`crate::codec::decode_request`]; `params` member types are not
/// validated here — domain-level parameter errors are the provider's job.
#[derive(Clone, Debug, Serialize)]
pub struct RpcRequest {
    /// Protocol version (always `"2.0"` on the wire).
    #[serde(rename = "jsonrpc")]
    pub version: Version,
    /// Request id, absent for best-effort requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Method name (e.g. `eth_blockNumber`).
    pub method: String,
    /// Positional parameters, passed to the provider verbatim.
    pub params: Vec<Value>,
}

impl RpcRequest {
    /// Build a request envelope.
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            version: Version,
            id,
            method: method.into(),
            params,
        }
    }
}

/// Error member of a response envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Machine-readable error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details (e.g. `{"txHash": ...}`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outgoing response envelope.
///
/// The two legal shapes carry exactly one of `result` / `error` — never both,
/// never neither. [`Self::is_valid`] checks that; the response validator
/// enforces it immediately before anything is transmitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version (always `"2.0"` on the wire).
    #[serde(rename = "jsonrpc")]
    pub version: Version,
    /// Echoed request id, or `null` when the request could not be trusted.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Result payload (success shape).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (failure shape).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            version: Version,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            version: Version,
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the envelope has one of the two legal shapes.
    pub fn is_valid(&self) -> bool {
        self.result.is_some() != self.error.is_some()
    }

    /// Whether this is the success shape.
    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }
}

/// Server-pushed subscription notification frame (`eth_subscription`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionFrame {
    /// Protocol version (always `"2.0"` on the wire).
    #[serde(rename = "jsonrpc")]
    pub version: Version,
    /// Always `"eth_subscription"`.
    pub method: String,
    /// Subscription id plus payload.
    pub params: SubscriptionParams,
}

/// Params member of a subscription notification frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionParams {
    /// The provider-assigned subscription id.
    pub subscription: String,
    /// The pushed payload.
    pub result: Value,
}

impl SubscriptionFrame {
    /// Build a notification frame for an active subscription.
    pub fn new(subscription: impl Into<String>, result: Value) -> Self {
        Self {
            version: Version,
            method: "eth_subscription".into(),
            params: SubscriptionParams {
                subscription: subscription.into(),
                result,
            },
        }
    }
}
