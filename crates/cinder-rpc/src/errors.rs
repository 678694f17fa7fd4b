//! Error taxonomy and normalization into wire error objects.

use serde_json::{json, Value};

use crate::types::{ErrorObject, RequestId, RpcResponse};

// ── Reserved transport-level codes (JSON-RPC 2.0) ───────────────────

/// Body was not valid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Valid JSON with the wrong envelope shape.
pub const INVALID_REQUEST: i64 = -32600;
/// Method does not exist on the provider.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Parameters rejected by the provider.
pub const INVALID_PARAMS: i64 = -32602;
/// Any other failure, including malformed provider responses.
pub const INTERNAL_ERROR: i64 = -32603;

/// Any failure raised on the dispatch path, funneled through one taxonomy.
///
/// Provider-reported errors keep their own code and message; everything
/// else collapses into the reserved transport codes. The normalizer
/// ([`Self::to_error_object`]) is a pure mapping, so failure paths are
/// testable without triggering real transport faults.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RpcError {
    /// The body was not valid JSON; nothing further can be assumed.
    #[error("Parse error: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// Valid JSON, but not a request envelope.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the shape.
        message: String,
    },

    /// Provider-reported domain error, forwarded unchanged.
    #[error("{message}")]
    Domain {
        /// Provider-owned error code.
        code: i64,
        /// Provider-owned message.
        message: String,
        /// Optional structured details.
        data: Option<Value>,
        /// Transaction the failure relates to, surfaced as `data.txHash`.
        transaction_hash: Option<String>,
    },

    /// Anything else. The context stays in logs and is never sent verbatim.
    #[error("Internal error: {context}")]
    Internal {
        /// Diagnostic context, for logging only.
        context: String,
    },
}

impl RpcError {
    /// Parse-error constructor.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Invalid-request constructor.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Internal-error constructor.
    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
        }
    }

    /// The wire error code for this failure.
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse { .. } => PARSE_ERROR,
            Self::InvalidRequest { .. } => INVALID_REQUEST,
            Self::Domain { code, .. } => *code,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Normalize into the wire error object.
    ///
    /// Domain errors forward code and message as-is, attaching the
    /// transaction hash under `data.txHash` when one is carried. Internal
    /// errors emit a generic message; the context is a log-only detail.
    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            Self::Parse { .. } | Self::InvalidRequest { .. } => ErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: None,
            },
            Self::Domain {
                code,
                message,
                data,
                transaction_hash,
            } => {
                let data = match transaction_hash {
                    Some(tx_hash) => Some(json!({ "txHash": tx_hash })),
                    None => data.clone(),
                };
                ErrorObject {
                    code: *code,
                    message: message.clone(),
                    data,
                }
            }
            Self::Internal { .. } => ErrorObject {
                code: INTERNAL_ERROR,
                message: "Internal error".into(),
                data: None,
            },
        }
    }

    /// Build the error response envelope for this failure.
    pub fn to_response(&self, id: Option<RequestId>) -> RpcResponse {
        RpcResponse::failure(id, self.to_error_object())
    }
}
