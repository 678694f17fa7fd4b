//! Typed domain errors reported by a provider.

use serde_json::Value;

use cinder_rpc::errors::{self, RpcError};

/// Error returned by a provider's `request` call.
///
/// `code` belongs to the provider's taxonomy and is forwarded to clients
/// unchanged; the reserved transport codes live in [`cinder_rpc::errors`]
/// and must not be reused for provider-specific failures other than the
/// standard method/params ones below.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Machine-readable error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    pub data: Option<Value>,
    /// Hash of the transaction the failure relates to, if any. Surfaces to
    /// clients as `error.data.txHash`.
    pub transaction_hash: Option<String>,
}

impl ProviderError {
    /// Build a domain error with an arbitrary provider-owned code.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            transaction_hash: None,
        }
    }

    /// The requested method does not exist on this provider.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            errors::METHOD_NOT_FOUND,
            format!("Method {method} not found"),
        )
    }

    /// The method exists but the parameters were rejected.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(errors::INVALID_PARAMS, message)
    }

    /// Unexpected provider-side failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(errors::INTERNAL_ERROR, message)
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the related transaction hash.
    #[must_use]
    pub fn with_transaction_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(tx_hash.into());
        self
    }
}

impl From<ProviderError> for RpcError {
    fn from(err: ProviderError) -> Self {
        Self::Domain {
            code: err.code,
            message: err.message,
            data: err.data,
            transaction_hash: err.transaction_hash,
        }
    }
}
