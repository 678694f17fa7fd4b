//! Terminal response validation.
//!
//! Every response — single or per batch item — passes through
//! [`finalize_response`] immediately before transmission. It is the last
//! line of defense: whatever a provider or an upstream bug produced, the
//! wire only ever sees a well-formed envelope.

use tracing::error;

use crate::errors::RpcError;
use crate::types::{RequestId, RpcResponse};

/// Stamp the request id onto a response and guarantee a legal shape.
///
/// The inbound request's id always wins over anything a provider produced
/// (`None` serializes as `null` for untrusted or best-effort requests). A
/// response failing the result-XOR-error check is discarded and replaced
/// with an internal error carrying the best-known id.
pub fn finalize_response(mut response: RpcResponse, id: Option<RequestId>) -> RpcResponse {
    response.id = id.clone();
    if response.is_valid() {
        response
    } else {
        error!(
            has_result = response.result.is_some(),
            has_error = response.error.is_some(),
            "discarding malformed response envelope"
        );
        RpcError::internal("malformed response envelope").to_response(id)
    }
}
