//! Request dispatch — single requests and concurrent batch fan-out.
//!
//! Every failure mode (bad shape, provider error, malformed envelope) is
//! converted into a response envelope here; nothing propagates out of a
//! dispatch call unhandled. Each response passes through the terminal
//! validation backstop before it is returned.

use cinder_core::Provider;
use cinder_rpc::codec::{decode_request, recover_id, RpcPayload};
use cinder_rpc::errors::RpcError;
use cinder_rpc::types::{RpcRequest, RpcResponse};
use cinder_rpc::validation::finalize_response;
use futures::future;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Response payload mirroring the inbound shape.
///
/// A batch of N requests always yields a batch of N responses, positionally
/// aligned to the input. An empty inbound batch collapses to a single
/// invalid-request envelope so the caller never sees an ambiguous `[]`.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// One response envelope.
    Single(RpcResponse),
    /// One envelope per batch item, in input order.
    Batch(Vec<RpcResponse>),
}

/// Dispatch an already-decoded request to the provider.
///
/// The inbound id always wins over anything produced downstream; it
/// defaults to `null` when the request carried none.
#[instrument(skip_all, fields(method = %request.method))]
pub async fn dispatch_request(request: RpcRequest, provider: &dyn Provider) -> RpcResponse {
    let id = request.id.clone();
    debug!(id = ?id, "dispatching");

    let response = match provider.request(&request.method, request.params).await {
        Ok(result) => RpcResponse::success(id.clone(), result),
        Err(err) => {
            debug!(code = err.code, %err, "provider returned error");
            RpcError::from(err).to_response(id.clone())
        }
    };

    finalize_response(response, id)
}

/// Decode one raw value and dispatch it.
///
/// A shape failure produces an invalid-request envelope (echoing the id
/// when one can be safely recovered) instead of aborting the caller.
pub async fn dispatch_raw(raw: &Value, provider: &dyn Provider) -> RpcResponse {
    match decode_request(raw) {
        Ok(request) => dispatch_request(request, provider).await,
        Err(err) => {
            let id = recover_id(raw);
            debug!(%err, "rejecting malformed request");
            finalize_response(err.to_response(id.clone()), id)
        }
    }
}

/// Dispatch a parsed payload, fanning batches out concurrently.
///
/// Batch items have no ordering dependency between them: all are dispatched
/// at once and the response sequence is reassembled by input position, not
/// completion order. One item's failure never aborts its siblings.
pub async fn dispatch_payload(payload: RpcPayload, provider: &dyn Provider) -> ResponsePayload {
    match payload {
        RpcPayload::Single(raw) => ResponsePayload::Single(dispatch_raw(&raw, provider).await),
        RpcPayload::Batch(items) if items.is_empty() => {
            let err = RpcError::invalid_request("empty batch");
            ResponsePayload::Single(finalize_response(err.to_response(None), None))
        }
        RpcPayload::Batch(items) => {
            let responses =
                future::join_all(items.iter().map(|raw| dispatch_raw(raw, provider))).await;
            ResponsePayload::Batch(responses)
        }
    }
}
