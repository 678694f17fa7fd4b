//! HTTP JSON-RPC endpoint.
//!
//! Anything that reaches the dispatcher answers HTTP 200 with a JSON-RPC
//! outcome in the body — transport status never signals RPC errors. The only
//! transport-level rejections are pre-dispatch: an over-limit body (413 from
//! the body-size layer) or a non-UTF-8 body. CORS headers, including the
//! OPTIONS preflight short-circuit, come from the router's `CorsLayer`.

use axum::extract::State;
use axum::Json;
use tracing::debug;

use cinder_rpc::codec::parse_payload;
use cinder_rpc::validation::finalize_response;

use crate::dispatch::{dispatch_payload, ResponsePayload};
use crate::server::AppState;

/// POST handler: single request or batch, always answered in-body.
pub(crate) async fn http_rpc(
    State(state): State<AppState>,
    body: String,
) -> Json<ResponsePayload> {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(err) => {
            debug!(%err, "rejecting unparseable body");
            return Json(ResponsePayload::Single(finalize_response(
                err.to_response(None),
                None,
            )));
        }
    };

    Json(dispatch_payload(payload, state.provider.as_ref()).await)
}
