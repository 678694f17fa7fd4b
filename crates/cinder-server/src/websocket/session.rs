//! WebSocket session lifecycle — one connected client from upgrade through
//! disconnect.
//!
//! Inbound frames dispatch in independent tasks, so responses to overlapping
//! requests may be sent in any order (batch position alignment is an HTTP
//! concern; it is not claimed between distinct frames). The session also
//! runs the connection's provider-notification listener and the close
//! procedure: detach listener, mark closed, fire-and-forget unsubscribes.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use cinder_core::{Provider, ProviderNotification};
use cinder_rpc::codec::{decode_request, parse_payload, recover_id, RpcPayload};
use cinder_rpc::errors::RpcError;
use cinder_rpc::types::{RpcResponse, SubscriptionFrame};
use cinder_rpc::validation::finalize_response;

use crate::dispatch::dispatch_request;
use crate::server::AppState;

use super::connection::WsConnection;

/// GET upgrade handler.
pub(crate) async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let client_id = Uuid::now_v7().to_string();
    ws.on_upgrade(move |socket| run_ws_session(socket, client_id, state))
}

/// Run a WebSocket session for a connected client.
///
/// 1. Attaches the provider notification listener for this connection
/// 2. Dispatches each inbound frame in its own task
/// 3. On disconnect: detaches the listener, closes the subscription
///    registry, and issues best-effort `eth_unsubscribe` cleanup
#[instrument(skip_all, fields(client_id = %client_id))]
pub(crate) async fn run_ws_session(ws: WebSocket, client_id: String, state: AppState) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(state.config.ws_channel_capacity);
    let conn = Arc::new(WsConnection::new(client_id.clone(), send_tx));

    let _ = state.connections.fetch_add(1, Ordering::Relaxed);
    info!("client connected");

    // One listener per connection, alive exactly as long as the session.
    let listener = tokio::spawn(notification_listener(
        state.provider.notifications(),
        conn.clone(),
    ));

    // Single socket writer, fed by the bounded outbound channel.
    let outbound = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_rx.next().await {
        let text = match message {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    debug!("ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        // Frames dispatch concurrently; an in-flight result for a closed
        // connection fails the send and is discarded there.
        let provider = state.provider.clone();
        let task_conn = conn.clone();
        drop(tokio::spawn(async move {
            handle_frame(&text, provider.as_ref(), &task_conn).await;
        }));
    }

    // Close procedure. Listener first: no further notifications are even
    // considered. Then the registry flips closed and hands back whatever
    // was still tracked for provider-side cleanup.
    listener.abort();
    let orphaned = conn.subscriptions.close();
    for subscription in orphaned {
        let provider = state.provider.clone();
        // Best-effort: no retry, the outcome is not awaited, failures only
        // logged — the client is already gone.
        drop(tokio::spawn(async move {
            if let Err(err) = provider
                .request("eth_unsubscribe", vec![Value::String(subscription.clone())])
                .await
            {
                debug!(subscription, %err, "unsubscribe cleanup failed");
            }
        }));
    }
    outbound.abort();

    let _ = state.connections.fetch_sub(1, Ordering::Relaxed);
    info!(drop_count = conn.drop_count(), "client disconnected");
}

/// Handle one inbound frame: decode, dispatch, track subscriptions, reply.
///
/// This transport carries one JSON object per frame; a batch array is
/// answered with an invalid-request envelope.
pub(crate) async fn handle_frame(text: &str, provider: &dyn Provider, conn: &WsConnection) {
    let raw = match parse_payload(text) {
        Ok(RpcPayload::Single(raw)) => raw,
        Ok(RpcPayload::Batch(_)) => {
            let err = RpcError::invalid_request("batch requests are not supported over WebSocket");
            send_response(conn, finalize_response(err.to_response(None), None));
            return;
        }
        Err(err) => {
            debug!(%err, "rejecting unparseable frame");
            send_response(conn, finalize_response(err.to_response(None), None));
            return;
        }
    };

    let request = match decode_request(&raw) {
        Ok(request) => request,
        Err(err) => {
            let id = recover_id(&raw);
            debug!(%err, "rejecting malformed frame");
            send_response(conn, finalize_response(err.to_response(id.clone()), id));
            return;
        }
    };

    let method = request.method.clone();
    let params = request.params.clone();
    let response = dispatch_request(request, provider).await;

    // Registry bookkeeping happens before the response leaves, so an
    // explicit unsubscribe is observed no later than its own response.
    if response.is_success() {
        match method.as_str() {
            "eth_subscribe" => {
                if let Some(subscription) = response.result.as_ref().and_then(Value::as_str) {
                    if conn.subscriptions.track(subscription) {
                        debug!(subscription, "subscription tracked");
                    } else {
                        // The connection closed while the subscribe was in
                        // flight; the reply still goes out best-effort but
                        // no notification can follow.
                        debug!(subscription, "subscribe completed after close");
                    }
                }
            }
            "eth_unsubscribe" => {
                if let Some(subscription) = params.first().and_then(Value::as_str) {
                    if conn.subscriptions.untrack(subscription) {
                        debug!(subscription, "subscription removed");
                    }
                }
            }
            _ => {}
        }
    }

    send_response(conn, response);
}

/// Forward provider notifications the connection owns.
///
/// Exits when the provider drops its notification channel or the task is
/// aborted by the close procedure.
async fn notification_listener(
    mut rx: broadcast::Receiver<ProviderNotification>,
    conn: Arc<WsConnection>,
) {
    loop {
        match rx.recv().await {
            Ok(notification) => {
                // Closed-ness is authoritative and checked before
                // membership; other connections' subscriptions fall out of
                // the membership check.
                if !conn.subscriptions.owns(&notification.subscription) {
                    continue;
                }
                let frame =
                    SubscriptionFrame::new(notification.subscription, notification.result);
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if !conn.send(json) {
                            debug!(conn_id = %conn.id, "notification dropped (connection closing or backlogged)");
                        }
                    }
                    Err(err) => warn!(%err, "failed to serialize notification"),
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(conn_id = %conn.id, skipped, "notification listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn send_response(conn: &WsConnection, response: RpcResponse) {
    match serde_json::to_string(&response) {
        Ok(json) => {
            if !conn.send(json) {
                debug!(conn_id = %conn.id, "response dropped (connection closing or backlogged)");
            }
        }
        Err(err) => error!(%err, "failed to serialize response"),
    }
}
