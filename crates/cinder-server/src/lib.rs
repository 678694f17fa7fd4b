//! # cinder-server
//!
//! Axum HTTP + `WebSocket` JSON-RPC transport for the Cinder gateway.
//!
//! - HTTP endpoint: single and batch requests over POST, CORS on every
//!   response, preflight short-circuit
//! - `WebSocket` endpoint: per-connection dispatch, subscription tracking,
//!   and push-notification fan-in from the provider
//! - Dispatcher: concurrent batch fan-out reassembled in input order, with
//!   the response-validation backstop before every send
//! - Graceful shutdown via `CancellationToken`
//!
//! Method semantics live behind the [`cinder_core::Provider`] seam; this
//! crate is pure protocol transport.

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, RpcServer, ServerError};
