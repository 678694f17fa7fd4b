//! WebSocket endpoint: connection state, subscription tracking, session
//! lifecycle.

pub mod connection;
pub mod session;
pub mod subscriptions;
