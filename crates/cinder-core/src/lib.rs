//! # cinder-core
//!
//! The execution provider contract consumed by the Cinder transport layer.
//!
//! The transport never implements RPC method semantics itself; it drives a
//! [`Provider`] — an execution backend answering `request(method, params)`
//! calls — and listens to its [`NotificationHub`] for subscription pushes.
//! This crate defines that seam: the trait, the typed domain error, and the
//! explicit publish/subscribe channel for notifications.

#![deny(unsafe_code)]

pub mod error;
pub mod notification;
pub mod provider;

pub use error::ProviderError;
pub use notification::{NotificationHub, ProviderNotification};
pub use provider::Provider;
