//! # cinder-rpc
//!
//! JSON-RPC 2.0 wire protocol for the Cinder gateway.
//!
//! - Envelope types (`RpcRequest`, `RpcResponse`, `ErrorObject`) tagged at
//!   the protocol boundary
//! - Codec: raw text → single request or batch, with strict shape checks
//! - Error taxonomy covering the reserved transport codes plus forwarded
//!   provider errors
//! - Terminal response validation so no malformed envelope reaches the wire
//!
//! This crate is pure protocol: no I/O, no runtime.

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod types;
pub mod validation;

pub use codec::{decode_request, parse_payload, recover_id, RpcPayload};
pub use errors::RpcError;
pub use types::{ErrorObject, RequestId, RpcRequest, RpcResponse};
pub use validation::finalize_response;
