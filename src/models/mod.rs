//! Data models for the i-doit JSON-RPC API.
//!
//! This module contains the request/response envelopes and the typed
//! results of the namespace wrappers.

mod common;
mod idoit;
mod object;
mod rpc;

pub use idoit::*;
pub use object::*;
pub use rpc::*;
