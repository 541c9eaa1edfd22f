//! Thin typed wrappers over [`ApiClient`](crate::client::ApiClient).
//!
//! Each wrapper borrows the client mutably and marshals parameters for one
//! i-doit namespace; all framing, authentication and error handling stays in
//! the client.

mod cmdb_object;
mod idoit;

pub use cmdb_object::*;
pub use idoit::*;
