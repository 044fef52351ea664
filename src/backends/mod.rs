//! Concrete backend adapters (spec.md C7). Each module is gated behind the
//! Cargo feature of the same name so a consumer only pulls in the client
//! library it actually needs.

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "relational")]
pub mod relational;

#[cfg(feature = "kv")]
pub mod kv;

#[cfg(feature = "log-backend")]
pub mod log;
