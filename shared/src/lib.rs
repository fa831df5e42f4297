//! Shared types for the self-improving content optimization system
//!
//! Contains the domain entities exchanged between the generator and the
//! engine, the shared error type and the tracing setup used by every binary.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
