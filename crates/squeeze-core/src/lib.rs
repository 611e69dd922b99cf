//! Shared data model, TTL cache primitive, and error taxonomy for the squeeze
//! discovery engine. Every other `squeeze-*` crate depends on this one; it
//! carries no provider, gate, or scoring logic of its own.

pub mod cache;
pub mod error;
pub mod types;

pub use cache::TtlCache;
pub use error::{AbsentReason, EngineError};
pub use types::*;
