//! # Trace Core
//!
//! Causal trees of blockchain transactions ("traces") and the per-account
//! annotations collected for them.
//!
//! This crate provides the trace data model, read-only analyses over it,
//! batched collection of additional info from an external source, and the
//! merge that carries collected info over to a freshly rebuilt trace.

pub mod account;
pub mod annotation;
pub mod enrichment;
pub mod error;
pub mod interfaces;
pub mod merge;
pub mod models;
pub mod trace;

pub use account::*;
pub use annotation::*;
pub use enrichment::*;
pub use error::*;
pub use interfaces::*;
pub use merge::*;
pub use models::*;
pub use trace::*;
