//! Shared types for the automated job-application pipeline
//!
//! Contains the domain model shared between the engine core and any outer
//! API layer: identifiers, queue entry lifecycle types, the job/profile
//! data model, the attempt-failure taxonomy, and tracing setup helpers.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
