//! Core policy engine and time-in-state analytics for ticketgate
//!
//! This crate is the heart of ticketgate, containing:
//! - Policy evaluation (which commands, projects and records are accessible)
//! - A registry of named record filters
//! - Search query narrowing with global filters
//! - Time-in-state statistics reconstructed from a record's change log
//!
//! Nothing here performs I/O. Settings and tracker data are loaded by the
//! caller and passed in.

mod engine;
mod events;
mod filters;
mod statistics;

pub use engine::*;
pub use events::*;
pub use filters::*;
pub use statistics::*;

use thiserror::Error;
use ticketgate_util::ProjectKey;

/// Errors raised when binding a policy document to the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Project '{project}' references unknown filter '{filter}'")]
    UnknownFilter { project: ProjectKey, filter: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
