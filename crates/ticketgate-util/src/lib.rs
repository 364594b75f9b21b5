//! Shared utilities for ticketgate
//!
//! This crate provides:
//! - ID types (ProjectKey, IssueKey, UserId, CommandName)
//! - Time utilities (mock-able clock, timestamp parsing, duration labels)
//! - Error types
//! - Comma-separated list parsing
//! - Default paths for the settings file

mod error;
mod ids;
mod list;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use list::*;
pub use paths::*;
pub use time::*;
