//! Domain types shared by the ticketgate crates
//!
//! This crate defines the values exchanged with the surrounding command layer:
//! - Tracker records and change history (as already parsed from the tracker)
//! - Outbound search queries
//! - Access decisions and deny reasons
//! - Per-state duration tallies

mod decision;
mod query;
mod statistics;
mod types;

pub use decision::*;
pub use query::*;
pub use statistics::*;
pub use types::*;
