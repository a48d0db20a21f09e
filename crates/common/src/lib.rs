//! `cutlist-common` — Shared time value types for the Cutlist timeline engine.
//!
//! This crate is the foundation the other engine crates depend on. It defines
//! the exact time arithmetic everything else is built on:
//!
//! - **`RationalTime`**: an exact `value / rate` point in time (no
//!   floating-point drift in comparisons or arithmetic)
//! - **`TimeRange`**: a half-open `[start, start + duration)` span with
//!   intersection, containment, and overlap tests

pub mod types;

// Re-export commonly used items at crate root
pub use types::{RationalTime, TimeRange};
