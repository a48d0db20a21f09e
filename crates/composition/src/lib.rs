//! `cutlist-composition` — Composition tree core for the Cutlist timeline engine.
//!
//! This crate implements the timeline data model: a tree of time-ordered
//! elements where every container can answer "what is at time T?" and "what
//! occupies range R?" in better than linear time. It handles:
//!
//! - **Ownership**: elements are held through reference-counted
//!   [`ElementHandle`]s; each element belongs to at most one composition,
//!   tracked by a weak back-reference
//! - **Mutation**: insert/remove/replace operations that keep the ordered
//!   sequence and the O(1) membership index consistent, all-or-nothing
//! - **Placement**: per-layout time-range computation (sequential
//!   prefix-sum or overlay), trim windows, transition overlap, media handles
//! - **Search**: a generalized bisection engine, point and range queries,
//!   and recursive kind-filtered search across nested compositions
//!
//! # Usage
//!
//! ```rust
//! use cutlist_common::{RationalTime, TimeRange};
//! use cutlist_composition::{Clip, Composition, Layout};
//!
//! let track = Composition::new("V1", Layout::Sequence, None);
//! for (name, frames) in [("a", 10), ("b", 5), ("c", 10)] {
//!     let media = TimeRange::new(RationalTime::ZERO, RationalTime::from_frames(frames, 24));
//!     track.append_child(Clip::new(name, media, None).into()).unwrap();
//! }
//!
//! let hit = track
//!     .child_at_time(RationalTime::from_frames(12, 24), true)
//!     .unwrap();
//! assert_eq!(hit.map(|c| c.name().to_string()), Some("b".into()));
//! ```

pub mod composition;
pub mod element;
pub mod error;

mod range;
mod search;

// Re-export primary API
pub use composition::{Composition, Layout};
pub use element::{Clip, ElementHandle, ElementKind, Gap, Transition};
pub use error::{CompositionError, CompositionResult};
