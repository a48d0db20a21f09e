//! `cutlist-project` — Timeline file save/load for the Cutlist timeline engine.
//!
//! This crate is the persistence boundary of the composition core: it
//! snapshots a live element tree into plain data and back. It supports:
//!
//! - **Save/Load**: serialize/deserialize [`TimelineFile`] to/from JSON,
//!   with atomic file writes
//! - **Version check**: files written by a newer format version are
//!   rejected cleanly before the typed parse
//! - **Rebuild**: decoding reconstructs the tree through the composition
//!   crate's mutation API, so a loaded tree satisfies the same ownership
//!   invariants — and answers the same queries — as the one saved
//!
//! # Usage
//!
//! ```rust,no_run
//! use cutlist_composition::{Composition, ElementHandle, Layout};
//! use cutlist_project::{load_timeline, save_timeline, TimelineFile};
//! use std::path::Path;
//!
//! let track = Composition::new("V1", Layout::Sequence, None);
//! let file = TimelineFile::new("My Cut", &ElementHandle::from(track));
//!
//! save_timeline(&file, Path::new("my_cut.ctl")).unwrap();
//!
//! let loaded = load_timeline(Path::new("my_cut.ctl")).unwrap();
//! let root = loaded.build_root().unwrap();
//! assert_eq!(root.name(), "V1");
//! ```

pub mod error;
pub mod load;
pub mod save;
pub mod types;

// Re-export primary API at crate root
pub use error::{ProjectError, ProjectResult};
pub use load::{from_json_string, load_timeline};
pub use save::{save_timeline, to_json_string, to_json_string_compact};
pub use types::{ElementData, LayoutData, TimelineFile, CURRENT_VERSION};
