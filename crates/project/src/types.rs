//! Timeline file schema: plain-data mirrors of the live composition tree.
//!
//! The live tree is reference-counted and interior-mutable, so it is not
//! serialized directly. [`ElementData`] mirrors it by value; decoding
//! rebuilds the tree through the public mutation API, which means a loaded
//! tree satisfies the same ownership invariants as one built by hand.

use serde::{Deserialize, Serialize};

use cutlist_common::{RationalTime, TimeRange};
use cutlist_composition::{Clip, Composition, ElementHandle, Gap, Layout, Transition};

use crate::error::ProjectResult;

/// Current timeline file format version.
pub const CURRENT_VERSION: u64 = 1;

/// Top-level contents of a `.ctl` timeline file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineFile {
    pub version: u64,
    pub name: String,
    pub root: ElementData,
}

impl TimelineFile {
    /// Snapshot an element tree into file data at the current version.
    pub fn new(name: impl Into<String>, root: &ElementHandle) -> Self {
        Self {
            version: CURRENT_VERSION,
            name: name.into(),
            root: ElementData::from_element(root),
        }
    }

    /// Rebuild the live element tree described by this file.
    pub fn build_root(&self) -> ProjectResult<ElementHandle> {
        self.root.build()
    }
}

/// One element of the tree, by value, with children nested inline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementData {
    Clip {
        name: String,
        available_range: TimeRange,
        source_range: Option<TimeRange>,
    },
    Gap {
        name: String,
        duration: RationalTime,
    },
    Transition {
        name: String,
        in_offset: RationalTime,
        out_offset: RationalTime,
    },
    Composition {
        name: String,
        layout: LayoutData,
        source_range: Option<TimeRange>,
        children: Vec<ElementData>,
    },
}

impl ElementData {
    /// Snapshot a live element (and, for compositions, its whole subtree).
    pub fn from_element(element: &ElementHandle) -> Self {
        match element {
            ElementHandle::Clip(clip) => ElementData::Clip {
                name: clip.name().to_string(),
                available_range: clip.available_range(),
                source_range: clip.source_range(),
            },
            ElementHandle::Gap(gap) => ElementData::Gap {
                name: gap.name().to_string(),
                duration: gap.duration(),
            },
            ElementHandle::Transition(transition) => ElementData::Transition {
                name: transition.name().to_string(),
                in_offset: transition.in_offset(),
                out_offset: transition.out_offset(),
            },
            ElementHandle::Composition(composition) => ElementData::Composition {
                name: composition.name().to_string(),
                layout: composition.layout().into(),
                source_range: composition.source_range(),
                children: composition
                    .children()
                    .iter()
                    .map(ElementData::from_element)
                    .collect(),
            },
        }
    }

    /// Rebuild a live element. Children are appended one by one through the
    /// mutation API, so ownership invariants hold by construction.
    pub fn build(&self) -> ProjectResult<ElementHandle> {
        match self {
            ElementData::Clip {
                name,
                available_range,
                source_range,
            } => Ok(Clip::new(name.clone(), *available_range, *source_range).into()),
            ElementData::Gap { name, duration } => Ok(Gap::new(name.clone(), *duration).into()),
            ElementData::Transition {
                name,
                in_offset,
                out_offset,
            } => Ok(Transition::new(name.clone(), *in_offset, *out_offset).into()),
            ElementData::Composition {
                name,
                layout,
                source_range,
                children,
            } => {
                let composition = Composition::new(name.clone(), (*layout).into(), *source_range);
                for child in children {
                    composition.append_child(child.build()?)?;
                }
                Ok(composition.into())
            }
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            ElementData::Clip { .. } => "clip",
            ElementData::Gap { .. } => "gap",
            ElementData::Transition { .. } => "transition",
            ElementData::Composition { .. } => "composition",
        }
    }
}

/// Serialized form of [`Layout`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutData {
    Sequence,
    Overlay,
}

impl From<Layout> for LayoutData {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Sequence => LayoutData::Sequence,
            Layout::Overlay => LayoutData::Overlay,
        }
    }
}

impl From<LayoutData> for Layout {
    fn from(layout: LayoutData) -> Self {
        match layout {
            LayoutData::Sequence => Layout::Sequence,
            LayoutData::Overlay => Layout::Overlay,
        }
    }
}
