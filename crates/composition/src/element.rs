//! Timeline elements and the shared-ownership handle that holds them.
//!
//! Every node that can be placed inside a [`Composition`] — a media clip, a
//! gap, a transition, or a nested composition — is owned through an
//! [`ElementHandle`], a reference-counted handle. Cloning a handle retains
//! the element, dropping one releases it, and the element is destroyed with
//! its last handle. Handle equality and hashing are by *identity* (two
//! handles are equal only when they point at the same element), which is
//! what makes the membership index and `range_of_all_children` maps work.
//!
//! Each element keeps a weak back-reference to its owning composition. The
//! back-reference never keeps anything alive; it is set on insertion and
//! cleared on removal by the mutation operations in
//! [`Composition`](crate::Composition).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use cutlist_common::{RationalTime, TimeRange};

use crate::composition::Composition;

/// Run-time type tag for the closed set of element kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Clip,
    Gap,
    Transition,
    Composition,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ElementKind::Clip => "clip",
            ElementKind::Gap => "gap",
            ElementKind::Transition => "transition",
            ElementKind::Composition => "composition",
        };
        write!(f, "{label}")
    }
}

/// A reference to a piece of media.
///
/// `available_range` is the full extent of the underlying media;
/// `source_range`, when set, trims the clip to a window inside it. The
/// slack between the two is what [`Composition::handles_of_child`]
/// reports to transition handling.
#[derive(Debug)]
pub struct Clip {
    name: String,
    available_range: TimeRange,
    source_range: Cell<Option<TimeRange>>,
    parent: RefCell<Weak<Composition>>,
}

impl Clip {
    pub fn new(
        name: impl Into<String>,
        available_range: TimeRange,
        source_range: Option<TimeRange>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            available_range,
            source_range: Cell::new(source_range),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_range(&self) -> TimeRange {
        self.available_range
    }

    pub fn source_range(&self) -> Option<TimeRange> {
        self.source_range.get()
    }

    /// Re-trim the clip. Resizes every ancestor, so their placement caches
    /// are invalidated.
    pub fn set_source_range(&self, range: Option<TimeRange>) {
        self.source_range.set(range);
        if let Some(parent) = self.parent() {
            parent.invalidate_placement();
        }
    }

    /// The clip's active window: `source_range` if set, else the full
    /// `available_range`.
    pub fn trimmed_range(&self) -> TimeRange {
        self.source_range.get().unwrap_or(self.available_range)
    }

    pub fn duration(&self) -> RationalTime {
        self.trimmed_range().duration
    }

    pub fn parent(&self) -> Option<Rc<Composition>> {
        self.parent.borrow().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: &Rc<Composition>) {
        self.parent.replace(Rc::downgrade(parent));
    }

    pub(crate) fn clear_parent(&self) {
        self.parent.replace(Weak::new());
    }
}

/// Empty space in a sequence. Occupies time, references no media.
#[derive(Debug)]
pub struct Gap {
    name: String,
    duration: Cell<RationalTime>,
    parent: RefCell<Weak<Composition>>,
}

impl Gap {
    pub fn new(name: impl Into<String>, duration: RationalTime) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            duration: Cell::new(duration),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> RationalTime {
        self.duration.get()
    }

    pub fn set_duration(&self, duration: RationalTime) {
        self.duration.set(duration);
        if let Some(parent) = self.parent() {
            parent.invalidate_placement();
        }
    }

    pub fn trimmed_range(&self) -> TimeRange {
        TimeRange::new(RationalTime::ZERO, self.duration.get())
    }

    pub fn parent(&self) -> Option<Rc<Composition>> {
        self.parent.borrow().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: &Rc<Composition>) {
        self.parent.replace(Rc::downgrade(parent));
    }

    pub(crate) fn clear_parent(&self) {
        self.parent.replace(Weak::new());
    }
}

/// A cut-point effect overlapping its sequential neighbours.
///
/// A transition occupies zero width in prefix-sum placement; its placed
/// range reaches `in_offset` back into the preceding element and
/// `out_offset` into the following one. Offsets must not exceed the
/// neighbouring durations, or the sequence's placed ranges stop being
/// monotonic (the same construction-side contract the bisection engine
/// relies on).
#[derive(Debug)]
pub struct Transition {
    name: String,
    in_offset: Cell<RationalTime>,
    out_offset: Cell<RationalTime>,
    parent: RefCell<Weak<Composition>>,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        in_offset: RationalTime,
        out_offset: RationalTime,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            in_offset: Cell::new(in_offset),
            out_offset: Cell::new(out_offset),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_offset(&self) -> RationalTime {
        self.in_offset.get()
    }

    pub fn out_offset(&self) -> RationalTime {
        self.out_offset.get()
    }

    pub fn set_offsets(&self, in_offset: RationalTime, out_offset: RationalTime) {
        self.in_offset.set(in_offset);
        self.out_offset.set(out_offset);
        if let Some(parent) = self.parent() {
            parent.invalidate_placement();
        }
    }

    /// The transition's local window, spanning its whole overlap.
    pub fn trimmed_range(&self) -> TimeRange {
        TimeRange::new(RationalTime::ZERO, self.in_offset.get() + self.out_offset.get())
    }

    pub fn parent(&self) -> Option<Rc<Composition>> {
        self.parent.borrow().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: &Rc<Composition>) {
        self.parent.replace(Rc::downgrade(parent));
    }

    pub(crate) fn clear_parent(&self) {
        self.parent.replace(Weak::new());
    }
}

/// Shared-ownership handle to any element.
///
/// This is the only way elements are held inside a composition or returned
/// from queries, so an element removed from a tree stays alive for as long
/// as any in-flight query result still references it.
#[derive(Clone)]
pub enum ElementHandle {
    Clip(Rc<Clip>),
    Gap(Rc<Gap>),
    Transition(Rc<Transition>),
    Composition(Rc<Composition>),
}

impl ElementHandle {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementHandle::Clip(_) => ElementKind::Clip,
            ElementHandle::Gap(_) => ElementKind::Gap,
            ElementHandle::Transition(_) => ElementKind::Transition,
            ElementHandle::Composition(_) => ElementKind::Composition,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ElementHandle::Clip(c) => c.name(),
            ElementHandle::Gap(g) => g.name(),
            ElementHandle::Transition(t) => t.name(),
            ElementHandle::Composition(c) => c.name(),
        }
    }

    /// The composition currently owning this element, if any.
    pub fn parent(&self) -> Option<Rc<Composition>> {
        match self {
            ElementHandle::Clip(c) => c.parent(),
            ElementHandle::Gap(g) => g.parent(),
            ElementHandle::Transition(t) => t.parent(),
            ElementHandle::Composition(c) => c.parent(),
        }
    }

    /// Checked cast used by recursive search.
    pub fn as_composition(&self) -> Option<&Rc<Composition>> {
        match self {
            ElementHandle::Composition(c) => Some(c),
            _ => None,
        }
    }

    /// The element's full untrimmed extent in its own local space.
    pub fn available_range(&self) -> TimeRange {
        match self {
            ElementHandle::Clip(c) => c.available_range(),
            ElementHandle::Gap(g) => g.trimmed_range(),
            ElementHandle::Transition(t) => t.trimmed_range(),
            ElementHandle::Composition(c) => c.available_range(),
        }
    }

    /// The element's active window in its own local space.
    pub fn trimmed_range(&self) -> TimeRange {
        match self {
            ElementHandle::Clip(c) => c.trimmed_range(),
            ElementHandle::Gap(g) => g.trimmed_range(),
            ElementHandle::Transition(t) => t.trimmed_range(),
            ElementHandle::Composition(c) => c.trimmed_range(),
        }
    }

    pub fn duration(&self) -> RationalTime {
        self.trimmed_range().duration
    }

    pub(crate) fn set_parent(&self, parent: &Rc<Composition>) {
        match self {
            ElementHandle::Clip(c) => c.set_parent(parent),
            ElementHandle::Gap(g) => g.set_parent(parent),
            ElementHandle::Transition(t) => t.set_parent(parent),
            ElementHandle::Composition(c) => c.set_parent(parent),
        }
    }

    pub(crate) fn clear_parent(&self) {
        match self {
            ElementHandle::Clip(c) => c.clear_parent(),
            ElementHandle::Gap(g) => g.clear_parent(),
            ElementHandle::Transition(t) => t.clear_parent(),
            ElementHandle::Composition(c) => c.clear_parent(),
        }
    }

    /// Stable identity key. Distinct live elements never share an address.
    fn identity(&self) -> usize {
        match self {
            ElementHandle::Clip(c) => Rc::as_ptr(c) as usize,
            ElementHandle::Gap(g) => Rc::as_ptr(g) as usize,
            ElementHandle::Transition(t) => Rc::as_ptr(t) as usize,
            ElementHandle::Composition(c) => Rc::as_ptr(c) as usize,
        }
    }
}

impl PartialEq for ElementHandle {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ElementHandle {}

impl Hash for ElementHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}('{}')", self.kind(), self.name())
    }
}

impl From<Rc<Clip>> for ElementHandle {
    fn from(clip: Rc<Clip>) -> Self {
        ElementHandle::Clip(clip)
    }
}

impl From<Rc<Gap>> for ElementHandle {
    fn from(gap: Rc<Gap>) -> Self {
        ElementHandle::Gap(gap)
    }
}

impl From<Rc<Transition>> for ElementHandle {
    fn from(transition: Rc<Transition>) -> Self {
        ElementHandle::Transition(transition)
    }
}

impl From<Rc<Composition>> for ElementHandle {
    fn from(composition: Rc<Composition>) -> Self {
        ElementHandle::Composition(composition)
    }
}
