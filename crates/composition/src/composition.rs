//! The composition container: an ordered, owning sequence of elements.
//!
//! A `Composition` owns its children through [`ElementHandle`]s and keeps a
//! membership index (element identity → position) in lockstep with the
//! ordered sequence, so containment and position lookups are O(1). Every
//! mutation validates completely before touching any state: a failed call
//! leaves the composition exactly as it was.
//!
//! Compositions nest — a composition is itself an element — and the tree is
//! kept acyclic: inserting a container into its own descendant is rejected.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use cutlist_common::TimeRange;

use crate::element::ElementHandle;
use crate::error::{CompositionError, CompositionResult};

/// How a composition places its children in its own local time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Children are laid end to end in sequence order (prefix-sum
    /// placement). Transitions occupy zero width and overlap their
    /// neighbours.
    Sequence,
    /// Every child starts at time zero, layered over one another.
    Overlay,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Sequence => write!(f, "sequence"),
            Layout::Overlay => write!(f, "overlay"),
        }
    }
}

/// An ordered, owning container of timeline elements.
pub struct Composition {
    name: String,
    layout: Layout,
    source_range: Cell<Option<TimeRange>>,
    pub(crate) children: RefCell<Vec<ElementHandle>>,
    /// Membership index: exactly the current children, keyed by identity,
    /// mapped to their dense zero-based positions.
    child_index: RefCell<HashMap<ElementHandle, usize>>,
    /// Lazily built untrimmed placed range per child; cleared by any
    /// mutation here or below (see `invalidate_placement`).
    pub(crate) placement: RefCell<Option<Rc<Vec<TimeRange>>>>,
    parent: RefCell<Weak<Composition>>,
}

impl Composition {
    /// Create an empty composition.
    pub fn new(
        name: impl Into<String>,
        layout: Layout,
        source_range: Option<TimeRange>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            layout,
            source_range: Cell::new(source_range),
            children: RefCell::new(Vec::new()),
            child_index: RefCell::new(HashMap::new()),
            placement: RefCell::new(None),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn source_range(&self) -> Option<TimeRange> {
        self.source_range.get()
    }

    /// Change the trim window. Resizes this composition in its ancestors'
    /// coordinate spaces, so their placement caches are invalidated.
    pub fn set_source_range(&self, range: Option<TimeRange>) {
        self.source_range.set(range);
        self.invalidate_placement();
    }

    /// Snapshot of the current child sequence, in order.
    pub fn children(&self) -> Vec<ElementHandle> {
        self.children.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
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

    /// Drop this composition's cached placement, and every ancestor's: a
    /// child's duration change resizes every container above it.
    pub(crate) fn invalidate_placement(&self) {
        self.placement.replace(None);
        let mut cursor = self.parent();
        while let Some(ancestor) = cursor {
            ancestor.placement.replace(None);
            cursor = ancestor.parent();
        }
    }

    /// Replace the entire child sequence.
    ///
    /// Fails without changing anything if the list names the same element
    /// twice, if any candidate belongs to a *different* composition
    /// (candidates already owned here may be re-listed, so `set_children`
    /// can reorder), or if any candidate is this composition or one of its
    /// ancestors.
    pub fn set_children(self: &Rc<Self>, children: Vec<ElementHandle>) -> CompositionResult<()> {
        let mut seen = HashSet::with_capacity(children.len());
        for child in &children {
            if !seen.insert(child.clone()) {
                return Err(CompositionError::DuplicateChild {
                    child: child.name().to_string(),
                });
            }
            if let Some(owner) = child.parent() {
                if !Rc::ptr_eq(&owner, self) {
                    return Err(CompositionError::ChildAlreadyParented {
                        child: child.name().to_string(),
                    });
                }
            }
            self.check_acyclic(child)?;
        }

        let old = std::mem::take(&mut *self.children.borrow_mut());
        for child in &old {
            child.clear_parent();
        }
        for child in &children {
            child.set_parent(self);
        }
        *self.children.borrow_mut() = children;
        self.reindex();
        self.invalidate_placement();
        Ok(())
    }

    /// Insert `child` at `index`, shifting later children up one position.
    ///
    /// `index` may be anywhere in `[0, len]`. The element must be detached
    /// (no owning composition) and must not be an ancestor of this one.
    pub fn insert_child(
        self: &Rc<Self>,
        index: usize,
        child: ElementHandle,
    ) -> CompositionResult<()> {
        let len = self.len();
        if index > len {
            return Err(CompositionError::IndexOutOfBounds { index, len });
        }
        self.check_detached(&child)?;
        self.check_acyclic(&child)?;

        child.set_parent(self);
        self.children.borrow_mut().insert(index, child);
        self.reindex();
        self.invalidate_placement();
        Ok(())
    }

    /// Append `child` after the last current child.
    pub fn append_child(self: &Rc<Self>, child: ElementHandle) -> CompositionResult<()> {
        self.insert_child(self.len(), child)
    }

    /// Replace the child at `index`, detaching the element previously there.
    pub fn set_child(
        self: &Rc<Self>,
        index: usize,
        child: ElementHandle,
    ) -> CompositionResult<()> {
        let len = self.len();
        if index >= len {
            return Err(CompositionError::IndexOutOfBounds { index, len });
        }
        self.check_detached(&child)?;
        self.check_acyclic(&child)?;

        let replaced = self.children.borrow()[index].clone();
        replaced.clear_parent();
        child.set_parent(self);
        self.children.borrow_mut()[index] = child;
        self.reindex();
        self.invalidate_placement();
        Ok(())
    }

    /// Remove and detach the child at `index`, compacting the sequence.
    pub fn remove_child(&self, index: usize) -> CompositionResult<()> {
        let len = self.len();
        if index >= len {
            return Err(CompositionError::IndexOutOfBounds { index, len });
        }
        let removed = self.children.borrow_mut().remove(index);
        removed.clear_parent();
        self.reindex();
        self.invalidate_placement();
        Ok(())
    }

    /// Remove and detach every child. Idempotent, never fails.
    pub fn clear_children(&self) {
        let old = std::mem::take(&mut *self.children.borrow_mut());
        for child in &old {
            child.clear_parent();
        }
        self.child_index.borrow_mut().clear();
        self.invalidate_placement();
    }

    /// Position of a direct child, or `None` if `child` is not one.
    pub fn index_of_child(&self, child: &ElementHandle) -> Option<usize> {
        self.child_index.borrow().get(child).copied()
    }

    /// O(1) direct-containment test.
    pub fn has_child(&self, child: &ElementHandle) -> bool {
        self.child_index.borrow().contains_key(child)
    }

    /// Ancestry test: walks `element`'s back-references up to the root.
    pub fn is_parent_of(&self, element: &ElementHandle) -> bool {
        let mut cursor = element.parent();
        while let Some(ancestor) = cursor {
            if std::ptr::eq(Rc::as_ptr(&ancestor), self) {
                return true;
            }
            cursor = ancestor.parent();
        }
        false
    }

    /// True if any clip exists anywhere below this composition.
    pub fn has_clips(&self) -> bool {
        for child in self.children.borrow().iter() {
            match child {
                ElementHandle::Clip(_) => return true,
                ElementHandle::Composition(comp) if comp.has_clips() => return true,
                _ => {}
            }
        }
        false
    }

    /// The chain of containers from `child`'s immediate parent up to (and
    /// including) this composition. Fails if the walk never reaches here.
    pub(crate) fn path_from_child(
        &self,
        child: &ElementHandle,
    ) -> CompositionResult<Vec<Rc<Composition>>> {
        let not_a_child = || CompositionError::NotAChild {
            child: child.name().to_string(),
            parent: self.name.clone(),
        };

        let mut path = Vec::new();
        let mut cursor = child.parent().ok_or_else(not_a_child)?;
        loop {
            let reached_self = std::ptr::eq(Rc::as_ptr(&cursor), self);
            let next = cursor.parent();
            path.push(cursor);
            if reached_self {
                return Ok(path);
            }
            cursor = next.ok_or_else(not_a_child)?;
        }
    }

    fn check_detached(&self, child: &ElementHandle) -> CompositionResult<()> {
        if child.parent().is_some() {
            return Err(CompositionError::ChildAlreadyParented {
                child: child.name().to_string(),
            });
        }
        Ok(())
    }

    /// Reject inserting this composition, or any of its ancestors, below
    /// itself.
    fn check_acyclic(self: &Rc<Self>, child: &ElementHandle) -> CompositionResult<()> {
        let Some(candidate) = child.as_composition() else {
            return Ok(());
        };
        let mut cursor = Some(self.clone());
        while let Some(ancestor) = cursor {
            if Rc::ptr_eq(&ancestor, candidate) {
                return Err(CompositionError::WouldFormCycle {
                    child: candidate.name().to_string(),
                });
            }
            cursor = ancestor.parent();
        }
        Ok(())
    }

    /// Rebuild the membership index from the child sequence.
    fn reindex(&self) {
        let children = self.children.borrow();
        let mut index = self.child_index.borrow_mut();
        index.clear();
        for (position, child) in children.iter().enumerate() {
            index.insert(child.clone(), position);
        }
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("children", &self.children.borrow().len())
            .finish()
    }
}
