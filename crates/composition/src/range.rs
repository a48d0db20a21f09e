//! Time-range computation for composition children.
//!
//! A composition places each child in its own local coordinate space
//! according to its [`Layout`](crate::Layout): sequences concatenate
//! (prefix-sum placement, which is what keeps the placed ranges monotonic
//! for the bisection engine), overlays layer everything at time zero. The
//! placed ranges for a whole composition are computed in one pass and
//! cached; the cache is cleared by any mutation in the subtree, so bulk and
//! per-index queries can never disagree.

use std::collections::HashMap;
use std::rc::Rc;

use cutlist_common::{RationalTime, TimeRange};

use crate::composition::{Composition, Layout};
use crate::element::ElementHandle;
use crate::error::{CompositionError, CompositionResult};

impl Composition {
    /// Untrimmed placed range of every child, in child order. Cached until
    /// the next mutation anywhere in this subtree.
    pub(crate) fn placement_ranges(&self) -> Rc<Vec<TimeRange>> {
        {
            let cached = self.placement.borrow();
            if let Some(ranges) = cached.as_ref() {
                return Rc::clone(ranges);
            }
        }
        let computed = Rc::new(self.compute_placement());
        *self.placement.borrow_mut() = Some(Rc::clone(&computed));
        computed
    }

    fn compute_placement(&self) -> Vec<TimeRange> {
        let children = self.children();
        match self.layout() {
            Layout::Sequence => {
                let mut ranges = Vec::with_capacity(children.len());
                let mut cursor = RationalTime::ZERO;
                for child in &children {
                    if let ElementHandle::Transition(transition) = child {
                        // Transitions occupy no width of their own; they
                        // reach into the neighbours on either side.
                        let start = cursor - transition.in_offset();
                        let duration = transition.in_offset() + transition.out_offset();
                        ranges.push(TimeRange::new(start, duration));
                    } else {
                        let duration = child.duration();
                        ranges.push(TimeRange::new(cursor, duration));
                        cursor = cursor + duration;
                    }
                }
                ranges
            }
            Layout::Overlay => children
                .iter()
                .map(|child| TimeRange::new(RationalTime::ZERO, child.duration()))
                .collect(),
        }
    }

    /// The full extent this composition covers before its own trim is
    /// applied: total child duration for sequences, the longest child for
    /// overlays.
    pub fn available_range(&self) -> TimeRange {
        let children = self.children();
        let mut total = RationalTime::ZERO;
        for child in &children {
            if matches!(child, ElementHandle::Transition(_)) {
                continue;
            }
            match self.layout() {
                Layout::Sequence => total = total + child.duration(),
                Layout::Overlay => total = total.max(child.duration()),
            }
        }
        TimeRange::new(RationalTime::ZERO, total)
    }

    /// This composition's active window: `source_range` if set, else the
    /// computed `available_range`.
    pub fn trimmed_range(&self) -> TimeRange {
        self.source_range()
            .unwrap_or_else(|| self.available_range())
    }

    pub fn duration(&self) -> RationalTime {
        self.trimmed_range().duration
    }

    /// Where this composition places its `index`-th child, untrimmed, in
    /// this composition's local coordinate space.
    pub fn range_of_child_at_index(&self, index: usize) -> CompositionResult<TimeRange> {
        let ranges = self.placement_ranges();
        ranges
            .get(index)
            .copied()
            .ok_or(CompositionError::IndexOutOfBounds {
                index,
                len: ranges.len(),
            })
    }

    /// Clip a child's placed range to this composition's own trim window.
    /// `None` means the range is entirely trimmed away.
    pub fn trim_child_range(&self, child_range: TimeRange) -> Option<TimeRange> {
        match self.source_range() {
            None => Some(child_range),
            Some(window) => child_range.intersection(window),
        }
    }

    /// `range_of_child_at_index` intersected with this composition's trim
    /// window.
    pub fn trimmed_range_of_child_at_index(
        &self,
        index: usize,
    ) -> CompositionResult<Option<TimeRange>> {
        Ok(self.trim_child_range(self.range_of_child_at_index(index)?))
    }

    /// Trimmed placed range of every child, keyed by child identity, in
    /// one pass. Children trimmed entirely away are absent, matching the
    /// per-index query returning `None` for them.
    pub fn range_of_all_children(&self) -> HashMap<ElementHandle, TimeRange> {
        let children = self.children();
        let ranges = self.placement_ranges();
        children
            .iter()
            .zip(ranges.iter())
            .filter_map(|(child, range)| {
                self.trim_child_range(*range)
                    .map(|trimmed| (child.clone(), trimmed))
            })
            .collect()
    }

    /// Untrimmed media slack immediately before and after a direct child's
    /// active window, available to transitions on either side. A side with
    /// no neighbour (first/last child) or no slack reports `None`.
    pub fn handles_of_child(
        &self,
        child: &ElementHandle,
    ) -> CompositionResult<(Option<RationalTime>, Option<RationalTime>)> {
        let index = self
            .index_of_child(child)
            .ok_or_else(|| CompositionError::NotAChild {
                child: child.name().to_string(),
                parent: self.name().to_string(),
            })?;

        let available = child.available_range();
        let trimmed = child.trimmed_range();

        let mut head = None;
        let mut tail = None;
        if index > 0 {
            let slack = trimmed.start_time - available.start_time;
            if slack > RationalTime::ZERO {
                head = Some(slack);
            }
        }
        if index + 1 < self.len() {
            let slack = available.end_time_exclusive() - trimmed.end_time_exclusive();
            if slack > RationalTime::ZERO {
                tail = Some(slack);
            }
        }
        Ok((head, tail))
    }

    /// Untrimmed range of a direct or indirect descendant, expressed in
    /// this composition's local coordinate space.
    ///
    /// For indirect descendants the result is composed by mapping the
    /// element's range outward through each ancestor in turn.
    pub fn range_of_child(&self, child: &ElementHandle) -> CompositionResult<TimeRange> {
        let path = self.path_from_child(child)?;
        let mut current = child.clone();
        let mut range: Option<TimeRange> = None;
        for container in path {
            let placed = container.placed_range_of_direct_child(&current)?;
            range = Some(match range {
                None => placed,
                Some(inner) => container.map_range_outward(inner, &current, placed),
            });
            current = ElementHandle::from(container);
        }
        // path_from_child returns at least one container
        Ok(range.expect("path contains the immediate parent"))
    }

    /// Like `range_of_child`, but applying every ancestor's trim window
    /// along the way. `None` if any level trims the range away entirely.
    pub fn trimmed_range_of_child(
        &self,
        child: &ElementHandle,
    ) -> CompositionResult<Option<TimeRange>> {
        let path = self.path_from_child(child)?;
        let mut current = child.clone();
        let mut range: Option<TimeRange> = None;
        for container in path {
            let placed = container.placed_range_of_direct_child(&current)?;
            let mapped = match range {
                None => placed,
                Some(inner) => container.map_range_outward(inner, &current, placed),
            };
            match container.trim_child_range(mapped) {
                Some(trimmed) => range = Some(trimmed),
                None => return Ok(None),
            }
            current = ElementHandle::from(container);
        }
        Ok(range)
    }

    /// Map a time in this composition's local space into a direct child's
    /// local space. This is the exact inverse of placement: deep queries
    /// and range-limited search rely on that.
    pub fn transformed_time(
        &self,
        time: RationalTime,
        child: &ElementHandle,
    ) -> CompositionResult<RationalTime> {
        let placed = self.placed_range_of_direct_child(child)?;
        Ok(time - placed.start_time + child.trimmed_range().start_time)
    }

    /// Map a range in this composition's local space into a direct child's
    /// local space. The duration is unchanged.
    pub fn transformed_time_range(
        &self,
        range: TimeRange,
        child: &ElementHandle,
    ) -> CompositionResult<TimeRange> {
        Ok(TimeRange::new(
            self.transformed_time(range.start_time, child)?,
            range.duration,
        ))
    }

    fn placed_range_of_direct_child(&self, child: &ElementHandle) -> CompositionResult<TimeRange> {
        let index = self
            .index_of_child(child)
            .ok_or_else(|| CompositionError::NotAChild {
                child: child.name().to_string(),
                parent: self.name().to_string(),
            })?;
        self.range_of_child_at_index(index)
    }

    /// Map `inner`, a range in `child`'s local space, into this
    /// composition's space given `placed`, the child's placed range here.
    fn map_range_outward(
        &self,
        inner: TimeRange,
        child: &ElementHandle,
        placed: TimeRange,
    ) -> TimeRange {
        let offset = placed.start_time - child.trimmed_range().start_time;
        TimeRange::new(inner.start_time + offset, inner.duration)
    }
}
