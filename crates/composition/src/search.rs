//! Time-indexed search: the bisection engine, point and range queries, and
//! recursive typed search across nested compositions.
//!
//! The bisection engine is a pair of generalized binary-search primitives
//! over a sub-range of the child sequence, parameterized by a
//! caller-supplied key function. Correctness requires the keys to be
//! non-decreasing over the queried sub-range; prefix-sum placement
//! guarantees that by construction, the engine never verifies it.

use cutlist_common::{RationalTime, TimeRange};

use crate::composition::{Composition, Layout};
use crate::element::{ElementHandle, ElementKind};
use crate::error::{CompositionError, CompositionResult};

impl Composition {
    /// Smallest index in `[lower, upper]` such that every child before it
    /// has `key(child) <= target`: the insertion point placing `target`
    /// *after* all equal keys.
    ///
    /// `lower` defaults to 0 and `upper` to the sequence length. The
    /// partial-range parameters let narrowed searches run without
    /// rebuilding a filtered sequence. Bounds outside
    /// `lower <= upper <= len` are a precondition violation, reported
    /// without evaluating any key.
    pub fn bisect_right<K>(
        &self,
        target: RationalTime,
        key: K,
        lower_search_bound: Option<usize>,
        upper_search_bound: Option<usize>,
    ) -> CompositionResult<usize>
    where
        K: Fn(&ElementHandle) -> RationalTime,
    {
        let children = self.children.borrow();
        let mut lower = lower_search_bound.unwrap_or(0);
        let mut upper = upper_search_bound.unwrap_or(children.len());
        if lower > upper || upper > children.len() {
            return Err(CompositionError::Internal {
                reason: format!(
                    "search bounds [{lower}, {upper}) invalid for {} children",
                    children.len()
                ),
            });
        }

        while lower < upper {
            let midpoint = lower + (upper - lower) / 2;
            if target < key(&children[midpoint]) {
                upper = midpoint;
            } else {
                lower = midpoint + 1;
            }
        }
        Ok(lower)
    }

    /// Smallest index in `[lower, upper]` such that every child before it
    /// has `key(child) < target`: the insertion point placing `target`
    /// *before* all equal keys.
    pub fn bisect_left<K>(
        &self,
        target: RationalTime,
        key: K,
        lower_search_bound: Option<usize>,
        upper_search_bound: Option<usize>,
    ) -> CompositionResult<usize>
    where
        K: Fn(&ElementHandle) -> RationalTime,
    {
        let children = self.children.borrow();
        let mut lower = lower_search_bound.unwrap_or(0);
        let mut upper = upper_search_bound.unwrap_or(children.len());
        if lower > upper || upper > children.len() {
            return Err(CompositionError::Internal {
                reason: format!(
                    "search bounds [{lower}, {upper}) invalid for {} children",
                    children.len()
                ),
            });
        }

        while lower < upper {
            let midpoint = lower + (upper - lower) / 2;
            if key(&children[midpoint]) < target {
                lower = midpoint + 1;
            } else {
                upper = midpoint;
            }
        }
        Ok(lower)
    }

    /// The child whose trimmed range contains `search_time`, or `None`.
    ///
    /// For sequential layouts one bisection over placed end times selects
    /// the candidate, so a time landing exactly on a cut belongs to the
    /// *following* child (`bisect_right` semantics). Overlay layouts have
    /// no monotonic key to bisect; they scan and return the first child in
    /// child order containing the time. Unless `shallow_search` is set,
    /// the search recurses into composition children with the time
    /// remapped into their local space, terminating at a leaf element or
    /// at a composition with nothing at that time.
    pub fn child_at_time(
        &self,
        search_time: RationalTime,
        shallow_search: bool,
    ) -> CompositionResult<Option<ElementHandle>> {
        let index = match self.layout() {
            Layout::Sequence => {
                let ranges = self.placement_ranges();
                let index = self.bisect_right(
                    search_time,
                    |child| {
                        let position = self
                            .index_of_child(child)
                            .expect("membership index tracks children");
                        ranges[position].end_time_exclusive()
                    },
                    None,
                    None,
                )?;
                if index >= self.len() {
                    return Ok(None);
                }
                index
            }
            Layout::Overlay => {
                let mut found = None;
                for i in 0..self.len() {
                    if let Some(trimmed) = self.trimmed_range_of_child_at_index(i)? {
                        if trimmed.contains(search_time) {
                            found = Some(i);
                            break;
                        }
                    }
                }
                match found {
                    Some(index) => index,
                    None => return Ok(None),
                }
            }
        };

        let child = self.children.borrow()[index].clone();
        match self.trimmed_range_of_child_at_index(index)? {
            Some(trimmed) if trimmed.contains(search_time) => {}
            _ => return Ok(None),
        }

        if !shallow_search {
            if let Some(composition) = child.as_composition() {
                let child_time = self.transformed_time(search_time, &child)?;
                return composition.child_at_time(child_time, false);
            }
        }
        Ok(Some(child))
    }

    /// Every child overlapping `search_range`, in child order, located in
    /// O(log n + k) by bisecting placed end keys for the first overlap and
    /// start keys for the last. Unless `shallow_search` is set, composition
    /// children are recursed into with the range remapped into their local
    /// space, each subtree's results following its container.
    pub fn children_in_range(
        &self,
        search_range: TimeRange,
        shallow_search: bool,
    ) -> CompositionResult<Vec<ElementHandle>> {
        let mut found = Vec::new();
        self.walk_children(&|_| true, Some(search_range), shallow_search, &mut found)?;
        Ok(found)
    }

    /// Every descendant matching `kind`, optionally restricted to a search
    /// range, in pre-order (each match before its own subtree's matches).
    pub fn find_children(
        &self,
        kind: ElementKind,
        search_range: Option<TimeRange>,
        shallow_search: bool,
    ) -> CompositionResult<Vec<ElementHandle>> {
        self.find_children_by(|child| child.kind() == kind, search_range, shallow_search)
    }

    /// Generalized form of [`find_children`](Self::find_children): collects
    /// every descendant satisfying an arbitrary predicate. The recursion
    /// and coordinate-remapping logic is shared with every other deep
    /// search in this module.
    pub fn find_children_by<F>(
        &self,
        predicate: F,
        search_range: Option<TimeRange>,
        shallow_search: bool,
    ) -> CompositionResult<Vec<ElementHandle>>
    where
        F: Fn(&ElementHandle) -> bool,
    {
        let mut found = Vec::new();
        self.walk_children(&predicate, search_range, shallow_search, &mut found)?;
        Ok(found)
    }

    /// Direct children overlapping `search_range`: two bisections over the
    /// monotonic placed keys for sequential layouts (children with empty
    /// placed ranges lying inside the search range are included, matching
    /// the key semantics), a linear overlap scan for overlay layouts.
    fn direct_children_in_range(
        &self,
        search_range: TimeRange,
    ) -> CompositionResult<Vec<ElementHandle>> {
        let ranges = self.placement_ranges();
        if self.layout() == Layout::Overlay {
            let children = self.children.borrow();
            return Ok(children
                .iter()
                .zip(ranges.iter())
                .filter(|(_, placed)| placed.overlaps(search_range))
                .map(|(child, _)| child.clone())
                .collect());
        }
        let position_of = |child: &ElementHandle| {
            self.index_of_child(child)
                .expect("membership index tracks children")
        };

        // first child ending after the range starts
        let first = self.bisect_right(
            search_range.start_time,
            |child| ranges[position_of(child)].end_time_exclusive(),
            None,
            None,
        )?;
        // one past the last child starting before the range ends
        let last = self.bisect_left(
            search_range.end_time_exclusive(),
            |child| ranges[position_of(child)].start_time,
            Some(first),
            None,
        )?;

        let children = self.children.borrow();
        Ok(children[first..last].to_vec())
    }

    /// The single recursive walker behind `children_in_range`,
    /// `find_children`, and `find_children_by`. The search range, when
    /// present, is remapped into each composition candidate's local space
    /// independently of its siblings.
    fn walk_children<F>(
        &self,
        predicate: &F,
        search_range: Option<TimeRange>,
        shallow_search: bool,
        found: &mut Vec<ElementHandle>,
    ) -> CompositionResult<()>
    where
        F: Fn(&ElementHandle) -> bool,
    {
        let candidates = match search_range {
            Some(range) => self.direct_children_in_range(range)?,
            None => self.children(),
        };

        for child in candidates {
            if predicate(&child) {
                found.push(child.clone());
            }
            if shallow_search {
                continue;
            }
            if let Some(composition) = child.as_composition() {
                let child_range = match search_range {
                    Some(range) => Some(self.transformed_time_range(range, &child)?),
                    None => None,
                };
                composition.walk_children(predicate, child_range, false, found)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Layout;
    use crate::element::{Clip, Gap, Transition};
    use std::rc::Rc;

    fn frames(n: i64) -> RationalTime {
        RationalTime::from_frames(n, 1)
    }

    fn range(start: i64, duration: i64) -> TimeRange {
        TimeRange::new(frames(start), frames(duration))
    }

    fn clip(name: &str, duration: i64) -> ElementHandle {
        Clip::new(name, range(0, duration), None).into()
    }

    fn ten_five_ten() -> (Rc<Composition>, Vec<ElementHandle>) {
        let comp = Composition::new("track", Layout::Sequence, None);
        let clips = vec![clip("a", 10), clip("b", 5), clip("c", 10)];
        comp.set_children(clips.clone()).unwrap();
        (comp, clips)
    }

    /// Bisection against an explicit key table, checked against the
    /// counting definition: bisect_right(t) == #{keys <= t},
    /// bisect_left(t) == #{keys < t}.
    fn check_bisect(comp: &Composition, keys: &[i64], target: i64) {
        let position = |child: &ElementHandle| {
            comp.index_of_child(child).expect("child is in the index")
        };
        let key = |child: &ElementHandle| frames(keys[position(child)]);

        let right = comp
            .bisect_right(frames(target), key, None, None)
            .unwrap();
        let left = comp.bisect_left(frames(target), key, None, None).unwrap();
        assert_eq!(right, keys.iter().filter(|k| **k <= target).count());
        assert_eq!(left, keys.iter().filter(|k| **k < target).count());
    }

    #[test]
    fn bisect_counting_definition_holds() {
        let comp = Composition::new("track", Layout::Sequence, None);
        comp.set_children((0..6).map(|i| clip(&format!("c{i}"), 1)).collect())
            .unwrap();

        let keys = [0, 5, 5, 5, 9, 12];
        for target in [-1, 0, 4, 5, 6, 9, 12, 100] {
            check_bisect(&comp, &keys, target);
        }
    }

    #[test]
    fn bisect_empty_and_single() {
        let empty = Composition::new("empty", Layout::Sequence, None);
        assert_eq!(
            empty
                .bisect_right(frames(3), |c| c.duration(), None, None)
                .unwrap(),
            0
        );
        assert_eq!(
            empty
                .bisect_left(frames(3), |c| c.duration(), None, None)
                .unwrap(),
            0
        );

        let single = Composition::new("single", Layout::Sequence, None);
        single.set_children(vec![clip("a", 7)]).unwrap();
        check_bisect(&single, &[7], 6);
        check_bisect(&single, &[7], 7);
        check_bisect(&single, &[7], 8);
    }

    #[test]
    fn bisect_partial_bounds() {
        let comp = Composition::new("track", Layout::Sequence, None);
        comp.set_children((0..8).map(|i| clip(&format!("c{i}"), 1)).collect())
            .unwrap();
        let keys = [1, 2, 3, 4, 5, 6, 7, 8];
        let position = |child: &ElementHandle| {
            comp.index_of_child(child).expect("child is in the index")
        };
        let key = |child: &ElementHandle| frames(keys[position(child)]);

        // searching only [2, 6) ignores keys outside it
        assert_eq!(
            comp.bisect_right(frames(0), key, Some(2), Some(6)).unwrap(),
            2
        );
        assert_eq!(
            comp.bisect_right(frames(100), key, Some(2), Some(6)).unwrap(),
            6
        );
        assert_eq!(
            comp.bisect_left(frames(5), key, Some(2), Some(6)).unwrap(),
            4
        );
    }

    #[test]
    fn bisect_invalid_bounds_is_internal_error() {
        let (comp, _) = ten_five_ten();
        let err = comp
            .bisect_right(frames(0), |c| c.duration(), Some(2), Some(1))
            .unwrap_err();
        assert!(matches!(err, CompositionError::Internal { .. }));

        let err = comp
            .bisect_left(frames(0), |c| c.duration(), None, Some(9))
            .unwrap_err();
        assert!(matches!(err, CompositionError::Internal { .. }));
    }

    #[test]
    fn child_at_time_basic_and_boundaries() {
        let (comp, clips) = ten_five_ten();

        assert_eq!(
            comp.child_at_time(frames(12), true).unwrap(),
            Some(clips[1].clone())
        );
        // a boundary-exact time belongs to the following child
        assert_eq!(
            comp.child_at_time(frames(10), true).unwrap(),
            Some(clips[1].clone())
        );
        assert_eq!(
            comp.child_at_time(frames(0), true).unwrap(),
            Some(clips[0].clone())
        );
        // past the end, and before the start, nothing
        assert_eq!(comp.child_at_time(frames(25), true).unwrap(), None);
        assert_eq!(comp.child_at_time(frames(-1), true).unwrap(), None);
    }

    #[test]
    fn child_at_time_empty_composition() {
        let comp = Composition::new("track", Layout::Sequence, None);
        assert_eq!(comp.child_at_time(frames(0), false).unwrap(), None);
    }

    #[test]
    fn child_at_time_skips_fully_trimmed() {
        let (comp, clips) = ten_five_ten();
        comp.set_source_range(Some(range(0, 12)));
        assert_eq!(
            comp.child_at_time(frames(11), true).unwrap(),
            Some(clips[1].clone())
        );
        // child c is placed at [15, 25) but trimmed away entirely
        assert_eq!(comp.child_at_time(frames(16), true).unwrap(), None);
    }

    #[test]
    fn child_at_time_recurses_into_nested() {
        let root = Composition::new("root", Layout::Sequence, None);
        let inner = Composition::new("inner", Layout::Sequence, None);
        let b = clip("b", 5);
        let c = clip("c", 10);
        inner.set_children(vec![b.clone(), c.clone()]).unwrap();
        root.set_children(vec![clip("a", 10), inner.clone().into()])
            .unwrap();

        // shallow stops at the composition
        assert_eq!(
            root.child_at_time(frames(12), true).unwrap(),
            Some(ElementHandle::from(inner))
        );
        // deep remaps 12 -> 2 inside inner, landing in b
        assert_eq!(root.child_at_time(frames(12), false).unwrap(), Some(b));
        assert_eq!(root.child_at_time(frames(17), false).unwrap(), Some(c));
    }

    #[test]
    fn child_at_time_deep_absent_when_nested_has_gap_in_coverage() {
        let root = Composition::new("root", Layout::Sequence, None);
        let inner = Composition::new("inner", Layout::Sequence, None);
        inner.set_children(vec![clip("b", 5)]).unwrap();
        // trim inner to 10 frames: frames 5..10 of it are empty space
        inner.set_source_range(Some(range(0, 10)));
        root.append_child(inner.clone().into()).unwrap();

        assert_eq!(root.child_at_time(frames(2), false).unwrap().map(|c| c.name().to_string()), Some("b".to_string()));
        // inner occupies [0, 10) of root but has no child at local time 7
        assert_eq!(root.child_at_time(frames(7), false).unwrap(), None);
    }

    #[test]
    fn children_in_range_uses_half_open_overlap() {
        let (comp, clips) = ten_five_ten();

        let found = comp.children_in_range(range(12, 8), true).unwrap();
        assert_eq!(found, vec![clips[1].clone(), clips[2].clone()]);

        // a range ending exactly where a child starts excludes it
        let found = comp.children_in_range(range(0, 10), true).unwrap();
        assert_eq!(found, vec![clips[0].clone()]);

        // a range starting exactly where a child ends excludes it
        let found = comp.children_in_range(range(15, 10), true).unwrap();
        assert_eq!(found, vec![clips[2].clone()]);

        let found = comp.children_in_range(range(0, 25), true).unwrap();
        assert_eq!(found, clips);

        let found = comp.children_in_range(range(25, 5), true).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn children_in_range_recurses_with_remapped_range() {
        let root = Composition::new("root", Layout::Sequence, None);
        let inner = Composition::new("inner", Layout::Sequence, None);
        let b = clip("b", 5);
        let c = clip("c", 10);
        inner.set_children(vec![b.clone(), c.clone()]).unwrap();
        let inner_handle = ElementHandle::from(inner);
        root.set_children(vec![clip("a", 10), inner_handle.clone()])
            .unwrap();

        // [12, 14) only touches inner's first child
        let found = root.children_in_range(range(12, 2), false).unwrap();
        assert_eq!(found, vec![inner_handle.clone(), b]);

        let found = root.children_in_range(range(12, 2), true).unwrap();
        assert_eq!(found, vec![inner_handle]);
    }

    #[test]
    fn find_children_filters_by_kind_in_preorder() {
        let root = Composition::new("root", Layout::Sequence, None);
        let inner = Composition::new("inner", Layout::Sequence, None);
        let b = clip("b", 5);
        let g: ElementHandle = Gap::new("g", frames(3)).into();
        inner.set_children(vec![g.clone(), b.clone()]).unwrap();
        let a = clip("a", 10);
        root.set_children(vec![a.clone(), inner.clone().into()])
            .unwrap();

        let clips_found = root.find_children(ElementKind::Clip, None, false).unwrap();
        assert_eq!(clips_found, vec![a.clone(), b.clone()]);

        let gaps = root.find_children(ElementKind::Gap, None, false).unwrap();
        assert_eq!(gaps, vec![g]);

        let comps = root
            .find_children(ElementKind::Composition, None, false)
            .unwrap();
        assert_eq!(comps, vec![ElementHandle::from(inner)]);

        // shallow search never descends
        let shallow = root.find_children(ElementKind::Clip, None, true).unwrap();
        assert_eq!(shallow, vec![a]);
    }

    #[test]
    fn find_children_restricted_by_range() {
        let root = Composition::new("root", Layout::Sequence, None);
        let inner = Composition::new("inner", Layout::Sequence, None);
        let b = clip("b", 5);
        let c = clip("c", 10);
        inner.set_children(vec![b.clone(), c.clone()]).unwrap();
        root.set_children(vec![clip("a", 10), inner.into()]).unwrap();

        // only the tail of the tree: a ends at 10, b covers [10, 15)
        let found = root
            .find_children(ElementKind::Clip, Some(range(16, 4)), false)
            .unwrap();
        assert_eq!(found, vec![c]);

        let found = root
            .find_children(ElementKind::Clip, Some(range(2, 6)), false)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "a");
    }

    #[test]
    fn find_children_by_arbitrary_predicate() {
        let (comp, clips) = ten_five_ten();
        let short = comp
            .find_children_by(|c| c.duration() < frames(8), None, false)
            .unwrap();
        assert_eq!(short, vec![clips[1].clone()]);
    }

    #[test]
    fn overlay_queries_scan_in_child_order() {
        let stack = Composition::new("stack", Layout::Overlay, None);
        let short = clip("short", 5);
        let long = clip("long", 20);
        stack.set_children(vec![short.clone(), long.clone()]).unwrap();

        // both contain t=2; the first in child order wins
        assert_eq!(stack.child_at_time(frames(2), true).unwrap(), Some(short.clone()));
        // only the long clip reaches t=10
        assert_eq!(stack.child_at_time(frames(10), true).unwrap(), Some(long.clone()));
        assert_eq!(stack.child_at_time(frames(20), true).unwrap(), None);

        let found = stack.children_in_range(range(3, 4), true).unwrap();
        assert_eq!(found, vec![short.clone(), long.clone()]);
        let found = stack.children_in_range(range(10, 4), true).unwrap();
        assert_eq!(found, vec![long]);
    }

    #[test]
    fn transition_is_found_by_point_query_only_in_its_own_window() {
        let comp = Composition::new("track", Layout::Sequence, None);
        let t: ElementHandle = Transition::new("x", frames(2), frames(2)).into();
        let a = clip("a", 10);
        let b = clip("b", 10);
        comp.set_children(vec![a.clone(), t.clone(), b.clone()]).unwrap();

        // inside the overlap window but before the cut, the outgoing clip
        // still ends later, so bisection selects it first
        assert_eq!(comp.child_at_time(frames(9), true).unwrap(), Some(a));
        // on the cut itself the transition's placed range [8, 12) is the
        // first whose end exceeds 10
        assert_eq!(comp.child_at_time(frames(10), true).unwrap(), Some(t.clone()));

        let found = comp.children_in_range(range(9, 2), true).unwrap();
        assert!(found.contains(&t));
    }
}
