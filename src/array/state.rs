use std::cmp;
use std::ops::Range;

/// Bookkeeping of which slots of a vector are defined.
///
/// Every mutation of a vector is planned here first: the returned range lists
/// the slots that must be filled as null, zero-length entries before the
/// write, and the returned state replaces the vector's state once the write
/// has been committed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SlotState {
    /// Number of defined slots.
    pub value_count: usize,
    /// Highest slot written explicitly; `None` when nothing has been written.
    pub last_set: Option<usize>,
}

/// What a mutation has to do before and after touching the buffers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    /// Slots to be filled as null, zero-length entries, in ascending order.
    pub fill: Range<usize>,
    /// Whether the written slot is already defined, so the bytes of the
    /// slots after it move when its length changes.
    pub rewrite: bool,
    pub next: SlotState,
}

impl SlotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first slot that has not been committed yet.
    #[inline]
    pub fn next_unset(&self) -> usize {
        self.last_set.map_or(0, |i| i + 1)
    }

    /// Plans writing slot `index`.
    pub fn set(&self, index: usize) -> Transition {
        let first = self.next_unset();
        let fill = if index > first { first..index } else { first..first };
        let last_set = cmp::max(self.last_set, Some(index));
        Transition {
            fill,
            rewrite: index < self.value_count,
            next: SlotState {
                value_count: cmp::max(self.value_count, index + 1),
                last_set,
            },
        }
    }

    /// Plans defining exactly `count` slots. Growing fills the new slots,
    /// shrinking drops the trailing ones.
    pub fn set_value_count(&self, count: usize) -> Transition {
        let first = self.next_unset();
        let fill = if count > first { first..count } else { first..first };
        Transition {
            fill,
            rewrite: false,
            next: SlotState {
                value_count: count,
                last_set: count.checked_sub(1),
            },
        }
    }

    /// Plans filling every slot before `index` that has not been written.
    pub fn fill_empties(&self, index: usize) -> Transition {
        let first = self.next_unset();
        let fill = if index > first { first..index } else { first..first };
        let last_set = if fill.is_empty() {
            self.last_set
        } else {
            Some(index - 1)
        };
        Transition {
            fill,
            rewrite: false,
            next: SlotState {
                value_count: cmp::max(self.value_count, index),
                last_set,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SlotState, Transition};

    #[test]
    fn set_on_empty_fills_gap() {
        let state = SlotState::new();
        let Transition {
            fill,
            rewrite,
            next,
        } = state.set(5);
        assert_eq!(0..5, fill);
        assert!(!rewrite);
        assert_eq!(6, next.value_count);
        assert_eq!(Some(5), next.last_set);
    }

    #[test]
    fn sequential_set_fills_nothing() {
        let state = SlotState::new().set(0).next;
        let t = state.set(1);
        assert!(t.fill.is_empty());
        assert!(!t.rewrite);
        assert_eq!(Some(1), t.next.last_set);
    }

    #[test]
    fn out_of_order_set_is_a_rewrite() {
        let state = SlotState::new().set(7).next;
        let t = state.set(3);
        assert!(t.fill.is_empty());
        assert!(t.rewrite);
        assert_eq!(8, t.next.value_count);
        assert_eq!(Some(7), t.next.last_set);
    }

    #[test]
    fn set_below_value_count_is_a_rewrite() {
        let state = SlotState {
            value_count: 4,
            last_set: Some(0),
        };
        let t = state.set(2);
        assert_eq!(1..2, t.fill);
        assert!(t.rewrite);
        assert_eq!(4, t.next.value_count);
        assert_eq!(Some(2), t.next.last_set);
    }

    #[test]
    fn value_count_grow_and_shrink() {
        let state = SlotState::new().set(1).next;
        let grow = state.set_value_count(4);
        assert_eq!(2..4, grow.fill);
        assert_eq!(Some(3), grow.next.last_set);

        let shrink = grow.next.set_value_count(1);
        assert!(shrink.fill.is_empty());
        assert_eq!(1, shrink.next.value_count);
        assert_eq!(Some(0), shrink.next.last_set);

        let zero = shrink.next.set_value_count(0);
        assert_eq!(None, zero.next.last_set);
    }

    #[test]
    fn fill_empties_stops_before_index() {
        let state = SlotState::new().set(0).next;
        let t = state.fill_empties(3);
        assert_eq!(1..3, t.fill);
        assert_eq!(Some(2), t.next.last_set);
        assert_eq!(3, t.next.value_count);
    }
}
