use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Unbounded};

use proptest::prelude::*;
use ravl_tree::{IterError, Rank, RavlSet};

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 1_000;

fn element_strategy() -> impl Strategy<Value = i64> {
    -2_000i64..2_000i64
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum SetOp {
    Insert(i64),
    Remove(i64),
    Contains(i64),
    First,
    Last,
    PopFirst,
    PopLast,
    GetByRank(usize),
    RankOf(i64),
    Higher(i64),
    Lower(i64),
    Ceiling(i64),
    Floor(i64),
}

fn set_op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        6 => element_strategy().prop_map(SetOp::Insert),
        4 => element_strategy().prop_map(SetOp::Remove),
        2 => element_strategy().prop_map(SetOp::Contains),
        1 => Just(SetOp::First),
        1 => Just(SetOp::Last),
        1 => Just(SetOp::PopFirst),
        1 => Just(SetOp::PopLast),
        2 => any::<usize>().prop_map(SetOp::GetByRank),
        2 => element_strategy().prop_map(SetOp::RankOf),
        1 => element_strategy().prop_map(SetOp::Higher),
        1 => element_strategy().prop_map(SetOp::Lower),
        1 => element_strategy().prop_map(SetOp::Ceiling),
        1 => element_strategy().prop_map(SetOp::Floor),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays a random sequence of operations on both RavlSet and BTreeSet
    /// and asserts identical results at every step, with the structural
    /// invariants re-verified after each one.
    #[test]
    fn set_ops_match_btreeset(ops in proptest::collection::vec(set_op_strategy(), TEST_SIZE)) {
        let mut ravl: RavlSet<i64> = RavlSet::new();
        let mut model: BTreeSet<i64> = BTreeSet::new();

        for op in &ops {
            match op {
                SetOp::Insert(v) => {
                    prop_assert_eq!(ravl.insert(*v), model.insert(*v), "insert({})", v);
                }
                SetOp::Remove(v) => {
                    prop_assert_eq!(ravl.remove(v), model.remove(v), "remove({})", v);
                }
                SetOp::Contains(v) => {
                    prop_assert_eq!(ravl.contains(v), model.contains(v), "contains({})", v);
                }
                SetOp::First => {
                    prop_assert_eq!(ravl.first(), model.first(), "first");
                }
                SetOp::Last => {
                    prop_assert_eq!(ravl.last(), model.last(), "last");
                }
                SetOp::PopFirst => {
                    prop_assert_eq!(ravl.pop_first(), model.pop_first(), "pop_first");
                }
                SetOp::PopLast => {
                    prop_assert_eq!(ravl.pop_last(), model.pop_last(), "pop_last");
                }
                SetOp::GetByRank(rank) => {
                    let rank = if model.is_empty() { *rank } else { rank % (model.len() + 1) };
                    prop_assert_eq!(ravl.get_by_rank(rank), model.iter().nth(rank), "get_by_rank({})", rank);
                }
                SetOp::RankOf(v) => {
                    let expected = if model.contains(v) { Some(model.range(..*v).count()) } else { None };
                    prop_assert_eq!(ravl.rank_of(v), expected, "rank_of({})", v);
                }
                SetOp::Higher(v) => {
                    let expected = model.range((Excluded(*v), Unbounded)).next();
                    prop_assert_eq!(ravl.higher(v), expected, "higher({})", v);
                }
                SetOp::Lower(v) => {
                    let expected = model.range(..*v).next_back();
                    prop_assert_eq!(ravl.lower(v), expected, "lower({})", v);
                }
                SetOp::Ceiling(v) => {
                    let expected = model.range(*v..).next();
                    prop_assert_eq!(ravl.ceiling(v), expected, "ceiling({})", v);
                }
                SetOp::Floor(v) => {
                    let expected = model.range(..=*v).next_back();
                    prop_assert_eq!(ravl.floor(v), expected, "floor({})", v);
                }
            }
            prop_assert!(ravl.is_healthy(), "invariants violated after {:?}", op);
            prop_assert_eq!(ravl.len(), model.len(), "len mismatch after {:?}", op);
        }
    }

    /// Iteration order and range queries match BTreeSet.
    #[test]
    fn iter_matches_btreeset(elements in proptest::collection::vec(element_strategy(), 0..TEST_SIZE)) {
        let ravl: RavlSet<i64> = elements.iter().copied().collect();
        let model: BTreeSet<i64> = elements.iter().copied().collect();

        let ravl_fwd: Vec<_> = ravl.iter().copied().collect();
        let model_fwd: Vec<_> = model.iter().copied().collect();
        prop_assert_eq!(&ravl_fwd, &model_fwd, "iter() mismatch");

        let ravl_rev: Vec<_> = ravl.iter().rev().copied().collect();
        let model_rev: Vec<_> = model.iter().rev().copied().collect();
        prop_assert_eq!(&ravl_rev, &model_rev, "iter().rev() mismatch");

        let ravl_into: Vec<_> = ravl.into_iter().collect();
        prop_assert_eq!(&ravl_into, &model_fwd, "into_iter() mismatch");
    }

    /// Every element's rank is consistent with `get_by_rank`.
    #[test]
    fn set_rank_round_trips(elements in proptest::collection::btree_set(element_strategy(), 0..256)) {
        let set: RavlSet<i64> = elements.iter().copied().collect();

        for (rank, element) in elements.iter().enumerate() {
            prop_assert_eq!(set.rank_of(element), Some(rank));
            prop_assert_eq!(set.get_by_rank(rank), Some(element));
        }
        prop_assert_eq!(set.get_by_rank(set.len()), None);
    }
}

// ─── Scenario tests ──────────────────────────────────────────────────────────

mod scenarios {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rank_navigation_and_ranges() {
        let set = RavlSet::from([1, 3, 5, 7, 9]);

        assert_eq!(set.get_by_rank(2), Some(&5));
        assert_eq!(set.rank_of(&7), Some(3));
        assert_eq!(set.floor(&4), Some(&3));
        assert_eq!(set.ceiling(&4), Some(&5));
        assert_eq!(set[Rank(0)], 1);

        let in_range: Vec<_> = set.range(3..=7).copied().collect();
        assert_eq!(in_range, [3, 5, 7]);

        let mut backward = Vec::new();
        let mut query = set.ranged_query(Some(3), Some(7), (true, true), true);
        while let Some(&element) = query.next(&set).unwrap() {
            backward.push(element);
        }
        assert_eq!(backward, [7, 5, 3]);
    }

    #[test]
    fn removal_shifts_ranks() {
        let mut set = RavlSet::from([1, 3, 5, 7, 9]);

        assert!(set.remove(&5));
        assert_eq!(set.rank_of(&7), Some(2));
        assert_eq!(set.len(), 4);
        assert!(set.is_healthy());
    }

    #[test]
    fn floor_and_lower_on_members_and_gaps() {
        let set = RavlSet::from([1, 3]);

        assert_eq!(set.lower(&1), None);
        assert_eq!(set.floor(&1), Some(&1));
        assert_eq!(set.lower(&3), Some(&1));
        assert_eq!(set.floor(&3), Some(&3));
        assert_eq!(set.floor(&0), None);
    }

    #[test]
    fn ceiling_and_higher_on_members_and_gaps() {
        let set = RavlSet::from([1, 3]);

        assert_eq!(set.higher(&3), None);
        assert_eq!(set.ceiling(&3), Some(&3));
        assert_eq!(set.higher(&1), Some(&3));
        assert_eq!(set.ceiling(&1), Some(&1));
        assert_eq!(set.ceiling(&4), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut set = RavlSet::new();
        assert!(set.insert(2));
        assert!(!set.insert(2));
        assert_eq!(set.len(), 1);
        assert!(set.is_healthy());
    }

    #[test]
    fn take_returns_the_stored_element() {
        let mut set = RavlSet::from([1, 2, 3]);
        assert_eq!(set.take(&2), Some(2));
        assert_eq!(set.take(&2), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn fail_fast_on_out_of_band_mutation() {
        let mut set = RavlSet::from([1, 2, 3]);
        let mut query = set.ranged_query(None, None, (true, true), false);
        assert_eq!(query.next(&set).unwrap(), Some(&1));

        set.insert(4);
        assert_eq!(query.next(&set), Err(IterError::TreeModified));
    }

    #[test]
    fn query_removal_drains_a_band() {
        let mut set: RavlSet<i64> = (0..20).collect();

        let mut query = set.ranged_query(Some(5), Some(14), (true, true), false);
        while query.next(&set).unwrap().is_some() {
            query.remove(&mut set).unwrap();
        }

        assert_eq!(set.len(), 10);
        assert!(set.is_healthy());
        assert!(set.iter().all(|&e| !(5..=14).contains(&e)));
    }

    #[test]
    fn query_remove_misuse_is_reported() {
        let mut set = RavlSet::from([1, 2]);
        let mut query = set.ranged_query(None, None, (true, true), false);

        assert_eq!(query.remove(&mut set), Err(IterError::NothingToRemove));
        query.next(&set).unwrap();
        assert_eq!(query.remove(&mut set), Ok(1));
        assert_eq!(query.remove(&mut set), Err(IterError::NothingToRemove));
    }

    #[test]
    fn set_equality_and_debug() {
        let a = RavlSet::from([3, 1, 2]);
        let b = RavlSet::from([1, 2, 3]);
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "{1, 2, 3}");
    }
}
