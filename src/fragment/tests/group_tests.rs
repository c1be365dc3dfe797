//! Tests for per-message fragment bookkeeping.

use bytes::Bytes;

use crate::{
    fragment::{FragmentGroup, FragmentIndex, InsertOutcome, SeqId},
    test_helpers::group_with,
};

#[test]
fn group_completes_when_every_index_arrives() {
    let mut group = FragmentGroup::new(SeqId::new(1), 3, 2);
    for index in [2, 0, 1] {
        assert!(!group.is_complete());
        assert_eq!(
            group.insert(FragmentIndex::new(index), Bytes::from_static(b"xy")),
            InsertOutcome::Fresh
        );
    }
    assert!(group.is_complete());
    assert!(group.missing_indices().is_empty());
}

#[test]
fn duplicate_index_overwrites_without_counting_twice() {
    let mut group = group_with(5, 3, 1, &[(2, b"a")]);

    assert_eq!(
        group.insert(FragmentIndex::new(2), Bytes::from_static(b"b")),
        InsertOutcome::Duplicate
    );
    assert_eq!(group.received_count(), 1);
    assert_eq!(
        group.payload(FragmentIndex::new(2)).map(|payload| &payload[..]),
        Some(&b"b"[..]),
        "second arrival replaces the first"
    );
    assert!(!group.is_complete());
}

#[test]
fn index_beyond_expected_count_is_discarded() {
    let mut group = FragmentGroup::new(SeqId::new(9), 2, 4);
    assert_eq!(
        group.insert(FragmentIndex::new(2), Bytes::from_static(b"late")),
        InsertOutcome::OutOfRange
    );
    assert_eq!(group.received_count(), 0);
}

#[test]
fn missing_indices_lists_gaps_in_order() {
    let group = group_with(10, 5, 1, &[(0, b"a"), (3, b"d")]);
    assert_eq!(
        group.missing_indices(),
        vec![
            FragmentIndex::new(1),
            FragmentIndex::new(2),
            FragmentIndex::new(4)
        ]
    );
}

#[test]
fn missing_count_matches_gaps_without_walking_indices() {
    let group = group_with(10, 5, 1, &[(0, b"a"), (3, b"d")]);
    assert_eq!(group.missing_count(), 3);

    let huge = group_with(12, u32::MAX, 1, &[(7, b"h")]);
    assert_eq!(huge.missing_count(), u32::MAX - 1);
}

#[test]
fn iter_yields_fragments_in_index_order() {
    let group = group_with(11, 3, 1, &[(2, b"c"), (0, b"a"), (1, b"b")]);
    let order: Vec<u32> = group.iter().map(|(index, _)| index.get()).collect();
    assert_eq!(order, vec![0, 1, 2]);
}
