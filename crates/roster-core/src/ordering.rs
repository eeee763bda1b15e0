//! # Ordering Math
//!
//! Pure functions that turn gestures into orderings and orderings into
//! patches.
//!
//! ## Gesture Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     splice_move(from = 1, to = 3)                       │
//! │                                                                         │
//! │   before:  A0  B1  C2  D3  E4                                          │
//! │   remove:  A   C   D   E          (B lifted out)                       │
//! │   insert:  A   C   D   B   E      (B dropped at index 3)               │
//! │   slots:   A0  C1  D2  B3  E4     (indices 1..=3 reuse slots 1,2,3)   │
//! │                                                                         │
//! │   diff vs before: {C:1, D:2, B:3}   (A and E never appear)             │
//! │                                                                         │
//! │   Remote slots need not be 0..n: with  A1 B2 C5 D6 E9  the same move   │
//! │   yields {C:2, D:5, B:6}.                                               │
//! │                                                                         │
//! │                     swap_adjacent(index = 1, Down)                      │
//! │                                                                         │
//! │   before:  A0  B1  C2                                                  │
//! │   after:   A0  C1  B2             (only the two neighbours change)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::patch::Patch;
use crate::types::{ClientType, Direction};

/// Sorts records by ascending position, breaking ties by id.
pub fn sort_by_position(records: &mut [ClientType]) {
    records.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}

/// Shifts every position above `removed` down by one, closing the slot a
/// deleted record left behind.
pub fn close_gap(records: &mut [ClientType], removed: u32) {
    for record in records.iter_mut().filter(|r| r.position > removed) {
        record.position -= 1;
    }
}

/// Returns true if positions are exactly `0..len` in iteration order.
pub fn is_contiguous(records: &[ClientType]) -> bool {
    records
        .iter()
        .enumerate()
        .all(|(index, record)| record.position as usize == index)
}

/// Returns the index of the record with `id`.
pub fn index_of(records: &[ClientType], id: &str) -> Option<usize> {
    records.iter().position(|r| r.id == id)
}

/// Removes the record at `from` and reinserts it at `to`.
///
/// `records` must be in ascending position order. The records between the two
/// indices take over the positions that range already held, so everything
/// outside it keeps its position whatever the spacing of the remote slots.
///
/// # Errors
/// `IndexOutOfRange` if either index does not address a record.
pub fn splice_move(records: &[ClientType], from: usize, to: usize) -> CoreResult<Vec<ClientType>> {
    let len = records.len();
    for index in [from, to] {
        if index >= len {
            return Err(CoreError::IndexOutOfRange { index, len });
        }
    }

    let mut moved = records.to_vec();
    let record = moved.remove(from);
    moved.insert(to, record);
    for index in from.min(to)..=from.max(to) {
        moved[index].position = records[index].position;
    }
    Ok(moved)
}

/// Swaps the record at `index` with its neighbour in `direction`, exchanging
/// their positions.
///
/// Returns `false` (and changes nothing) when the record is already at that
/// edge of the list.
pub fn swap_adjacent(records: &mut [ClientType], index: usize, direction: Direction) -> bool {
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => index.checked_add(1).filter(|n| *n < records.len()),
    };
    let Some(neighbour) = neighbour else {
        return false;
    };
    if index >= records.len() {
        return false;
    }

    let position = records[index].position;
    records[index].position = records[neighbour].position;
    records[neighbour].position = position;
    records.swap(index, neighbour);
    true
}

/// Diffs a proposed ordering against the confirmed one.
///
/// Only records whose proposed position differs from their confirmed position
/// are included, in proposed order. Records unknown to `confirmed` are always
/// included so the store can reject them.
pub fn diff(confirmed: &[ClientType], proposed: &[ClientType]) -> Patch {
    let baseline: HashMap<&str, u32> = confirmed
        .iter()
        .map(|r| (r.id.as_str(), r.position))
        .collect();

    let mut patch = Patch::new();
    for record in proposed {
        if baseline.get(record.id.as_str()) != Some(&record.position) {
            patch.push(record.id.clone(), record.position);
        }
    }
    patch
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: u32) -> Vec<ClientType> {
        (0..n)
            .map(|i| {
                ClientType::new(format!("Type {i}"))
                    .with_id(format!("id-{i}"))
                    .with_position(i)
            })
            .collect()
    }

    fn ids(records: &[ClientType]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_splice_move_last_to_first() {
        let before = records(5);
        let after = splice_move(&before, 4, 0).unwrap();

        assert_eq!(ids(&after), vec!["id-4", "id-0", "id-1", "id-2", "id-3"]);
        assert!(is_contiguous(&after));

        let patch = diff(&before, &after);
        assert_eq!(patch.len(), 5);
        assert_eq!(patch.position_of("id-4"), Some(0));
        for i in 0..4 {
            assert_eq!(patch.position_of(&format!("id-{i}")), Some(i + 1));
        }
    }

    #[test]
    fn test_splice_move_adjacent_diffs_two() {
        let before = records(5);
        let after = splice_move(&before, 1, 2).unwrap();
        let patch = diff(&before, &after);

        let mut changed: Vec<_> = patch.ids().collect();
        changed.sort();
        assert_eq!(changed, vec!["id-1", "id-2"]);
    }

    #[test]
    fn test_splice_move_to_end_shifts_tail_only() {
        let before = records(6);
        let after = splice_move(&before, 2, 5).unwrap();
        let patch = diff(&before, &after);

        assert_eq!(patch.len(), 4);
        assert_eq!(patch.position_of("id-0"), None);
        assert_eq!(patch.position_of("id-1"), None);
        assert_eq!(patch.position_of("id-2"), Some(5));
        assert_eq!(patch.position_of("id-5"), Some(4));
    }

    #[test]
    fn test_minimal_diff_size_for_every_pair() {
        let before = records(7);
        for from in 0..7usize {
            for to in 0..7usize {
                let after = splice_move(&before, from, to).unwrap();
                assert!(is_contiguous(&after));
                assert_eq!(after[to].id, before[from].id);

                let expected = if from == to { 0 } else { from.abs_diff(to) + 1 };
                assert_eq!(diff(&before, &after).len(), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_splice_move_reuses_sparse_slots() {
        let before: Vec<ClientType> = [1u32, 2, 5, 6, 9]
            .iter()
            .enumerate()
            .map(|(i, p)| ClientType::new(format!("Type {i}")).with_id(format!("id-{i}")).with_position(*p))
            .collect();

        let after = splice_move(&before, 1, 3).unwrap();
        assert_eq!(ids(&after), vec!["id-0", "id-2", "id-3", "id-1", "id-4"]);
        let positions: Vec<u32> = after.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 5, 6, 9]);

        let patch = diff(&before, &after);
        assert_eq!(patch.len(), 3);
        assert_eq!(patch.position_of("id-2"), Some(2));
        assert_eq!(patch.position_of("id-3"), Some(5));
        assert_eq!(patch.position_of("id-1"), Some(6));
    }

    #[test]
    fn test_minimal_diff_holds_for_one_based_slots() {
        let before: Vec<ClientType> = records(5)
            .into_iter()
            .map(|r| {
                let position = r.position + 1;
                r.with_position(position)
            })
            .collect();
        for from in 0..5usize {
            for to in 0..5usize {
                let after = splice_move(&before, from, to).unwrap();
                assert_eq!(after[to].id, before[from].id);
                assert!(after.windows(2).all(|w| w[0].position < w[1].position));

                let patch = diff(&before, &after);
                let expected = if from == to { 0 } else { from.abs_diff(to) + 1 };
                assert_eq!(patch.len(), expected, "{from} -> {to}");
                assert_eq!(patch.position_of(&before[from].id).is_some(), from != to);
            }
        }
    }

    #[test]
    fn test_close_gap_keeps_order() {
        let mut list = records(4);
        list.remove(1);
        close_gap(&mut list, 1);
        assert_eq!(ids(&list), vec!["id-0", "id-2", "id-3"]);
        assert!(is_contiguous(&list));
    }

    #[test]
    fn test_splice_move_rejects_out_of_range() {
        let before = records(3);
        assert_eq!(
            splice_move(&before, 3, 0),
            Err(CoreError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert!(splice_move(&before, 0, 9).is_err());
        assert!(splice_move(&[], 0, 0).is_err());
    }

    #[test]
    fn test_swap_adjacent() {
        let mut list = records(3);

        assert!(swap_adjacent(&mut list, 1, Direction::Down));
        assert_eq!(ids(&list), vec!["id-0", "id-2", "id-1"]);
        assert!(is_contiguous(&list));

        assert!(swap_adjacent(&mut list, 1, Direction::Up));
        assert_eq!(ids(&list), vec!["id-2", "id-0", "id-1"]);
        assert!(is_contiguous(&list));
    }

    #[test]
    fn test_swap_adjacent_at_edges_is_noop() {
        let mut list = records(3);
        assert!(!swap_adjacent(&mut list, 0, Direction::Up));
        assert!(!swap_adjacent(&mut list, 2, Direction::Down));
        assert!(!swap_adjacent(&mut list, 9, Direction::Up));
        assert_eq!(ids(&list), vec!["id-0", "id-1", "id-2"]);
        assert!(is_contiguous(&list));
    }

    #[test]
    fn test_diff_of_identical_orderings_is_empty() {
        let list = records(4);
        assert!(diff(&list, &list).is_empty());
    }

    #[test]
    fn test_diff_includes_unknown_records() {
        let confirmed = records(2);
        let mut proposed = records(2);
        proposed.push(ClientType::new("Ghost").with_id("ghost").with_position(2));

        let patch = diff(&confirmed, &proposed);
        assert_eq!(patch.ids().collect::<Vec<_>>(), vec!["ghost"]);
    }

    #[test]
    fn test_sort_by_position_breaks_ties_by_id() {
        let mut list = vec![
            ClientType::new("b").with_id("b").with_position(1),
            ClientType::new("c").with_id("c").with_position(0),
            ClientType::new("a").with_id("a").with_position(1),
        ];
        sort_by_position(&mut list);
        assert_eq!(ids(&list), vec!["c", "a", "b"]);
    }
}
