// Copyright (C) 2022 Quickwit, Inc.
//
// Quickwit is offered under the AGPL v3.0 and as commercial software.
// For commercial licensing, contact us at hello@quickwit.io.
//
// AGPL:
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

use std::collections::BTreeMap;

use hstream_store::Lsn;

use crate::record_id::{BatchNumMap, RecordId};

/// Inclusive range of record ids, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordIdRange {
    pub start: RecordId,
    pub end: RecordId,
}

impl RecordIdRange {
    pub fn new(start: RecordId, end: RecordId) -> Self {
        debug_assert!(start <= end);
        RecordIdRange { start, end }
    }

    fn contains(&self, record_id: RecordId) -> bool {
        self.start <= record_id && record_id <= self.end
    }
}

/// What an ack insertion did, for logging purposes. Duplicate and
/// below-window acks are idempotent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Inserted,
    DuplicateAck,
    AckBelowWindow,
}

/// Sparse set of acked record ids above the window lower bound, kept as
/// pairwise disjoint, pairwise non-adjacent ranges keyed by their start.
///
/// Adjacency is defined by the batch-map arithmetic of
/// [`BatchNumMap::ids_adjacent`]; an insert touching a neighbor always
/// merges, so the representation is canonical after every operation.
#[derive(Debug, Clone, Default)]
pub struct AckedRanges {
    ranges: BTreeMap<RecordId, RecordIdRange>,
}

impl AckedRanges {
    /// Folds one ack into the set.
    ///
    /// Acks below `lower_bound` (already checkpointed) and acks covered by an
    /// existing range (duplicates) leave the set unchanged.
    pub fn insert_ack(
        &mut self,
        record_id: RecordId,
        lower_bound: RecordId,
        batch_num_map: &BatchNumMap,
    ) -> AckOutcome {
        if record_id < lower_bound {
            return AckOutcome::AckBelowWindow;
        }
        if self.contains(record_id) {
            return AckOutcome::DuplicateAck;
        }
        self.insert_range(RecordIdRange::new(record_id, record_id), batch_num_map);
        AckOutcome::Inserted
    }

    /// Records a storage gap `[lo, hi]` as delivered-and-acked.
    ///
    /// The synthetic range spans `(lo, 0) ..= (hi, u32::MAX)` so that any
    /// record id falling inside the gap is covered. The portion below
    /// `lower_bound`, if any, is already checkpointed and dropped.
    pub fn insert_gap(
        &mut self,
        lo: Lsn,
        hi: Lsn,
        lower_bound: RecordId,
        batch_num_map: &BatchNumMap,
    ) {
        let start = RecordId::new(lo, 0).max(lower_bound);
        let end = RecordId::new(hi, u32::MAX);
        if end < start {
            return;
        }
        self.insert_range(RecordIdRange::new(start, end), batch_num_map);
    }

    /// Inserts `range`, merging every overlapping or adjacent neighbor.
    fn insert_range(&mut self, mut range: RecordIdRange, batch_num_map: &BatchNumMap) {
        // Absorb the closest range starting at or before `range.start`.
        if let Some((&predecessor_start, predecessor)) =
            self.ranges.range(..=range.start).next_back()
        {
            if predecessor.contains(range.start)
                || batch_num_map.ids_adjacent(predecessor.end, range.start)
            {
                if predecessor.end >= range.end {
                    // `range` is entirely covered.
                    return;
                }
                range.start = predecessor_start;
                self.ranges.remove(&predecessor_start);
            }
        }
        // Absorb every range overlapping or adjacent to the right.
        while let Some((&successor_start, successor)) =
            self.ranges.range(range.start..).next()
        {
            if successor_start <= range.end || batch_num_map.ids_adjacent(range.end, successor_start)
            {
                range.end = range.end.max(successor.end);
                self.ranges.remove(&successor_start);
            } else {
                break;
            }
        }
        self.ranges.insert(range.start, range);
    }

    /// Removes the minimum range if it starts exactly at `lower_bound`,
    /// returning the new lower bound and the record id to checkpoint.
    ///
    /// Callers apply this repeatedly until it returns `None`; each range is
    /// removed exactly once, so the loop is amortized O(1) per ack.
    pub fn advance_window(
        &mut self,
        lower_bound: RecordId,
        batch_num_map: &BatchNumMap,
    ) -> Option<(RecordId, RecordId)> {
        let (&min_start, min_range) = self.ranges.iter().next()?;
        debug_assert!(min_start >= lower_bound);
        if min_start != lower_bound {
            return None;
        }
        let checkpoint_id = min_range.end;
        self.ranges.remove(&min_start);
        let new_lower_bound = batch_num_map.successor(checkpoint_id);
        Some((new_lower_bound, checkpoint_id))
    }

    pub fn contains(&self, record_id: RecordId) -> bool {
        self.ranges
            .range(..=record_id)
            .next_back()
            .map(|(_, range)| range.contains(record_id))
            .unwrap_or(false)
    }

    pub fn num_ranges(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[cfg(test)]
    fn as_vec(&self) -> Vec<RecordIdRange> {
        self.ranges.values().copied().collect()
    }
}
