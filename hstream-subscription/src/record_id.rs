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
use std::fmt;

use hstream_store::Lsn;

/// Total-ordered identifier of a record: `(batch LSN, index within batch)`.
/// The derived ordering is lexicographic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub batch_id: Lsn,
    pub batch_index: u32,
}

impl RecordId {
    pub const fn new(batch_id: Lsn, batch_index: u32) -> Self {
        RecordId {
            batch_id,
            batch_index,
        }
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "({}, {})", self.batch_id, self.batch_index)
    }
}

impl From<hstream_proto::RecordId> for RecordId {
    fn from(record_id: hstream_proto::RecordId) -> Self {
        RecordId::new(record_id.batch_id, record_id.batch_index)
    }
}

impl From<RecordId> for hstream_proto::RecordId {
    fn from(record_id: RecordId) -> Self {
        hstream_proto::RecordId {
            batch_id: record_id.batch_id,
            batch_index: record_id.batch_index,
        }
    }
}

/// Number of records of each batch this runtime has seen, keyed by batch LSN.
///
/// Populated on read. Entries below the delivery window lower bound may be
/// pruned; correctness does not depend on pruning.
#[derive(Debug, Clone, Default)]
pub struct BatchNumMap {
    num_records_per_batch: BTreeMap<Lsn, u32>,
}

impl BatchNumMap {
    pub fn record(&mut self, batch_id: Lsn, num_records: u32) {
        self.num_records_per_batch.insert(batch_id, num_records);
    }

    pub fn num_records(&self, batch_id: Lsn) -> Option<u32> {
        self.num_records_per_batch.get(&batch_id).copied()
    }

    /// The record id immediately following `record_id` in the total order.
    ///
    /// Within a known batch this advances the index; at the end of a known
    /// batch it advances to the next known batch. When the batch is unknown
    /// (a gap bound) or no later batch is known yet, it falls back to
    /// `(batch_id + 1, 0)`.
    pub fn successor(&self, record_id: RecordId) -> RecordId {
        if let Some(num_records) = self.num_records(record_id.batch_id) {
            if record_id.batch_index + 1 < num_records {
                return RecordId::new(record_id.batch_id, record_id.batch_index + 1);
            }
            if let Some((&next_batch_id, _)) = self
                .num_records_per_batch
                .range(record_id.batch_id + 1..)
                .next()
            {
                return RecordId::new(next_batch_id, 0);
            }
        }
        RecordId::new(record_id.batch_id + 1, 0)
    }

    /// The record id immediately preceding `record_id`, or `None` when no
    /// earlier batch is known.
    pub fn predecessor(&self, record_id: RecordId) -> Option<RecordId> {
        if record_id.batch_index > 0 {
            return Some(RecordId::new(
                record_id.batch_id,
                record_id.batch_index - 1,
            ));
        }
        let (&previous_batch_id, &num_records) = self
            .num_records_per_batch
            .range(..record_id.batch_id)
            .next_back()?;
        Some(RecordId::new(
            previous_batch_id,
            num_records.saturating_sub(1),
        ))
    }

    /// Whether `right` directly follows `left`, under either direction of the
    /// batch-map arithmetic. The two directions differ around gap bounds,
    /// whose batches never enter the map.
    pub fn ids_adjacent(&self, left: RecordId, right: RecordId) -> bool {
        self.successor(left) == right || self.predecessor(right) == Some(left)
    }

    /// Drops entries strictly below `lower_bound.batch_id`.
    pub fn prune_below(&mut self, lower_bound: RecordId) {
        self.num_records_per_batch = self
            .num_records_per_batch
            .split_off(&lower_bound.batch_id);
    }

    pub fn num_batches(&self) -> usize {
        self.num_records_per_batch.len()
    }
}
