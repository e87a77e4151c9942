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

//! Client abstraction over the replicated log store backing streams.
//!
//! The storage layer itself is an external system. This crate only defines
//! the client surface the subscription engine programs against: ordered
//! reads with gap reporting, positionable rereads for redelivery, and a
//! per-subscription checkpoint slot. [`MemoryLogStore`] is an in-process
//! implementation backing tests and single-node deployments.

mod error;
mod memory_log;

use async_trait::async_trait;

pub use crate::error::{StoreError, StoreResult};
pub use crate::memory_log::MemoryLogStore;

/// Log sequence number assigned by the storage layer.
/// Strictly increasing within a log; one LSN covers one appended batch.
pub type Lsn = u64;

/// Identifier of a log within the store. Each stream maps to exactly one log.
pub type LogId = u64;

/// LSN 0 is reserved as "no LSN"; assigned LSNs start at [`LSN_MIN`].
pub const LSN_INVALID: Lsn = 0;
pub const LSN_MIN: Lsn = 1;
pub const LSN_MAX: Lsn = Lsn::MAX;

/// Why the storage layer reports an LSN range as undeliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    /// Records were trimmed by retention.
    Trim,
    /// Records were released without data (e.g. skipped epochs).
    Release,
    Unknown,
}

/// A single unit returned by a log read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// One record of a batch. Records of the same appended batch share an LSN
    /// and are returned consecutively, in append order.
    Record { lsn: Lsn, payload: Vec<u8> },
    /// An inclusive LSN range `[lo, hi]` containing no deliverable records.
    Gap { kind: GapKind, lo: Lsn, hi: Lsn },
}

impl LogEntry {
    pub fn lsn(&self) -> Lsn {
        match self {
            LogEntry::Record { lsn, .. } => *lsn,
            LogEntry::Gap { lo, .. } => *lo,
        }
    }
}

/// A stateful forward cursor over one log.
///
/// Reads are non-blocking: a read returns whatever is currently available,
/// possibly nothing. Implementations never split the records of one batch
/// (one LSN) across two reads, so callers can derive batch sizes from a
/// single read.
#[async_trait]
pub trait LogReader: Send {
    /// Returns at most `max_records` record entries. Gap entries do not
    /// count towards the limit.
    async fn read(&mut self, max_records: usize) -> StoreResult<Vec<LogEntry>>;
}

/// A positionable cursor used to re-read already delivered LSNs.
#[async_trait]
pub trait LogRereader: Send {
    /// Repositions the cursor on the inclusive LSN range `[lo, hi]`.
    async fn seek(&mut self, lo: Lsn, hi: Lsn) -> StoreResult<()>;

    /// Reads at most `max_records` record entries from the current range.
    async fn read(&mut self, max_records: usize) -> StoreResult<Vec<LogEntry>>;
}

/// Client handle on the log store.
#[async_trait]
pub trait LogClient: Send + Sync + 'static {
    /// Resolves the log backing `stream_name`, failing with
    /// [`StoreError::LogNotFound`] if the stream does not exist.
    async fn resolve_log(&self, stream_name: &str) -> StoreResult<LogId>;

    /// Returns the LSN of the last appended batch, or [`LSN_INVALID`] for
    /// an empty log.
    async fn tail_lsn(&self, log_id: LogId) -> StoreResult<Lsn>;

    /// Opens a forward reader positioned at `start_lsn` with `LSN_MAX` as
    /// the upper bound.
    async fn open_reader(&self, log_id: LogId, start_lsn: Lsn) -> StoreResult<Box<dyn LogReader>>;

    /// Opens an unpositioned rereader. Callers must `seek` before reading.
    async fn open_rereader(&self, log_id: LogId) -> StoreResult<Box<dyn LogRereader>>;

    /// Durably records that `subscription_id` has processed everything up to
    /// and including `lsn`. One slot per `(subscription_id, log_id)` pair.
    async fn write_checkpoint(
        &self,
        subscription_id: &str,
        log_id: LogId,
        lsn: Lsn,
    ) -> StoreResult<()>;

    /// Reads back the checkpoint slot, if any was ever written.
    async fn read_checkpoint(
        &self,
        subscription_id: &str,
        log_id: LogId,
    ) -> StoreResult<Option<Lsn>>;
}
