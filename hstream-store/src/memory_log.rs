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

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    GapKind, LogClient, LogEntry, LogId, LogReader, LogRereader, Lsn, StoreError, StoreResult,
};

#[derive(Default)]
struct LogState {
    /// One entry per appended batch, keyed by its LSN.
    batches: BTreeMap<Lsn, Vec<Vec<u8>>>,
    /// All LSNs `<= trimmed_up_to` have been trimmed away.
    trimmed_up_to: Option<Lsn>,
    last_lsn: Lsn,
}

#[derive(Default)]
struct InnerStore {
    log_ids: HashMap<String, LogId>,
    logs: HashMap<LogId, LogState>,
    checkpoints: HashMap<(String, LogId), Lsn>,
    next_log_id: LogId,
}

/// In-process implementation of [`LogClient`].
///
/// Backs tests and single-node deployments. Appends assign consecutive LSNs
/// starting at [`LSN_MIN`]; `trim` makes subsequent reads over the removed
/// range surface a single [`LogEntry::Gap`].
#[derive(Clone, Default)]
pub struct MemoryLogStore {
    inner: Arc<RwLock<InnerStore>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new log for `stream_name`.
    pub async fn create_log(&self, stream_name: &str) -> StoreResult<LogId> {
        let mut inner = self.inner.write().await;
        if inner.log_ids.contains_key(stream_name) {
            return Err(StoreError::Internal(anyhow!(
                "Log for stream `{stream_name}` already exists."
            )));
        }
        inner.next_log_id += 1;
        let log_id = inner.next_log_id;
        inner.log_ids.insert(stream_name.to_string(), log_id);
        inner.logs.insert(log_id, LogState::default());
        debug!(stream_name = %stream_name, log_id = log_id, "memory-log-created");
        Ok(log_id)
    }

    /// Appends one batch of records, all sharing the newly assigned LSN.
    pub async fn append_batch(&self, log_id: LogId, payloads: Vec<Vec<u8>>) -> StoreResult<Lsn> {
        let mut inner = self.inner.write().await;
        let log = inner
            .logs
            .get_mut(&log_id)
            .ok_or(StoreError::UnknownLog { log_id })?;
        log.last_lsn += 1;
        let lsn = log.last_lsn;
        log.batches.insert(lsn, payloads);
        Ok(lsn)
    }

    /// Trims every batch with an LSN `<= up_to`.
    pub async fn trim(&self, log_id: LogId, up_to: Lsn) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let log = inner
            .logs
            .get_mut(&log_id)
            .ok_or(StoreError::UnknownLog { log_id })?;
        log.batches = log.batches.split_off(&(up_to + 1));
        log.trimmed_up_to = Some(log.trimmed_up_to.map_or(up_to, |prev| prev.max(up_to)));
        debug!(log_id = log_id, up_to = up_to, "memory-log-trimmed");
        Ok(())
    }
}

#[async_trait]
impl LogClient for MemoryLogStore {
    async fn resolve_log(&self, stream_name: &str) -> StoreResult<LogId> {
        let inner = self.inner.read().await;
        inner
            .log_ids
            .get(stream_name)
            .copied()
            .ok_or_else(|| StoreError::LogNotFound {
                stream_name: stream_name.to_string(),
            })
    }

    async fn tail_lsn(&self, log_id: LogId) -> StoreResult<Lsn> {
        let inner = self.inner.read().await;
        let log = inner
            .logs
            .get(&log_id)
            .ok_or(StoreError::UnknownLog { log_id })?;
        Ok(log.last_lsn)
    }

    async fn open_reader(&self, log_id: LogId, start_lsn: Lsn) -> StoreResult<Box<dyn LogReader>> {
        let inner = self.inner.read().await;
        if !inner.logs.contains_key(&log_id) {
            return Err(StoreError::UnknownLog { log_id });
        }
        Ok(Box::new(MemoryLogReader {
            inner: self.inner.clone(),
            log_id,
            position: start_lsn,
        }))
    }

    async fn open_rereader(&self, log_id: LogId) -> StoreResult<Box<dyn LogRereader>> {
        let inner = self.inner.read().await;
        if !inner.logs.contains_key(&log_id) {
            return Err(StoreError::UnknownLog { log_id });
        }
        Ok(Box::new(MemoryLogRereader {
            inner: self.inner.clone(),
            log_id,
            range: None,
        }))
    }

    async fn write_checkpoint(
        &self,
        subscription_id: &str,
        log_id: LogId,
        lsn: Lsn,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.logs.contains_key(&log_id) {
            return Err(StoreError::CheckpointFailure {
                log_id,
                message: "log is not registered with this store".to_string(),
            });
        }
        inner
            .checkpoints
            .insert((subscription_id.to_string(), log_id), lsn);
        Ok(())
    }

    async fn read_checkpoint(
        &self,
        subscription_id: &str,
        log_id: LogId,
    ) -> StoreResult<Option<Lsn>> {
        let inner = self.inner.read().await;
        Ok(inner
            .checkpoints
            .get(&(subscription_id.to_string(), log_id))
            .copied())
    }
}

struct MemoryLogReader {
    inner: Arc<RwLock<InnerStore>>,
    log_id: LogId,
    position: Lsn,
}

/// Copies out whole batches from `position` on, stopping before a batch that
/// would overflow `max_records` unless it is the first one.
fn read_from(
    log: &LogState,
    position: &mut Lsn,
    hi: Lsn,
    max_records: usize,
) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    if let Some(trimmed_up_to) = log.trimmed_up_to {
        if *position <= trimmed_up_to {
            let gap_hi = trimmed_up_to.min(hi);
            entries.push(LogEntry::Gap {
                kind: GapKind::Trim,
                lo: *position,
                hi: gap_hi,
            });
            *position = gap_hi + 1;
        }
    }
    let mut num_records = 0;
    for (&lsn, batch) in log.batches.range(*position..=hi) {
        if num_records > 0 && num_records + batch.len() > max_records {
            break;
        }
        for payload in batch {
            entries.push(LogEntry::Record {
                lsn,
                payload: payload.clone(),
            });
        }
        num_records += batch.len();
        *position = lsn + 1;
        if num_records >= max_records {
            break;
        }
    }
    entries
}

#[async_trait]
impl LogReader for MemoryLogReader {
    async fn read(&mut self, max_records: usize) -> StoreResult<Vec<LogEntry>> {
        let inner = self.inner.read().await;
        let log = inner.logs.get(&self.log_id).ok_or(StoreError::UnknownLog {
            log_id: self.log_id,
        })?;
        Ok(read_from(log, &mut self.position, Lsn::MAX, max_records))
    }
}

struct MemoryLogRereader {
    inner: Arc<RwLock<InnerStore>>,
    log_id: LogId,
    /// `(position, hi)` of the currently seeked range.
    range: Option<(Lsn, Lsn)>,
}

#[async_trait]
impl LogRereader for MemoryLogRereader {
    async fn seek(&mut self, lo: Lsn, hi: Lsn) -> StoreResult<()> {
        self.range = Some((lo, hi));
        Ok(())
    }

    async fn read(&mut self, max_records: usize) -> StoreResult<Vec<LogEntry>> {
        let (mut position, hi) = match self.range {
            Some(range) => range,
            None => return Ok(Vec::new()),
        };
        let inner = self.inner.read().await;
        let log = inner.logs.get(&self.log_id).ok_or(StoreError::UnknownLog {
            log_id: self.log_id,
        })?;
        let entries = read_from(log, &mut position, hi, max_records);
        self.range = Some((position, hi));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LSN_INVALID, LSN_MIN};

    fn payloads(labels: &[&str]) -> Vec<Vec<u8>> {
        labels.iter().map(|label| label.as_bytes().to_vec()).collect()
    }

    #[tokio::test]
    async fn test_memory_log_read_groups_batches() -> anyhow::Result<()> {
        let store = MemoryLogStore::new();
        let log_id = store.create_log("events").await?;
        let lsn_1 = store.append_batch(log_id, payloads(&["a", "b"])).await?;
        let lsn_2 = store.append_batch(log_id, payloads(&["c"])).await?;
        assert_eq!((lsn_1, lsn_2), (1, 2));

        let mut reader = store.open_reader(log_id, LSN_MIN).await?;
        let entries = reader.read(1000).await?;
        assert_eq!(
            entries,
            vec![
                LogEntry::Record {
                    lsn: 1,
                    payload: b"a".to_vec()
                },
                LogEntry::Record {
                    lsn: 1,
                    payload: b"b".to_vec()
                },
                LogEntry::Record {
                    lsn: 2,
                    payload: b"c".to_vec()
                },
            ]
        );
        // The reader advanced past everything available.
        assert!(reader.read(1000).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_log_never_splits_a_batch() -> anyhow::Result<()> {
        let store = MemoryLogStore::new();
        let log_id = store.create_log("events").await?;
        store.append_batch(log_id, payloads(&["a", "b"])).await?;
        store.append_batch(log_id, payloads(&["c", "d"])).await?;

        let mut reader = store.open_reader(log_id, LSN_MIN).await?;
        // Limit of 3 stops before the second batch rather than splitting it.
        let entries = reader.read(3).await?;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| entry.lsn() == 1));

        // A batch larger than the limit is still returned whole when it is
        // the first batch of the read.
        let entries = reader.read(1).await?;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| entry.lsn() == 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_log_trim_reports_gap() -> anyhow::Result<()> {
        hstream_common::setup_logging_for_tests();
        let store = MemoryLogStore::new();
        let log_id = store.create_log("events").await?;
        for label in ["a", "b", "c"] {
            store.append_batch(log_id, payloads(&[label])).await?;
        }
        store.trim(log_id, 2).await?;

        let mut reader = store.open_reader(log_id, LSN_MIN).await?;
        let entries = reader.read(1000).await?;
        assert_eq!(
            entries,
            vec![
                LogEntry::Gap {
                    kind: GapKind::Trim,
                    lo: LSN_MIN,
                    hi: 2
                },
                LogEntry::Record {
                    lsn: 3,
                    payload: b"c".to_vec()
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_log_tail_lsn() -> anyhow::Result<()> {
        let store = MemoryLogStore::new();
        let log_id = store.create_log("events").await?;
        assert_eq!(store.tail_lsn(log_id).await?, LSN_INVALID);
        store.append_batch(log_id, payloads(&["a"])).await?;
        store.append_batch(log_id, payloads(&["b"])).await?;
        assert_eq!(store.tail_lsn(log_id).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_log_checkpoint_roundtrip() -> anyhow::Result<()> {
        let store = MemoryLogStore::new();
        let log_id = store.create_log("events").await?;
        assert_eq!(store.read_checkpoint("sub-1", log_id).await?, None);
        store.write_checkpoint("sub-1", log_id, 17).await?;
        store.write_checkpoint("sub-2", log_id, 4).await?;
        assert_eq!(store.read_checkpoint("sub-1", log_id).await?, Some(17));
        assert_eq!(store.read_checkpoint("sub-2", log_id).await?, Some(4));
        Ok(())
    }

    #[tokio::test]
    async fn test_rereader_reads_a_seeked_range() -> anyhow::Result<()> {
        let store = MemoryLogStore::new();
        let log_id = store.create_log("events").await?;
        for labels in [&["a", "b"][..], &["c"][..], &["d"][..]] {
            store.append_batch(log_id, payloads(labels)).await?;
        }
        let mut rereader = store.open_rereader(log_id).await?;
        // Unseeked rereads return nothing.
        assert!(rereader.read(1000).await?.is_empty());

        rereader.seek(2, 2).await?;
        let entries = rereader.read(1000).await?;
        assert_eq!(
            entries,
            vec![LogEntry::Record {
                lsn: 2,
                payload: b"c".to_vec()
            }]
        );
        // The seeked range is exhausted.
        assert!(rereader.read(1000).await?.is_empty());

        rereader.seek(1, 3).await?;
        assert_eq!(rereader.read(1000).await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_unknown_stream() {
        let store = MemoryLogStore::new();
        let error = store.resolve_log("missing").await.unwrap_err();
        assert!(matches!(
            error,
            StoreError::LogNotFound { stream_name } if stream_name == "missing"
        ));
    }
}
