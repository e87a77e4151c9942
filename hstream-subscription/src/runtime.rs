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
use std::sync::Arc;
use std::time::Duration;

use hstream_proto::tonic;
use hstream_store::{LogClient, LogEntry, LogId, LogReader, LogRereader, Lsn};
use serde_json::json;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::acked_ranges::{AckOutcome, AckedRanges};
use crate::dispatcher::{self, ConsumerSender};
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::record_id::{BatchNumMap, RecordId};

/// Upper bound on the number of records pulled from the log per dispatch
/// iteration.
pub(crate) const DISPATCH_BATCH_SIZE: usize = 1000;

/// Cadence of the dispatch loop.
pub(crate) const DISPATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Mutable per-subscription state. Guarded by the runtime mutex; critical
/// sections never span log reads or consumer sends.
struct RuntimeState {
    /// Next record id expected; everything strictly below is checkpointed.
    window_lower_bound: RecordId,
    /// Highest record id ever dispatched. Diagnostics only; advancement
    /// never consults it.
    window_upper_bound: RecordId,
    acked_ranges: AckedRanges,
    batch_num_map: BatchNumMap,
    /// One sender per attached consumer, in canonical name order.
    stream_sends: BTreeMap<String, ConsumerSender>,
    /// One-shot waiters parked on "a consumer exists again".
    signals: Vec<oneshot::Sender<()>>,
    /// Cleared once deletion begins; all further work short-circuits.
    valid: bool,
}

/// Serializes checkpoint writes and enforces their monotonicity: a write
/// below the last written LSN is skipped, never issued.
struct Checkpointer {
    log_client: Arc<dyn LogClient>,
    subscription_id: String,
    log_id: LogId,
    last_written_lsn: Mutex<Option<Lsn>>,
}

impl Checkpointer {
    async fn write(&self, lsn: Lsn) -> SubscriptionResult<()> {
        let mut last_written_lsn = self.last_written_lsn.lock().await;
        if last_written_lsn.map_or(false, |last_lsn| lsn < last_lsn) {
            return Ok(());
        }
        self.log_client
            .write_checkpoint(&self.subscription_id, self.log_id, lsn)
            .await?;
        *last_written_lsn = Some(lsn);
        debug!(subscription_id = %self.subscription_id, lsn = lsn, "checkpoint-written");
        Ok(())
    }
}

/// What one dispatch iteration did.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Nothing to deliver right now.
    Idle,
    /// These record ids were handed to consumers; schedule their resend.
    Dispatched(Vec<RecordId>),
    /// The runtime is deleted; the dispatch loop must end.
    Stopped,
}

/// What one resend tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// Some records are still unacked; tick again after the ack timeout.
    Pending,
    /// Every record of this resend set is acked.
    Finished,
    /// The runtime is deleted.
    Stopped,
}

/// Per-subscription delivery runtime.
///
/// Holds the delivery window, the ack range set, and the senders of the
/// currently attached consumers. One instance exists per active
/// subscription; it survives its last consumer detaching and is destroyed
/// only through deletion.
pub struct SubscriptionRuntime {
    subscription_id: String,
    stream_name: String,
    log_id: LogId,
    ack_timeout: Duration,
    state: Mutex<RuntimeState>,
    checkpointer: Checkpointer,
    /// Positionable cursor for redelivery. Its own lock: rereads must not
    /// hold the state mutex across storage I/O.
    rereader: Mutex<Box<dyn LogRereader>>,
}

impl std::fmt::Debug for SubscriptionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRuntime")
            .field("subscription_id", &self.subscription_id)
            .field("stream_name", &self.stream_name)
            .field("log_id", &self.log_id)
            .field("ack_timeout", &self.ack_timeout)
            .finish_non_exhaustive()
    }
}

impl SubscriptionRuntime {
    pub(crate) fn new(
        subscription_id: String,
        stream_name: String,
        log_id: LogId,
        ack_timeout: Duration,
        start_lsn: Lsn,
        log_client: Arc<dyn LogClient>,
        rereader: Box<dyn LogRereader>,
    ) -> Self {
        let start_record_id = RecordId::new(start_lsn, 0);
        SubscriptionRuntime {
            subscription_id: subscription_id.clone(),
            stream_name,
            log_id,
            ack_timeout,
            state: Mutex::new(RuntimeState {
                window_lower_bound: start_record_id,
                window_upper_bound: start_record_id,
                acked_ranges: AckedRanges::default(),
                batch_num_map: BatchNumMap::default(),
                stream_sends: BTreeMap::new(),
                signals: Vec::new(),
                valid: true,
            }),
            checkpointer: Checkpointer {
                log_client,
                subscription_id,
                log_id,
                last_written_lsn: Mutex::new(None),
            },
            rereader: Mutex::new(rereader),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Registers a consumer sender, waking every parked dispatch or resend
    /// waiter. A sender already registered under the same name is replaced;
    /// the stale session ends when its receiving half is dropped.
    pub async fn attach_consumer(
        &self,
        consumer_name: &str,
        sender: ConsumerSender,
    ) -> SubscriptionResult<()> {
        let mut state = self.state.lock().await;
        if !state.valid {
            return Err(SubscriptionError::SubscriptionRemoved);
        }
        if state
            .stream_sends
            .insert(consumer_name.to_string(), sender)
            .is_some()
        {
            debug!(
                subscription_id = %self.subscription_id,
                consumer = %consumer_name,
                "consumer-sender-replaced"
            );
        }
        for waiter in state.signals.drain(..) {
            let _ = waiter.send(());
        }
        info!(
            subscription_id = %self.subscription_id,
            consumer = %consumer_name,
            num_consumers = state.stream_sends.len(),
            "consumer-attached"
        );
        Ok(())
    }

    /// Removes the consumer's sender if it is still the registered one.
    /// Idempotent; the runtime itself is left intact.
    pub async fn detach_consumer(&self, consumer_name: &str, sender: &ConsumerSender) {
        let mut state = self.state.lock().await;
        let is_current = state
            .stream_sends
            .get(consumer_name)
            .map(|current| current.same_channel(sender))
            .unwrap_or(false);
        if is_current {
            state.stream_sends.remove(consumer_name);
            info!(
                subscription_id = %self.subscription_id,
                consumer = %consumer_name,
                num_consumers = state.stream_sends.len(),
                "consumer-detached"
            );
        }
    }

    /// Folds a batch of acks into the range set, advances the window as far
    /// as the contiguous acked prefix reaches, and checkpoints each
    /// advancement.
    pub async fn ack_batch(&self, ack_ids: &[RecordId]) -> SubscriptionResult<()> {
        let checkpoint_ids = {
            let mut state_guard = self.state.lock().await;
            let state = &mut *state_guard;
            if !state.valid {
                return Err(SubscriptionError::SubscriptionRemoved);
            }
            debug!(
                subscription_id = %self.subscription_id,
                num_acks = ack_ids.len(),
                "before-handle-acks"
            );
            for &ack_id in ack_ids {
                match state.acked_ranges.insert_ack(
                    ack_id,
                    state.window_lower_bound,
                    &state.batch_num_map,
                ) {
                    AckOutcome::Inserted => {}
                    AckOutcome::DuplicateAck => {
                        debug!(subscription_id = %self.subscription_id, ack_id = ?ack_id, "duplicate-ack");
                    }
                    AckOutcome::AckBelowWindow => {
                        debug!(subscription_id = %self.subscription_id, ack_id = ?ack_id, "ack-below-window");
                    }
                }
            }
            let checkpoint_ids = Self::advance_window(state);
            debug!(
                subscription_id = %self.subscription_id,
                window_lower_bound = ?state.window_lower_bound,
                "after-handle-acks"
            );
            checkpoint_ids
        };
        self.write_checkpoints(&checkpoint_ids).await
    }

    /// Applies `advance_window` until it returns `None` and prunes the batch
    /// map below the new lower bound. Call with the state lock held.
    fn advance_window(state: &mut RuntimeState) -> Vec<RecordId> {
        let mut checkpoint_ids = Vec::new();
        while let Some((new_lower_bound, checkpoint_id)) = state
            .acked_ranges
            .advance_window(state.window_lower_bound, &state.batch_num_map)
        {
            state.window_lower_bound = new_lower_bound;
            checkpoint_ids.push(checkpoint_id);
        }
        if !checkpoint_ids.is_empty() {
            state.batch_num_map.prune_below(state.window_lower_bound);
        }
        checkpoint_ids
    }

    async fn write_checkpoints(&self, checkpoint_ids: &[RecordId]) -> SubscriptionResult<()> {
        for checkpoint_id in checkpoint_ids {
            self.checkpointer.write(checkpoint_id.batch_id).await?;
        }
        Ok(())
    }

    /// Marks the runtime deleted: pushes a terminal status to every consumer
    /// session, clears the senders, and wakes all parked waiters so they
    /// observe the flag and self-abort.
    pub async fn mark_deleted(&self) {
        let mut state = self.state.lock().await;
        state.valid = false;
        let stream_sends = std::mem::take(&mut state.stream_sends);
        for (_, sender) in stream_sends {
            let _ = sender.send(Err(tonic::Status::internal("Subscription has been removed")));
        }
        for waiter in state.signals.drain(..) {
            let _ = waiter.send(());
        }
        info!(subscription_id = %self.subscription_id, "subscription-runtime-deleted");
    }

    pub async fn is_valid(&self) -> bool {
        self.state.lock().await.valid
    }

    /// Parks until a consumer is attached. Returns `false` if the runtime
    /// was deleted while waiting.
    async fn wait_for_consumer(&self) -> bool {
        loop {
            let waiter = {
                let mut state = self.state.lock().await;
                if !state.valid {
                    return false;
                }
                if !state.stream_sends.is_empty() {
                    return true;
                }
                let (wake_sender, wake_receiver) = oneshot::channel();
                state.signals.push(wake_sender);
                wake_receiver
            };
            debug!(subscription_id = %self.subscription_id, "waiting-for-consumer");
            // A dropped sender just means another writer drained the signal
            // set first; re-check the state either way.
            let _ = waiter.await;
        }
    }

    /// One dispatch iteration: read a batch from `reader`, record batch
    /// sizes and gaps, and distribute the records round-robin.
    ///
    /// The state lock is held only to mutate state and snapshot the senders;
    /// the log read and the sends happen with the lock released, and send
    /// failures are reconciled in a second short critical section.
    pub async fn dispatch_once(
        &self,
        reader: &mut (dyn LogReader),
    ) -> SubscriptionResult<DispatchOutcome> {
        if !self.wait_for_consumer().await {
            return Ok(DispatchOutcome::Stopped);
        }
        let entries = reader.read(DISPATCH_BATCH_SIZE).await?;

        // Group consecutive records sharing an LSN into batches and assign
        // record ids in read order.
        let mut batch_sizes: Vec<(Lsn, u32)> = Vec::new();
        let mut gaps = Vec::new();
        let mut records: Vec<(RecordId, Vec<u8>)> = Vec::new();
        for entry in entries {
            match entry {
                LogEntry::Record { lsn, payload } => match batch_sizes.last_mut() {
                    Some((last_lsn, num_records)) if *last_lsn == lsn => {
                        records.push((RecordId::new(lsn, *num_records), payload));
                        *num_records += 1;
                    }
                    _ => {
                        batch_sizes.push((lsn, 1));
                        records.push((RecordId::new(lsn, 0), payload));
                    }
                },
                LogEntry::Gap { kind, lo, hi } => {
                    debug!(
                        subscription_id = %self.subscription_id,
                        kind = ?kind,
                        lo = lo,
                        hi = hi,
                        "gap-recorded-as-acked"
                    );
                    gaps.push((lo, hi));
                }
            }
        }
        let max_record_id = records.last().map(|(record_id, _)| *record_id);

        let stream_sends = {
            let mut state_guard = self.state.lock().await;
            let state = &mut *state_guard;
            if !state.valid {
                return Ok(DispatchOutcome::Stopped);
            }
            for &(lsn, num_records) in &batch_sizes {
                state.batch_num_map.record(lsn, num_records);
            }
            for &(lo, hi) in &gaps {
                state.acked_ranges.insert_gap(
                    lo,
                    hi,
                    state.window_lower_bound,
                    &state.batch_num_map,
                );
            }
            let max_record_id = match max_record_id {
                Some(max_record_id) => max_record_id,
                None => return Ok(DispatchOutcome::Idle),
            };
            state.window_upper_bound = state.window_upper_bound.max(max_record_id);
            state.stream_sends.clone()
        };

        let dispatched_ids: Vec<RecordId> =
            records.iter().map(|(record_id, _)| *record_id).collect();
        let failed_consumers = dispatcher::distribute(records, &stream_sends);
        self.remove_failed_consumers(&failed_consumers, &stream_sends)
            .await;
        Ok(DispatchOutcome::Dispatched(dispatched_ids))
    }

    /// One resend tick for `record_ids`: filters out everything acked in the
    /// meantime, rereads each survivor individually, and redelivers
    /// round-robin across the live senders.
    pub async fn resend_once(&self, record_ids: &[RecordId]) -> SubscriptionResult<ResendOutcome> {
        let (unacked_ids, batch_sizes, stream_sends) = loop {
            let snapshot = {
                let state = self.state.lock().await;
                if !state.valid {
                    return Ok(ResendOutcome::Stopped);
                }
                let unacked_ids: Vec<RecordId> = record_ids
                    .iter()
                    .copied()
                    .filter(|record_id| {
                        *record_id >= state.window_lower_bound
                            && !state.acked_ranges.contains(*record_id)
                    })
                    .collect();
                if unacked_ids.is_empty() {
                    return Ok(ResendOutcome::Finished);
                }
                if state.stream_sends.is_empty() {
                    None
                } else {
                    // A batch missing from the map can only come from a timer
                    // racing a delete/recreate of the subscription: the fresh
                    // runtime never dispatched these ids. Drop them.
                    let mut batch_sizes: BTreeMap<Lsn, u32> = BTreeMap::new();
                    let mut reread_ids = Vec::with_capacity(unacked_ids.len());
                    for record_id in unacked_ids {
                        match state.batch_num_map.num_records(record_id.batch_id) {
                            Some(num_records) => {
                                batch_sizes.insert(record_id.batch_id, num_records);
                                reread_ids.push(record_id);
                            }
                            None => {
                                warn!(
                                    subscription_id = %self.subscription_id,
                                    record_id = ?record_id,
                                    "resend-for-unknown-batch-dropped"
                                );
                            }
                        }
                    }
                    if reread_ids.is_empty() {
                        return Ok(ResendOutcome::Finished);
                    }
                    Some((reread_ids, batch_sizes, state.stream_sends.clone()))
                }
            };
            match snapshot {
                Some(snapshot) => break snapshot,
                None => {
                    if !self.wait_for_consumer().await {
                        return Ok(ResendOutcome::Stopped);
                    }
                }
            }
        };

        debug!(
            subscription_id = %self.subscription_id,
            num_records = unacked_ids.len(),
            "resending-unacked-records"
        );
        // Reread each unacked record by itself. Records whose batch was
        // trimmed in the meantime surface as gaps and are folded as acked.
        let mut resend_records: Vec<(RecordId, Vec<u8>)> = Vec::new();
        let mut reread_gaps: Vec<(Lsn, Lsn)> = Vec::new();
        {
            let mut rereader = self.rereader.lock().await;
            for &record_id in &unacked_ids {
                let num_records = batch_sizes[&record_id.batch_id];
                rereader.seek(record_id.batch_id, record_id.batch_id).await?;
                let entries = rereader.read(num_records as usize).await?;
                let mut batch_payloads: Vec<Vec<u8>> = Vec::new();
                for entry in entries {
                    match entry {
                        LogEntry::Record { lsn, payload } if lsn == record_id.batch_id => {
                            batch_payloads.push(payload);
                        }
                        LogEntry::Gap { lo, hi, .. } => reread_gaps.push((lo, hi)),
                        LogEntry::Record { .. } => {}
                    }
                }
                match batch_payloads
                    .into_iter()
                    .nth(record_id.batch_index as usize)
                {
                    Some(payload) => resend_records.push((record_id, payload)),
                    None => {
                        // The batch is gone (trimmed) or shorter than when it
                        // was dispatched; the gap fold below covers it.
                        debug!(
                            subscription_id = %self.subscription_id,
                            record_id = ?record_id,
                            "reread-record-unavailable"
                        );
                    }
                }
            }
        }
        let failed_consumers = dispatcher::redistribute(resend_records, &stream_sends);
        self.remove_failed_consumers(&failed_consumers, &stream_sends)
            .await;
        if !reread_gaps.is_empty() {
            self.fold_gaps(&reread_gaps).await?;
        }
        Ok(ResendOutcome::Pending)
    }

    /// Folds storage gaps discovered outside the dispatch path (e.g. during
    /// a reread) and advances the window if they complete the prefix.
    async fn fold_gaps(&self, gaps: &[(Lsn, Lsn)]) -> SubscriptionResult<()> {
        let checkpoint_ids = {
            let mut state_guard = self.state.lock().await;
            let state = &mut *state_guard;
            if !state.valid {
                return Ok(());
            }
            for &(lo, hi) in gaps {
                state.acked_ranges.insert_gap(
                    lo,
                    hi,
                    state.window_lower_bound,
                    &state.batch_num_map,
                );
            }
            Self::advance_window(state)
        };
        self.write_checkpoints(&checkpoint_ids).await
    }

    /// Drops the given consumers unless a newer sender took their name in
    /// the meantime.
    async fn remove_failed_consumers(
        &self,
        failed_consumers: &[String],
        sends_snapshot: &BTreeMap<String, ConsumerSender>,
    ) {
        if failed_consumers.is_empty() {
            return;
        }
        let mut state = self.state.lock().await;
        for consumer_name in failed_consumers {
            let is_current = match (
                state.stream_sends.get(consumer_name),
                sends_snapshot.get(consumer_name),
            ) {
                (Some(current), Some(snapshot)) => current.same_channel(snapshot),
                _ => false,
            };
            if is_current {
                state.stream_sends.remove(consumer_name);
                warn!(
                    subscription_id = %self.subscription_id,
                    consumer = %consumer_name,
                    "consumer-send-failed"
                );
            }
        }
    }

    /// Diagnostic snapshot of the runtime state.
    pub async fn observable_state(&self) -> serde_json::Value {
        let state = self.state.lock().await;
        json!({
            "subscription_id": self.subscription_id,
            "stream_name": self.stream_name,
            "log_id": self.log_id,
            "window_lower_bound": format!("{:?}", state.window_lower_bound),
            "window_upper_bound": format!("{:?}", state.window_upper_bound),
            "num_acked_ranges": state.acked_ranges.num_ranges(),
            "num_tracked_batches": state.batch_num_map.num_batches(),
            "consumers": state.stream_sends.keys().collect::<Vec<_>>(),
            "valid": state.valid,
        })
    }
}
