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

use hstream_proto::tonic;
use hstream_proto::{ReceivedRecord, StreamingFetchResponse};
use tokio::sync::mpsc;

use crate::record_id::RecordId;

/// Capability to push one response (or a terminal status) to a consumer
/// session. The receiving half backs the session's gRPC response stream, so
/// the sender is single-writer by construction and responses from
/// concurrent dispatch and resend paths never interleave. Sending fails
/// once the session's receiving half is gone.
pub type ConsumerSender = mpsc::UnboundedSender<Result<StreamingFetchResponse, tonic::Status>>;

fn received_record(record_id: RecordId, payload: Vec<u8>) -> ReceivedRecord {
    ReceivedRecord {
        record_id: Some(record_id.into()),
        payload,
    }
}

/// Distributes `records` round-robin across the senders, one response per
/// consumer. Returns the names of the consumers whose send failed.
///
/// The partitioning is stable: record `i` goes to the consumer at position
/// `i % M` in name order. Consumers are deliberately not buffered per speed;
/// unacked timeouts are the backpressure channel.
pub fn distribute(
    records: Vec<(RecordId, Vec<u8>)>,
    stream_sends: &BTreeMap<String, ConsumerSender>,
) -> Vec<String> {
    let num_consumers = stream_sends.len();
    if num_consumers == 0 || records.is_empty() {
        return Vec::new();
    }
    let mut partitions: Vec<Vec<ReceivedRecord>> = vec![Vec::new(); num_consumers];
    for (index, (record_id, payload)) in records.into_iter().enumerate() {
        partitions[index % num_consumers].push(received_record(record_id, payload));
    }
    let mut failed_consumers = Vec::new();
    for ((consumer_name, sender), partition) in stream_sends.iter().zip(partitions) {
        if partition.is_empty() {
            continue;
        }
        let response = StreamingFetchResponse {
            received_records: partition,
        };
        if sender.send(Ok(response)).is_err() {
            failed_consumers.push(consumer_name.clone());
        }
    }
    failed_consumers
}

/// Redelivers `records` one response per record, cycling through the senders.
///
/// A sender failing mid-call is excluded for the rest of this call (and
/// reported back) so that its share falls over to the remaining consumers.
/// Never retries within the call: records that could not be handed to any
/// live sender stay unacked and come back on the next resend tick.
pub fn redistribute(
    records: Vec<(RecordId, Vec<u8>)>,
    stream_sends: &BTreeMap<String, ConsumerSender>,
) -> Vec<String> {
    let senders: Vec<(&String, &ConsumerSender)> = stream_sends.iter().collect();
    if senders.is_empty() {
        return Vec::new();
    }
    let mut alive = vec![true; senders.len()];
    let mut failed_consumers = Vec::new();
    let mut cursor = 0;
    'records: for (record_id, payload) in records {
        let response = StreamingFetchResponse {
            received_records: vec![received_record(record_id, payload)],
        };
        for attempt in 0..senders.len() {
            let slot = (cursor + attempt) % senders.len();
            if !alive[slot] {
                continue;
            }
            let (consumer_name, sender) = senders[slot];
            if sender.send(Ok(response.clone())).is_err() {
                alive[slot] = false;
                failed_consumers.push(consumer_name.clone());
                continue;
            }
            cursor = (slot + 1) % senders.len();
            continue 'records;
        }
        // Every sender is dead.
        break;
    }
    failed_consumers
}
