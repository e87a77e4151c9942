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

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use hstream_metastore::{Metastore, Subscription, SubscriptionOffset};
use hstream_store::{LogClient, LogReader, StoreError, LSN_MIN};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::resend;
use crate::runtime::{DispatchOutcome, SubscriptionRuntime, DISPATCH_INTERVAL};

/// Process-wide owner of the live subscription runtimes.
///
/// Creation, lookup, and deletion of runtimes serialize on the registry
/// lock; the lock is never held across runtime-level operations. Sessions
/// and timers hold the subscription id only and re-resolve the runtime here
/// on every mutation, which is what makes deletion races safe.
pub struct SubscriptionRegistry {
    metastore: Arc<dyn Metastore>,
    log_client: Arc<dyn LogClient>,
    runtimes: Mutex<HashMap<String, Arc<SubscriptionRuntime>>>,
}

impl SubscriptionRegistry {
    pub fn new(metastore: Arc<dyn Metastore>, log_client: Arc<dyn LogClient>) -> Arc<Self> {
        Arc::new(SubscriptionRegistry {
            metastore,
            log_client,
            runtimes: Mutex::new(HashMap::new()),
        })
    }

    /// Persists a new subscription after checking the underlying stream
    /// exists. Does not materialize a runtime.
    pub async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> SubscriptionResult<Subscription> {
        if subscription.ack_timeout_secs == 0 {
            return Err(SubscriptionError::InvalidArgument {
                message: "Ack timeout must be at least one second.".to_string(),
            });
        }
        if let Err(error) = self.log_client.resolve_log(&subscription.stream_name).await {
            return Err(match error {
                StoreError::LogNotFound { stream_name } => {
                    SubscriptionError::StreamNotFound { stream_name }
                }
                other => other.into(),
            });
        }
        self.metastore
            .create_subscription(subscription.clone())
            .await?;
        info!(
            subscription_id = %subscription.subscription_id,
            stream_name = %subscription.stream_name,
            "subscription-created"
        );
        Ok(subscription)
    }

    /// Deletes the subscription from persistence and tears down its runtime
    /// if one is live. Timers and sessions observe the teardown on their
    /// next re-resolution.
    pub async fn delete_subscription(&self, subscription_id: &str) -> SubscriptionResult<()> {
        self.metastore.delete_subscription(subscription_id).await?;
        let runtime_opt = self.runtimes.lock().await.remove(subscription_id);
        if let Some(runtime) = runtime_opt {
            runtime.mark_deleted().await;
        }
        info!(subscription_id = %subscription_id, "subscription-deleted");
        Ok(())
    }

    /// Existence check against persistence, so a deleted-but-draining
    /// runtime reads as absent.
    pub async fn subscription_exists(&self, subscription_id: &str) -> SubscriptionResult<bool> {
        Ok(self.metastore.subscription_exists(subscription_id).await?)
    }

    pub async fn list_subscriptions(&self) -> SubscriptionResult<Vec<Subscription>> {
        Ok(self.metastore.list_subscriptions().await?)
    }

    /// Looks up a live runtime without materializing one.
    pub async fn runtime(&self, subscription_id: &str) -> Option<Arc<SubscriptionRuntime>> {
        self.runtimes.lock().await.get(subscription_id).cloned()
    }

    pub(crate) async fn remove_runtime(&self, subscription_id: &str) {
        self.runtimes.lock().await.remove(subscription_id);
    }

    /// Returns the runtime for `subscription_id`, materializing it from
    /// persisted metadata on first use.
    ///
    /// A fresh runtime starts at the persisted checkpoint when one exists;
    /// the checkpointed batch itself is re-read because the prefix below a
    /// mid-batch checkpoint may be incomplete. Without a checkpoint the
    /// subscription's configured start offset applies.
    pub async fn get_or_create_runtime(
        self: &Arc<Self>,
        subscription_id: &str,
    ) -> SubscriptionResult<Arc<SubscriptionRuntime>> {
        let mut runtimes = self.runtimes.lock().await;
        if let Some(runtime) = runtimes.get(subscription_id) {
            return Ok(runtime.clone());
        }
        let subscription = self.metastore.subscription(subscription_id).await?;
        let log_id = match self.log_client.resolve_log(&subscription.stream_name).await {
            Ok(log_id) => log_id,
            Err(StoreError::LogNotFound { stream_name }) => {
                return Err(SubscriptionError::StreamNotFound { stream_name });
            }
            Err(other) => return Err(other.into()),
        };
        let start_lsn = match self
            .log_client
            .read_checkpoint(subscription_id, log_id)
            .await?
        {
            Some(checkpoint_lsn) => checkpoint_lsn,
            None => match subscription.offset {
                SubscriptionOffset::Earliest => LSN_MIN,
                SubscriptionOffset::Latest => self.log_client.tail_lsn(log_id).await? + 1,
                SubscriptionOffset::RecordId { batch_id, .. } => batch_id,
            },
        };
        let reader = self.log_client.open_reader(log_id, start_lsn).await?;
        let rereader = self.log_client.open_rereader(log_id).await?;
        let runtime = Arc::new(SubscriptionRuntime::new(
            subscription.subscription_id.clone(),
            subscription.stream_name.clone(),
            log_id,
            Duration::from_secs(subscription.ack_timeout_secs as u64),
            start_lsn,
            self.log_client.clone(),
            rereader,
        ));
        runtimes.insert(subscription_id.to_string(), runtime.clone());
        spawn_dispatch_loop(Arc::downgrade(self), runtime.clone(), reader);
        info!(
            subscription_id = %subscription_id,
            stream_name = %subscription.stream_name,
            log_id = log_id,
            start_lsn = start_lsn,
            "subscription-runtime-materialized"
        );
        Ok(runtime)
    }
}

/// Drives one runtime: ticks every [`DISPATCH_INTERVAL`], dispatches
/// whatever the reader returns, and arms a resend timer for each dispatched
/// batch. A reader failure is fatal to the runtime.
fn spawn_dispatch_loop(
    registry: Weak<SubscriptionRegistry>,
    runtime: Arc<SubscriptionRuntime>,
    mut reader: Box<dyn LogReader>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DISPATCH_INTERVAL);
        loop {
            interval.tick().await;
            match runtime.dispatch_once(&mut *reader).await {
                Ok(DispatchOutcome::Idle) => {}
                Ok(DispatchOutcome::Dispatched(record_ids)) => {
                    resend::schedule_resend(
                        registry.clone(),
                        runtime.subscription_id().to_string(),
                        record_ids,
                        runtime.ack_timeout(),
                    );
                }
                Ok(DispatchOutcome::Stopped) => return,
                Err(error) => {
                    error!(
                        subscription_id = %runtime.subscription_id(),
                        error = ?error,
                        "subscription-reader-failed"
                    );
                    runtime.mark_deleted().await;
                    if let Some(registry) = registry.upgrade() {
                        registry.remove_runtime(runtime.subscription_id()).await;
                    }
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use hstream_common::rand::append_random_suffix;
    use hstream_metastore::{FileBackedMetastore, MetastoreError, MockMetastore};
    use hstream_proto::StreamingFetchResponse;
    use hstream_store::MemoryLogStore;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::record_id::RecordId;

    const RECV_TIMEOUT: Duration = Duration::from_secs(10);

    struct TestSetup {
        registry: Arc<SubscriptionRegistry>,
        log_store: MemoryLogStore,
        metastore: Arc<FileBackedMetastore>,
        _tempdir: tempfile::TempDir,
    }

    async fn setup() -> TestSetup {
        hstream_common::setup_logging_for_tests();
        let tempdir = tempfile::tempdir().unwrap();
        let metastore = Arc::new(FileBackedMetastore::try_new(tempdir.path()).await.unwrap());
        let log_store = MemoryLogStore::new();
        let registry = SubscriptionRegistry::new(metastore.clone(), Arc::new(log_store.clone()));
        TestSetup {
            registry,
            log_store,
            metastore,
            _tempdir: tempdir,
        }
    }

    fn subscription(subscription_id: &str, stream_name: &str, ack_timeout_secs: u32) -> Subscription {
        Subscription {
            subscription_id: subscription_id.to_string(),
            stream_name: stream_name.to_string(),
            ack_timeout_secs,
            offset: SubscriptionOffset::Earliest,
        }
    }

    fn payloads(labels: &[&str]) -> Vec<Vec<u8>> {
        labels.iter().map(|label| label.as_bytes().to_vec()).collect()
    }

    type ResponseReceiver =
        UnboundedReceiver<Result<StreamingFetchResponse, hstream_proto::tonic::Status>>;

    async fn recv_response(receiver: &mut ResponseReceiver) -> StreamingFetchResponse {
        tokio::time::timeout(RECV_TIMEOUT, receiver.recv())
            .await
            .expect("Timed out waiting for a response.")
            .expect("The response channel closed unexpectedly.")
            .expect("The session was terminated with a status.")
    }

    fn response_ids(response: &StreamingFetchResponse) -> Vec<RecordId> {
        response
            .received_records
            .iter()
            .map(|record| record.record_id.clone().unwrap().into())
            .collect()
    }

    #[tokio::test]
    async fn test_create_list_exists_delete_subscription() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        test_setup.log_store.create_log(&stream_name).await.unwrap();

        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 10))
            .await
            .unwrap();
        assert!(test_setup
            .registry
            .subscription_exists(&subscription_id)
            .await
            .unwrap());
        let subscriptions = test_setup.registry.list_subscriptions().await.unwrap();
        assert!(subscriptions
            .iter()
            .any(|sub| sub.subscription_id == subscription_id));

        let error = test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            SubscriptionError::SubscriptionAlreadyExists { .. }
        ));

        test_setup
            .registry
            .delete_subscription(&subscription_id)
            .await
            .unwrap();
        assert!(!test_setup
            .registry
            .subscription_exists(&subscription_id)
            .await
            .unwrap());
        let error = test_setup
            .registry
            .delete_subscription(&subscription_id)
            .await
            .unwrap_err();
        assert!(matches!(error, SubscriptionError::SubscriptionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_subscription_against_missing_stream() {
        let test_setup = setup().await;
        let error = test_setup
            .registry
            .create_subscription(subscription("sub-1", "no-such-stream", 10))
            .await
            .unwrap_err();
        assert!(matches!(error, SubscriptionError::StreamNotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_subscription_rejects_zero_ack_timeout() {
        let test_setup = setup().await;
        let error = test_setup
            .registry
            .create_subscription(subscription("sub-1", "events", 0))
            .await
            .unwrap_err();
        assert!(matches!(error, SubscriptionError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_metastore_failure_propagates() {
        let mut mock_metastore = MockMetastore::new();
        mock_metastore.expect_subscription().times(1).returning(|_| {
            Err(MetastoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk failure",
            )))
        });
        let registry = SubscriptionRegistry::new(
            Arc::new(mock_metastore),
            Arc::new(MemoryLogStore::new()),
        );
        let error = registry.get_or_create_runtime("sub-1").await.unwrap_err();
        assert!(matches!(error, SubscriptionError::Metastore(_)));
    }

    #[tokio::test]
    async fn test_get_or_create_runtime_unknown_subscription() {
        let test_setup = setup().await;
        let error = test_setup
            .registry
            .get_or_create_runtime("no-such-subscription")
            .await
            .unwrap_err();
        assert!(matches!(error, SubscriptionError::SubscriptionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_ack_and_checkpoint_advance() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["a", "b"]))
            .await
            .unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["c"]))
            .await
            .unwrap();

        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 30))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender).await.unwrap();

        let response = recv_response(&mut receiver).await;
        assert_eq!(
            response_ids(&response),
            vec![
                RecordId::new(1, 0),
                RecordId::new(1, 1),
                RecordId::new(2, 0)
            ]
        );
        assert_eq!(response.received_records[0].payload, b"a".to_vec());

        // Out-of-order acks: no checkpoint until the prefix is contiguous.
        runtime.ack_batch(&[RecordId::new(2, 0)]).await.unwrap();
        runtime.ack_batch(&[RecordId::new(1, 1)]).await.unwrap();
        assert_eq!(
            test_setup
                .log_store
                .read_checkpoint(&subscription_id, log_id)
                .await
                .unwrap(),
            None
        );
        runtime.ack_batch(&[RecordId::new(1, 0)]).await.unwrap();
        assert_eq!(
            test_setup
                .log_store
                .read_checkpoint(&subscription_id, log_id)
                .await
                .unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_checkpoint_written_per_advancement() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["a", "b"]))
            .await
            .unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["c"]))
            .await
            .unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 30))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender).await.unwrap();
        recv_response(&mut receiver).await;

        runtime
            .ack_batch(&[RecordId::new(1, 0), RecordId::new(1, 1)])
            .await
            .unwrap();
        assert_eq!(
            test_setup
                .log_store
                .read_checkpoint(&subscription_id, log_id)
                .await
                .unwrap(),
            Some(1)
        );
        runtime.ack_batch(&[RecordId::new(2, 0)]).await.unwrap();
        assert_eq!(
            test_setup
                .log_store
                .read_checkpoint(&subscription_id, log_id)
                .await
                .unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_round_robin_across_two_consumers() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 30))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender_a, mut receiver_a) = mpsc::unbounded_channel();
        let (sender_b, mut receiver_b) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-a", sender_a).await.unwrap();
        runtime.attach_consumer("consumer-b", sender_b).await.unwrap();

        // One appended batch is never split across reads, so all four
        // records are partitioned in a single distribute call.
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["r0", "r1", "r2", "r3"]))
            .await
            .unwrap();

        let response_a = recv_response(&mut receiver_a).await;
        assert_eq!(
            response_ids(&response_a),
            vec![RecordId::new(1, 0), RecordId::new(1, 2)]
        );
        let response_b = recv_response(&mut receiver_b).await;
        assert_eq!(
            response_ids(&response_b),
            vec![RecordId::new(1, 1), RecordId::new(1, 3)]
        );
    }

    #[tokio::test]
    async fn test_resend_after_ack_timeout() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["r0", "r1"]))
            .await
            .unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 1))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender).await.unwrap();

        let response = recv_response(&mut receiver).await;
        assert_eq!(
            response_ids(&response),
            vec![RecordId::new(1, 0), RecordId::new(1, 1)]
        );
        // Ack only the first record; the second must come back.
        runtime.ack_batch(&[RecordId::new(1, 0)]).await.unwrap();

        let resent = recv_response(&mut receiver).await;
        assert_eq!(response_ids(&resent), vec![RecordId::new(1, 1)]);
        assert_eq!(resent.received_records[0].payload, b"r1".to_vec());
        runtime.ack_batch(&[RecordId::new(1, 1)]).await.unwrap();

        // Fully acked: no further redelivery.
        let no_more = tokio::time::timeout(Duration::from_millis(2500), receiver.recv()).await;
        assert!(no_more.is_err());
    }

    #[tokio::test]
    async fn test_dead_consumer_share_falls_over() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 1))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender_a, mut receiver_a) = mpsc::unbounded_channel();
        let (sender_b, receiver_b) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-a", sender_a).await.unwrap();
        runtime.attach_consumer("consumer-b", sender_b).await.unwrap();
        // consumer-b dies before anything is dispatched.
        drop(receiver_b);

        test_setup
            .log_store
            .append_batch(log_id, payloads(&["r0", "r1", "r2", "r3"]))
            .await
            .unwrap();

        let response_a = recv_response(&mut receiver_a).await;
        assert_eq!(
            response_ids(&response_a),
            vec![RecordId::new(1, 0), RecordId::new(1, 2)]
        );
        runtime
            .ack_batch(&[RecordId::new(1, 0), RecordId::new(1, 2)])
            .await
            .unwrap();

        // consumer-b's share is redelivered to consumer-a after the timeout,
        // one response per record.
        let mut fallen_over = HashSet::new();
        for _ in 0..2 {
            let response = recv_response(&mut receiver_a).await;
            fallen_over.extend(response_ids(&response));
        }
        assert_eq!(
            fallen_over,
            HashSet::from([RecordId::new(1, 1), RecordId::new(1, 3)])
        );
    }

    #[tokio::test]
    async fn test_gap_record_advances_window() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        for label in ["a", "b", "c"] {
            test_setup
                .log_store
                .append_batch(log_id, payloads(&[label]))
                .await
                .unwrap();
        }
        test_setup.log_store.trim(log_id, 2).await.unwrap();

        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 30))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender).await.unwrap();

        // Only the record after the trim is deliverable.
        let response = recv_response(&mut receiver).await;
        assert_eq!(response_ids(&response), vec![RecordId::new(3, 0)]);

        // Acking it advances the window through the gap, without any record
        // of the trimmed range having been individually acked.
        runtime.ack_batch(&[RecordId::new(3, 0)]).await.unwrap();
        assert_eq!(
            test_setup
                .log_store
                .read_checkpoint(&subscription_id, log_id)
                .await
                .unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_delete_subscription_tears_down_runtime() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 10))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender.clone()).await.unwrap();

        test_setup
            .registry
            .delete_subscription(&subscription_id)
            .await
            .unwrap();

        assert!(!runtime.is_valid().await);
        assert!(test_setup.registry.runtime(&subscription_id).await.is_none());
        // The session was terminated with an INTERNAL status.
        let terminal = tokio::time::timeout(RECV_TIMEOUT, receiver.recv())
            .await
            .unwrap()
            .unwrap();
        let status = terminal.unwrap_err();
        assert_eq!(status.message(), "Subscription has been removed");
        // Further mutations observe the removal.
        let (new_sender, _new_receiver) = mpsc::unbounded_channel();
        let error = runtime
            .attach_consumer("consumer-2", new_sender)
            .await
            .unwrap_err();
        assert!(matches!(error, SubscriptionError::SubscriptionRemoved));
        let error = runtime.ack_batch(&[RecordId::new(1, 0)]).await.unwrap_err();
        assert!(matches!(error, SubscriptionError::SubscriptionRemoved));
    }

    #[tokio::test]
    async fn test_runtime_survives_last_detach() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 10))
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, _receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender.clone()).await.unwrap();
        runtime.detach_consumer("consumer-1", &sender).await;
        // Detaching twice is a no-op.
        runtime.detach_consumer("consumer-1", &sender).await;

        // The runtime is retained so the window survives reconnection.
        assert!(test_setup.registry.runtime(&subscription_id).await.is_some());
        assert!(runtime.is_valid().await);
        let (new_sender, _new_receiver) = mpsc::unbounded_channel();
        runtime
            .attach_consumer("consumer-1", new_sender)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_runtime_resumes_from_checkpoint() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["a"]))
            .await
            .unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["b"]))
            .await
            .unwrap();
        test_setup
            .registry
            .create_subscription(subscription(&subscription_id, &stream_name, 30))
            .await
            .unwrap();
        {
            let runtime = test_setup
                .registry
                .get_or_create_runtime(&subscription_id)
                .await
                .unwrap();
            let (sender, mut receiver) = mpsc::unbounded_channel();
            runtime.attach_consumer("consumer-1", sender).await.unwrap();
            recv_response(&mut receiver).await;
            runtime
                .ack_batch(&[RecordId::new(1, 0), RecordId::new(2, 0)])
                .await
                .unwrap();
        }

        // A fresh broker instance sharing the same store and metastore.
        let new_registry = SubscriptionRegistry::new(
            test_setup.metastore.clone(),
            Arc::new(test_setup.log_store.clone()),
        );
        let runtime = new_registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["c"]))
            .await
            .unwrap();

        // The checkpointed batch is re-read (its prefix guarantee is only
        // partial), then delivery continues with the new data.
        let mut received = Vec::new();
        while received.len() < 2 {
            let response = recv_response(&mut receiver).await;
            received.extend(response_ids(&response));
        }
        assert_eq!(received, vec![RecordId::new(2, 0), RecordId::new(3, 0)]);
    }

    #[tokio::test]
    async fn test_latest_offset_skips_existing_records() {
        let test_setup = setup().await;
        let stream_name = append_random_suffix("events");
        let subscription_id = append_random_suffix("sub");
        let log_id = test_setup.log_store.create_log(&stream_name).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["old"]))
            .await
            .unwrap();
        let mut latest_subscription = subscription(&subscription_id, &stream_name, 30);
        latest_subscription.offset = SubscriptionOffset::Latest;
        test_setup
            .registry
            .create_subscription(latest_subscription)
            .await
            .unwrap();
        let runtime = test_setup
            .registry
            .get_or_create_runtime(&subscription_id)
            .await
            .unwrap();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        runtime.attach_consumer("consumer-1", sender).await.unwrap();
        test_setup
            .log_store
            .append_batch(log_id, payloads(&["new"]))
            .await
            .unwrap();

        let response = recv_response(&mut receiver).await;
        assert_eq!(response_ids(&response), vec![RecordId::new(2, 0)]);
        assert_eq!(response.received_records[0].payload, b"new".to_vec());
    }
}
