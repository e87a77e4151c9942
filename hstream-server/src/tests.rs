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

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hstream_common::net::find_available_tcp_port;
use hstream_common::rand::append_random_suffix;
use hstream_metastore::FileBackedMetastore;
use hstream_proto::hstream_api_client::HstreamApiClient;
use hstream_proto::tonic::transport::Channel;
use hstream_proto::tonic::Code;
use hstream_proto::{
    CheckSubscriptionExistRequest, CreateSubscriptionRequest, DeleteSubscriptionRequest,
    ListSubscriptionsRequest, StreamingFetchRequest,
};
use hstream_store::{LogClient, LogId, MemoryLogStore};
use hstream_subscription::SubscriptionRegistry;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::start_grpc_server;

struct TestServer {
    client: HstreamApiClient<Channel>,
    log_store: MemoryLogStore,
    _tempdir: tempfile::TempDir,
}

async fn start_test_server() -> anyhow::Result<TestServer> {
    hstream_common::setup_logging_for_tests();
    let tempdir = tempfile::tempdir()?;
    let metastore = Arc::new(FileBackedMetastore::try_new(tempdir.path()).await?);
    let log_store = MemoryLogStore::new();
    let registry = SubscriptionRegistry::new(metastore, Arc::new(log_store.clone()));

    let port = find_available_tcp_port()?;
    let grpc_listen_addr: SocketAddr = ([127, 0, 0, 1], port).into();
    tokio::spawn(start_grpc_server(
        grpc_listen_addr,
        registry,
        60,
        futures::future::pending(),
    ));

    let mut client = None;
    for _ in 0..100 {
        match HstreamApiClient::connect(format!("http://127.0.0.1:{port}")).await {
            Ok(connected_client) => {
                client = Some(connected_client);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    let client = client.expect("Failed to connect to the test gRPC server.");
    Ok(TestServer {
        client,
        log_store,
        _tempdir: tempdir,
    })
}

fn subscription_request(
    subscription_id: &str,
    stream_name: &str,
    ack_timeout_secs: u32,
) -> CreateSubscriptionRequest {
    CreateSubscriptionRequest {
        subscription: Some(hstream_proto::Subscription {
            subscription_id: subscription_id.to_string(),
            stream_name: stream_name.to_string(),
            ack_timeout_secs,
            offset: None,
        }),
    }
}

async fn wait_for_checkpoint(
    log_store: &MemoryLogStore,
    subscription_id: &str,
    log_id: LogId,
    expected_lsn: u64,
) {
    for _ in 0..100 {
        if log_store
            .read_checkpoint(subscription_id, log_id)
            .await
            .unwrap()
            == Some(expected_lsn)
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Timed out waiting for checkpoint `{expected_lsn}`.");
}

#[tokio::test]
async fn test_subscription_crud_over_grpc() -> anyhow::Result<()> {
    let mut test_server = start_test_server().await?;
    let stream_name = append_random_suffix("events");
    let subscription_id = append_random_suffix("sub");
    test_server.log_store.create_log(&stream_name).await?;

    // An unset ack timeout gets the server default.
    let created = test_server
        .client
        .create_subscription(subscription_request(&subscription_id, &stream_name, 0))
        .await?
        .into_inner();
    assert_eq!(created.ack_timeout_secs, 60);

    let status = test_server
        .client
        .create_subscription(subscription_request(&subscription_id, &stream_name, 10))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    let status = test_server
        .client
        .create_subscription(subscription_request("other-sub", "no-such-stream", 10))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    let exists = test_server
        .client
        .check_subscription_exist(CheckSubscriptionExistRequest {
            subscription_id: subscription_id.clone(),
        })
        .await?
        .into_inner()
        .exists;
    assert!(exists);

    let subscriptions = test_server
        .client
        .list_subscriptions(ListSubscriptionsRequest {})
        .await?
        .into_inner()
        .subscriptions;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].subscription_id, subscription_id);

    test_server
        .client
        .delete_subscription(DeleteSubscriptionRequest {
            subscription_id: subscription_id.clone(),
        })
        .await?;
    let exists = test_server
        .client
        .check_subscription_exist(CheckSubscriptionExistRequest {
            subscription_id: subscription_id.clone(),
        })
        .await?
        .into_inner()
        .exists;
    assert!(!exists);

    let status = test_server
        .client
        .delete_subscription(DeleteSubscriptionRequest {
            subscription_id: subscription_id.clone(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_streaming_fetch_end_to_end() -> anyhow::Result<()> {
    let mut test_server = start_test_server().await?;
    let stream_name = append_random_suffix("events");
    let subscription_id = append_random_suffix("sub");
    let log_id = test_server.log_store.create_log(&stream_name).await?;
    test_server
        .log_store
        .append_batch(log_id, vec![b"a".to_vec(), b"b".to_vec()])
        .await?;

    test_server
        .client
        .create_subscription(subscription_request(&subscription_id, &stream_name, 30))
        .await?;

    let (request_sender, request_receiver) = mpsc::unbounded_channel();
    request_sender
        .send(StreamingFetchRequest {
            subscription_id: subscription_id.clone(),
            consumer_name: "consumer-1".to_string(),
            ack_ids: Vec::new(),
        })
        .unwrap();
    let mut response_stream = test_server
        .client
        .streaming_fetch(UnboundedReceiverStream::new(request_receiver))
        .await?
        .into_inner();

    let response = response_stream
        .message()
        .await?
        .expect("The fetch stream ended unexpectedly.");
    assert_eq!(response.received_records.len(), 2);
    assert_eq!(response.received_records[0].payload, b"a".to_vec());
    assert_eq!(response.received_records[1].payload, b"b".to_vec());
    let ack_ids: Vec<hstream_proto::RecordId> = response
        .received_records
        .iter()
        .map(|record| record.record_id.clone().unwrap())
        .collect();

    request_sender
        .send(StreamingFetchRequest {
            subscription_id: subscription_id.clone(),
            consumer_name: "consumer-1".to_string(),
            ack_ids,
        })
        .unwrap();
    wait_for_checkpoint(&test_server.log_store, &subscription_id, log_id, 1).await;

    // Deleting the subscription terminates the session with INTERNAL.
    test_server
        .client
        .delete_subscription(DeleteSubscriptionRequest {
            subscription_id: subscription_id.clone(),
        })
        .await?;
    let status = response_stream.message().await.unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "Subscription has been removed");
    Ok(())
}

#[tokio::test]
async fn test_streaming_fetch_unknown_subscription() -> anyhow::Result<()> {
    let mut test_server = start_test_server().await?;
    let (request_sender, request_receiver) = mpsc::unbounded_channel();
    request_sender
        .send(StreamingFetchRequest {
            subscription_id: "no-such-subscription".to_string(),
            consumer_name: "consumer-1".to_string(),
            ack_ids: Vec::new(),
        })
        .unwrap();
    let status = test_server
        .client
        .streaming_fetch(UnboundedReceiverStream::new(request_receiver))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "Subscription has been removed");
    Ok(())
}
