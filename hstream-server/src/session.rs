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

use std::sync::Arc;

use hstream_proto::tonic::{self, Status};
use hstream_proto::{StreamingFetchRequest, StreamingFetchResponse};
use hstream_subscription::{RecordId, SubscriptionError, SubscriptionRegistry};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::grpc_adapter::convert_error;

/// Receiving half of a consumer session's response channel; backs the gRPC
/// response stream.
pub(crate) type SessionReceiver =
    mpsc::UnboundedReceiver<Result<StreamingFetchResponse, Status>>;

/// Runs the first-request half of a `StreamingFetch` session.
///
/// The initial request names the subscription and the consumer: it resolves
/// or materializes the runtime through the registry, attaches this session's
/// sender, and folds any piggy-backed acks. The remainder of the session (an
/// ack loop until EOF or recv error, then detach) runs in a background task;
/// the session holds the subscription id only and re-resolves the runtime on
/// every ack so a concurrent deletion is observed instead of raced.
pub(crate) async fn start_streaming_fetch_session(
    registry: Arc<SubscriptionRegistry>,
    mut request_stream: tonic::Streaming<StreamingFetchRequest>,
) -> Result<SessionReceiver, Status> {
    let first_request = request_stream
        .message()
        .await?
        .ok_or_else(|| Status::invalid_argument("The fetch stream closed before registration."))?;
    if first_request.consumer_name.is_empty() {
        return Err(Status::invalid_argument("`consumer_name` must not be empty."));
    }
    let subscription_id = first_request.subscription_id;
    let consumer_name = first_request.consumer_name;

    let runtime = registry
        .get_or_create_runtime(&subscription_id)
        .await
        .map_err(|error| match error {
            SubscriptionError::SubscriptionNotFound { .. } => {
                Status::internal("Subscription has been removed")
            }
            other => convert_error(other),
        })?;
    let (response_sender, response_receiver) = mpsc::unbounded_channel();
    runtime
        .attach_consumer(&consumer_name, response_sender.clone())
        .await
        .map_err(convert_error)?;
    info!(
        subscription_id = %subscription_id,
        consumer = %consumer_name,
        "fetch-session-started"
    );
    if !first_request.ack_ids.is_empty() {
        let ack_ids = ack_ids_from_proto(first_request.ack_ids);
        if let Err(error) = runtime.ack_batch(&ack_ids).await {
            runtime.detach_consumer(&consumer_name, &response_sender).await;
            return Err(convert_error(error));
        }
    }
    tokio::spawn(session_ack_loop(
        registry,
        subscription_id,
        consumer_name,
        response_sender,
        request_stream,
    ));
    Ok(response_receiver)
}

/// The attached phase: every inbound request carries acks to fold. Ends on
/// EOF, recv error, or observation that the subscription was removed; the
/// closed session detaches its sender but never deletes the runtime.
async fn session_ack_loop(
    registry: Arc<SubscriptionRegistry>,
    subscription_id: String,
    consumer_name: String,
    response_sender: hstream_subscription::ConsumerSender,
    mut request_stream: tonic::Streaming<StreamingFetchRequest>,
) {
    loop {
        match request_stream.message().await {
            Ok(Some(request)) => {
                if request.ack_ids.is_empty() {
                    continue;
                }
                let runtime = match registry.runtime(&subscription_id).await {
                    Some(runtime) => runtime,
                    None => {
                        debug!(
                            subscription_id = %subscription_id,
                            consumer = %consumer_name,
                            "subscription-removed-mid-session"
                        );
                        break;
                    }
                };
                let ack_ids = ack_ids_from_proto(request.ack_ids);
                if let Err(error) = runtime.ack_batch(&ack_ids).await {
                    debug!(
                        subscription_id = %subscription_id,
                        consumer = %consumer_name,
                        error = ?error,
                        "ack-failed"
                    );
                    break;
                }
            }
            Ok(None) => break,
            Err(status) => {
                debug!(
                    subscription_id = %subscription_id,
                    consumer = %consumer_name,
                    status = ?status,
                    "fetch-session-recv-error"
                );
                break;
            }
        }
    }
    if let Some(runtime) = registry.runtime(&subscription_id).await {
        runtime
            .detach_consumer(&consumer_name, &response_sender)
            .await;
    }
    info!(
        subscription_id = %subscription_id,
        consumer = %consumer_name,
        "fetch-session-closed"
    );
}

fn ack_ids_from_proto(ack_ids: Vec<hstream_proto::RecordId>) -> Vec<RecordId> {
    ack_ids.into_iter().map(RecordId::from).collect()
}
