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

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use hstream_metastore::{Subscription, SubscriptionOffset};
use hstream_proto::hstream_api_server::HstreamApi;
use hstream_proto::subscription_offset::{Offset, SpecialOffset};
use hstream_proto::tonic::{self, Request, Response, Status};
use hstream_proto::{
    CheckSubscriptionExistRequest, CheckSubscriptionExistResponse, CreateSubscriptionRequest,
    DeleteSubscriptionRequest, DeleteSubscriptionResponse, ListSubscriptionsRequest,
    ListSubscriptionsResponse, StreamingFetchRequest, StreamingFetchResponse,
};
use hstream_subscription::{SubscriptionError, SubscriptionRegistry};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::session;

/// Maps engine errors onto gRPC statuses at the RPC boundary.
pub(crate) fn convert_error(error: SubscriptionError) -> Status {
    match &error {
        SubscriptionError::SubscriptionNotFound { .. }
        | SubscriptionError::StreamNotFound { .. } => Status::not_found(error.to_string()),
        SubscriptionError::SubscriptionAlreadyExists { .. } => {
            Status::already_exists(error.to_string())
        }
        SubscriptionError::SubscriptionRemoved => Status::internal(error.to_string()),
        SubscriptionError::InvalidArgument { .. } => Status::invalid_argument(error.to_string()),
        SubscriptionError::Metastore(_) | SubscriptionError::Store(_) => {
            Status::internal(error.to_string())
        }
    }
}

#[derive(Clone)]
pub struct GrpcSubscriptionAdapter {
    registry: Arc<SubscriptionRegistry>,
    default_ack_timeout_secs: u32,
}

impl GrpcSubscriptionAdapter {
    pub fn new(registry: Arc<SubscriptionRegistry>, default_ack_timeout_secs: u32) -> Self {
        GrpcSubscriptionAdapter {
            registry,
            default_ack_timeout_secs,
        }
    }

    fn subscription_from_proto(
        &self,
        subscription: hstream_proto::Subscription,
    ) -> Result<Subscription, Status> {
        let offset = match subscription.offset.and_then(|offset| offset.offset) {
            None => SubscriptionOffset::Earliest,
            Some(Offset::SpecialOffset(special_offset)) => {
                match SpecialOffset::from_i32(special_offset) {
                    Some(SpecialOffset::Earliest) => SubscriptionOffset::Earliest,
                    Some(SpecialOffset::Latest) => SubscriptionOffset::Latest,
                    None => {
                        return Err(Status::invalid_argument(format!(
                            "Unknown special offset `{special_offset}`."
                        )));
                    }
                }
            }
            Some(Offset::RecordId(record_id)) => SubscriptionOffset::RecordId {
                batch_id: record_id.batch_id,
                batch_index: record_id.batch_index,
            },
        };
        let ack_timeout_secs = if subscription.ack_timeout_secs == 0 {
            self.default_ack_timeout_secs
        } else {
            subscription.ack_timeout_secs
        };
        Ok(Subscription {
            subscription_id: subscription.subscription_id,
            stream_name: subscription.stream_name,
            ack_timeout_secs,
            offset,
        })
    }
}

fn subscription_to_proto(subscription: Subscription) -> hstream_proto::Subscription {
    let offset = match subscription.offset {
        SubscriptionOffset::Earliest => Offset::SpecialOffset(SpecialOffset::Earliest as i32),
        SubscriptionOffset::Latest => Offset::SpecialOffset(SpecialOffset::Latest as i32),
        SubscriptionOffset::RecordId {
            batch_id,
            batch_index,
        } => Offset::RecordId(hstream_proto::RecordId {
            batch_id,
            batch_index,
        }),
    };
    hstream_proto::Subscription {
        subscription_id: subscription.subscription_id,
        stream_name: subscription.stream_name,
        ack_timeout_secs: subscription.ack_timeout_secs,
        offset: Some(hstream_proto::SubscriptionOffset {
            offset: Some(offset),
        }),
    }
}

#[async_trait]
impl HstreamApi for GrpcSubscriptionAdapter {
    async fn create_subscription(
        &self,
        request: Request<CreateSubscriptionRequest>,
    ) -> Result<Response<hstream_proto::Subscription>, Status> {
        let subscription = request
            .into_inner()
            .subscription
            .ok_or_else(|| Status::invalid_argument("`subscription` must be set."))?;
        let subscription = self.subscription_from_proto(subscription)?;
        let created = self
            .registry
            .create_subscription(subscription)
            .await
            .map_err(convert_error)?;
        Ok(Response::new(subscription_to_proto(created)))
    }

    async fn delete_subscription(
        &self,
        request: Request<DeleteSubscriptionRequest>,
    ) -> Result<Response<DeleteSubscriptionResponse>, Status> {
        let subscription_id = request.into_inner().subscription_id;
        self.registry
            .delete_subscription(&subscription_id)
            .await
            .map_err(convert_error)?;
        Ok(Response::new(DeleteSubscriptionResponse {}))
    }

    async fn check_subscription_exist(
        &self,
        request: Request<CheckSubscriptionExistRequest>,
    ) -> Result<Response<CheckSubscriptionExistResponse>, Status> {
        let subscription_id = request.into_inner().subscription_id;
        let exists = self
            .registry
            .subscription_exists(&subscription_id)
            .await
            .map_err(convert_error)?;
        Ok(Response::new(CheckSubscriptionExistResponse { exists }))
    }

    async fn list_subscriptions(
        &self,
        _request: Request<ListSubscriptionsRequest>,
    ) -> Result<Response<ListSubscriptionsResponse>, Status> {
        let subscriptions = self
            .registry
            .list_subscriptions()
            .await
            .map_err(convert_error)?
            .into_iter()
            .map(subscription_to_proto)
            .collect();
        Ok(Response::new(ListSubscriptionsResponse { subscriptions }))
    }

    type StreamingFetchStream =
        Pin<Box<dyn Stream<Item = Result<StreamingFetchResponse, Status>> + Send + 'static>>;

    async fn streaming_fetch(
        &self,
        request: Request<tonic::Streaming<StreamingFetchRequest>>,
    ) -> Result<Response<Self::StreamingFetchStream>, Status> {
        let request_stream = request.into_inner();
        let response_receiver =
            session::start_streaming_fetch_session(self.registry.clone(), request_stream).await?;
        let response_stream = UnboundedReceiverStream::new(response_receiver);
        Ok(Response::new(Box::pin(response_stream)))
    }
}
