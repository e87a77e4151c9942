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

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hstream_proto::hstream_api_server::HstreamApiServer;
use hstream_proto::tonic::transport::Server;
use hstream_subscription::SubscriptionRegistry;
use tracing::*;

use crate::grpc_adapter::GrpcSubscriptionAdapter;

/// Starts the gRPC service given a gRPC address. Runs until
/// `shutdown_signal` resolves.
pub async fn start_grpc_server(
    grpc_listen_addr: SocketAddr,
    registry: Arc<SubscriptionRegistry>,
    default_ack_timeout_secs: u32,
    shutdown_signal: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    info!(grpc_listen_addr = ?grpc_listen_addr, "Starting gRPC server.");
    let grpc_adapter = GrpcSubscriptionAdapter::new(registry, default_ack_timeout_secs);
    let grpc_service = HstreamApiServer::new(grpc_adapter);
    Server::builder()
        .add_service(grpc_service)
        .serve_with_shutdown(grpc_listen_addr, shutdown_signal)
        .await?;
    Ok(())
}
