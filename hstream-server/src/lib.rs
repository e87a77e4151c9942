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

//! gRPC surface of the subscription delivery engine: subscription CRUD and
//! the bidirectional `StreamingFetch` session.

mod config;
mod grpc;
mod grpc_adapter;
mod session;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;

use hstream_metastore::FileBackedMetastore;
use hstream_store::LogClient;
use hstream_subscription::SubscriptionRegistry;

pub use crate::config::HstreamServerConfig;
pub use crate::grpc::start_grpc_server;
pub use crate::grpc_adapter::GrpcSubscriptionAdapter;

/// Wires a file-backed metastore and a registry onto `log_client` and serves
/// the gRPC API until `shutdown_signal` resolves.
pub async fn serve(
    config: HstreamServerConfig,
    log_client: Arc<dyn LogClient>,
    shutdown_signal: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    config.validate()?;
    let metastore = Arc::new(FileBackedMetastore::try_new(&config.metastore_root).await?);
    let registry = SubscriptionRegistry::new(metastore, log_client);
    start_grpc_server(
        config.listen_addr,
        registry,
        config.default_ack_timeout_secs,
        shutdown_signal,
    )
    .await
}
