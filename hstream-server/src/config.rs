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
use std::path::PathBuf;

use anyhow::bail;
use serde::Deserialize;

/// Broker-local configuration of the subscription engine server.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HstreamServerConfig {
    pub listen_addr: SocketAddr,
    /// Root directory of the file-backed metastore.
    pub metastore_root: PathBuf,
    /// Applied when a create request leaves the ack timeout unset.
    #[serde(default = "default_ack_timeout_secs")]
    pub default_ack_timeout_secs: u32,
}

fn default_ack_timeout_secs() -> u32 {
    60
}

impl HstreamServerConfig {
    pub fn for_test(metastore_root: PathBuf) -> Self {
        HstreamServerConfig {
            listen_addr: ([127, 0, 0, 1], 0u16).into(),
            metastore_root,
            default_ack_timeout_secs: default_ack_timeout_secs(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_ack_timeout_secs == 0 {
            bail!("`default_ack_timeout_secs` must be at least 1.");
        }
        Ok(())
    }
}
