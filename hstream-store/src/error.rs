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

use crate::{LogId, Lsn};

/// Error type for all log store operations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Log for stream `{stream_name}` does not exist.")]
    LogNotFound { stream_name: String },

    #[error("Log `{log_id}` is not registered with this store.")]
    UnknownLog { log_id: LogId },

    #[error("Failed to read log `{log_id}` at LSN `{lsn}`: {message}")]
    ReadFailure {
        log_id: LogId,
        lsn: Lsn,
        message: String,
    },

    #[error("Failed to write checkpoint for log `{log_id}`: {message}")]
    CheckpointFailure { log_id: LogId, message: String },

    #[error("Internal store error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
