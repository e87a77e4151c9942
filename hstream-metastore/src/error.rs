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

#[derive(thiserror::Error, Debug)]
pub enum MetastoreError {
    #[error("Subscription `{subscription_id}` already exists.")]
    AlreadyExists { subscription_id: String },

    #[error("Subscription `{subscription_id}` does not exist.")]
    DoesNotExist { subscription_id: String },

    #[error("{0}")]
    InvalidIdentifier(String),

    #[error("Failed to serialize or deserialize subscription record: {message}")]
    InvalidManifest { message: String },

    #[error("Metastore I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MetastoreResult<T> = Result<T, MetastoreError>;
