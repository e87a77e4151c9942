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

use hstream_metastore::MetastoreError;
use hstream_store::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum SubscriptionError {
    #[error("Subscription `{subscription_id}` does not exist.")]
    SubscriptionNotFound { subscription_id: String },

    #[error("Subscription `{subscription_id}` already exists.")]
    SubscriptionAlreadyExists { subscription_id: String },

    /// The subscription was deleted while a session or timer was still
    /// referring to it.
    #[error("Subscription has been removed")]
    SubscriptionRemoved,

    #[error("Stream `{stream_name}` does not exist.")]
    StreamNotFound { stream_name: String },

    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("Metastore error: {0}")]
    Metastore(MetastoreError),

    #[error("Log store error: {0}")]
    Store(#[from] StoreError),
}

impl From<MetastoreError> for SubscriptionError {
    fn from(error: MetastoreError) -> Self {
        match error {
            MetastoreError::AlreadyExists { subscription_id } => {
                SubscriptionError::SubscriptionAlreadyExists { subscription_id }
            }
            MetastoreError::DoesNotExist { subscription_id } => {
                SubscriptionError::SubscriptionNotFound { subscription_id }
            }
            MetastoreError::InvalidIdentifier(message) => {
                SubscriptionError::InvalidArgument { message }
            }
            other => SubscriptionError::Metastore(other),
        }
    }
}

pub type SubscriptionResult<T> = Result<T, SubscriptionError>;
