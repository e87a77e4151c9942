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

//! Persistence of subscription definitions.
//!
//! Subscriptions are immutable configuration records. The metastore is a
//! plain key-value surface: create, get, list, delete, and an existence
//! check. Deletion is final.

mod error;
mod file_backed_metastore;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use crate::error::{MetastoreError, MetastoreResult};
pub use crate::file_backed_metastore::FileBackedMetastore;

/// Where a freshly materialized subscription starts reading its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionOffset {
    Earliest,
    Latest,
    /// An explicit position `(batch LSN, index within batch)`.
    RecordId { batch_id: u64, batch_index: u32 },
}

impl Default for SubscriptionOffset {
    fn default() -> Self {
        SubscriptionOffset::Earliest
    }
}

/// Immutable subscription configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: String,
    pub stream_name: String,
    /// Records unacked for longer than this are redelivered.
    pub ack_timeout_secs: u32,
    #[serde(default)]
    pub offset: SubscriptionOffset,
}

/// Checks that a subscription id or stream name is a well-formed identifier.
pub fn validate_identifier(label: &str, value: &str) -> MetastoreResult<()> {
    static IDENTIFIER_REGEX: OnceCell<Regex> = OnceCell::new();

    if IDENTIFIER_REGEX
        .get_or_init(|| {
            Regex::new(r"^[a-zA-Z][a-zA-Z0-9-_]{0,254}$").expect("The regex should compile.")
        })
        .is_match(value)
    {
        return Ok(());
    }
    Err(MetastoreError::InvalidIdentifier(format!(
        "{label} `{value}` is invalid."
    )))
}

#[cfg_attr(any(test, feature = "testsuite"), mockall::automock)]
#[async_trait]
pub trait Metastore: Send + Sync + 'static {
    /// Persists a new subscription record.
    /// Fails with [`MetastoreError::AlreadyExists`] if the id is taken.
    async fn create_subscription(&self, subscription: Subscription) -> MetastoreResult<()>;

    /// Removes a subscription record. Fails with
    /// [`MetastoreError::DoesNotExist`] if the id is unknown.
    async fn delete_subscription(&self, subscription_id: &str) -> MetastoreResult<()>;

    /// Fetches a subscription record by id.
    async fn subscription(&self, subscription_id: &str) -> MetastoreResult<Subscription>;

    async fn subscription_exists(&self, subscription_id: &str) -> MetastoreResult<bool>;

    async fn list_subscriptions(&self) -> MetastoreResult<Vec<Subscription>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_offset_serde_shape() {
        let subscription = Subscription {
            subscription_id: "sub-1".to_string(),
            stream_name: "events".to_string(),
            ack_timeout_secs: 60,
            offset: SubscriptionOffset::RecordId {
                batch_id: 42,
                batch_index: 3,
            },
        };
        let json = serde_json::to_value(&subscription).unwrap();
        assert_eq!(
            json["offset"],
            serde_json::json!({"record_id": {"batch_id": 42, "batch_index": 3}})
        );
        let parsed: Subscription = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, subscription);
    }

    #[test]
    fn test_subscription_offset_defaults_to_earliest() {
        let parsed: Subscription = serde_json::from_str(
            r#"{"subscription_id": "sub-1", "stream_name": "events", "ack_timeout_secs": 10}"#,
        )
        .unwrap();
        assert_eq!(parsed.offset, SubscriptionOffset::Earliest);
    }

    #[test]
    fn test_validate_identifier() {
        validate_identifier("Subscription ID", "sub-1").unwrap();
        validate_identifier("Stream name", "Events_2").unwrap();
        validate_identifier("Subscription ID", "").unwrap_err();
        validate_identifier("Subscription ID", "1-starts-with-digit").unwrap_err();
        validate_identifier("Subscription ID", "has/slash").unwrap_err();
    }
}
