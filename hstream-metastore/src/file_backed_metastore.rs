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

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    validate_identifier, Metastore, MetastoreError, MetastoreResult, Subscription,
};

const SUBSCRIPTIONS_DIR: &str = "subscriptions";

/// Stores one JSON file per subscription under `<root>/subscriptions/`.
pub struct FileBackedMetastore {
    root: PathBuf,
    // Serializes the check-then-write sequences of create and delete.
    write_lock: Mutex<()>,
}

impl FileBackedMetastore {
    /// Opens a metastore rooted at `root`, creating the layout if needed.
    pub async fn try_new(root: &Path) -> MetastoreResult<Self> {
        fs::create_dir_all(root.join(SUBSCRIPTIONS_DIR)).await?;
        Ok(FileBackedMetastore {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn subscription_path(&self, subscription_id: &str) -> PathBuf {
        self.root
            .join(SUBSCRIPTIONS_DIR)
            .join(format!("{subscription_id}.json"))
    }
}

async fn file_exists(path: &Path) -> std::io::Result<bool> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(io_error) if io_error.kind() == ErrorKind::NotFound => Ok(false),
        Err(io_error) => Err(io_error),
    }
}

#[async_trait]
impl Metastore for FileBackedMetastore {
    async fn create_subscription(&self, subscription: Subscription) -> MetastoreResult<()> {
        validate_identifier("Subscription ID", &subscription.subscription_id)?;
        validate_identifier("Stream name", &subscription.stream_name)?;
        let _guard = self.write_lock.lock().await;
        let path = self.subscription_path(&subscription.subscription_id);
        if file_exists(&path).await? {
            return Err(MetastoreError::AlreadyExists {
                subscription_id: subscription.subscription_id,
            });
        }
        let record_json = serde_json::to_vec_pretty(&subscription).map_err(|error| {
            MetastoreError::InvalidManifest {
                message: error.to_string(),
            }
        })?;
        fs::write(&path, record_json).await?;
        debug!(subscription_id = %subscription.subscription_id, "subscription-created");
        Ok(())
    }

    async fn delete_subscription(&self, subscription_id: &str) -> MetastoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.subscription_path(subscription_id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(subscription_id = %subscription_id, "subscription-deleted");
                Ok(())
            }
            Err(io_error) if io_error.kind() == ErrorKind::NotFound => {
                Err(MetastoreError::DoesNotExist {
                    subscription_id: subscription_id.to_string(),
                })
            }
            Err(io_error) => Err(io_error.into()),
        }
    }

    async fn subscription(&self, subscription_id: &str) -> MetastoreResult<Subscription> {
        let path = self.subscription_path(subscription_id);
        let record_json = match fs::read(&path).await {
            Ok(record_json) => record_json,
            Err(io_error) if io_error.kind() == ErrorKind::NotFound => {
                return Err(MetastoreError::DoesNotExist {
                    subscription_id: subscription_id.to_string(),
                });
            }
            Err(io_error) => return Err(io_error.into()),
        };
        serde_json::from_slice(&record_json).map_err(|error| MetastoreError::InvalidManifest {
            message: error.to_string(),
        })
    }

    async fn subscription_exists(&self, subscription_id: &str) -> MetastoreResult<bool> {
        let path = self.subscription_path(subscription_id);
        Ok(file_exists(&path).await?)
    }

    async fn list_subscriptions(&self) -> MetastoreResult<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        let mut dir_entries = fs::read_dir(self.root.join(SUBSCRIPTIONS_DIR)).await?;
        while let Some(dir_entry) = dir_entries.next_entry().await? {
            let path = dir_entry.path();
            if path.extension().map(|ext| ext != "json").unwrap_or(true) {
                continue;
            }
            let record_json = fs::read(&path).await?;
            let subscription = serde_json::from_slice(&record_json).map_err(|error| {
                MetastoreError::InvalidManifest {
                    message: format!("{}: {error}", path.display()),
                }
            })?;
            subscriptions.push(subscription);
        }
        subscriptions.sort_by(|left: &Subscription, right: &Subscription| {
            left.subscription_id.cmp(&right.subscription_id)
        });
        Ok(subscriptions)
    }
}
