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

use std::sync::Weak;
use std::time::Duration;

use tracing::{debug, warn};

use crate::record_id::RecordId;
use crate::registry::SubscriptionRegistry;
use crate::runtime::ResendOutcome;

/// Arms the resend timer for one dispatched batch.
///
/// The task carries only the subscription id and the record ids, and
/// re-resolves the runtime through the registry on every fire so that it
/// survives deletion races: once the subscription is gone (or the registry
/// itself is dropped) the task ends quietly. Each fire filters out records
/// acked in the meantime, so the set only shrinks.
pub(crate) fn schedule_resend(
    registry: Weak<SubscriptionRegistry>,
    subscription_id: String,
    record_ids: Vec<RecordId>,
    ack_timeout: Duration,
) {
    if record_ids.is_empty() {
        return;
    }
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ack_timeout).await;
            let registry = match registry.upgrade() {
                Some(registry) => registry,
                None => return,
            };
            let runtime = match registry.runtime(&subscription_id).await {
                Some(runtime) => runtime,
                None => return,
            };
            drop(registry);
            match runtime.resend_once(&record_ids).await {
                Ok(ResendOutcome::Pending) => {}
                Ok(ResendOutcome::Finished) => {
                    debug!(subscription_id = %subscription_id, "resend-set-fully-acked");
                    return;
                }
                Ok(ResendOutcome::Stopped) => return,
                Err(error) => {
                    warn!(
                        subscription_id = %subscription_id,
                        error = ?error,
                        "resend-failed"
                    );
                    return;
                }
            }
        }
    });
}
