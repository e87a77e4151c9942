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

//! Per-subscription delivery engine.
//!
//! Every active subscription is one [`SubscriptionRuntime`] owned by the
//! process-wide [`SubscriptionRegistry`]. A background dispatch loop reads
//! ordered records from the log, fans them out round-robin across the
//! attached consumers, folds acknowledgments into a sparse
//! [`AckedRanges`] set, advances the delivery window as the acked prefix
//! grows (checkpointing each advancement), and redelivers records still
//! unacked after the subscription's ack timeout.

mod acked_ranges;
mod dispatcher;
mod error;
mod record_id;
mod registry;
mod resend;
mod runtime;

pub use crate::acked_ranges::{AckOutcome, AckedRanges, RecordIdRange};
pub use crate::dispatcher::ConsumerSender;
pub use crate::error::{SubscriptionError, SubscriptionResult};
pub use crate::record_id::{BatchNumMap, RecordId};
pub use crate::registry::SubscriptionRegistry;
pub use crate::runtime::{DispatchOutcome, ResendOutcome, SubscriptionRuntime};
