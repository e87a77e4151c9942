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

pub mod net;
pub mod rand;

use once_cell::sync::Lazy;

static LOGGER_GUARD: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().format_timestamp(None).try_init();
});

/// Initializes the logger once for the whole test binary.
/// Repeated calls are no-ops.
pub fn setup_logging_for_tests() {
    Lazy::force(&LOGGER_GUARD);
}
