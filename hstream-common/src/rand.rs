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

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Appends a random suffix of five lowercase alphanumeric characters
/// to make a test resource name unique.
pub fn append_random_suffix(label: &str) -> String {
    let slug: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|byte| char::from(byte.to_ascii_lowercase()))
        .collect();
    format!("{label}-{slug}")
}
