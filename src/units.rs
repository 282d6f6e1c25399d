// dsctl - CLI for the Synology DiskStation Web API
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Human readable sizes, durations and timestamps.

use chrono::{Local, TimeZone};

// Each tier has its own divisor; the sub-GB tiers are close to, but not
// exactly, powers of 1024.
const SIZE_TIERS: [(f64, &str); 3] = [(1.074e9, "GB"), (1.049e6, "MB"), (1024.0, "KB")];

/// Render a byte count as e.g. `1.5 GB`, falling through GB, MB and KB until
/// the value reaches 1, and printing raw bytes otherwise.
pub fn readable_size(bytes: u64) -> String {
    for (divisor, unit) in SIZE_TIERS {
        let size = bytes as f64 / divisor;
        if size >= 1.0 {
            return format!("{} {unit}", format_rounded(size));
        }
    }
    format!("{bytes} B")
}

// Two decimals, printed as the shortest float that round-trips (`1.0`, `2.5`, `1023.59`).
fn format_rounded(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded:?}")
}

/// Render elapsed seconds as e.g. `1 day 2 hours 5 seconds`.
///
/// Only nonzero components are printed; zero renders as `0 seconds`.
pub fn readable_duration(total_seconds: u64) -> String {
    if total_seconds == 0 {
        return "0 seconds".to_string();
    }

    let total_minutes = total_seconds / 60;
    let total_hours = total_minutes / 60;
    let parts = [
        (total_hours / 24, "day"),
        (total_hours % 24, "hour"),
        (total_minutes % 60, "minute"),
        (total_seconds % 60, "second"),
    ];

    parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            let plural = if *value == 1 { "" } else { "s" };
            format!("{value} {unit}{plural}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a unix timestamp in local time as `YYYY/MM/DD HH:MM:SS`; `0`
/// (the API's "never") renders as an empty string.
pub fn format_timestamp(epoch: i64) -> String {
    if epoch == 0 {
        return String::new();
    }
    match Local.timestamp_opt(epoch, 0).single() {
        Some(dt) => dt.format("%Y/%m/%d %H:%M:%S").to_string(),
        None => epoch.to_string(),
    }
}
