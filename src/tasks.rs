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

//! Reshaping of Download Station task objects before they are tabulated.

use crate::units::{format_timestamp, readable_duration, readable_size};
use serde_json::{Map, Value};

const TIMESTAMP_FIELDS: [&str; 3] = ["completed_time", "create_time", "started_time"];
const TRANSFER_SIZE_FIELDS: [&str; 2] = ["size_downloaded", "size_uploaded"];
const TRANSFER_SPEED_FIELDS: [&str; 2] = ["speed_download", "speed_upload"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Enrichment {
    pub detail: bool,
    pub transfer: bool,
    pub human_readable: bool,
}

impl Enrichment {
    /// Values for the `additional` request parameter, e.g. `detail,transfer`.
    pub fn additional(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.detail {
            parts.push("detail");
        }
        if self.transfer {
            parts.push("transfer");
        }
        (!parts.is_empty()).then(|| parts.join(","))
    }

    pub fn apply_all(&self, tasks: &mut [Value]) {
        for task in tasks.iter_mut() {
            if let Some(task) = task.as_object_mut() {
                self.apply(task);
            }
        }
    }

    pub fn apply(&self, task: &mut Map<String, Value>) {
        if let Some(Value::Object(mut additional)) = task.remove("additional") {
            for (section, wanted) in [("detail", self.detail), ("transfer", self.transfer)] {
                if !wanted {
                    continue;
                }
                if let Some(Value::Object(fields)) = additional.remove(section) {
                    task.extend(fields);
                }
            }
        }

        if self.human_readable {
            map_u64(task, "size", |n| Value::from(readable_size(n)));
        }

        if self.detail {
            for field in TIMESTAMP_FIELDS {
                map_i64(task, field, |n| Value::from(format_timestamp(n)));
            }
            if self.human_readable {
                map_u64(task, "seedelapsed", |n| Value::from(readable_duration(n)));
            }
        }

        if self.transfer && self.human_readable {
            for field in TRANSFER_SIZE_FIELDS {
                map_u64(task, field, |n| Value::from(readable_size(n)));
            }
            for field in TRANSFER_SPEED_FIELDS {
                map_u64(task, field, |n| Value::from(format!("{}/s", readable_size(n))));
            }
        }
    }
}

fn map_u64(task: &mut Map<String, Value>, field: &str, convert: impl Fn(u64) -> Value) {
    if let Some(value) = task.get_mut(field)
        && let Some(n) = value.as_u64()
    {
        *value = convert(n);
    }
}

fn map_i64(task: &mut Map<String, Value>, field: &str, convert: impl Fn(i64) -> Value) {
    if let Some(value) = task.get_mut(field)
        && let Some(n) = value.as_i64()
    {
        *value = convert(n);
    }
}
