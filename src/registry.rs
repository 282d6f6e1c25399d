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

//! Catalog of the Web API endpoints known to this run.
//!
//! The DiskStation describes its own APIs through `SYNO.API.Info`. Only that
//! entry is known up front; everything else is learned from its answer.

use crate::error::StationError;
use serde_json::Value;
use std::collections::HashMap;

pub const INFO: &str = "info";
pub const AUTH: &str = "auth";
pub const STATION_INFO: &str = "ds_info";
pub const STATION_TASK: &str = "ds_task";

pub const INFO_WIRE_NAME: &str = "SYNO.API.Info";
pub const AUTH_WIRE_NAME: &str = "SYNO.API.Auth";
pub const STATION_INFO_WIRE_NAME: &str = "SYNO.DownloadStation.Info";
pub const STATION_TASK_WIRE_NAME: &str = "SYNO.DownloadStation.Task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDescriptor {
    pub key: String,
    pub wire_name: String,
    pub version: u32,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ApiRegistry {
    apis: HashMap<String, ApiDescriptor>,
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            apis: HashMap::new(),
        };
        registry.register(INFO, INFO_WIRE_NAME, 1, "query.cgi");
        registry
    }

    /// Insert or replace the descriptor for `key`.
    pub fn register(&mut self, key: &str, wire_name: &str, version: u32, path: &str) {
        self.apis.insert(
            key.to_string(),
            ApiDescriptor {
                key: key.to_string(),
                wire_name: wire_name.to_string(),
                version,
                path: path.to_string(),
            },
        );
    }

    pub fn resolve(&self, key: &str) -> Result<&ApiDescriptor, StationError> {
        self.apis
            .get(key)
            .ok_or_else(|| StationError::UnknownApi(key.to_string()))
    }

    /// Register `key` from the `data` object of a `SYNO.API.Info` query.
    ///
    /// Returns `false` without touching the registry when the answer does not
    /// describe `wire_name` with both a `maxVersion` and a `path`.
    pub fn register_from_info(&mut self, key: &str, info: &Value, wire_name: &str) -> bool {
        let Some(entry) = info.get(wire_name) else {
            return false;
        };
        let version = entry
            .get("maxVersion")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok());
        let path = entry.get("path").and_then(Value::as_str);

        match (version, path) {
            (Some(version), Some(path)) => {
                self.register(key, wire_name, version, path);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.apis.len()
    }
}

/// Name used when reporting failures of the API registered as `key`.
pub fn display_name(key: &str) -> String {
    match key {
        INFO => "API Info".to_string(),
        AUTH => "Authentication".to_string(),
        STATION_INFO => "Download Station Info".to_string(),
        STATION_TASK => "Download Station Task".to_string(),
        other => crate::table::display_name(other),
    }
}
