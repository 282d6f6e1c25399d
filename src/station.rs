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

use crate::client::{ApiClient, Transport};
use crate::error::StationError;
use crate::registry::{self, ApiRegistry};
use serde_json::Value;

const SESSION_NAME: &str = "DownloadStation";

/// APIs the bootstrap query asks about, with the key they are registered under.
const BOOTSTRAP_APIS: [(&str, &str); 3] = [
    (registry::AUTH, registry::AUTH_WIRE_NAME),
    (registry::STATION_INFO, registry::STATION_INFO_WIRE_NAME),
    (registry::STATION_TASK, registry::STATION_TASK_WIRE_NAME),
];

#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub unzip_password: Option<String>,
    pub destination: Option<String>,
}

/// One run against a DiskStation: the endpoint catalog learned during
/// bootstrap plus the session id once logged in.
#[derive(Debug)]
pub struct DownloadStation<'a, T: Transport> {
    client: &'a ApiClient<T>,
    registry: ApiRegistry,
    sid: Option<String>,
}

impl<'a, T: Transport> DownloadStation<'a, T> {
    /// Ask `SYNO.API.Info` where the auth and Download Station APIs live and
    /// register whatever it describes.
    pub fn connect(client: &'a ApiClient<T>) -> Result<Self, StationError> {
        let mut apis = ApiRegistry::new();
        let query = BOOTSTRAP_APIS
            .iter()
            .map(|(_, wire_name)| *wire_name)
            .collect::<Vec<_>>()
            .join(",");
        let info = client.call(&apis, registry::INFO, "query", &[("query", query)], None)?;

        for (key, wire_name) in BOOTSTRAP_APIS {
            if apis.register_from_info(key, &info, wire_name) {
                tracing::debug!(key, wire_name, "registered API");
            } else {
                tracing::warn!(wire_name, "server did not describe API");
            }
        }
        // Nothing works without a session, so fail before asking for credentials.
        apis.resolve(registry::AUTH)?;

        Ok(Self::with_registry(client, apis))
    }

    pub fn with_registry(client: &'a ApiClient<T>, apis: ApiRegistry) -> Self {
        Self {
            client,
            registry: apis,
            sid: None,
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &ApiRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<(), StationError> {
        let params = [
            ("account", username.to_string()),
            ("passwd", password.to_string()),
            ("session", SESSION_NAME.to_string()),
            ("format", "sid".to_string()),
        ];
        let data = self.call(registry::AUTH, "login", &params)?;
        let sid = data
            .get("sid")
            .and_then(Value::as_str)
            .ok_or_else(|| StationError::MissingField {
                api: registry::display_name(registry::AUTH),
                field: "sid",
            })?;
        self.sid = Some(sid.to_string());
        tracing::debug!("logged in");
        Ok(())
    }

    /// End the session. The session id is forgotten even when the server
    /// rejects the call.
    pub fn logout(&mut self) -> Result<(), StationError> {
        if self.sid.is_none() {
            return Ok(());
        }
        let result = self.call(
            registry::AUTH,
            "logout",
            &[("session", SESSION_NAME.to_string())],
        );
        self.sid = None;
        result.map(|_| ())
    }

    pub fn info(&self) -> Result<Value, StationError> {
        self.call(registry::STATION_INFO, "getinfo", &[])
    }

    pub fn config(&self) -> Result<Value, StationError> {
        self.call(registry::STATION_INFO, "getconfig", &[])
    }

    pub fn list_tasks(
        &self,
        offset: Option<u64>,
        limit: Option<u64>,
        additional: Option<&str>,
    ) -> Result<Value, StationError> {
        let mut params = Vec::new();
        if let Some(offset) = offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(additional) = additional {
            params.push(("additional", additional.to_string()));
        }
        self.call(registry::STATION_TASK, "list", &params)
    }

    pub fn task_info(&self, ids: &str, additional: Option<&str>) -> Result<Value, StationError> {
        let mut params = vec![("id", ids.to_string())];
        if let Some(additional) = additional {
            params.push(("additional", additional.to_string()));
        }
        self.call(registry::STATION_TASK, "getinfo", &params)
    }

    pub fn create_task(&self, task: &CreateTask) -> Result<Value, StationError> {
        let mut params = vec![("uri", task.uri.clone())];
        let optional = [
            ("username", &task.username),
            ("password", &task.password),
            ("unzip_password", &task.unzip_password),
            ("destination", &task.destination),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.push((key, value.clone()));
            }
        }
        self.call(registry::STATION_TASK, "create", &params)
    }

    fn call(&self, key: &str, method: &str, params: &[(&str, String)]) -> Result<Value, StationError> {
        self.client
            .call(&self.registry, key, method, params, self.sid.as_deref())
    }
}
