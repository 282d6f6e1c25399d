use crate::error::{StationError, TransportError};
use crate::registry::{ApiDescriptor, ApiRegistry};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, COOKIE, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT_VALUE: &str = "dsctl/0.1";

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status: u16,
    pub body: String,
}

/// Blocking GET used by the request pipeline.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        cookies: &[(&str, &str)],
    ) -> Result<ResponseData, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(HeaderValue::from_static(USER_AGENT_VALUE))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        cookies: &[(&str, &str)],
    ) -> Result<ResponseData, TransportError> {
        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if !query.is_empty() {
            request = request.query(query);
        }
        if !cookies.is_empty() {
            let jar = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, jar);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(ResponseData { status, body })
    }
}

/// The `{success, data, error}` object every Web API call answers with.
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
}

/// Query string for one call: `api`, `version` and `method` first, then the
/// caller's parameters. A caller key equal to one of the reserved keys
/// replaces that entry in place; any other key is appended in caller order.
pub fn build_query(
    descriptor: &ApiDescriptor,
    method: &str,
    params: &[(&str, String)],
) -> Vec<(String, String)> {
    let mut query = vec![
        ("api".to_string(), descriptor.wire_name.clone()),
        ("version".to_string(), descriptor.version.to_string()),
        ("method".to_string(), method.to_string()),
    ];
    for (key, value) in params {
        match query.iter_mut().find(|(existing, _)| existing == key) {
            Some(slot) => slot.1 = value.clone(),
            None => query.push((key.to_string(), value.clone())),
        }
    }
    query
}

#[derive(Debug, Clone)]
pub struct ApiClient<T: Transport = HttpTransport> {
    address: String,
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(address: &str, transport: T) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            transport,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url_for(&self, descriptor: &ApiDescriptor) -> String {
        format!("http://{}/webapi/{}", self.address, descriptor.path)
    }

    /// Issue `method` on the API registered as `key` and return the envelope's
    /// `data` (JSON `null` when the server sent none).
    pub fn call(
        &self,
        registry: &ApiRegistry,
        key: &str,
        method: &str,
        params: &[(&str, String)],
        sid: Option<&str>,
    ) -> Result<Value, StationError> {
        let descriptor = registry.resolve(key)?;
        let url = self.url_for(descriptor);
        let query = build_query(descriptor, method, params);
        let cookies: Vec<(&str, &str)> = match sid {
            Some(sid) if !sid.is_empty() => vec![("id", sid)],
            _ => Vec::new(),
        };

        tracing::debug!(key = %descriptor.key, api = %descriptor.wire_name, method, %url, "sending request");
        let response = self
            .transport
            .get(&url, &query, &cookies)
            .map_err(|source| StationError::Connect {
                address: self.address.clone(),
                source,
            })?;
        tracing::debug!(status = response.status, bytes = response.body.len(), "received response");

        let envelope: ResponseEnvelope =
            serde_json::from_str(&response.body).map_err(|err| StationError::InvalidResponse {
                url: url.clone(),
                reason: err.to_string(),
            })?;

        if envelope.success {
            return Ok(envelope.data.unwrap_or(Value::Null));
        }

        match envelope.error {
            Some(error) => {
                tracing::debug!(api = %descriptor.wire_name, method, code = error.code, "API reported failure");
                Err(StationError::api(key, error.code))
            }
            None => Err(StationError::InvalidResponse {
                url,
                reason: "unsuccessful response without an error code".to_string(),
            }),
        }
    }
}
