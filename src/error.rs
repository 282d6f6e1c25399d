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

//! Error types for talking to the DiskStation and the numeric error code
//! tables the Web API documents.

use crate::registry;
use thiserror::Error;

/// Which code table applies to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Generic,
    Auth,
    Task,
}

impl ErrorScope {
    pub fn for_api(key: &str) -> Self {
        match key {
            registry::AUTH => ErrorScope::Auth,
            registry::STATION_TASK => ErrorScope::Task,
            _ => ErrorScope::Generic,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum StationError {
    #[error("API `{0}` was never registered; the bootstrap query did not describe it")]
    UnknownApi(String),
    #[error("Could not connect to provided address {address}")]
    Connect {
        address: String,
        #[source]
        source: TransportError,
    },
    #[error("Invalid request URL {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
    #[error("Error in {api} request: {message} (code {code})")]
    Api {
        api: String,
        code: i64,
        message: &'static str,
    },
    #[error("response from {api} is missing `{field}`")]
    MissingField { api: String, field: &'static str },
}

impl StationError {
    /// Classify a `success: false` envelope returned for the API `key`.
    pub fn api(key: &str, code: i64) -> Self {
        let message = describe(ErrorScope::for_api(key), code).unwrap_or("Unrecognised error code");
        StationError::Api {
            api: registry::display_name(key),
            code,
            message,
        }
    }
}

/// Look up the message for `code`, preferring the scope's own table over
/// the codes shared by every API.
pub fn describe(scope: ErrorScope, code: i64) -> Option<&'static str> {
    let specific = match scope {
        ErrorScope::Generic => None,
        ErrorScope::Auth => auth_message(code),
        ErrorScope::Task => task_message(code),
    };
    specific.or_else(|| generic_message(code))
}

fn generic_message(code: i64) -> Option<&'static str> {
    let msg = match code {
        100 => "Unknown error",
        101 => "Invalid parameter",
        102 => "The requested API does not exist",
        103 => "The requested method does not exist",
        104 => "The requested version does not support the functionality",
        105 => "The logged in session does not have permission",
        106 => "Session timeout",
        107 => "Session interrupted by duplicate login",
        _ => return None,
    };
    Some(msg)
}

fn auth_message(code: i64) -> Option<&'static str> {
    let msg = match code {
        400 => "No such account or incorrect password",
        401 => "Account disabled",
        402 => "Permission denied",
        403 => "2-step verification code required",
        404 => "Failed to authenticate 2-step verification code",
        _ => return None,
    };
    Some(msg)
}

fn task_message(code: i64) -> Option<&'static str> {
    let msg = match code {
        400 => "File upload failed",
        401 => "Max number of tasks reached",
        402 => "Destination denied",
        403 => "Destination does not exist",
        404 => "Invalid task id",
        405 => "Invalid task action",
        406 => "No default destination",
        407 => "Set destination failed",
        408 => "File does not exist",
        _ => return None,
    };
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_codes_apply_to_every_scope() {
        for scope in [ErrorScope::Generic, ErrorScope::Auth, ErrorScope::Task] {
            assert_eq!(describe(scope, 106), Some("Session timeout"));
            assert_eq!(
                describe(scope, 107),
                Some("Session interrupted by duplicate login")
            );
        }
    }

    #[test]
    fn scoped_tables_disambiguate_shared_codes() {
        assert_eq!(
            describe(ErrorScope::Auth, 400),
            Some("No such account or incorrect password")
        );
        assert_eq!(describe(ErrorScope::Task, 400), Some("File upload failed"));
        assert_eq!(describe(ErrorScope::Task, 408), Some("File does not exist"));
        assert_eq!(describe(ErrorScope::Generic, 400), None);
        assert_eq!(describe(ErrorScope::Auth, 405), None);
    }

    #[test]
    fn scope_follows_logical_key() {
        assert_eq!(ErrorScope::for_api(registry::AUTH), ErrorScope::Auth);
        assert_eq!(ErrorScope::for_api(registry::STATION_TASK), ErrorScope::Task);
        assert_eq!(ErrorScope::for_api(registry::STATION_INFO), ErrorScope::Generic);
        assert_eq!(ErrorScope::for_api(registry::INFO), ErrorScope::Generic);
    }

    #[test]
    fn api_error_names_the_request() {
        let err = StationError::api(registry::STATION_TASK, 404);
        assert_eq!(
            err.to_string(),
            "Error in Download Station Task request: Invalid task id (code 404)"
        );

        let err = StationError::api(registry::AUTH, 999);
        assert!(err.to_string().contains("Unrecognised error code"));
        assert!(err.to_string().contains("Authentication"));
    }
}
