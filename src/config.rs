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

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Defaults read from disk. Passwords are deliberately not part of it.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub address: Option<String>,
    pub username: Option<String>,
    pub human_readable: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a config directory for the current user")]
    MissingConfigDir,
    #[error("a server address is required; pass it as the first argument or set `address` in .dsctl.yaml")]
    MissingAddress,
}

/// Values given on the command line; each one wins over the config files.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub address: Option<String>,
    pub username: Option<String>,
    pub human_readable: bool,
}

#[derive(Debug)]
pub struct EffectiveConfig {
    pub address: String,
    pub username: Option<String>,
    pub human_readable: bool,
    pub timeout: Duration,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".dsctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("DSCTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("dsctl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn resolve(cwd: &Path, overrides: Overrides) -> Result<EffectiveConfig> {
    let merged = load(cwd)?;

    let address = overrides
        .address
        .or(merged.address)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or(ConfigError::MissingAddress)?;

    let username = overrides.username.or(merged.username);
    let human_readable = overrides.human_readable || merged.human_readable.unwrap_or(false);
    let timeout = Duration::from_secs(merged.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

    Ok(EffectiveConfig {
        address,
        username,
        human_readable,
        timeout,
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    Config {
        address: local.address.or(user.address),
        username: local.username.or(user.username),
        human_readable: local.human_readable.or(user.human_readable),
        timeout_secs: local.timeout_secs.or(user.timeout_secs),
    }
}
