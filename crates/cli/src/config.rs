// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves the client configuration for a command.
//!
//! Precedence, highest first: command-line flags, `SPACELINK_*` environment
//! variables, the config file. The config file is `--config`, else
//! `SPACELINK_CONFIG`, else `<config dir>/spacelink/config.toml` when it
//! exists.

use std::path::{Path, PathBuf};

use spacelink::ClientConfig;
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::env;
use crate::error::{Error, Result};

/// Returns the default config file location.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spacelink").join("config.toml"))
}

/// Settings taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub config: Option<PathBuf>,
    pub url: Option<String>,
    pub token: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        EnvOverrides {
            config: env::config_path(),
            url: env::url(),
            token: env::token(),
        }
    }
}

/// Resolves the configuration from flags, environment and config file.
pub fn resolve(global: &GlobalArgs) -> Result<ClientConfig> {
    resolve_with(global, &EnvOverrides::from_env(), default_path())
}

/// Resolves against explicit environment overrides and default path.
pub fn resolve_with(
    global: &GlobalArgs,
    env: &EnvOverrides,
    default: Option<PathBuf>,
) -> Result<ClientConfig> {
    let (file, base) = match global.config.clone().or_else(|| env.config.clone()) {
        // An explicitly named file must exist.
        Some(path) => {
            let config = load(&path)?;
            (Some(path), Some(config))
        }
        None => match default {
            Some(path) if path.exists() => {
                let config = load(&path)?;
                (Some(path), Some(config))
            }
            other => (other, None),
        },
    };

    let url = global
        .url
        .clone()
        .or_else(|| env.url.clone())
        .or_else(|| base.as_ref().map(|config| config.url.clone()))
        .ok_or_else(|| Error::NoUrl(describe(file.as_deref())))?;

    let mut config = base.unwrap_or_else(|| ClientConfig::new(url.clone(), ""));
    config.url = url;
    if let Some(project) = &global.project {
        config.project = project.clone();
    }
    if let Some(token) = global.token.clone().or_else(|| env.token.clone()) {
        config.token = Some(token);
    }

    config.validate()?;
    Ok(config)
}

fn load(path: &Path) -> Result<ClientConfig> {
    debug!(path = %path.display(), "loading config");
    Ok(ClientConfig::load(path)?)
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "the config file".to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
