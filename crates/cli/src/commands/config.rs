// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use spacelink::ClientConfig;

use crate::cli::GlobalArgs;
use crate::config;
use crate::error::Result;

const REDACTED: &str = "<redacted>";

pub fn run(global: &GlobalArgs) -> Result<()> {
    let resolved = config::resolve(global)?;
    print!("{}", render(&resolved)?);
    Ok(())
}

/// Renders a configuration as TOML with the token hidden.
pub fn render(config: &ClientConfig) -> Result<String> {
    let mut shown = config.clone();
    if shown.token.is_some() {
        shown.token = Some(REDACTED.to_string());
    }
    Ok(toml::to_string(&shown)?)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
