// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::env::ConfigSource;

pub const PARAMETER_PREFIX_ENV: &str = "SQLWEAVE_PARAMETER_PREFIX";
pub const ALIAS_PREFIX_ENV: &str = "SQLWEAVE_ALIAS_PREFIX";
pub const INLINE_LITERALS_ENV: &str = "SQLWEAVE_INLINE_LITERALS";

pub const DEFAULT_PARAMETER_PREFIX: &str = "p";
pub const DEFAULT_ALIAS_PREFIX: &str = "t";

/// Settings shared by every builder of one statement (or one batch of statements).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Prefix of generated bind names (`p` gives `@p0`, `@p1`, ...)
    pub parameter_prefix: String,
    /// Prefix of generated table aliases, used when the caller doesn't supply one
    pub alias_prefix: String,
    /// Render literals as SQL text instead of binding them. Meant for debugging output only.
    pub inline_literals: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            inline_literals: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a letter or underscore followed by letters, digits or underscores, got `{value}`")]
    InvalidPrefix { key: &'static str, value: String },

    #[error("{key} must be a yes/no flag (true, 1, yes, on or false, 0, no, off), got `{value}`")]
    InvalidFlag { key: &'static str, value: String },
}

impl QueryConfig {
    pub fn from_env(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        Ok(Self {
            parameter_prefix: prefix(source, PARAMETER_PREFIX_ENV, DEFAULT_PARAMETER_PREFIX)?,
            alias_prefix: prefix(source, ALIAS_PREFIX_ENV, DEFAULT_ALIAS_PREFIX)?,
            inline_literals: flag(source, INLINE_LITERALS_ENV)?,
        })
    }
}

// Prefixes end up verbatim in the SQL text, so they must be plain identifiers.
fn prefix(
    source: &dyn ConfigSource,
    key: &'static str,
    default: &str,
) -> Result<String, ConfigError> {
    let Some(value) = source.var(key) else {
        return Ok(default.to_string());
    };

    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(value)
    } else {
        Err(ConfigError::InvalidPrefix { key, value })
    }
}

// Unset means off.
fn flag(source: &dyn ConfigSource, key: &'static str) -> Result<bool, ConfigError> {
    let Some(value) = source.var(key) else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { key, value }),
    }
}
