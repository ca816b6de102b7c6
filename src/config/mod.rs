//! Environment-driven logger configuration.
//!
//! [`LoggerConfig`] reads `LOG_LEVEL`, `LOG_COLOR`, `LOG_FORMAT` and
//! `LOG_UPSTREAM`; [`LoggerBuilder`] turns a config plus explicit overrides
//! into a root [`Logger`](crate::Logger).

mod build;

use std::{env, str::FromStr};

use thiserror::Error;

use crate::{
    formatter::{ConsoleFormatter, JsonFormatter, SharedFormatter, TextFormatter},
    level::{LevelParseError, LogLevel},
    upstream::{EndpointError, UpstreamEndpoint, UpstreamError},
};

pub use build::LoggerBuilder;

pub const ENV_LEVEL: &str = "LOG_LEVEL";
pub const ENV_COLOR: &str = "LOG_COLOR";
pub const ENV_FORMAT: &str = "LOG_FORMAT";
pub const ENV_UPSTREAM: &str = "LOG_UPSTREAM";

/// Errors raised while reading configuration or assembling a logger.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidLevel(#[from] LevelParseError),
    /// `LOG_COLOR` was neither a boolean nor `auto`.
    #[error("invalid color mode: \"{0}\"")]
    InvalidColor(String),
    #[error("invalid output format: \"{0}\" (expected \"text\" or \"json\")")]
    InvalidFormat(String),
    #[error("invalid upstream endpoint: {0}")]
    InvalidUpstream(#[from] EndpointError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Whether console output is coloured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Colour when stderr is a terminal and no custom output is set.
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "1" | "t" | "true" | "y" | "yes" | "on" => Ok(Self::Always),
            "0" | "f" | "false" | "n" | "no" | "off" => Ok(Self::Never),
            _ => Err(ConfigError::InvalidColor(s.to_owned())),
        }
    }
}

/// Layout of lines written to the logger's output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidFormat(s.to_owned())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub color: ColorMode,
    pub format: OutputFormat,
    pub upstream: Option<UpstreamEndpoint>,
}

impl LoggerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of a
    /// variable if it is set. Unset and empty variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let level = get(ENV_LEVEL)
            .map(|value| value.parse::<LogLevel>())
            .transpose()?
            .unwrap_or_default();
        let color = get(ENV_COLOR)
            .map(|value| value.parse::<ColorMode>())
            .transpose()?
            .unwrap_or_default();
        let format = get(ENV_FORMAT)
            .map(|value| value.parse::<OutputFormat>())
            .transpose()?
            .unwrap_or_default();
        let upstream = get(ENV_UPSTREAM)
            .map(|value| UpstreamEndpoint::parse(value.trim()))
            .transpose()?;
        Ok(Self {
            level,
            color,
            format,
            upstream,
        })
    }

    /// Formatter for this configuration; `terminal` says whether the output
    /// is attached to a terminal.
    pub fn formatter(&self, terminal: bool) -> SharedFormatter {
        let base = match self.format {
            OutputFormat::Text => SharedFormatter::new(TextFormatter),
            OutputFormat::Json => SharedFormatter::new(JsonFormatter),
        };
        match self.color {
            ColorMode::Always => SharedFormatter::new(ConsoleFormatter::new(true, Some(base))),
            ColorMode::Never => base,
            ColorMode::Auto => SharedFormatter::new(ConsoleFormatter::new(terminal, Some(base))),
        }
    }
}
