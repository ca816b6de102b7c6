//! Assembly of a root logger from configuration and overrides.

use std::{
    io::{self, IsTerminal, Write},
    sync::Arc,
};

use super::{ConfigError, LoggerConfig};
use crate::{
    diagnostics::Diagnostics,
    exit::ExitCoordinator,
    formatter::{Formatter, SharedFormatter},
    hook::Hook,
    level::LogLevel,
    logger::{CoreParts, Logger},
    metrics::MetricFactory,
    upstream::{self, UpstreamConfig, UpstreamEndpoint},
};

/// Builder for a root [`Logger`].
///
/// Values from [`LoggerConfig`] are defaults; an explicit formatter wins over
/// the configured format and colour mode.
#[derive(Default)]
pub struct LoggerBuilder {
    config: LoggerConfig,
    upstream: UpstreamConfig,
    output: Option<Box<dyn Write + Send>>,
    formatter: Option<SharedFormatter>,
    metrics: Option<MetricFactory>,
    exit: Option<Arc<ExitCoordinator>>,
    diagnostics: Option<Diagnostics>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::from_config(LoggerConfig::from_env()?))
    }

    pub fn from_config(config: LoggerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_upstream(mut self, endpoint: UpstreamEndpoint) -> Self {
        self.config.upstream = Some(endpoint);
        self
    }

    /// Settings for upstream hooks created by this logger.
    pub fn with_upstream_config(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn with_output<W>(mut self, output: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.output = Some(Box::new(output));
        self
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Formatter + 'static,
    {
        self.formatter = Some(SharedFormatter::new(formatter));
        self
    }

    /// Register the logger's counters with `metrics` instead of a private
    /// registry.
    pub fn with_metrics(mut self, metrics: MetricFactory) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Share an exit chain with other components.
    pub fn with_exit_coordinator(mut self, exit: Arc<ExitCoordinator>) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Report pipeline failures to `diagnostics`. Applies to upstream hooks
    /// too, overriding the sink in the upstream config.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn with_hook<H>(mut self, hook: H) -> Self
    where
        H: Hook + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Build the logger. Fails only if the upstream worker cannot start.
    pub fn build(self) -> Result<Logger, ConfigError> {
        let Self {
            config,
            mut upstream,
            output,
            formatter,
            metrics,
            exit,
            diagnostics,
            hooks,
        } = self;
        let diagnostics = match diagnostics {
            Some(diagnostics) => {
                upstream = upstream.with_diagnostics(diagnostics.clone());
                diagnostics
            }
            None => upstream.diagnostics.clone(),
        };
        let formatter = formatter.unwrap_or_else(|| {
            config.formatter(output.is_none() && io::stderr().is_terminal())
        });
        let logger = Logger::from_parts(CoreParts {
            level: config.level,
            formatter,
            output: output.unwrap_or_else(|| Box::new(io::stderr())),
            exit: exit.unwrap_or_else(|| Arc::new(ExitCoordinator::new(diagnostics.clone()))),
            metrics: metrics.unwrap_or_else(|| MetricFactory::with_prefix("")),
            upstream: upstream.clone(),
            diagnostics,
        });
        for hook in hooks {
            logger.add_shared_hook(hook);
        }
        if let Some(endpoint) = config.upstream {
            logger.set_upstream_hook(upstream::hook_for(endpoint, upstream)?);
        }
        Ok(logger)
    }
}
