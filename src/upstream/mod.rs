//! Forwarding of log records to a remote collector over TCP.
//!
//! Two hooks are provided. [`BufferedUpstreamHook`] queues JSON lines and
//! delivers them from a worker thread, retrying until the collector accepts
//! them; it suits collectors across the network. [`UnbufferedUpstreamHook`]
//! writes on the calling thread with a short timeout and drops what it cannot
//! deliver; it suits a collector on the loopback interface.
//! [`hook_for_endpoint`] picks between them from the endpoint address.

mod buffered;
mod config;
mod endpoint;
mod serialise;
mod shutdown;
mod transport;
mod unbuffered;
mod worker;

#[cfg(test)]
mod tests;

use std::io;

use thiserror::Error;

use crate::{hook::Hook, level::LogLevel, log_record::LogRecord};

pub use buffered::BufferedUpstreamHook;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_EXIT_TIMEOUT, DEFAULT_FLUSH_INTERVAL, DEFAULT_LOCAL_TIMEOUT,
    DEFAULT_PANIC_TIMEOUT, DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_INTERVAL, DEFAULT_WRITE_TIMEOUT,
    OverflowPolicy, RetryInterval, UpstreamConfig,
};
pub use endpoint::{EndpointError, UpstreamEndpoint};
pub use shutdown::ShutdownHandle;
pub use transport::UpstreamConnection;
pub use unbuffered::UnbufferedUpstreamHook;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("failed to start upstream worker: {0}")]
    Spawn(#[from] io::Error),
}

/// Either kind of upstream hook, as chosen by [`hook_for_endpoint`].
#[derive(Debug)]
pub enum UpstreamHook {
    Buffered(BufferedUpstreamHook),
    Unbuffered(UnbufferedUpstreamHook),
}

impl UpstreamHook {
    pub fn endpoint(&self) -> &UpstreamEndpoint {
        match self {
            Self::Buffered(hook) => hook.endpoint(),
            Self::Unbuffered(hook) => hook.endpoint(),
        }
    }

    /// Shutdown control for the buffered variant; the unbuffered hook holds
    /// nothing that needs flushing.
    pub fn shutdown_handle(&self) -> Option<ShutdownHandle> {
        match self {
            Self::Buffered(hook) => Some(hook.shutdown_handle()),
            Self::Unbuffered(_) => None,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered(_))
    }
}

impl Hook for UpstreamHook {
    fn levels(&self) -> &[LogLevel] {
        match self {
            Self::Buffered(hook) => hook.levels(),
            Self::Unbuffered(hook) => hook.levels(),
        }
    }

    fn fire(&self, record: &LogRecord) {
        match self {
            Self::Buffered(hook) => hook.fire(record),
            Self::Unbuffered(hook) => hook.fire(record),
        }
    }
}

/// Build the hook suited to `endpoint`: unbuffered for loopback addresses,
/// buffered for everything else.
pub fn hook_for_endpoint(
    endpoint: &str,
    config: UpstreamConfig,
) -> Result<UpstreamHook, UpstreamError> {
    hook_for(UpstreamEndpoint::parse(endpoint)?, config)
}

/// [`hook_for_endpoint`] for an address that has already been parsed.
pub fn hook_for(
    endpoint: UpstreamEndpoint,
    config: UpstreamConfig,
) -> Result<UpstreamHook, UpstreamError> {
    if endpoint.is_loopback() {
        Ok(UpstreamHook::Unbuffered(
            UnbufferedUpstreamHook::with_endpoint(endpoint, config),
        ))
    } else {
        BufferedUpstreamHook::with_endpoint(endpoint, config).map(UpstreamHook::Buffered)
    }
}
