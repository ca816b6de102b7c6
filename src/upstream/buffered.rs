//! Queue-backed hook for remote collectors.

use std::{fmt, thread::JoinHandle, time::Duration};

use crossbeam_channel::{SendTimeoutError, Sender, TrySendError, bounded};
use parking_lot::Mutex;

use crate::{
    diagnostics::Diagnostics,
    hook::Hook,
    level::LogLevel,
    log_record::LogRecord,
    rate_limited_warner::RateLimitedWarner,
};

use super::{
    UpstreamError,
    config::{OverflowPolicy, RetryInterval, UpstreamConfig},
    endpoint::UpstreamEndpoint,
    serialise::{QueuedLine, serialise_record},
    shutdown::{ShutdownHandle, shutdown_pair},
    worker::spawn_worker,
};

/// Hook that queues records and lets a worker thread deliver them.
///
/// Callers never wait on the network. The worker retries the oldest
/// undelivered record until the collector accepts it, so records arrive in
/// the order they were fired. Records at [`LogLevel::Panic`] additionally
/// stop the worker and block the caller for up to the panic timeout so the
/// record has a chance to leave the process.
pub struct BufferedUpstreamHook {
    endpoint: UpstreamEndpoint,
    tx: Sender<QueuedLine>,
    shutdown: ShutdownHandle,
    handle: Mutex<Option<JoinHandle<()>>>,
    overflow: OverflowPolicy,
    panic_timeout: Duration,
    exit_timeout: Duration,
    retry_interval: RetryInterval,
    diagnostics: Diagnostics,
    warner: RateLimitedWarner,
}

impl BufferedUpstreamHook {
    /// Parse `endpoint` and start the worker.
    pub fn new(endpoint: &str, config: UpstreamConfig) -> Result<Self, UpstreamError> {
        Self::with_endpoint(UpstreamEndpoint::parse(endpoint)?, config)
    }

    pub fn with_endpoint(
        endpoint: UpstreamEndpoint,
        config: UpstreamConfig,
    ) -> Result<Self, UpstreamError> {
        let (tx, rx) = bounded(config.capacity);
        let (shutdown, signals) = shutdown_pair();
        let handle = spawn_worker(endpoint.clone(), rx, signals, &config)?;
        Ok(Self {
            endpoint,
            tx,
            shutdown,
            handle: Mutex::new(Some(handle)),
            overflow: config.overflow,
            panic_timeout: config.panic_timeout,
            exit_timeout: config.exit_timeout,
            retry_interval: config.retry_interval,
            warner: RateLimitedWarner::new(config.warn_interval),
            diagnostics: config.diagnostics,
        })
    }

    pub fn endpoint(&self) -> &UpstreamEndpoint {
        &self.endpoint
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Handle to the pause between reconnection attempts; changes apply to
    /// the running worker.
    pub fn retry_interval(&self) -> &RetryInterval {
        &self.retry_interval
    }

    pub fn exit_timeout(&self) -> Duration {
        self.exit_timeout
    }

    /// Closure suitable for an exit chain: stop the worker and wait for it
    /// up to the exit timeout.
    pub fn exit_handler(&self) -> impl FnOnce() + Send + 'static {
        let shutdown = self.shutdown.clone();
        let timeout = self.exit_timeout;
        move || {
            shutdown.shutdown(timeout);
        }
    }

    /// Stop the worker and wait up to the exit timeout. Returns `true` when
    /// the worker finished in time.
    pub fn close(&self) -> bool {
        let finished = self.shutdown.shutdown(self.exit_timeout);
        if finished && let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                self.diagnostics
                    .report(format!("upstream {}: worker thread panicked", self.endpoint));
            }
        }
        self.warner.flush(|count| self.report_drops(count));
        finished
    }

    fn enqueue(&self, line: QueuedLine) {
        let rejected = match self.overflow {
            OverflowPolicy::Drop => match self.tx.try_send(line) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => Some("queue full"),
                Err(TrySendError::Disconnected(_)) => Some("hook closed"),
            },
            OverflowPolicy::Block => self.tx.send(line).err().map(|_| "hook closed"),
            OverflowPolicy::Timeout(timeout) => match self.tx.send_timeout(line, timeout) {
                Ok(()) => None,
                Err(SendTimeoutError::Timeout(_)) => Some("queue full"),
                Err(SendTimeoutError::Disconnected(_)) => Some("hook closed"),
            },
        };
        if let Some(reason) = rejected {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                self.diagnostics.report(format!(
                    "upstream {}: {reason}; dropped {count} records",
                    self.endpoint
                ));
            });
        }
    }

    fn report_drops(&self, count: u64) {
        self.diagnostics.report(format!(
            "upstream {}: dropped {count} records in the last interval",
            self.endpoint
        ));
    }
}

impl Hook for BufferedUpstreamHook {
    fn levels(&self) -> &[LogLevel] {
        &LogLevel::UPSTREAM
    }

    fn fire(&self, record: &LogRecord) {
        match serialise_record(record) {
            Ok(Some(line)) => self.enqueue(line),
            Ok(None) => {}
            Err(err) => self.diagnostics.report(format!(
                "upstream {}: failed to serialise record: {err}",
                self.endpoint
            )),
        }
        if record.level == LogLevel::Panic {
            self.shutdown.shutdown(self.panic_timeout);
        }
    }
}

impl Drop for BufferedUpstreamHook {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for BufferedUpstreamHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedUpstreamHook")
            .field("endpoint", &self.endpoint)
            .field("overflow", &self.overflow)
            .field("closed", &self.shutdown.is_closed())
            .finish()
    }
}
