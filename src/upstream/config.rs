//! Configuration consumed by the upstream hooks.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{diagnostics::Diagnostics, rate_limited_warner::DEFAULT_WARN_INTERVAL};

/// Default number of records the buffered hook can hold before overflowing.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
/// How often the buffered worker drains its queue.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
/// Dial timeout for remote collectors.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Dial and write timeout for collectors on the loopback interface.
pub const DEFAULT_LOCAL_TIMEOUT: Duration = Duration::from_secs(1);
/// Write timeout applied to buffered deliveries.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// How long process exit waits for the buffered worker.
pub const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_secs(3);
/// How long a panic-level record blocks its caller waiting for delivery.
pub const DEFAULT_PANIC_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause between reconnection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Retry pause shared between a hook and whoever configured it.
///
/// Updates take effect from the next wait onwards, including in a worker that
/// is already running.
#[derive(Clone, Debug)]
pub struct RetryInterval {
    millis: Arc<AtomicU64>,
}

impl RetryInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(to_millis(interval))),
        }
    }

    pub fn get(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }

    pub fn set(&self, interval: Duration) {
        self.millis.store(to_millis(interval), Ordering::Relaxed);
    }
}

impl Default for RetryInterval {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

fn to_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

/// Determines how the buffered hook reacts when its queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop new records, preserving queued ones.
    Drop,
    /// Block the caller until space becomes available.
    Block,
    /// Block up to the specified duration before dropping.
    Timeout(Duration),
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self::Drop
    }
}

/// Settings for [`BufferedUpstreamHook`](super::BufferedUpstreamHook) and
/// [`UnbufferedUpstreamHook`](super::UnbufferedUpstreamHook).
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub capacity: usize,
    pub flush_interval: Duration,
    pub connect_timeout: Duration,
    pub local_timeout: Duration,
    pub write_timeout: Duration,
    pub exit_timeout: Duration,
    pub panic_timeout: Duration,
    pub retry_interval: RetryInterval,
    pub overflow: OverflowPolicy,
    pub diagnostics: Diagnostics,
    pub warn_interval: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            local_timeout: DEFAULT_LOCAL_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            exit_timeout: DEFAULT_EXIT_TIMEOUT,
            panic_timeout: DEFAULT_PANIC_TIMEOUT,
            retry_interval: RetryInterval::default(),
            overflow: OverflowPolicy::default(),
            diagnostics: Diagnostics::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl UpstreamConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: RetryInterval) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_exit_timeout(mut self, timeout: Duration) -> Self {
        self.exit_timeout = timeout;
        self
    }
}
