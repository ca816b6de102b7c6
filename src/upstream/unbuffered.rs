//! Synchronous hook for collectors on the local machine.

use std::{fmt, time::Duration};

use parking_lot::Mutex;

use crate::{diagnostics::Diagnostics, hook::Hook, level::LogLevel, log_record::LogRecord};

use super::{
    UpstreamError,
    config::UpstreamConfig,
    endpoint::UpstreamEndpoint,
    serialise::serialise_record,
    transport::{UpstreamConnection, deadline_after},
};

/// Hook that writes each record directly on the calling thread.
///
/// Dial and write together must finish within the local timeout, so a
/// missing or stalled collector costs each caller at most one short wait. A record that cannot
/// be written is dropped and the connection is redialled on the next call.
pub struct UnbufferedUpstreamHook {
    endpoint: UpstreamEndpoint,
    connection: Mutex<Option<UpstreamConnection>>,
    timeout: Duration,
    diagnostics: Diagnostics,
}

impl UnbufferedUpstreamHook {
    pub fn new(endpoint: &str, config: UpstreamConfig) -> Result<Self, UpstreamError> {
        Ok(Self::with_endpoint(UpstreamEndpoint::parse(endpoint)?, config))
    }

    pub fn with_endpoint(endpoint: UpstreamEndpoint, config: UpstreamConfig) -> Self {
        Self {
            endpoint,
            connection: Mutex::new(None),
            timeout: config.local_timeout,
            diagnostics: config.diagnostics,
        }
    }

    pub fn endpoint(&self) -> &UpstreamEndpoint {
        &self.endpoint
    }

    fn send(&self, line: &str) {
        let mut slot = self.connection.lock();
        let deadline = deadline_after(self.timeout);
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => match UpstreamConnection::connect_by(&self.endpoint, deadline, self.timeout) {
                Ok(conn) => conn,
                Err(err) => {
                    self.diagnostics.report(format!(
                        "upstream {}: failed to connect: {err}",
                        self.endpoint
                    ));
                    return;
                }
            },
        };
        match conn.write_line_by(line, deadline) {
            Ok(()) => *slot = Some(conn),
            Err(err) => self
                .diagnostics
                .report(format!("upstream {}: failed to send: {err}", self.endpoint)),
        }
    }
}

impl Hook for UnbufferedUpstreamHook {
    fn levels(&self) -> &[LogLevel] {
        &LogLevel::UPSTREAM
    }

    fn fire(&self, record: &LogRecord) {
        match serialise_record(record) {
            Ok(Some(queued)) => self.send(&queued.line),
            Ok(None) => {}
            Err(err) => self.diagnostics.report(format!(
                "upstream {}: failed to serialise record: {err}",
                self.endpoint
            )),
        }
    }
}

impl fmt::Debug for UnbufferedUpstreamHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnbufferedUpstreamHook")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}
