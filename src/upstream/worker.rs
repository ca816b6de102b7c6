//! Worker thread driving buffered upstream delivery.
//!
//! The worker owns the only connection to the collector. Every flush
//! interval it drains the queue and writes the lines in order, retrying the
//! head line until it is delivered. Waits between attempts end early when
//! shutdown is requested; from then on the worker makes at most one more
//! dial, delivers what it can, and drops the rest.

use std::{
    collections::VecDeque,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::Receiver;

use crate::diagnostics::Diagnostics;

use super::{
    config::{RetryInterval, UpstreamConfig},
    endpoint::UpstreamEndpoint,
    serialise::QueuedLine,
    shutdown::WorkerSignals,
    transport::UpstreamConnection,
};

const THREAD_NAME: &str = "logrelay-upstream";

/// Outcome of a delivery pass made while retries are still allowed.
#[derive(Debug)]
enum Delivery {
    Delivered,
    /// Shutdown arrived during a retry wait; carries the undelivered lines.
    Interrupted(VecDeque<QueuedLine>),
}

pub(crate) struct Worker {
    endpoint: UpstreamEndpoint,
    queue: Receiver<QueuedLine>,
    signals: WorkerSignals,
    connection: Option<UpstreamConnection>,
    flush_interval: Duration,
    connect_timeout: Duration,
    write_timeout: Duration,
    retry_interval: RetryInterval,
    diagnostics: Diagnostics,
}

pub(crate) fn spawn_worker(
    endpoint: UpstreamEndpoint,
    queue: Receiver<QueuedLine>,
    signals: WorkerSignals,
    config: &UpstreamConfig,
) -> std::io::Result<JoinHandle<()>> {
    let worker = Worker {
        endpoint,
        queue,
        signals,
        connection: None,
        flush_interval: config.flush_interval,
        connect_timeout: config.connect_timeout,
        write_timeout: config.write_timeout,
        retry_interval: config.retry_interval.clone(),
        diagnostics: config.diagnostics.clone(),
    };
    thread::Builder::new()
        .name(THREAD_NAME.into())
        .spawn(move || worker.run())
}

impl Worker {
    fn run(mut self) {
        let pending = loop {
            if self.signals.wait_for_closing(self.flush_interval) {
                break VecDeque::new();
            }
            let queued = self.drain_queue(VecDeque::new());
            if let Delivery::Interrupted(pending) = self.deliver(queued) {
                break pending;
            }
        };
        let remaining = self.drain_queue(pending);
        self.deliver_final(remaining);
        self.connection = None;
    }

    fn drain_queue(&self, mut lines: VecDeque<QueuedLine>) -> VecDeque<QueuedLine> {
        lines.extend(self.queue.try_iter());
        lines
    }

    fn deliver(&mut self, mut lines: VecDeque<QueuedLine>) -> Delivery {
        while let Some(front) = lines.front() {
            if self.send(&front.line) {
                lines.pop_front();
                continue;
            }
            if self.signals.wait_for_closing(self.retry_interval.get()) {
                return Delivery::Interrupted(lines);
            }
        }
        Delivery::Delivered
    }

    /// Last pass after shutdown: no waiting, and at most one new dial.
    fn deliver_final(&mut self, mut lines: VecDeque<QueuedLine>) {
        let mut dial_allowed = true;
        while let Some(front) = lines.front() {
            if self.connection.is_none() {
                if !dial_allowed {
                    break;
                }
                dial_allowed = false;
            }
            if self.send(&front.line) {
                lines.pop_front();
            }
        }
        if !lines.is_empty() {
            self.diagnostics.report(format!(
                "upstream {}: dropped {} remaining logs",
                self.endpoint,
                lines.len()
            ));
        }
    }

    /// Write one line, dialling first if needed. A failed write discards the
    /// connection so the next call redials.
    fn send(&mut self, line: &str) -> bool {
        let mut conn = match self.connection.take() {
            Some(conn) => conn,
            None => match UpstreamConnection::connect(
                &self.endpoint,
                self.connect_timeout,
                self.write_timeout,
            ) {
                Ok(conn) => conn,
                Err(err) => {
                    self.diagnostics.report(format!(
                        "upstream {}: failed to connect: {err}",
                        self.endpoint
                    ));
                    return false;
                }
            },
        };
        match conn.write_line(line) {
            Ok(()) => {
                self.connection = Some(conn);
                true
            }
            Err(err) => {
                self.diagnostics
                    .report(format!("upstream {}: failed to send: {err}", self.endpoint));
                false
            }
        }
    }
}
