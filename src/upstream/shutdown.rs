//! One-shot shutdown signalling between a buffered hook and its worker.
//!
//! Both directions are modelled as channels on which nothing is ever sent:
//! dropping the only sender disconnects every receiver at once, which gives a
//! broadcast that cannot be undone. "Closing" is dropped by whoever requests
//! shutdown; "closed" is dropped by the worker when it exits, even if it
//! unwinds.

use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use parking_lot::Mutex;

/// Handle used to stop a buffered hook and wait for its worker.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    closing_tx: Arc<Mutex<Option<Sender<()>>>>,
    closed_rx: Receiver<()>,
}

/// Worker-side ends of the shutdown channels.
#[derive(Debug)]
pub(crate) struct WorkerSignals {
    pub(crate) closing: Receiver<()>,
    // Held only to be dropped when the worker exits.
    _closed: Sender<()>,
}

pub(crate) fn shutdown_pair() -> (ShutdownHandle, WorkerSignals) {
    let (closing_tx, closing_rx) = bounded(0);
    let (closed_tx, closed_rx) = bounded(0);
    (
        ShutdownHandle {
            closing_tx: Arc::new(Mutex::new(Some(closing_tx))),
            closed_rx,
        },
        WorkerSignals {
            closing: closing_rx,
            _closed: closed_tx,
        },
    )
}

impl ShutdownHandle {
    /// Ask the worker to flush what it holds and stop. Idempotent.
    pub fn signal(&self) {
        self.closing_tx.lock().take();
    }

    pub fn is_signalled(&self) -> bool {
        self.closing_tx.lock().is_none()
    }

    /// Wait up to `timeout` for the worker to finish. Returns `true` when it has.
    pub fn wait(&self, timeout: Duration) -> bool {
        matches!(
            self.closed_rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Signal and then wait up to `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.signal();
        self.wait(timeout)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.closed_rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

impl WorkerSignals {
    /// Block up to `timeout`; returns `true` as soon as shutdown is requested.
    pub(crate) fn wait_for_closing(&self, timeout: Duration) -> bool {
        !matches!(
            self.closing.recv_timeout(timeout),
            Err(RecvTimeoutError::Timeout)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Instant};

    #[test]
    fn signal_wakes_waiting_worker() {
        let (handle, signals) = shutdown_pair();
        let worker = thread::spawn(move || {
            let woke = signals.wait_for_closing(Duration::from_secs(5));
            drop(signals);
            woke
        });
        let start = Instant::now();
        assert!(handle.shutdown(Duration::from_secs(2)));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(worker.join().unwrap());
        assert!(handle.is_closed());
    }

    #[test]
    fn wait_times_out_while_worker_runs() {
        let (handle, signals) = shutdown_pair();
        assert!(!handle.wait(Duration::from_millis(20)));
        assert!(!handle.is_closed());
        drop(signals);
        assert!(handle.wait(Duration::from_millis(20)));
    }

    #[test]
    fn signal_is_idempotent_and_shared_between_clones() {
        let (handle, signals) = shutdown_pair();
        let clone = handle.clone();
        clone.signal();
        handle.signal();
        assert!(handle.is_signalled());
        assert!(signals.wait_for_closing(Duration::ZERO));
    }

    #[test]
    fn unsignalled_wait_reports_timeout() {
        let (_handle, signals) = shutdown_pair();
        assert!(!signals.wait_for_closing(Duration::from_millis(10)));
    }
}
