//! Ordered chain of work to run before the process exits.
//!
//! Buffered hooks register a handler here so that `Logger::fatal` and
//! `Logger::exit` give queued records a bounded chance to leave the process.
//! The chain is owned by whoever builds the logger; there is no global
//! instance.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use parking_lot::Mutex;

use crate::diagnostics::Diagnostics;

type ExitHandler = Box<dyn FnOnce() + Send + 'static>;

/// Runs registered handlers once, in chain order.
pub struct ExitCoordinator {
    handlers: Mutex<Option<Vec<ExitHandler>>>,
    diagnostics: Diagnostics,
}

impl Default for ExitCoordinator {
    fn default() -> Self {
        Self::new(Diagnostics::default())
    }
}

impl ExitCoordinator {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            handlers: Mutex::new(Some(Vec::new())),
            diagnostics,
        }
    }

    /// Append `handler` to the end of the chain.
    ///
    /// Handlers added after the chain has run are dropped without being
    /// called.
    pub fn register<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(handlers) = self.handlers.lock().as_mut() {
            handlers.push(Box::new(handler));
        }
    }

    /// Insert `handler` at the front of the chain so it runs before every
    /// handler registered so far.
    pub fn defer<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(handlers) = self.handlers.lock().as_mut() {
            handlers.insert(0, Box::new(handler));
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_run(&self) -> bool {
        self.handlers.lock().is_none()
    }

    /// Invoke every handler exactly once. Subsequent calls do nothing.
    ///
    /// A panicking handler is reported and the rest of the chain still runs.
    pub fn run(&self) {
        // Release the lock before calling out so handlers may touch the chain.
        let Some(handlers) = self.handlers.lock().take() else {
            return;
        };
        for (index, handler) in handlers.into_iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(handler)).is_err() {
                self.diagnostics
                    .report(format!("exit handler {index} panicked"));
            }
        }
    }

    /// Run the chain and terminate the process with `code`.
    pub fn exit(&self, code: i32) -> ! {
        self.run();
        std::process::exit(code)
    }
}

impl fmt::Debug for ExitCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitCoordinator")
            .field("pending", &self.len())
            .field("has_run", &self.has_run())
            .finish()
    }
}
