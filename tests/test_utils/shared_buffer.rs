//! Shared buffer for capturing logger output in integration tests.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// Thread-safe byte buffer; clones write to the same storage.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.buffer.lock().expect("SharedBuf mutex poisoned").clone();
        String::from_utf8(bytes)
            .expect("output is UTF-8")
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("SharedBuf mutex poisoned")
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
