//! Shutdown and output doubles for the stock supervisor.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::runtime::{ShutdownError, ShutdownSignal};

/// Returns immediately, noting whether the pid file existed at that point.
#[derive(Debug, Clone)]
pub struct ObservingShutdown {
    pidfile: PathBuf,
    saw_pidfile: Arc<AtomicBool>,
}

impl ObservingShutdown {
    /// Watches `pidfile`.
    #[must_use]
    pub fn new(pidfile: PathBuf) -> Self {
        Self {
            pidfile,
            saw_pidfile: Arc::default(),
        }
    }

    /// Whether the pid file existed while the daemon was ready.
    #[must_use]
    pub fn saw_pidfile(&self) -> bool {
        self.saw_pidfile.load(Ordering::SeqCst)
    }
}

impl ShutdownSignal for ObservingShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        self.saw_pidfile
            .store(self.pidfile.exists(), Ordering::SeqCst);
        Ok(())
    }
}

/// Writer whose contents stay readable after it has been moved.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Contents written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().expect("buffer mutex poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
