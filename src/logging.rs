// src/logging.rs
//! Subscriber setup for the binary, plus an in-memory sink that collects the
//! log lines of one input file so they can be written beside its outputs.

use std::{
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Shared buffer of formatted log lines. Clones write to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub struct RunLogWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for RunLogWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RunLog {
    type Writer = RunLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RunLogWriter {
            buf: Arc::clone(&self.buf),
        }
    }
}

/// Install the global subscriber: `RUST_LOG`-filtered lines (default
/// `info`) to stderr, and `info` and above, without colour, into `run_log`.
pub fn init_logging(run_log: &RunLog) {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_filter(env);
    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(run_log.clone())
        .with_filter(LevelFilter::INFO);
    tracing_subscriber::registry().with(console).with(file).init();
}
