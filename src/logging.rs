//! Process-wide log sink.
//!
//! Every component logs through `tracing`. [`init`] installs a subscriber with two
//! layers: one writing `LEVEL: message` lines to `<root>/log.txt` (truncated when the
//! launcher starts), and one writing to stderr filtered by `RUST_LOG`.
//!
//! The log file sits behind a single mutex shared by all writers. The lock is taken
//! once per event, after the line has been formatted into the subscriber's buffer,
//! so concurrent downloads and the liveness poll never interleave partial lines.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::{Event, Subscriber};
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Shared handle to the log file
#[derive(Clone)]
pub struct LogSink {
    file: Arc<Mutex<File>>,
}

impl LogSink {
    /// Open (and truncate) the log file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        // A panic while holding the lock leaves the file usable
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn flush(&self) -> io::Result<()> {
        let mut file = self.lock();
        file.flush()?;
        file.sync_all()
    }
}

/// Writer handed out per event; holds the sink lock until dropped
pub struct SinkWriter<'a> {
    guard: MutexGuard<'a, File>,
}

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter { guard: self.lock() }
    }
}

/// `INFO: message key=value` lines, no timestamps or targets
pub struct LevelPrefixFormat;

impl<S, N> FormatEvent<S, N> for LevelPrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}: ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber. Returns the sink so the caller can flush it on shutdown.
pub fn init(log_path: &Path, verbose: bool) -> Result<LogSink> {
    let sink = LogSink::open(log_path)?;

    let default_level = if verbose { "debug" } else { "warn" };
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LevelPrefixFormat)
        .with_ansi(false)
        .with_writer(sink.clone())
        .with_filter(EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(sink)
}
