//! Subscriber setup and the central JSONL file writer.
//!
//! Writes structured JSONL logs to a central file that can be tailed by
//! external tools. Multi-process safe via append-only semantics.

use crate::json_layer::JsonLayer;
use crate::{LogConfig, StderrFormat};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Central log file location, `~/.letterbox/logs/letterbox.jsonl`.
///
/// Falls back to the system temp dir when no home directory is known.
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".letterbox")
        .join("logs")
        .join("letterbox.jsonl")
}

/// File writer that appends to the central log file.
/// Flushes every write so lines from several processes never interleave.
#[derive(Clone)]
pub struct CentralLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl CentralLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for CentralLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// MakeWriter implementation for tracing-subscriber.
#[derive(Clone)]
pub struct WriterFactory {
    writer: CentralLogWriter,
}

impl<'a> MakeWriter<'a> for WriterFactory {
    type Writer = CentralLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer.clone()
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber: JSONL file layer plus optional stderr layer.
pub(crate) fn init_subscriber(config: &LogConfig) {
    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);

    let json_layer = match CentralLogWriter::new(&log_path) {
        Ok(writer) => Some(
            JsonLayer::new(config.service_name.clone(), WriterFactory { writer })
                .with_filter(env_filter(&config.default_level)),
        ),
        Err(e) => {
            eprintln!("observability: cannot open {}: {}", log_path.display(), e);
            None
        }
    };
    let file_enabled = json_layer.is_some();

    // Without a file the stderr layer is the only sink, so force it on.
    let stderr_enabled = config.also_stderr || !file_enabled;
    let compact = (stderr_enabled && config.stderr_format == StderrFormat::Compact).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });
    let json = (stderr_enabled && config.stderr_format == StderrFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    // A second init (tests, embedding) keeps the first subscriber.
    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(compact)
        .with(json)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            log_path = %log_path.display(),
            file_enabled,
            "observability initialized"
        );
    }
}
