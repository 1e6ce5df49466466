use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
};

use chrono::{SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(Level::WARN.into())
                .from_env_lossy()
        });

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Open the append-mode sink that receives the supervised server's
/// combined stdout/stderr.
pub fn open_log_sink(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Separate runs in the shared sink with a timestamped marker line.
pub fn append_run_marker(sink: &mut File, command: &str, port: u16) -> io::Result<()> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    writeln!(sink, "==== {timestamp} | launching `{command}` on port {port} ====")
}
