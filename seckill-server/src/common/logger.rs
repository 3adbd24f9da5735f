//! Tracing setup
//!
//! Console output is pretty text in development and JSON lines in production.
//! With a log directory configured the same events also go to daily files
//! under `<log_dir>/app`, which [`cleanup_old_logs`] prunes after 14 days.

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

const LOG_RETENTION_DAYS: i64 = 14;
const APP_LOG_PREFIX: &str = "app";

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

fn format_layer<S, W>(json: bool, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if json {
        layer
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        // Thread ids only help when reading files after the fact
        layer.with_ansi(ansi).with_thread_ids(!ansi).boxed()
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = vec![format_layer(json_format, std::io::stdout, true)];
    if let Some(dir) = log_dir {
        let app_log_dir = Path::new(dir).join(APP_LOG_PREFIX);
        fs::create_dir_all(&app_log_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, app_log_dir, APP_LOG_PREFIX);
        layers.push(format_layer(json_format, appender, false));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;
    Ok(())
}

/// Delete rotated `app.YYYY-MM-DD` files older than the retention window.
/// Returns how many files were removed.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let app_log_dir = log_dir.join(APP_LOG_PREFIX);
    if !app_log_dir.is_dir() {
        return Ok(0);
    }
    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(LOG_RETENTION_DAYS);

    let mut removed = 0;
    for entry in fs::read_dir(&app_log_dir)? {
        let path = entry?.path();
        let rotated_on = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("app."))
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        if rotated_on.is_some_and(|date| date < cutoff) {
            fs::remove_file(&path)?;
            tracing::info!(file = %path.display(), "Removed expired log file");
            removed += 1;
        }
    }
    Ok(removed)
}
