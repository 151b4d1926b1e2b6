//! Logging for the search service
//!
//! Every request runs inside the span opened by the HTTP trace layer, which
//! carries the request id. Filter translation, store access and error logs
//! emitted while serving a search therefore share that id. Output goes to
//! stdout, as JSON for log shippers or as text for local runs, and can be
//! mirrored to a rolling file. `RUST_LOG` replaces the configured directives.

use std::fs;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes buffered file output when dropped. Hold it until `main` returns.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LogGuard> {
    let mut layers = vec![format_layer(config.json, true, std::io::stdout)];
    let file_guard = if config.file_enabled {
        let (writer, guard) = file_writer(config)?;
        layers.push(format_layer(config.json, false, writer));
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(config))
        .try_init()?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        json = config.json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
}

/// Both service crates at the configured level. Request spans from
/// `tower_http` stay visible; sqlx logs every statement at info.
fn default_directives(level: &str) -> String {
    format!("dsu_server={level},dsu_search={level},tower_http=debug,sqlx=warn")
}

/// JSON lines keep only the current span, which is enough to carry the
/// request id without repeating the whole span stack.
fn format_layer<W>(json: bool, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed()
    }
}

fn file_writer(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let dir = &config.file_directory;
    let prefix = &config.file_prefix;
    let appender = match config.file_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(dir, prefix),
        "minutely" => tracing_appender::rolling::minutely(dir, prefix),
        "never" => tracing_appender::rolling::never(dir, format!("{prefix}.log")),
        _ => tracing_appender::rolling::daily(dir, prefix),
    };

    Ok(tracing_appender::non_blocking(appender))
}
