use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives for `--log-level`: the store and bridge log at `level`, HTTP
/// client internals stay at `warn`.
fn directives(level: &str) -> String {
    format!("warn,column_store={level}")
}

/// Installs a stderr subscriber; stdout is reserved for NDJSON frames.
/// `RUST_LOG` overrides `--log-level`. Returns false if one was already set.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)));
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false);
    tracing_subscriber::registry().with(filter).with(stderr).try_init().is_ok()
}
