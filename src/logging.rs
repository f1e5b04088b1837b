use std::path::Path;
#[cfg(test)]
use std::sync::LazyLock;

use anyhow::Result;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_PREFIX: &str = "taskcounter";
const MAX_LOG_FILES: usize = 5;

/// Installs the global subscriber writing to `<state_dir>/logs`. Warnings
/// are echoed to stderr only when `echo_warnings` is set, so the dashboard
/// keeps the terminal to itself.
pub fn enable_logging(
	state_dir: &Path,
	log_level: Option<LevelFilter>,
	echo_warnings: bool,
) -> Result<()> {
	let appender = tracing_appender::rolling::Builder::new()
		.rotation(Rotation::DAILY)
		.max_log_files(MAX_LOG_FILES)
		.filename_prefix(LOG_PREFIX)
		.build(state_dir.join("logs"))?;

	let stderr = std::io::stderr
		.with_max_level(Level::WARN)
		.with_filter(move |_| echo_warnings);

	let level = log_level
		.map(|level| level.to_string())
		.unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::new(format!(
			"{}={level}",
			env!("CARGO_PKG_NAME").replace('-', "_"),
		)))
		.with_ansi(false)
		.with_writer(stderr.and(appender))
		.try_init()
		.map_err(|err| anyhow::anyhow!(err))?;
	Ok(())
}

#[cfg(test)]
pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
	let _ = tracing_subscriber::fmt()
		.with_max_level(LevelFilter::TRACE)
		.with_test_writer()
		.try_init();
});
