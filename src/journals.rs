use std::env;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const APP_DIR: &str = "taskcounter";
const DEFAULT_JOURNAL_FILE: &str = "taskcounter.journal";
const RECENT_JOURNALS_FILE: &str = "recent_journals.txt";
pub const MAX_RECENT_JOURNALS: usize = 20;

/// Where the journal comes from: flag, environment, last used, or the default
/// file in the state directory.
pub fn resolve_journal_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = env::var_os("TASKCOUNTER_JOURNAL") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
	}

	match recent_journals(1) {
		Ok(recent) => {
			if let Some(path) = recent.into_iter().next() {
				return path;
			}
		}
		Err(err) => warn!(%err, "could not read recent journals"),
	}

	state_dir().join(DEFAULT_JOURNAL_FILE)
}

pub fn remember_journal(path: &Path) -> Result<(), std::io::Error> {
	let path = absolutize(path.to_path_buf());
	let mut entries = recent_journals(MAX_RECENT_JOURNALS)?;
	entries.retain(|entry| entry != &path);
	entries.insert(0, path);
	entries.truncate(MAX_RECENT_JOURNALS);
	debug!(count = entries.len(), "remembering journal");
	save_recent_journals(&entries)
}

pub fn recent_journals(limit: usize) -> Result<Vec<PathBuf>, std::io::Error> {
	let raw = match fs::read_to_string(recent_journals_path()) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
		Err(err) => return Err(err),
	};

	Ok(raw
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(PathBuf::from)
		.take(limit)
		.collect())
}

fn save_recent_journals(entries: &[PathBuf]) -> Result<(), std::io::Error> {
	fs::create_dir_all(state_dir())?;

	let mut file = fs::File::create(recent_journals_path())?;
	for path in entries {
		writeln!(file, "{}", path.display())?;
	}

	Ok(())
}

fn recent_journals_path() -> PathBuf {
	state_dir().join(RECENT_JOURNALS_FILE)
}

/// Per-user directory for the recent list, logs and the default journal.
pub fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("TASKCOUNTER_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".local").join("state").join(APP_DIR);
	}

	PathBuf::from(format!(".{APP_DIR}"))
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::{absolutize, resolve_journal_path};

	#[test]
	fn explicit_path_wins() {
		let path = std::env::temp_dir().join("taskcounter_explicit.journal");
		assert_eq!(resolve_journal_path(Some(path.clone())), path);
	}

	#[test]
	fn relative_paths_are_anchored_at_the_working_directory() {
		let resolved = absolutize(PathBuf::from("no_such_dir/work.journal"));
		assert!(resolved.is_absolute());
		assert!(resolved.ends_with("no_such_dir/work.journal"));
	}
}
