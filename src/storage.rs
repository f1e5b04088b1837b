use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Journal, JournalHeader, Task};

const TASKS_MARKER: &str = "\n=== TASKS ===\n";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML header: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode TOML header: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("failed to parse task on line {line}: {source}")]
    JsonDecode {
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed to encode task: {0}")]
    JsonEncode(serde_json::Error),
}

/// Reads a journal file. A missing or blank file is an empty journal.
pub fn load_journal(path: &Path) -> Result<Journal, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "journal not found, starting empty");
            return Ok(Journal::new());
        }
        Err(err) => return Err(err.into()),
    };

    if raw.trim().is_empty() {
        return Ok(Journal::new());
    }

    let (header_blob, tasks_blob) = raw
        .split_once(TASKS_MARKER)
        .unwrap_or((raw.as_str(), ""));

    let header: JournalHeader = toml::from_str(header_blob)?;
    let mut tasks: Vec<Task> = Vec::new();
    for (index, line) in tasks_blob.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let task = serde_json::from_str(line).map_err(|source| StorageError::JsonDecode {
            line: index + 1,
            source,
        })?;
        tasks.push(task);
    }

    debug!(
        path = %path.display(),
        weeks = header.weeks.len(),
        days = header.days.len(),
        tasks = tasks.len(),
        "journal loaded"
    );
    Ok(Journal { header, tasks })
}

pub fn save_journal(path: &Path, journal: &Journal) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let header = toml::to_string_pretty(&journal.header)?;
    let mut file = fs::File::create(path)?;
    file.write_all(header.as_bytes())?;
    file.write_all(TASKS_MARKER.as_bytes())?;

    for task in &journal.tasks {
        let line = serde_json::to_string(task).map_err(StorageError::JsonEncode)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }

    debug!(path = %path.display(), tasks = journal.tasks.len(), "journal saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use std::fs;
    use std::path::PathBuf;

    use crate::calendar::WeekKey;
    use crate::domain::{Journal, TaskUpdate};
    use crate::store::{Store, get_or_create_day, get_or_create_week};

    use super::{StorageError, load_journal, save_journal};

    #[test]
    fn round_trips_toml_and_jsonl() {
        let mut journal = Journal::new();
        let week = WeekKey::new(2018, 10);
        let monday = NaiveDate::from_ymd_opt(2018, 3, 5).expect("valid date");
        get_or_create_week(&mut journal, week, 2100);
        get_or_create_day(&mut journal, monday, week);
        journal.set_setting("default_man_day_time", "480".to_string());
        let id = journal
            .create_task(monday, "Write report")
            .expect("task should be created");
        journal.update_task(
            &id,
            TaskUpdate::Start(NaiveTime::from_hms_opt(9, 0, 0).expect("valid time")),
        );
        journal.create_task(monday, "Open item").expect("task should be created");

        let path = temp_file("taskcounter_storage_roundtrip.journal");
        save_journal(&path, &journal).expect("save should succeed");
        let loaded = load_journal(&path).expect("load should succeed");
        assert_eq!(loaded.header.weeks, journal.header.weeks);
        assert_eq!(loaded.header.days, journal.header.days);
        assert_eq!(loaded.tasks, journal.tasks);
        assert_eq!(
            loaded.get_setting("default_man_day_time"),
            Some("480".to_string())
        );
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_or_blank_file_is_an_empty_journal() {
        let path = temp_file("taskcounter_storage_missing.journal");
        let _ = fs::remove_file(&path);
        let journal = load_journal(&path).expect("missing file should load");
        assert!(journal.tasks.is_empty());

        fs::write(&path, "  \n").expect("write should succeed");
        let journal = load_journal(&path).expect("blank file should load");
        assert!(journal.header.weeks.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn reports_the_broken_task_line() {
        let path = temp_file("taskcounter_storage_broken.journal");
        save_journal(&path, &Journal::new()).expect("save should succeed");
        let mut raw = fs::read_to_string(&path).expect("read should succeed");
        raw.push_str("{not json}\n");
        fs::write(&path, raw).expect("write should succeed");

        let err = load_journal(&path).expect_err("broken line should fail");
        assert!(matches!(err, StorageError::JsonDecode { line: 1, .. }));
        let _ = fs::remove_file(path);
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
