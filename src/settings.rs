use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::colors::is_hex_color;
use crate::store::Store;

pub const WEEK_TIME: &str = "default_week_time";
pub const MAN_DAY_TIME: &str = "default_man_day_time";
pub const INVALID_COLOR: &str = "invalid_color";
pub const VALID_COLOR: &str = "valid_color";
pub const CURRENT_CELL_COLOR: &str = "current_cell_color";

pub const DEFAULT_WEEK_TIME: u32 = 35 * 60;
pub const DEFAULT_MAN_DAY_TIME: u32 = 7 * 60;
pub const DEFAULT_INVALID_COLOR: &str = "#FFCDD2";
pub const DEFAULT_VALID_COLOR: &str = "#DAF7A6";
pub const DEFAULT_CURRENT_CELL_COLOR: &str = "#fffd88";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to encode setting {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },
    #[error("{0:?} is not a #rrggbb or #rgb color")]
    InvalidColor(String),
}

/// Snapshot of every setting, defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub default_week_time: u32,
    pub default_man_day_time: u32,
    pub invalid_color: String,
    pub valid_color: String,
    pub current_cell_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_week_time: DEFAULT_WEEK_TIME,
            default_man_day_time: DEFAULT_MAN_DAY_TIME,
            invalid_color: DEFAULT_INVALID_COLOR.to_string(),
            valid_color: DEFAULT_VALID_COLOR.to_string(),
            current_cell_color: DEFAULT_CURRENT_CELL_COLOR.to_string(),
        }
    }
}

impl Settings {
    pub fn load<S: Store + ?Sized>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            default_week_time: get_value(store, WEEK_TIME).unwrap_or(defaults.default_week_time),
            default_man_day_time: get_value(store, MAN_DAY_TIME)
                .unwrap_or(defaults.default_man_day_time),
            invalid_color: get_color(store, INVALID_COLOR).unwrap_or(defaults.invalid_color),
            valid_color: get_color(store, VALID_COLOR).unwrap_or(defaults.valid_color),
            current_cell_color: get_color(store, CURRENT_CELL_COLOR)
                .unwrap_or(defaults.current_cell_color),
        }
    }
}

/// Decodes a stored setting. Values that fail to decode are logged and
/// treated as absent.
pub fn get_value<S, T>(store: &S, name: &str) -> Option<T>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    let raw = store.get_setting(name)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(name, %err, "ignoring unreadable setting");
            None
        }
    }
}

pub fn set_value<S, T>(store: &mut S, name: &str, value: &T) -> Result<(), SettingsError>
where
    S: Store + ?Sized,
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value).map_err(|source| SettingsError::Encode {
        name: name.to_string(),
        source,
    })?;
    store.set_setting(name, encoded);
    Ok(())
}

fn get_color<S: Store + ?Sized>(store: &S, name: &str) -> Option<String> {
    let color: String = get_value(store, name)?;
    if is_hex_color(&color) {
        Some(color)
    } else {
        warn!(name, color, "ignoring invalid color setting");
        None
    }
}

pub fn default_week_time<S: Store + ?Sized>(store: &S) -> u32 {
    get_value(store, WEEK_TIME).unwrap_or(DEFAULT_WEEK_TIME)
}

pub fn default_man_day_time<S: Store + ?Sized>(store: &S) -> u32 {
    get_value(store, MAN_DAY_TIME).unwrap_or(DEFAULT_MAN_DAY_TIME)
}

pub fn set_default_week_time<S: Store + ?Sized>(
    store: &mut S,
    minutes: u32,
) -> Result<(), SettingsError> {
    set_value(store, WEEK_TIME, &minutes)
}

pub fn set_default_man_day_time<S: Store + ?Sized>(
    store: &mut S,
    minutes: u32,
) -> Result<(), SettingsError> {
    set_value(store, MAN_DAY_TIME, &minutes)
}

/// Stores one of the color settings after checking its format.
pub fn set_color<S: Store + ?Sized>(
    store: &mut S,
    name: &str,
    color: &str,
) -> Result<(), SettingsError> {
    if !is_hex_color(color) {
        return Err(SettingsError::InvalidColor(color.to_string()));
    }
    set_value(store, name, color)
}
