//! Watcher configuration: TOML file, environment and command-line overrides.
//!
//! Loading goes through three layers, later ones winning:
//! 1. the TOML file ([`load_settings_path`] / [`load_settings_str`]), parsed
//!    into [`RawConfig`] and resolved into [`Settings`];
//! 2. the `APPOINTMENT_WATCH_DATABASE` environment variable ([`Settings::apply_env`]);
//! 3. command-line flags ([`Settings::apply_overrides`]).
//!
//! [`Settings::validate`] then checks cross-field rules and normalizes the
//! location list. The validated settings hand each polling task an immutable
//! [`AcceptanceConstraints`] via [`Settings::constraints`].

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use schedule_source::{models::location::LocationId, providers::ttp_rest::DEFAULT_URL_TEMPLATE};
use serde::Deserialize;
use shared_utils::{
    duration::{DurationParseError, parse_duration},
    env::get_env_var_opt,
};

use crate::{notify::NotificationLevel, policy::AcceptanceConstraints};

/// Environment variable overriding the `database` key.
pub const DATABASE_ENV: &str = "APPOINTMENT_WATCH_DATABASE";

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "ttp.db";

/// Default minimum lead time (15 minutes).
pub const DEFAULT_TRAVEL_TIME: Duration = Duration::from_secs(900);

/// Default polling interval per location (5 minutes).
pub const DEFAULT_RETRIEVAL_INTERVAL: Duration = Duration::from_secs(300);

const DATE_FORMAT: &str = "%B %d, %Y";
const TIME_FORMAT: &str = "%H:%M";

/// Configuration errors. Every variant aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The file is not valid TOML or has unknown keys or wrong types.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A duration value did not parse.
    #[error("'{key}' {source}")]
    Duration {
        /// Config key holding the value.
        key: &'static str,
        /// Parse failure.
        source: DurationParseError,
    },

    /// A date did not match `Month Day, Year`.
    #[error("'{key}' must be in the format of Month Day, Year (e.g. January 1, 2024), got '{value}'")]
    Date {
        /// Config key holding the value.
        key: &'static str,
        /// Offending text.
        value: String,
    },

    /// A time of day did not match `HH:MM`.
    #[error("'{key}' must be in the format of HH:MM (e.g. 15:00), got '{value}'")]
    Time {
        /// Config key holding the value.
        key: &'static str,
        /// Offending text.
        value: String,
    },

    /// `notification_level` was neither 1 nor 2.
    #[error("'notification_level' must be 1 (info) or 2 (error), got {0}")]
    NotificationLevel(u8),

    /// A key of the `locations` table is not an integer id.
    #[error("location key '{0}' is not an integer id")]
    LocationKey(String),

    /// The current appointment lies before today.
    #[error("'current_appointment_date' cannot be in the past ({0})")]
    DateInPast(NaiveDate),

    /// The time-of-day window is inverted.
    #[error("'start_appointment_time' ({start}) cannot be after 'end_appointment_time' ({end})")]
    WindowInverted {
        /// Window start.
        start: NaiveTime,
        /// Window end.
        end: NaiveTime,
    },

    /// Nothing to monitor.
    #[error("no location ids configured; set 'location_ids' or pass --location-ids")]
    NoLocations,
}

/// A duration given either as integer seconds or as `<int><unit>` text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    /// Plain seconds, e.g. `travel_time = 900`.
    Seconds(u64),
    /// Text such as `"15m"`.
    Text(String),
}

impl DurationValue {
    fn resolve(&self, key: &'static str) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => {
                parse_duration(text).map_err(|source| ConfigError::Duration { key, source })
            }
        }
    }
}

/// A scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// `key = 5140`
    One(T),
    /// `key = [5140, 5003]`
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

/// Config file as written on disk. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// `"Month Day, Year"` of the appointment already held.
    pub current_appointment_date: Option<String>,
    /// Minimum lead time.
    pub travel_time: Option<DurationValue>,
    /// Interval between cycle starts for each location.
    pub retrieval_interval: Option<DurationValue>,
    /// Earliest acceptable `HH:MM`.
    pub start_appointment_time: Option<String>,
    /// Latest acceptable `HH:MM`.
    pub end_appointment_time: Option<String>,
    /// SQLite file holding seen appointments.
    pub database: Option<String>,
    /// Locations to monitor.
    pub location_ids: Option<OneOrMany<i64>>,
    /// Minimum level for notifications to be delivered.
    pub notification_level: Option<u8>,
    /// Display names keyed by location id.
    #[serde(default)]
    pub locations: IndexMap<String, String>,
    /// URL template with a `{location_id}` placeholder.
    pub source_url: Option<String>,
}

/// Command-line values that override the file. Unset fields leave the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--current-appointment-date`
    pub current_appointment_date: Option<String>,
    /// `--location-ids`, merged into the configured list.
    pub location_ids: Vec<i64>,
    /// `--notification-level`
    pub notification_level: Option<u8>,
    /// `--retrieval-interval`
    pub retrieval_interval: Option<String>,
    /// `--start-appointment-time`
    pub start_appointment_time: Option<String>,
    /// `--end-appointment-time`
    pub end_appointment_time: Option<String>,
    /// `--travel-time`
    pub travel_time: Option<String>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Date of the appointment already held, if any.
    pub current_appointment_date: Option<NaiveDate>,
    /// Minimum lead time.
    pub travel_time: Duration,
    /// Interval between cycle starts; zero means a single cycle.
    pub retrieval_interval: Duration,
    /// Earliest acceptable time of day.
    pub start_appointment_time: Option<NaiveTime>,
    /// Latest acceptable time of day.
    pub end_appointment_time: Option<NaiveTime>,
    /// SQLite database path.
    pub database: PathBuf,
    /// Locations to monitor; sorted and unique after [`Settings::validate`].
    pub location_ids: Vec<LocationId>,
    /// Minimum notification level.
    pub notification_level: NotificationLevel,
    /// Display names for locations.
    pub locations: IndexMap<LocationId, String>,
    /// Slots URL template.
    pub source_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            current_appointment_date: None,
            travel_time: DEFAULT_TRAVEL_TIME,
            retrieval_interval: DEFAULT_RETRIEVAL_INTERVAL,
            start_appointment_time: None,
            end_appointment_time: None,
            database: PathBuf::from(DEFAULT_DATABASE),
            location_ids: Vec::new(),
            notification_level: NotificationLevel::Info,
            locations: IndexMap::new(),
            source_url: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

fn parse_date(key: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ConfigError::Date {
        key,
        value: value.to_string(),
    })
}

fn parse_time(key: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| ConfigError::Time {
        key,
        value: value.to_string(),
    })
}

fn parse_level(level: u8) -> Result<NotificationLevel, ConfigError> {
    NotificationLevel::from_u8(level).ok_or(ConfigError::NotificationLevel(level))
}

impl Settings {
    /// Resolves a parsed file on top of the defaults.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(date) = raw.current_appointment_date.as_deref() {
            settings.current_appointment_date = Some(parse_date("current_appointment_date", date)?);
        }
        if let Some(value) = &raw.travel_time {
            settings.travel_time = value.resolve("travel_time")?;
        }
        if let Some(value) = &raw.retrieval_interval {
            settings.retrieval_interval = value.resolve("retrieval_interval")?;
        }
        if let Some(time) = raw.start_appointment_time.as_deref() {
            settings.start_appointment_time = Some(parse_time("start_appointment_time", time)?);
        }
        if let Some(time) = raw.end_appointment_time.as_deref() {
            settings.end_appointment_time = Some(parse_time("end_appointment_time", time)?);
        }
        if let Some(database) = raw.database {
            settings.database = PathBuf::from(database);
        }
        if let Some(ids) = raw.location_ids {
            settings.location_ids = ids.into_vec().into_iter().map(LocationId).collect();
        }
        if let Some(level) = raw.notification_level {
            settings.notification_level = parse_level(level)?;
        }
        for (key, name) in raw.locations {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::LocationKey(key.clone()))?;
            settings.locations.insert(LocationId(id), name);
        }
        if let Some(url) = raw.source_url {
            settings.source_url = url;
        }

        Ok(settings)
    }

    /// Applies environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(database) = get_env_var_opt(DATABASE_ENV) {
            tracing::debug!(database = %database, "database path taken from {DATABASE_ENV}");
            self.database = PathBuf::from(database);
        }
    }

    /// Applies command-line overrides. Location ids are appended, skipping
    /// ones already configured.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(date) = overrides.current_appointment_date.as_deref() {
            self.current_appointment_date = Some(parse_date("current_appointment_date", date)?);
        }
        for &id in &overrides.location_ids {
            let id = LocationId(id);
            if !self.location_ids.contains(&id) {
                self.location_ids.push(id);
            }
        }
        if let Some(level) = overrides.notification_level {
            self.notification_level = parse_level(level)?;
        }
        if let Some(text) = overrides.retrieval_interval.as_deref() {
            self.retrieval_interval = parse_duration(text).map_err(|source| ConfigError::Duration {
                key: "retrieval_interval",
                source,
            })?;
        }
        if let Some(time) = overrides.start_appointment_time.as_deref() {
            self.start_appointment_time = Some(parse_time("start_appointment_time", time)?);
        }
        if let Some(time) = overrides.end_appointment_time.as_deref() {
            self.end_appointment_time = Some(parse_time("end_appointment_time", time)?);
        }
        if let Some(text) = overrides.travel_time.as_deref() {
            self.travel_time = parse_duration(text).map_err(|source| ConfigError::Duration {
                key: "travel_time",
                source,
            })?;
        }
        Ok(())
    }

    /// Checks cross-field rules against `today`, then sorts and dedupes the
    /// location ids.
    pub fn validate(&mut self, today: NaiveDate) -> Result<(), ConfigError> {
        if let Some(date) = self.current_appointment_date {
            if date < today {
                return Err(ConfigError::DateInPast(date));
            }
        }

        if let (Some(start), Some(end)) = (self.start_appointment_time, self.end_appointment_time) {
            if start > end {
                return Err(ConfigError::WindowInverted { start, end });
            }
        }

        self.location_ids.sort_unstable();
        self.location_ids.dedup();
        Ok(())
    }

    /// Errors unless at least one location is configured.
    pub fn require_locations(&self) -> Result<&[LocationId], ConfigError> {
        if self.location_ids.is_empty() {
            return Err(ConfigError::NoLocations);
        }
        Ok(&self.location_ids)
    }

    /// The acceptance constraints every polling task is built with.
    pub fn constraints(&self) -> AcceptanceConstraints {
        AcceptanceConstraints {
            current_appointment_date: self.current_appointment_date,
            travel_time: Some(self.travel_time),
            start_time_of_day: self.start_appointment_time,
            end_time_of_day: self.end_appointment_time,
        }
    }

    /// Database path as a diesel SQLite URL.
    pub fn database_url(&self) -> String {
        self.database.to_string_lossy().into_owned()
    }
}

/// Parse and resolve a config from a TOML string.
pub fn load_settings_str(s: &str) -> Result<Settings, ConfigError> {
    let raw: RawConfig = toml::from_str(s)?;
    Settings::from_raw(raw)
}

/// Load settings from `path`. A missing path or file yields the defaults.
pub fn load_settings_path(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    match fs::read_to_string(path) {
        Ok(s) => load_settings_str(&s),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Settings::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
