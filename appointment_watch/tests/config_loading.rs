use std::{io::Write, path::PathBuf, time::Duration};

use appointment_watch::config::{ConfigError, DATABASE_ENV, Overrides, load_settings_path};
use chrono::NaiveDate;
use schedule_source::models::location::LocationId;
use serial_test::serial;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = load_settings_path(Some(dir.path().join("absent.toml").as_path())).unwrap();
    assert_eq!(settings.retrieval_interval, Duration::from_secs(300));
    assert!(settings.location_ids.is_empty());
}

#[test]
fn file_then_flags_then_validation() {
    let file = write_config(
        r#"
            location_ids = [5446, 5140]
            retrieval_interval = "10m"
            start_appointment_time = "07:30"
        "#,
    );

    let mut settings = load_settings_path(Some(file.path())).unwrap();
    settings
        .apply_overrides(&Overrides {
            location_ids: vec![5003],
            retrieval_interval: Some("0".into()),
            end_appointment_time: Some("12:00".into()),
            ..Default::default()
        })
        .unwrap();
    settings.validate(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()).unwrap();

    assert_eq!(
        settings.require_locations().unwrap(),
        &[LocationId(5003), LocationId(5140), LocationId(5446)]
    );
    assert_eq!(settings.retrieval_interval, Duration::ZERO);
    assert!(settings.constraints().end_time_of_day.is_some());
}

#[test]
fn bad_flag_is_reported() {
    let mut settings = load_settings_path(None).unwrap();
    let err = settings
        .apply_overrides(&Overrides {
            notification_level: Some(3),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotificationLevel(3)));
}

#[test]
#[serial]
fn environment_overrides_database() {
    let file = write_config(r#"database = "from-file.db""#);

    // SAFETY: serialised with the other env tests in this binary.
    unsafe { std::env::set_var(DATABASE_ENV, "/tmp/from-env.db") };
    let mut settings = load_settings_path(Some(file.path())).unwrap();
    settings.apply_env();
    unsafe { std::env::remove_var(DATABASE_ENV) };

    assert_eq!(settings.database, PathBuf::from("/tmp/from-env.db"));
}

#[test]
#[serial]
fn unset_environment_keeps_file_database() {
    let file = write_config(r#"database = "from-file.db""#);

    // SAFETY: serialised with the other env tests in this binary.
    unsafe { std::env::remove_var(DATABASE_ENV) };
    let mut settings = load_settings_path(Some(file.path())).unwrap();
    settings.apply_env();

    assert_eq!(settings.database_url(), "from-file.db");
}

#[test]
fn shipped_example_config_parses() {
    let settings =
        appointment_watch::config::load_settings_str(include_str!("../config.example.toml")).unwrap();
    assert_eq!(settings.travel_time, Duration::from_secs(900));
    assert_eq!(settings.location_ids, vec![LocationId(5140)]);
}
