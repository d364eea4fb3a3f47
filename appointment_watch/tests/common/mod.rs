#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use appointment_watch::{
    db::{connection, migrate},
    engine::PollingEngine,
    notify::{NewAppointments, NotificationLevel, NotificationSink, NotifyError},
    policy::{AcceptanceConstraints, AcceptancePolicy},
    store::{SeenStore, SqliteSeenStore},
};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveDateTime};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use schedule_source::{
    models::{candidate::AppointmentCandidate, location::LocationId},
    providers::{RejectedSnafu, ScheduleSource, SourceError, StatusSnafu},
};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

impl TestDb {
    pub fn connect(&self) -> SqliteConnection {
        connection::connect_sqlite(&self.path).expect("connect")
    }

    pub fn seen(&self, location_id: i64) -> Vec<NaiveDateTime> {
        SqliteSeenStore::new()
            .seen_for_location(&mut self.connect(), LocationId(location_id))
            .expect("seen rows")
    }
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

/// A slot `days` from today at `hour:minute`, local time. Two or more days
/// out is always clear of the default travel time.
pub fn slot(days: u64, hour: u32, minute: u32) -> NaiveDateTime {
    (Local::now().date_naive() + Days::new(days))
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn active(location_id: i64, when: NaiveDateTime) -> AppointmentCandidate {
    AppointmentCandidate::new(LocationId(location_id), when, true)
}

pub fn inactive(location_id: i64, when: NaiveDateTime) -> AppointmentCandidate {
    AppointmentCandidate::new(LocationId(location_id), when, false)
}

/// One canned fetch result.
#[derive(Clone, Debug)]
pub enum Scripted {
    Slots(Vec<AppointmentCandidate>),
    /// HTTP 4xx.
    Reject(u16),
    /// HTTP 5xx.
    Unavailable(u16),
}

/// Replays a script per location; the last entry repeats once the rest are used.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<LocationId, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<LocationId, usize>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, location_id: i64, steps: impl IntoIterator<Item = Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(LocationId(location_id), steps.into_iter().collect());
        self
    }

    pub fn calls(&self, location_id: i64) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&LocationId(location_id))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ScheduleSource for ScriptedSource {
    async fn fetch_slots(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<AppointmentCandidate>, SourceError> {
        *self.calls.lock().unwrap().entry(location_id).or_default() += 1;

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts.entry(location_id).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match step {
            None => Ok(Vec::new()),
            Some(Scripted::Slots(slots)) => Ok(slots),
            Some(Scripted::Reject(status)) => RejectedSnafu { status }.fail(),
            Some(Scripted::Unavailable(status)) => StatusSnafu { status }.fail(),
        }
    }
}

/// Sink remembering everything it was handed.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Mutex<Vec<(LocationId, NewAppointments)>>,
    pub texts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<(LocationId, NewAppointments)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn new_appointments(
        &self,
        location_id: LocationId,
        appointments: &NewAppointments,
    ) -> Result<(), NotifyError> {
        self.batches
            .lock()
            .unwrap()
            .push((location_id, appointments.clone()));
        if self.fail {
            return Err(std::io::Error::other("sink offline").into());
        }
        Ok(())
    }

    async fn send_text(
        &self,
        body: &str,
        _level: Option<NotificationLevel>,
    ) -> Result<(), NotifyError> {
        self.texts.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

/// Travel time only, so every `slot(2.., ..)` is accepted.
pub fn lenient() -> AcceptanceConstraints {
    AcceptanceConstraints {
        travel_time: Some(Duration::from_secs(900)),
        ..Default::default()
    }
}

pub fn engine(
    db: &TestDb,
    location_id: i64,
    constraints: AcceptanceConstraints,
    source: Arc<ScriptedSource>,
    sink: Arc<RecordingSink>,
) -> PollingEngine {
    PollingEngine::new(
        LocationId(location_id),
        AcceptancePolicy::new(constraints),
        source,
        sink,
        db.connect(),
    )
    .with_courtesy_delay(Duration::ZERO)
}
