//! Per-location polling engine.
//!
//! One [`PollingEngine`] watches one location. A cycle
//! ([`PollingEngine::run_cycle`]) is:
//!
//! 1. wait the courtesy delay, then fetch the location's slots;
//! 2. drop inactive slots;
//! 3. collect the active start times (the reconcile set) and, in feed order,
//!    the subset the [`AcceptancePolicy`] accepts;
//! 4. in one store transaction, claim the accepted times and prune stored
//!    rows absent from the active set;
//! 5. group the newly claimed times by date and hand them to the
//!    [`NotificationSink`].
//!
//! Transient fetch failures end the cycle before the store is touched. HTTP
//! 4xx responses and store failures are returned as [`EngineError`] and stop
//! the location. The repeat loop lives in [`driver`].
//!
//! Cancellation is honoured only up to the end of the fetch. Steps 4 and 5
//! always run together, so a claimed slot is never left unannounced.

pub mod driver;

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::NaiveDateTime;
use diesel::SqliteConnection;
use schedule_source::{
    models::location::LocationId,
    providers::{ScheduleSource, SourceError},
};
use tokio_util::sync::CancellationToken;

use crate::{
    notify::{NewAppointments, NotificationSink, group_by_date},
    policy::AcceptancePolicy,
    store::{CycleChanges, SeenStore, SqliteSeenStore, StoreError},
};

/// Pause before each request, out of courtesy to the remote API.
pub const COURTESY_DELAY: Duration = Duration::from_secs(1);

/// Errors that end monitoring of a location.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The API refused our requests (HTTP 4xx).
    #[error("location {location_id}: {source}")]
    Rejected {
        /// Location whose request was refused.
        location_id: LocationId,
        /// The refusal as reported by the source.
        source: SourceError,
    },

    /// The seen-appointment store failed; dedup can no longer be trusted.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking task running the store transaction panicked or was cancelled.
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Counts and results of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Slots in the response, active or not.
    pub total: usize,
    /// Distinct active start times.
    pub active: usize,
    /// Active slots the policy accepted.
    pub accepted: usize,
    /// Stored rows pruned by reconcile.
    pub removed: usize,
    /// Newly claimed appointments, grouped by date.
    pub new: NewAppointments,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// The fetch failed transiently; the store was not touched.
    Skipped,
    /// The response was processed and recorded.
    Completed(CycleSummary),
    /// Cancelled before anything was recorded.
    Cancelled,
}

/// Polls a single location and reconciles the results into the store.
///
/// The store defaults to [`SqliteSeenStore`]; any [`SeenStore`] works.
pub struct PollingEngine<S = SqliteSeenStore> {
    location_id: LocationId,
    policy: AcceptancePolicy,
    source: Arc<dyn ScheduleSource>,
    sink: Arc<dyn NotificationSink>,
    store: Arc<S>,
    conn: Arc<Mutex<SqliteConnection>>,
    courtesy_delay: Duration,
}

impl PollingEngine {
    /// Creates an engine for `location_id` that owns `conn` for its store writes.
    pub fn new(
        location_id: LocationId,
        policy: AcceptancePolicy,
        source: Arc<dyn ScheduleSource>,
        sink: Arc<dyn NotificationSink>,
        conn: SqliteConnection,
    ) -> Self {
        Self::with_store(location_id, policy, source, sink, SqliteSeenStore::new(), conn)
    }
}

impl<S> PollingEngine<S>
where
    S: SeenStore + Send + Sync + 'static,
{
    /// Like [`PollingEngine::new`] with a custom store implementation.
    pub fn with_store(
        location_id: LocationId,
        policy: AcceptancePolicy,
        source: Arc<dyn ScheduleSource>,
        sink: Arc<dyn NotificationSink>,
        store: S,
        conn: SqliteConnection,
    ) -> Self {
        Self {
            location_id,
            policy,
            source,
            sink,
            store: Arc::new(store),
            conn: Arc::new(Mutex::new(conn)),
            courtesy_delay: COURTESY_DELAY,
        }
    }

    /// Overrides the pause before each request.
    pub fn with_courtesy_delay(mut self, delay: Duration) -> Self {
        self.courtesy_delay = delay;
        self
    }

    /// The location this engine watches.
    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    /// Runs one fetch, filter, reconcile, notify pass.
    pub async fn run_cycle(&self) -> Result<CycleReport, EngineError> {
        self.run_cycle_until(&CancellationToken::new()).await
    }

    /// Like [`run_cycle`](Self::run_cycle), but gives up with
    /// [`CycleReport::Cancelled`] if `cancel` fires before the response is in.
    pub async fn run_cycle_until(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, EngineError> {
        let location_id = self.location_id;

        if !self.courtesy_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(CycleReport::Cancelled),
                _ = tokio::time::sleep(self.courtesy_delay) => {}
            }
        }

        let fetched = tokio::select! {
            _ = cancel.cancelled() => return Ok(CycleReport::Cancelled),
            fetched = self.source.fetch_slots(location_id) => fetched,
        };
        if cancel.is_cancelled() {
            return Ok(CycleReport::Cancelled);
        }

        let candidates = match fetched {
            Ok(candidates) => candidates,
            Err(source) if source.is_fatal() => {
                return Err(EngineError::Rejected {
                    location_id,
                    source,
                });
            }
            Err(error) => {
                tracing::debug!(%location_id, %error, "fetch failed, skipping cycle");
                return Ok(CycleReport::Skipped);
            }
        };

        let total = candidates.len();
        let mut active = BTreeSet::new();
        let mut accepted = Vec::new();
        for candidate in candidates.into_iter().filter(|c| c.active) {
            active.insert(candidate.start_time);
            if self.policy.accepts(candidate.start_time) {
                accepted.push(candidate.start_time);
            }
        }

        if active.is_empty() {
            tracing::info!(%location_id, "No active appointments available for location {location_id}");
        }
        tracing::debug!(
            %location_id,
            total,
            active = active.len(),
            acceptable = accepted.len(),
            "evaluated appointments"
        );

        let accepted_count = accepted.len();
        let active_count = active.len();
        let changes = self.record(accepted, active).await?;

        let new = group_by_date(changes.claimed.iter().copied());
        tracing::debug!(%location_id, count = changes.claimed.len(), "new appointments");

        if !new.is_empty() {
            if let Err(error) = self.sink.new_appointments(location_id, &new).await {
                tracing::warn!(%location_id, %error, "failed to send new appointment notification");
            }
        }

        Ok(CycleReport::Completed(CycleSummary {
            total,
            active: active_count,
            accepted: accepted_count,
            removed: changes.removed,
            new,
        }))
    }

    /// Claims and reconciles on a blocking thread. Once started, the
    /// transaction runs to commit or rollback even if the caller is dropped.
    async fn record(
        &self,
        accepted: Vec<NaiveDateTime>,
        active: BTreeSet<NaiveDateTime>,
    ) -> Result<CycleChanges, EngineError> {
        let conn = Arc::clone(&self.conn);
        let store = Arc::clone(&self.store);
        let location_id = self.location_id;

        let changes = tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            store.apply_cycle(&mut conn, location_id, &accepted, &active)
        })
        .await??;

        Ok(changes)
    }
}
