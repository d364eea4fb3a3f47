//! Acceptance window: which offered slots are worth announcing.
//!
//! A slot is accepted when it passes every configured rule, checked in this
//! order:
//! 1. its date is before `current_appointment_date`;
//! 2. it starts no earlier than `now + travel_time`;
//! 3. its time of day is not before `start_time_of_day`;
//! 4. its time of day is not after `end_time_of_day`.
//!
//! Unset rules always pass. Both window bounds are inclusive, and a slot
//! exactly at `now + travel_time` is accepted.

use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Resolved constraints, immutable for the life of a polling session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptanceConstraints {
    /// Slots on or after this date are rejected.
    pub current_appointment_date: Option<NaiveDate>,
    /// Minimum lead time between now and the slot start.
    pub travel_time: Option<Duration>,
    /// Earliest acceptable time of day (inclusive).
    pub start_time_of_day: Option<NaiveTime>,
    /// Latest acceptable time of day (inclusive).
    pub end_time_of_day: Option<NaiveTime>,
}

/// Outcome of evaluating one slot; every variant but `Accepted` names the
/// first rule that rejected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All rules passed.
    Accepted,
    /// The slot is not earlier than the appointment already held.
    NotBeforeCurrentAppointment,
    /// The slot starts too soon to get there.
    WithinTravelTime,
    /// The slot is earlier in the day than the window start.
    BeforeWindow,
    /// The slot is later in the day than the window end.
    AfterWindow,
}

impl Verdict {
    /// `true` for [`Verdict::Accepted`].
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

/// Pure predicate over slot start times.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    constraints: AcceptanceConstraints,
}

impl AcceptancePolicy {
    /// Creates a policy over fixed constraints.
    pub fn new(constraints: AcceptanceConstraints) -> Self {
        Self { constraints }
    }

    /// The constraints this policy evaluates.
    pub fn constraints(&self) -> &AcceptanceConstraints {
        &self.constraints
    }

    /// Evaluates `when` against the local wall clock, read fresh on every call.
    pub fn accepts(&self, when: NaiveDateTime) -> bool {
        self.accepts_at(when, Local::now().naive_local())
    }

    /// Evaluates `when` as if the current time were `now`.
    pub fn accepts_at(&self, when: NaiveDateTime, now: NaiveDateTime) -> bool {
        self.evaluate_at(when, now).is_accepted()
    }

    /// Like [`accepts_at`](Self::accepts_at) but reports which rule rejected.
    pub fn evaluate_at(&self, when: NaiveDateTime, now: NaiveDateTime) -> Verdict {
        let c = &self.constraints;

        if let Some(current) = c.current_appointment_date {
            if when.date() >= current {
                return Verdict::NotBeforeCurrentAppointment;
            }
        }

        if let Some(travel) = c.travel_time {
            // A lead time too large to represent can never be satisfied.
            let earliest = TimeDelta::from_std(travel)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta));
            match earliest {
                Some(earliest) if when >= earliest => {}
                _ => return Verdict::WithinTravelTime,
            }
        }

        if let Some(start) = c.start_time_of_day {
            if when.time() < start {
                return Verdict::BeforeWindow;
            }
        }

        if let Some(end) = c.end_time_of_day {
            if when.time() > end {
                return Verdict::AfterWindow;
            }
        }

        Verdict::Accepted
    }
}
