//! Visitor session tracking
//!
//! Keeps a per-client visit counter in session state. The counter moves at
//! most once per elapsed day: a request arriving a full day or more after the
//! recorded `last_visit` bumps `visits` and stamps `last_visit` with the
//! current time; anything sooner leaves both untouched.
//!
//! [`track`] is a pure function over [`VisitState`] and a caller-supplied
//! `now`. [`track_session`] is the glue that reads the two fields out of a
//! request's [`Session`] and writes the result back.

use crate::error::Result;
use crate::session::{Session, SessionData};
use chrono::{DateTime, SecondsFormat, Utc};

/// Session field holding the visit counter
pub const VISITS_KEY: &str = "visits";
/// Session field holding the RFC 3339 timestamp of the last counted visit
pub const LAST_VISIT_KEY: &str = "last_visit";

/// The two session fields the tracker cares about, as found in the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitState {
    pub visits: Option<u64>,
    pub last_visit: Option<String>,
}

/// What a call to [`track`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// No prior `last_visit`; fields seeded without incrementing
    FirstVisit,
    /// Less than a full day since `last_visit`
    SameDay,
    /// At least a full day elapsed; counter incremented
    NewDay,
    /// Stored `last_visit` was unreadable (or ahead of `now`); reset to now
    Reset,
}

/// Updated state to persist back into the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedVisit {
    pub visits: u64,
    pub last_visit: String,
    pub outcome: VisitOutcome,
}

/// Serialize a timestamp the way `last_visit` is stored
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a stored `last_visit` value
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Compute the next visit state for a request arriving at `now`.
pub fn track(state: VisitState, now: DateTime<Utc>) -> TrackedVisit {
    let visits = state.visits.unwrap_or(1);
    let now_str = format_timestamp(now);

    let Some(raw) = state.last_visit else {
        return TrackedVisit {
            visits,
            last_visit: now_str,
            outcome: VisitOutcome::FirstVisit,
        };
    };

    let last = match parse_timestamp(&raw) {
        Some(last) if last <= now => last,
        Some(_) => {
            tracing::warn!("last_visit {} is ahead of request time, resetting", raw);
            return reset(visits, now_str);
        }
        None => {
            tracing::warn!("Unparseable last_visit {:?}, resetting", raw);
            return reset(visits, now_str);
        }
    };

    if (now - last).num_days() > 0 {
        TrackedVisit {
            visits: visits.saturating_add(1),
            last_visit: now_str,
            outcome: VisitOutcome::NewDay,
        }
    } else {
        TrackedVisit {
            visits,
            last_visit: raw,
            outcome: VisitOutcome::SameDay,
        }
    }
}

fn reset(visits: u64, now_str: String) -> TrackedVisit {
    TrackedVisit {
        visits,
        last_visit: now_str,
        outcome: VisitOutcome::Reset,
    }
}

impl VisitState {
    /// Read the tracked fields out of session data.
    ///
    /// A `visits` value that is not a non-negative integer counts as absent.
    pub fn from_session(data: &SessionData) -> Self {
        let visits = match data.get_value(VISITS_KEY) {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        let last_visit = data
            .get_value(LAST_VISIT_KEY)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        VisitState { visits, last_visit }
    }
}

impl TrackedVisit {
    /// Write both fields back into session data
    pub fn write_to(&self, data: &mut SessionData) -> Result<()> {
        data.insert(VISITS_KEY, self.visits)?;
        data.insert(LAST_VISIT_KEY, &self.last_visit)?;
        Ok(())
    }
}

/// Track a visit against the request's session and return the visit count
pub fn track_session(session: &Session, now: DateTime<Utc>) -> Result<u64> {
    session.update(|data| {
        let tracked = track(VisitState::from_session(data), now);
        tracked.write_to(data)?;
        tracing::debug!(
            visits = tracked.visits,
            outcome = ?tracked.outcome,
            "Tracked visit"
        );
        Ok(tracked.visits)
    })
}
