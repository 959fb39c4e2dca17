//! Aggregate statistics for the overview
//!
//! Every figure is computed on demand from whatever collections are currently
//! visible. Nothing here is cached, so the numbers can never disagree with the
//! data they summarize.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::data::{Collection, Record, ResourceId};
use crate::state::DashboardState;

/// Headline numbers shown on the overview
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_teachers: usize,
    pub active_teachers: usize,
    pub total_courses: usize,
    pub total_batches: usize,
    pub active_batches: usize,
    pub completed_batches: usize,
    /// `completed_batches / total_batches`, absent when there are no batches
    pub batch_completion_ratio: Option<f64>,
    pub upcoming_live_sessions: usize,
    pub open_jobs: usize,
}

impl DashboardStats {
    /// Summarizes the visible state as of `now`
    ///
    /// # Arguments
    /// * `state` - The collections currently on screen
    /// * `now` - Reference point for "upcoming" sessions
    pub fn compute(state: &DashboardState, now: DateTime<Utc>) -> Self {
        let users = state.get(ResourceId::Users).unwrap_or_default();
        let teachers = state.get(ResourceId::Teachers).unwrap_or_default();
        let courses = state.get(ResourceId::Courses).unwrap_or_default();
        let batches = state.get(ResourceId::Batches).unwrap_or_default();
        let sessions = state.get(ResourceId::LiveSessions).unwrap_or_default();
        let jobs = state.get(ResourceId::Jobs).unwrap_or_default();

        let completed_batches = count_with_status(&batches, &["completed", "complete", "finished"]);

        Self {
            total_users: users.len(),
            active_users: count_active(&users),
            total_teachers: teachers.len(),
            active_teachers: count_active(&teachers),
            total_courses: courses.len(),
            total_batches: batches.len(),
            active_batches: count_active(&batches),
            completed_batches,
            batch_completion_ratio: ratio(completed_batches, batches.len()),
            upcoming_live_sessions: sessions
                .iter()
                .filter(|session| is_upcoming(session, now))
                .count(),
            open_jobs: count_with_status(&jobs, &["open"]),
        }
    }
}

fn ratio(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64)
}

fn status(record: &Record) -> Option<String> {
    record
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
}

fn count_with_status(collection: &Collection, statuses: &[&str]) -> usize {
    collection
        .iter()
        .filter(|record| status(record).is_some_and(|s| statuses.contains(&s.as_str())))
        .count()
}

/// A record is active if it says so through a boolean flag or its status
fn is_active(record: &Record) -> bool {
    for flag in ["isActive", "active"] {
        if let Some(active) = record.get(flag).and_then(Value::as_bool) {
            return active;
        }
    }
    status(record).is_some_and(|s| s == "active")
}

fn count_active(collection: &Collection) -> usize {
    collection.iter().filter(|record| is_active(record)).count()
}

/// Scheduled strictly after `now` and not cancelled
fn is_upcoming(session: &Record, now: DateTime<Utc>) -> bool {
    if status(session).is_some_and(|s| s == "cancelled" || s == "canceled") {
        return false;
    }
    ["scheduledAt", "startTime", "startsAt"]
        .iter()
        .filter_map(|field| session.get(*field).and_then(Value::as_str))
        .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .is_some_and(|start| start.with_timezone(&Utc) > now)
}
