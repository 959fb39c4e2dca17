//! Section-scoped load orchestration
//!
//! Running a section fans out to every loader in its plan with a forced
//! refresh, races the fan-out against the plan's budget and reports one
//! aggregated outcome.
//!
//! Each loader runs in its own task and commits its own result the moment it
//! resolves, so partial progress is visible before the budget expires. When
//! the budget runs out the caller gets a timed-out outcome right away, but the
//! outstanding tasks are not cancelled: they finish in the background, still
//! write through to the cache, and only touch visible state if their
//! navigation is still the active one.

use futures::future::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::data::{get_descriptor, DataSource, ResourceId};
use crate::error::LoadError;
use crate::loader::{Loaded, LoaderSet};
use crate::notify::{Notice, Notifier, Severity};
use crate::section::SectionId;
use crate::state::{ActiveSection, DashboardState, NavigationToken};

/// Overall result of one section run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Every resource loaded successfully
    Complete,
    /// Everything resolved, but at least one resource fell back
    Partial,
    /// The budget expired with resources still outstanding
    TimedOut,
}

/// What happened to one resource during a section run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub resource: ResourceId,
    pub source: DataSource,
    pub records: usize,
    pub error: Option<LoadError>,
    /// Whether the result reached visible state
    pub committed: bool,
}

impl ResourceReport {
    pub fn from_loaded(loaded: &Loaded, committed: bool) -> Self {
        Self {
            resource: loaded.resource,
            source: loaded.source,
            records: loaded.data.len(),
            error: loaded.error.clone(),
            committed,
        }
    }

    /// Failures the user is told about (demo substitution stays silent)
    pub fn is_visible_failure(&self) -> bool {
        self.error.is_some() && get_descriptor(self.resource).fallback.is_user_visible()
    }
}

/// Aggregated result of `run_section`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionOutcome {
    pub section: SectionId,
    pub token: NavigationToken,
    pub status: OutcomeStatus,
    /// Resources that resolved within the budget, in arrival order
    pub resources: Vec<ResourceReport>,
    /// Resources still outstanding when the budget expired
    pub pending: Vec<ResourceId>,
    /// The user navigated elsewhere before the run finished
    pub superseded: bool,
    pub elapsed_ms: u64,
}

impl SectionOutcome {
    pub fn is_timed_out(&self) -> bool {
        self.status == OutcomeStatus::TimedOut
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(|report| report.error.is_some())
    }

    pub fn report(&self, resource: ResourceId) -> Option<&ResourceReport> {
        self.resources.iter().find(|report| report.resource == resource)
    }
}

/// Runs section load plans against a shared loader set and view state
#[derive(Debug, Clone)]
pub struct LoadOrchestrator {
    loaders: LoaderSet,
    state: DashboardState,
    active: ActiveSection,
    notifier: Arc<dyn Notifier>,
}

impl LoadOrchestrator {
    pub fn new(loaders: LoaderSet, state: DashboardState, active: ActiveSection) -> Self {
        let notifier = Arc::clone(&loaders.context().notifier);
        Self {
            loaders,
            state,
            active,
            notifier,
        }
    }

    pub fn loaders(&self) -> &LoaderSet {
        &self.loaders
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn active(&self) -> &ActiveSection {
        &self.active
    }

    /// Navigates to `section` and loads everything its plan lists
    ///
    /// Supersedes any earlier run: results from older navigations are still
    /// cached but never shown.
    pub async fn run_section(&self, section: SectionId) -> SectionOutcome {
        let plan = section.plan();
        let token = self.active.enter(section);
        let started = Instant::now();
        let deadline = started + plan.budget();

        info!(
            section = %section,
            generation = token.generation,
            resources = plan.resources.len(),
            budget_ms = plan.budget_ms,
            "loading section"
        );

        let mut in_flight: FuturesUnordered<_> = plan
            .resources
            .iter()
            .map(|&resource| {
                let loader = self.loaders.get(resource).clone();
                let state = self.state.clone();
                let active = self.active.clone();
                tokio::spawn(async move {
                    let loaded = loader.load(true).await;
                    let committed =
                        state.commit_if_current(&active, &token, resource, loaded.data.clone());
                    if !committed {
                        debug!(
                            resource = %resource,
                            section = %token.section,
                            generation = token.generation,
                            "navigation superseded; result cached but not shown"
                        );
                    }
                    ResourceReport::from_loaded(&loaded, committed)
                })
                .map(move |joined| (resource, joined))
            })
            .collect();

        let mut resources = Vec::with_capacity(plan.resources.len());
        let mut timed_out = false;
        while !in_flight.is_empty() {
            match tokio::time::timeout_at(deadline, in_flight.next()).await {
                Ok(Some((_, Ok(report)))) => resources.push(report),
                Ok(Some((resource, Err(join_error)))) => {
                    warn!(resource = %resource, error = %join_error, "resource task failed");
                    resources.push(ResourceReport {
                        resource,
                        source: DataSource::Empty,
                        records: 0,
                        error: Some(LoadError::Cancelled {
                            message: join_error.to_string(),
                        }),
                        committed: false,
                    });
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }
        // Dropping the handles detaches the remaining tasks; they keep running.
        drop(in_flight);

        let pending: Vec<ResourceId> = plan
            .resources
            .iter()
            .copied()
            .filter(|resource| !resources.iter().any(|report| report.resource == *resource))
            .collect();

        let status = if timed_out {
            OutcomeStatus::TimedOut
        } else if resources.iter().any(|report| report.error.is_some()) {
            OutcomeStatus::Partial
        } else {
            OutcomeStatus::Complete
        };

        let outcome = SectionOutcome {
            section,
            token,
            status,
            resources,
            pending,
            superseded: !self.active.is_current(&token),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        self.report(&outcome);
        outcome
    }

    fn report(&self, outcome: &SectionOutcome) {
        info!(
            section = %outcome.section,
            status = ?outcome.status,
            resolved = outcome.resources.len(),
            pending = outcome.pending.len(),
            superseded = outcome.superseded,
            elapsed_ms = outcome.elapsed_ms,
            "section load finished"
        );

        if outcome.superseded {
            return;
        }

        if outcome.is_timed_out() {
            self.notifier.notify(Notice::new(
                format!(
                    "Loading {} is taking longer than expected; try refreshing",
                    outcome.section
                ),
                Severity::Warning,
            ));
        }

        if outcome
            .resources
            .iter()
            .any(ResourceReport::is_visible_failure)
        {
            self.notifier
                .notify(Notice::new("Some data failed to load", Severity::Warning));
        }
    }
}
