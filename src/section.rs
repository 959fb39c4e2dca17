//! Sections and their static load plans
//!
//! A section is one navigable view of the console. Its plan lists the
//! resources the view needs and the overall time budget for loading them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::data::ResourceId;

/// Identifies one navigable view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionId {
    Overview,
    Users,
    Teachers,
    Courses,
    Batches,
    OneToOne,
    Modules,
    Lessons,
    Classroom,
    LiveSessions,
    Mentors,
    Projects,
    Assessments,
    Jobs,
    Activity,
}

impl SectionId {
    pub const ALL: [SectionId; 15] = [
        SectionId::Overview,
        SectionId::Users,
        SectionId::Teachers,
        SectionId::Courses,
        SectionId::Batches,
        SectionId::OneToOne,
        SectionId::Modules,
        SectionId::Lessons,
        SectionId::Classroom,
        SectionId::LiveSessions,
        SectionId::Mentors,
        SectionId::Projects,
        SectionId::Assessments,
        SectionId::Jobs,
        SectionId::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Overview => "overview",
            SectionId::Users => "users",
            SectionId::Teachers => "teachers",
            SectionId::Courses => "courses",
            SectionId::Batches => "batches",
            SectionId::OneToOne => "one-to-one",
            SectionId::Modules => "modules",
            SectionId::Lessons => "lessons",
            SectionId::Classroom => "classroom",
            SectionId::LiveSessions => "live-sessions",
            SectionId::Mentors => "mentors",
            SectionId::Projects => "projects",
            SectionId::Assessments => "assessments",
            SectionId::Jobs => "jobs",
            SectionId::Activity => "activity",
        }
    }

    /// The load plan for this section
    pub fn plan(&self) -> &'static SectionPlan {
        // SECTION_PLANS is laid out in SectionId::ALL order
        &SECTION_PLANS[*self as usize]
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known section
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown section: '{0}'")]
pub struct UnknownSection(pub String);

impl FromStr for SectionId {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}

/// Resources a section needs and how long it may take to load them
#[derive(Debug, Clone, Copy)]
pub struct SectionPlan {
    pub section: SectionId,
    pub resources: &'static [ResourceId],
    pub budget_ms: u64,
}

impl SectionPlan {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

const DEFAULT_BUDGET_MS: u64 = 8_000;

/// Static table of section plans, in `SectionId::ALL` order
pub static SECTION_PLANS: [SectionPlan; 15] = [
    SectionPlan {
        section: SectionId::Overview,
        resources: &[
            ResourceId::Users,
            ResourceId::Courses,
            ResourceId::Teachers,
            ResourceId::Batches,
        ],
        budget_ms: 10_000,
    },
    SectionPlan {
        section: SectionId::Users,
        resources: &[ResourceId::Users, ResourceId::Batches],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Teachers,
        resources: &[ResourceId::Teachers, ResourceId::Courses],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Courses,
        resources: &[ResourceId::Courses, ResourceId::Modules, ResourceId::Teachers],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Batches,
        resources: &[ResourceId::Courses, ResourceId::Batches, ResourceId::Teachers],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::OneToOne,
        resources: &[
            ResourceId::OneToOneBatches,
            ResourceId::Users,
            ResourceId::Teachers,
        ],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Modules,
        resources: &[ResourceId::Modules, ResourceId::Courses],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Lessons,
        resources: &[ResourceId::Lessons, ResourceId::Modules],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Classroom,
        resources: &[ResourceId::ClassroomVideos, ResourceId::Batches],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::LiveSessions,
        resources: &[
            ResourceId::LiveSessions,
            ResourceId::Batches,
            ResourceId::Teachers,
        ],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Mentors,
        resources: &[ResourceId::Mentors],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Projects,
        resources: &[ResourceId::Projects, ResourceId::Courses],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Assessments,
        resources: &[ResourceId::Assessments, ResourceId::Courses],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Jobs,
        resources: &[ResourceId::Jobs],
        budget_ms: DEFAULT_BUDGET_MS,
    },
    SectionPlan {
        section: SectionId::Activity,
        resources: &[ResourceId::ActivityLog, ResourceId::Users],
        budget_ms: DEFAULT_BUDGET_MS,
    },
];
