//! Core data model for the console's backend collections
//!
//! Every backend collection is normalized into the same shape: an ordered list
//! of JSON object records. Resource identity, static descriptors, response
//! adapters, fallback policies and the resource API transport all live here.

pub mod adapter;
pub mod demo;
pub mod fallback;
pub mod resources;
pub mod transport;

pub use adapter::ResponseAdapter;
pub use fallback::{FallbackMode, FallbackResolution};
pub use resources::{all_resources, get_descriptor, ResourceDescriptor};
pub use transport::{
    CredentialSource, EnvCredentials, HttpTransport, ResourceTransport, StaticCredentials,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single record as returned by the backend
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The canonical collection shape every adapter produces
pub type Collection = Vec<Record>;

/// Identifies one backend collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceId {
    Users,
    Teachers,
    Courses,
    Batches,
    OneToOneBatches,
    Modules,
    Lessons,
    ClassroomVideos,
    LiveSessions,
    Mentors,
    Projects,
    Assessments,
    Jobs,
    ActivityLog,
}

impl ResourceId {
    /// Every resource, in descriptor-table order
    pub const ALL: [ResourceId; 14] = [
        ResourceId::Users,
        ResourceId::Teachers,
        ResourceId::Courses,
        ResourceId::Batches,
        ResourceId::OneToOneBatches,
        ResourceId::Modules,
        ResourceId::Lessons,
        ResourceId::ClassroomVideos,
        ResourceId::LiveSessions,
        ResourceId::Mentors,
        ResourceId::Projects,
        ResourceId::Assessments,
        ResourceId::Jobs,
        ResourceId::ActivityLog,
    ];

    /// Stable identifier, also used as the cache key
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceId::Users => "users",
            ResourceId::Teachers => "teachers",
            ResourceId::Courses => "courses",
            ResourceId::Batches => "batches",
            ResourceId::OneToOneBatches => "one-to-one-batches",
            ResourceId::Modules => "modules",
            ResourceId::Lessons => "lessons",
            ResourceId::ClassroomVideos => "classroom-videos",
            ResourceId::LiveSessions => "live-sessions",
            ResourceId::Mentors => "mentors",
            ResourceId::Projects => "projects",
            ResourceId::Assessments => "assessments",
            ResourceId::Jobs => "jobs",
            ResourceId::ActivityLog => "activity-log",
        }
    }

    /// Human-readable name for notifications
    pub fn label(&self) -> &'static str {
        match self {
            ResourceId::Users => "users",
            ResourceId::Teachers => "teachers",
            ResourceId::Courses => "courses",
            ResourceId::Batches => "batches",
            ResourceId::OneToOneBatches => "one-to-one batches",
            ResourceId::Modules => "modules",
            ResourceId::Lessons => "lessons",
            ResourceId::ClassroomVideos => "classroom videos",
            ResourceId::LiveSessions => "live sessions",
            ResourceId::Mentors => "mentors",
            ResourceId::Projects => "projects",
            ResourceId::Assessments => "assessments",
            ResourceId::Jobs => "jobs",
            ResourceId::ActivityLog => "activity log",
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known resource
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown resource: '{0}'")]
pub struct UnknownResource(pub String);

impl FromStr for ResourceId {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ResourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

/// Where a loaded collection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// Fresh cache entry, no network call made
    Cache,
    /// Successful network call
    Network,
    /// Built-in demo dataset substituted after a failure
    Demo,
    /// Last cached value (possibly expired) substituted after a failure
    LastKnown,
    /// Nothing usable; empty collection after a failure
    Empty,
}

impl DataSource {
    /// True when the data reflects a successful load rather than a fallback
    pub fn is_live(&self) -> bool {
        matches!(self, DataSource::Cache | DataSource::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_roundtrips_through_str() {
        for id in ResourceId::ALL {
            assert_eq!(id.as_str().parse::<ResourceId>(), Ok(id));
        }
    }

    #[test]
    fn test_resource_id_parse_accepts_underscores_and_case() {
        assert_eq!(
            "One_To_One_Batches".parse::<ResourceId>(),
            Ok(ResourceId::OneToOneBatches)
        );
        assert_eq!(" activity-log ".parse::<ResourceId>(), Ok(ResourceId::ActivityLog));
    }

    #[test]
    fn test_resource_id_parse_unknown() {
        let err = "grades".parse::<ResourceId>().unwrap_err();
        assert!(err.to_string().contains("grades"));
    }

    #[test]
    fn test_resource_id_serializes_as_kebab_case() {
        let json = serde_json::to_string(&ResourceId::ClassroomVideos).expect("serialize");
        assert_eq!(json, "\"classroom-videos\"");
    }

    #[test]
    fn test_data_source_live_flags() {
        assert!(DataSource::Cache.is_live());
        assert!(DataSource::Network.is_live());
        assert!(!DataSource::Demo.is_live());
        assert!(!DataSource::LastKnown.is_live());
        assert!(!DataSource::Empty.is_live());
    }
}
