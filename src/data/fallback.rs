//! Per-resource failure policy
//!
//! Each descriptor picks exactly one `FallbackMode`. The mode alone decides
//! what a failed load turns into; nothing is inferred at call time.

use serde::{Deserialize, Serialize};

use super::{demo, Collection, DataSource, ResourceId};
use crate::error::LoadError;
use crate::notify::{Notice, Severity};

/// What a resource shows when its load fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackMode {
    /// Substitute the built-in demo dataset, silently
    ///
    /// Only for non-sensitive catalog data (course and teacher directories).
    DemoSubstitute,
    /// Substitute the last cached value, even if expired, else empty; always warns
    LastKnownOrEmpty,
    /// Always empty plus an error notice
    ///
    /// Mandatory for tenant-sensitive resources. Never consults demo data or
    /// any cached value.
    HardFail,
}

/// The data a failed load resolves to, plus what to tell the user
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResolution {
    pub data: Collection,
    pub source: DataSource,
    /// `None` when the failure is logged only
    pub notice: Option<Notice>,
}

impl FallbackMode {
    /// Resolves a failed load of `resource`
    ///
    /// `last_known` is only invoked for `LastKnownOrEmpty`.
    pub fn resolve<F>(
        self,
        resource: ResourceId,
        error: &LoadError,
        last_known: F,
    ) -> FallbackResolution
    where
        F: FnOnce() -> Option<Collection>,
    {
        match self {
            FallbackMode::DemoSubstitute => FallbackResolution {
                data: demo::dataset(resource),
                source: DataSource::Demo,
                notice: None,
            },
            FallbackMode::LastKnownOrEmpty => match last_known() {
                Some(data) => FallbackResolution {
                    data,
                    source: DataSource::LastKnown,
                    notice: Some(Notice::new(
                        format!(
                            "Couldn't refresh {}; showing previously loaded data ({})",
                            resource.label(),
                            error
                        ),
                        Severity::Warning,
                    )),
                },
                None => FallbackResolution {
                    data: Collection::new(),
                    source: DataSource::Empty,
                    notice: Some(Notice::new(
                        format!("Couldn't load {} ({})", resource.label(), error),
                        Severity::Warning,
                    )),
                },
            },
            FallbackMode::HardFail => FallbackResolution {
                data: Collection::new(),
                source: DataSource::Empty,
                notice: Some(Notice::new(
                    format!("Failed to load {}: {}", resource.label(), error),
                    Severity::Error,
                )),
            },
        }
    }

    /// Whether failures under this mode are surfaced to the user
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, FallbackMode::DemoSubstitute)
    }
}
