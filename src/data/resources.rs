//! Static descriptor table for every backend collection
//!
//! This is the single authoritative source of per-resource TTLs, fallback
//! policies, endpoints and envelope keys. Descriptors are built at compile
//! time and never change.

use std::time::Duration;

use super::{FallbackMode, ResourceId, ResponseAdapter};

/// Placeholder replaced by the tenant id when expanding an endpoint
const TENANT_PLACEHOLDER: &str = "{tenant}";

/// Static description of one backend collection
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    /// Freshness window for cached copies, in milliseconds
    pub ttl_ms: u64,
    pub fallback: FallbackMode,
    /// Endpoint path template; `{tenant}` is substituted at call time
    pub endpoint: &'static str,
    pub adapter: ResponseAdapter,
}

impl ResourceDescriptor {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Expands the endpoint template for `tenant`
    pub fn endpoint_for(&self, tenant: &str) -> String {
        self.endpoint.replace(TENANT_PLACEHOLDER, tenant)
    }

    /// Cache key for this resource (the store itself is tenant-scoped)
    pub fn cache_key(&self) -> &'static str {
        self.id.as_str()
    }
}

const SHORT_TTL_MS: u64 = 90_000;
const CATALOG_TTL_MS: u64 = 300_000;

/// Static array of every resource descriptor, in `ResourceId::ALL` order
pub static RESOURCES: [ResourceDescriptor; 14] = [
    ResourceDescriptor {
        id: ResourceId::Users,
        ttl_ms: SHORT_TTL_MS,
        fallback: FallbackMode::HardFail,
        endpoint: "/tenants/{tenant}/users",
        adapter: ResponseAdapter::envelope("users"),
    },
    ResourceDescriptor {
        id: ResourceId::Teachers,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::DemoSubstitute,
        endpoint: "/tenants/{tenant}/teachers",
        adapter: ResponseAdapter::envelope("teachers"),
    },
    ResourceDescriptor {
        id: ResourceId::Courses,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::DemoSubstitute,
        endpoint: "/tenants/{tenant}/courses",
        adapter: ResponseAdapter::envelope("courses"),
    },
    ResourceDescriptor {
        id: ResourceId::Batches,
        ttl_ms: SHORT_TTL_MS,
        fallback: FallbackMode::LastKnownOrEmpty,
        endpoint: "/tenants/{tenant}/batches",
        adapter: ResponseAdapter::envelope("batches"),
    },
    ResourceDescriptor {
        id: ResourceId::OneToOneBatches,
        ttl_ms: SHORT_TTL_MS,
        fallback: FallbackMode::HardFail,
        endpoint: "/tenants/{tenant}/one-to-one-batches",
        adapter: ResponseAdapter::envelope("batches"),
    },
    ResourceDescriptor {
        id: ResourceId::Modules,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::DemoSubstitute,
        endpoint: "/tenants/{tenant}/modules",
        adapter: ResponseAdapter::envelope("modules"),
    },
    ResourceDescriptor {
        id: ResourceId::Lessons,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::DemoSubstitute,
        endpoint: "/tenants/{tenant}/lessons",
        adapter: ResponseAdapter::envelope("lessons"),
    },
    ResourceDescriptor {
        id: ResourceId::ClassroomVideos,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::LastKnownOrEmpty,
        endpoint: "/tenants/{tenant}/classroom-videos",
        adapter: ResponseAdapter::envelope("videos"),
    },
    ResourceDescriptor {
        id: ResourceId::LiveSessions,
        ttl_ms: 60_000,
        fallback: FallbackMode::LastKnownOrEmpty,
        endpoint: "/tenants/{tenant}/live-sessions",
        adapter: ResponseAdapter::envelope("sessions"),
    },
    ResourceDescriptor {
        id: ResourceId::Mentors,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::LastKnownOrEmpty,
        endpoint: "/tenants/{tenant}/mentors",
        adapter: ResponseAdapter::envelope("mentors"),
    },
    ResourceDescriptor {
        id: ResourceId::Projects,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::LastKnownOrEmpty,
        endpoint: "/tenants/{tenant}/projects",
        adapter: ResponseAdapter::envelope("projects"),
    },
    ResourceDescriptor {
        id: ResourceId::Assessments,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::HardFail,
        endpoint: "/tenants/{tenant}/assessments",
        adapter: ResponseAdapter::envelope("assessments"),
    },
    ResourceDescriptor {
        id: ResourceId::Jobs,
        ttl_ms: CATALOG_TTL_MS,
        fallback: FallbackMode::DemoSubstitute,
        endpoint: "/tenants/{tenant}/jobs",
        adapter: ResponseAdapter::envelope("jobs"),
    },
    ResourceDescriptor {
        id: ResourceId::ActivityLog,
        ttl_ms: 30_000,
        fallback: FallbackMode::HardFail,
        endpoint: "/tenants/{tenant}/activity-log",
        adapter: ResponseAdapter::envelope("logs"),
    },
];

/// Returns the descriptor for `id`
pub fn get_descriptor(id: ResourceId) -> &'static ResourceDescriptor {
    // RESOURCES is laid out in ResourceId::ALL order
    &RESOURCES[id as usize]
}

/// Returns all resource descriptors
pub fn all_resources() -> &'static [ResourceDescriptor] {
    &RESOURCES
}
