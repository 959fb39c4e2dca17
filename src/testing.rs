//! Shared fixtures for unit tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::cache::{CacheStore, ManualClock};
use crate::data::{get_descriptor, Collection, ResourceId, ResourceTransport, StaticCredentials};
use crate::error::LoadError;
use crate::loader::{LoaderContext, LoaderSet, DEFAULT_CALL_TIMEOUT};
use crate::notify::RecordingNotifier;
use crate::state::LoadingState;

pub(crate) const TENANT: &str = "acme";

/// Builds a collection of `{"id": ...}` records
pub(crate) fn records(ids: &[&str]) -> Collection {
    ids.iter()
        .map(|id| json!({ "id": id }).as_object().cloned().expect("object"))
        .collect()
}

/// Canned transport behaviour for one endpoint
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(Value),
    Status(u16),
    /// Never answers
    Hang,
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub endpoint: String,
    pub token: String,
}

#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<String, (Duration, Reply)>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn route(&self, resource: ResourceId, reply: Reply) {
        self.route_delayed(resource, Duration::ZERO, reply);
    }

    pub fn route_delayed(&self, resource: ResourceId, delay: Duration, reply: Reply) {
        let endpoint = get_descriptor(resource).endpoint_for(TENANT);
        self.routes
            .lock()
            .expect("routes lock")
            .insert(endpoint, (delay, reply));
    }

    pub fn calls(&self, resource: ResourceId) -> usize {
        let endpoint = get_descriptor(resource).endpoint_for(TENANT);
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().expect("calls lock").last().cloned()
    }
}

#[async_trait]
impl ResourceTransport for FakeTransport {
    async fn fetch(&self, endpoint: &str, token: &str) -> Result<Value, LoadError> {
        self.calls.lock().expect("calls lock").push(Call {
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        });
        let route = self
            .routes
            .lock()
            .expect("routes lock")
            .get(endpoint)
            .cloned();
        let (delay, reply) = route.unwrap_or((Duration::ZERO, Reply::Status(404)));

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Json(value) => Ok(value),
            Reply::Status(status) => Err(LoadError::Http {
                status,
                message: "fake failure".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// A loader set wired to fakes, a manual clock and a throwaway cache directory
pub(crate) struct Harness {
    pub transport: Arc<FakeTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub loaders: LoaderSet,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_credentials(Some("test-token"))
    }

    pub fn with_credentials(token: Option<&str>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let clock = Arc::new(ManualClock::default());
        let transport = Arc::new(FakeTransport::default());
        let notifier = Arc::new(RecordingNotifier::new());
        let cache = CacheStore::for_tenant(dir.path(), TENANT).with_clock(clock.clone());

        let loaders = LoaderSet::new(LoaderContext {
            tenant: TENANT.to_string(),
            cache,
            transport: transport.clone(),
            credentials: Arc::new(StaticCredentials(token.map(String::from))),
            notifier: notifier.clone(),
            loading: LoadingState::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        });

        Self {
            transport,
            notifier,
            clock,
            loaders,
            _dir: dir,
        }
    }
}
