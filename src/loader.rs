//! Per-resource loaders
//!
//! A `ResourceLoader` owns one backend collection. A load:
//! 1. Returns a fresh cache entry immediately unless a refresh is forced
//! 2. Otherwise joins the in-flight network call for this resource, or starts one
//! 3. Bounds that call with a call-local timeout
//! 4. On success adapts the response and writes it through to the cache
//! 5. On any failure applies the resource's `FallbackMode`
//!
//! The network call runs as its own task, so it keeps going (and still writes
//! the cache) even if every caller stops waiting for it. The loading flag is
//! owned by a guard inside that task and cleared whenever the task ends,
//! however it ends.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::data::{
    get_descriptor, Collection, CredentialSource, DataSource, ResourceDescriptor, ResourceId,
    ResourceTransport,
};
use crate::error::LoadError;
use crate::notify::Notifier;
use crate::state::LoadingState;

/// Default call-local timeout for a single network request
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one load: always some data, plus the failure that produced it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub resource: ResourceId,
    pub data: Collection,
    pub source: DataSource,
    /// Set whenever the data is a fallback
    pub error: Option<LoadError>,
}

impl Loaded {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Collaborators shared by every loader of one tenant
#[derive(Debug, Clone)]
pub struct LoaderContext {
    pub tenant: String,
    pub cache: CacheStore,
    pub transport: Arc<dyn ResourceTransport>,
    pub credentials: Arc<dyn CredentialSource>,
    pub notifier: Arc<dyn Notifier>,
    pub loading: LoadingState,
    pub call_timeout: Duration,
}

type SharedLoad = Shared<BoxFuture<'static, Loaded>>;

struct InFlight {
    generation: u64,
    shared: SharedLoad,
}

struct LoaderInner {
    descriptor: &'static ResourceDescriptor,
    context: LoaderContext,
    /// At most one network call per resource; concurrent loads join it
    in_flight: Mutex<Option<InFlight>>,
    next_generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Loads one backend collection through cache, network and fallback
#[derive(Clone)]
pub struct ResourceLoader {
    inner: Arc<LoaderInner>,
}

impl fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("resource", &self.inner.descriptor.id)
            .field("in_flight", &lock(&self.inner.in_flight).is_some())
            .finish()
    }
}

impl ResourceLoader {
    pub fn new(descriptor: &'static ResourceDescriptor, context: LoaderContext) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                descriptor,
                context,
                in_flight: Mutex::new(None),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn resource(&self) -> ResourceId {
        self.inner.descriptor.id
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.inner.descriptor
    }

    pub fn is_loading(&self) -> bool {
        self.inner.context.loading.is_loading(self.resource())
    }

    /// Loads the collection
    ///
    /// # Arguments
    /// * `force_refresh` - Skip the cache and always go to the network
    ///
    /// # Returns
    /// Always a `Loaded`; failures are folded into fallback data with
    /// `error` set.
    pub async fn load(&self, force_refresh: bool) -> Loaded {
        let descriptor = self.inner.descriptor;

        if !force_refresh {
            if let Some(data) = self
                .inner
                .context
                .cache
                .get::<Collection>(descriptor.cache_key())
            {
                debug!(resource = %descriptor.id, records = data.len(), "cache hit");
                return Loaded {
                    resource: descriptor.id,
                    data,
                    source: DataSource::Cache,
                    error: None,
                };
            }
        }

        self.fetch_shared().await
    }

    /// Loads the collection with a network call issued after this point
    ///
    /// A call already in flight may have been sent before a write this caller
    /// just made, so it is waited out rather than joined. Calls started after
    /// this one began are joined as usual.
    pub async fn refetch(&self) -> Loaded {
        let earlier = lock(&self.inner.in_flight)
            .as_ref()
            .map(|in_flight| in_flight.shared.clone());
        if let Some(earlier) = earlier {
            debug!(resource = %self.resource(), "waiting out earlier load before refetch");
            earlier.await;
        }
        self.fetch_shared().await
    }

    /// Joins the in-flight network call or starts a new one
    fn fetch_shared(&self) -> SharedLoad {
        let mut slot = lock(&self.inner.in_flight);
        if let Some(existing) = slot.as_ref() {
            debug!(resource = %self.resource(), "joining in-flight load");
            return existing.shared.clone();
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let task_inner = Arc::clone(&self.inner);
        // The guard is created by the task itself: a task dropped before its
        // first poll must not touch `in_flight` while this lock is held
        let task = tokio::spawn(async move {
            let _guard = InFlightGuard::begin(Arc::clone(&task_inner), generation);
            task_inner.fetch_and_settle().await
        });

        let inner = Arc::clone(&self.inner);
        let shared = async move {
            let loaded = match task.await {
                Ok(loaded) => loaded,
                Err(join_error) => inner.settle_failure(LoadError::Cancelled {
                    message: join_error.to_string(),
                }),
            };
            inner.release(generation);
            loaded
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            generation,
            shared: shared.clone(),
        });
        shared
    }
}

impl LoaderInner {
    /// Empties the in-flight slot if it still holds call `generation`
    fn release(&self, generation: u64) {
        let mut slot = lock(&self.in_flight);
        if slot
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            *slot = None;
        }
    }

    async fn fetch_and_settle(&self) -> Loaded {
        let descriptor = self.descriptor;
        let timeout = self.context.call_timeout;

        let outcome = match tokio::time::timeout(timeout, self.fetch_once()).await {
            Ok(result) => result,
            Err(_) => Err(LoadError::Timeout {
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match outcome {
            Ok(data) => {
                if let Err(e) = self
                    .context
                    .cache
                    .set(descriptor.cache_key(), &data, descriptor.ttl())
                {
                    warn!(resource = %descriptor.id, error = %e, "failed to write cache entry");
                }
                debug!(resource = %descriptor.id, records = data.len(), "loaded from network");
                Loaded {
                    resource: descriptor.id,
                    data,
                    source: DataSource::Network,
                    error: None,
                }
            }
            Err(error) => self.settle_failure(error),
        }
    }

    async fn fetch_once(&self) -> Result<Collection, LoadError> {
        let token = self
            .context
            .credentials
            .bearer_token()
            .ok_or(LoadError::Unauthenticated)?;
        let endpoint = self.descriptor.endpoint_for(&self.context.tenant);
        let raw = self.context.transport.fetch(&endpoint, &token).await?;
        self.descriptor.adapter.adapt(raw)
    }

    fn settle_failure(&self, error: LoadError) -> Loaded {
        let descriptor = self.descriptor;
        let resolution = descriptor.fallback.resolve(descriptor.id, &error, || {
            self.context
                .cache
                .read::<Collection>(descriptor.cache_key())
                .map(|cached| cached.data)
        });

        match resolution.notice {
            Some(notice) => self.context.notifier.notify(notice),
            None => warn!(
                resource = %descriptor.id,
                error = %error,
                "load failed; substituting demo data"
            ),
        }

        Loaded {
            resource: descriptor.id,
            data: resolution.data,
            source: resolution.source,
            error: Some(error),
        }
    }
}

/// Marks a resource as loading for exactly as long as its network task runs
struct InFlightGuard {
    inner: Arc<LoaderInner>,
    generation: u64,
}

impl InFlightGuard {
    fn begin(inner: Arc<LoaderInner>, generation: u64) -> Self {
        inner.context.loading.set(inner.descriptor.id, true);
        Self { inner, generation }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner
            .context
            .loading
            .set(self.inner.descriptor.id, false);
        self.inner.release(self.generation);
    }
}

/// One loader per resource, sharing a single context
#[derive(Debug, Clone)]
pub struct LoaderSet {
    /// Indexed by `ResourceId as usize`
    loaders: Vec<ResourceLoader>,
    context: LoaderContext,
}

impl LoaderSet {
    pub fn new(context: LoaderContext) -> Self {
        let loaders = ResourceId::ALL
            .into_iter()
            .map(|id| ResourceLoader::new(get_descriptor(id), context.clone()))
            .collect();
        Self { loaders, context }
    }

    pub fn get(&self, resource: ResourceId) -> &ResourceLoader {
        &self.loaders[resource as usize]
    }

    pub fn context(&self) -> &LoaderContext {
        &self.context
    }

    pub fn loading(&self) -> &LoadingState {
        &self.context.loading
    }

    pub fn cache(&self) -> &CacheStore {
        &self.context.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::demo;
    use crate::notify::Severity;
    use crate::testing::{records, Harness, Reply};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_without_cache_hits_network_and_writes_cache() {
        let harness = Harness::new();
        harness.transport.route(
            ResourceId::Batches,
            Reply::Json(json!({"batches": [{"id": "b1"}], "total": 1})),
        );
        let loader = harness.loaders.get(ResourceId::Batches);

        let loaded = loader.load(false).await;

        assert_eq!(loaded.source, DataSource::Network);
        assert_eq!(loaded.data, records(&["b1"]));
        assert!(loaded.error.is_none());
        assert_eq!(harness.transport.calls(ResourceId::Batches), 1);
        assert_eq!(
            harness.loaders.cache().get::<Collection>("batches"),
            Some(records(&["b1"]))
        );
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Batches, Reply::Json(json!([{"id": "b1"}])));
        let loader = harness.loaders.get(ResourceId::Batches);

        loader.load(true).await;
        harness.clock.advance(ChronoDuration::milliseconds(89_000));
        let loaded = loader.load(false).await;

        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(harness.transport.calls(ResourceId::Batches), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_network_call() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Batches, Reply::Json(json!([{"id": "b1"}])));
        let loader = harness.loaders.get(ResourceId::Batches);

        loader.load(true).await;
        harness.clock.advance(ChronoDuration::milliseconds(91_000));
        let loaded = loader.load(false).await;

        assert_eq!(loaded.source, DataSource::Network);
        assert_eq!(harness.transport.calls(ResourceId::Batches), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_fresh_cache() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Courses, Reply::Json(json!([{"id": "c1"}])));
        let loader = harness.loaders.get(ResourceId::Courses);

        loader.load(false).await;
        loader.load(true).await;
        loader.load(true).await;

        assert_eq!(harness.transport.calls(ResourceId::Courses), 3);
    }

    #[tokio::test]
    async fn test_hard_fail_on_500_is_empty_with_one_error() {
        let harness = Harness::new();
        harness.transport.route(ResourceId::Users, Reply::Status(500));

        let loaded = harness.loaders.get(ResourceId::Users).load(true).await;

        assert!(loaded.data.is_empty());
        assert_eq!(loaded.source, DataSource::Empty);
        assert!(matches!(loaded.error, Some(LoadError::Http { status: 500, .. })));
        assert_eq!(harness.notifier.count(Severity::Error), 1);
        assert_eq!(harness.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_hard_fail_ignores_existing_cache() {
        let harness = Harness::new();
        harness
            .loaders
            .cache()
            .set("users", &records(&["someone"]), Duration::from_secs(90))
            .expect("seed cache");
        harness.transport.route(ResourceId::Users, Reply::Status(503));

        let loaded = harness.loaders.get(ResourceId::Users).load(true).await;

        assert!(loaded.data.is_empty());
    }

    #[tokio::test]
    async fn test_demo_substitute_on_500_is_silent() {
        let harness = Harness::new();
        harness.transport.route(ResourceId::Courses, Reply::Status(500));

        let loaded = harness.loaders.get(ResourceId::Courses).load(true).await;

        assert_eq!(loaded.data, demo::dataset(ResourceId::Courses));
        assert_eq!(loaded.source, DataSource::Demo);
        assert!(harness.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_last_known_uses_expired_entry() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Batches, Reply::Json(json!([{"id": "old"}])));
        let loader = harness.loaders.get(ResourceId::Batches);
        loader.load(true).await;

        harness.clock.advance(ChronoDuration::hours(2));
        harness.transport.route(ResourceId::Batches, Reply::Status(502));
        let loaded = loader.load(false).await;

        assert_eq!(loaded.source, DataSource::LastKnown);
        assert_eq!(loaded.data, records(&["old"]));
        assert_eq!(harness.notifier.count(Severity::Warning), 1);
    }

    #[tokio::test]
    async fn test_last_known_without_cache_is_empty_with_warning() {
        let harness = Harness::new();
        harness.transport.route(ResourceId::Projects, Reply::Status(404));

        let loaded = harness.loaders.get(ResourceId::Projects).load(true).await;

        assert_eq!(loaded.source, DataSource::Empty);
        assert!(loaded.data.is_empty());
        assert_eq!(harness.notifier.count(Severity::Warning), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_parse_error() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Users, Reply::Json(json!({"unexpected": true})));

        let loaded = harness.loaders.get(ResourceId::Users).load(true).await;

        assert!(matches!(loaded.error, Some(LoadError::Parse { .. })));
        assert!(loaded.data.is_empty());
        assert!(harness.loaders.cache().read::<Collection>("users").is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_network_call() {
        let harness = Harness::with_credentials(None);
        harness
            .transport
            .route(ResourceId::Users, Reply::Json(json!([{"id": "u1"}])));

        let loaded = harness.loaders.get(ResourceId::Users).load(true).await;

        assert_eq!(loaded.error, Some(LoadError::Unauthenticated));
        assert_eq!(harness.transport.calls(ResourceId::Users), 0);
        assert!(!harness.loaders.loading().is_loading(ResourceId::Users));
    }

    #[tokio::test]
    async fn test_bearer_token_and_tenant_endpoint_are_used() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Jobs, Reply::Json(json!([])));

        harness.loaders.get(ResourceId::Jobs).load(true).await;

        let call = harness.transport.last_call().expect("a call was made");
        assert_eq!(call.endpoint, "/tenants/acme/jobs");
        assert_eq!(call.token, "test-token");
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_applies_fallback_and_clears_flag() {
        let harness = Harness::new();
        harness.transport.route(ResourceId::Batches, Reply::Hang);
        let loader = harness.loaders.get(ResourceId::Batches).clone();

        let started = tokio::time::Instant::now();
        let loaded = loader.load(true).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_CALL_TIMEOUT);
        assert!(elapsed < DEFAULT_CALL_TIMEOUT + Duration::from_millis(50));
        assert_eq!(loaded.error, Some(LoadError::Timeout { after_ms: 10_000 }));
        assert_eq!(loaded.source, DataSource::Empty);
        assert!(!loader.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_flag_set_only_while_in_flight() {
        let harness = Harness::new();
        harness.transport.route_delayed(
            ResourceId::Courses,
            Duration::from_millis(500),
            Reply::Json(json!([{"id": "c1"}])),
        );
        let loader = harness.loaders.get(ResourceId::Courses).clone();

        let pending = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load(true).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(loader.is_loading());

        pending.await.expect("load task");
        tokio::task::yield_now().await;
        assert!(!loader.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_network_call() {
        let harness = Harness::new();
        harness.transport.route_delayed(
            ResourceId::Teachers,
            Duration::from_millis(300),
            Reply::Json(json!([{"id": "t1"}])),
        );
        let loader = harness.loaders.get(ResourceId::Teachers).clone();

        let results = futures::future::join_all((0..5).map(|_| loader.load(true))).await;

        assert_eq!(harness.transport.calls(ResourceId::Teachers), 1);
        for loaded in &results {
            assert_eq!(loaded.data, records(&["t1"]));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_notified_once_for_coalesced_callers() {
        let harness = Harness::new();
        harness.transport.route_delayed(
            ResourceId::Users,
            Duration::from_millis(200),
            Reply::Status(500),
        );
        let loader = harness.loaders.get(ResourceId::Users).clone();

        futures::future::join_all((0..3).map(|_| loader.load(true))).await;

        assert_eq!(harness.notifier.count(Severity::Error), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_load_still_writes_cache() {
        let harness = Harness::new();
        harness.transport.route_delayed(
            ResourceId::Modules,
            Duration::from_secs(2),
            Reply::Json(json!([{"id": "m1"}])),
        );
        let loader = harness.loaders.get(ResourceId::Modules).clone();

        let abandoned = tokio::time::timeout(Duration::from_millis(100), loader.load(true)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            harness.loaders.cache().get::<Collection>("modules"),
            Some(records(&["m1"]))
        );
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn test_sequential_loads_do_not_reuse_settled_call() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Mentors, Reply::Json(json!([{"id": "first"}])));
        let loader = harness.loaders.get(ResourceId::Mentors);

        loader.load(true).await;
        tokio::task::yield_now().await;
        harness
            .transport
            .route(ResourceId::Mentors, Reply::Json(json!([{"id": "second"}])));
        let loaded = loader.load(true).await;

        assert_eq!(loaded.data, records(&["second"]));
        assert_eq!(harness.transport.calls(ResourceId::Mentors), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_waits_out_earlier_call_then_fetches_again() {
        let harness = Harness::new();
        harness.transport.route_delayed(
            ResourceId::Batches,
            Duration::from_millis(500),
            Reply::Json(json!([{"id": "old"}])),
        );
        let loader = harness.loaders.get(ResourceId::Batches).clone();

        let earlier = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load(true).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        harness
            .transport
            .route(ResourceId::Batches, Reply::Json(json!([{"id": "new"}])));

        let refetched = loader.refetch().await;

        assert_eq!(earlier.await.expect("load task").data, records(&["old"]));
        assert_eq!(refetched.data, records(&["new"]));
        assert_eq!(harness.transport.calls(ResourceId::Batches), 2);
        assert_eq!(
            harness.loaders.cache().get::<Collection>("batches"),
            Some(records(&["new"]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_after_refetch_started_joins_it() {
        let harness = Harness::new();
        harness.transport.route_delayed(
            ResourceId::Courses,
            Duration::from_millis(300),
            Reply::Json(json!([{"id": "c1"}])),
        );
        let loader = harness.loaders.get(ResourceId::Courses).clone();

        let (refetched, joined) = tokio::join!(loader.refetch(), loader.load(true));

        assert_eq!(refetched.data, joined.data);
        assert_eq!(harness.transport.calls(ResourceId::Courses), 1);
    }

    #[test]
    fn test_load_started_on_shut_down_runtime_settles_as_cancelled() {
        let harness = Harness::new();
        harness
            .transport
            .route(ResourceId::Courses, Reply::Json(json!([{"id": "c1"}])));
        let loader = harness.loaders.get(ResourceId::Courses).clone();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let handle = runtime.handle().clone();
        drop(runtime);

        // The spawned task is dropped unpolled; this must not deadlock
        let shared = {
            let _enter = handle.enter();
            loader.fetch_shared()
        };
        let loaded = futures::executor::block_on(shared);

        assert!(matches!(loaded.error, Some(LoadError::Cancelled { .. })));
        assert_eq!(loaded.source, DataSource::Demo);
        assert!(!loader.is_loading());
        assert!(lock(&loader.inner.in_flight).is_none());
        assert_eq!(harness.transport.calls(ResourceId::Courses), 0);
    }
}
