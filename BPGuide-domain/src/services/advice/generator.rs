use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, warn};

use bp_guide_data::repository::ReadingStore;

use super::cache::AdviceCache;
use super::inference::{InferenceClient, InferenceError};
use super::limiter::RateLimiter;
use super::prompt::{build_advice_prompt, PatientContext};
use super::retry::{call_with_retry, InferenceOutcome, RetryPolicy};
use super::{AdviceError, Fingerprint, FALLBACK_RATE_LIMITED, FALLBACK_UNAVAILABLE};
use crate::entities::conversions::convert_to_domain_user;

type AdviceFuture = Shared<BoxFuture<'static, Result<String, AdviceError>>>;

/// Misses currently being resolved, keyed by fingerprint
///
/// The id tells a task's own slot apart from a later one for the same key.
#[derive(Default)]
struct InFlight {
    next_id: u64,
    tasks: HashMap<Fingerprint, (u64, AdviceFuture)>,
}

struct GeneratorInner {
    store: Arc<dyn ReadingStore>,
    client: Arc<dyn InferenceClient>,
    cache: Arc<AdviceCache>,
    limiter: RateLimiter,
    policy: RetryPolicy,
    in_flight: Mutex<InFlight>,
}

impl GeneratorInner {
    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a task's in-flight slot when the task ends, including by panic
struct InFlightSlot {
    inner: Arc<GeneratorInner>,
    fingerprint: Fingerprint,
    id: u64,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        let mut in_flight = self.inner.in_flight();
        if matches!(in_flight.tasks.get(&self.fingerprint), Some((id, _)) if *id == self.id) {
            in_flight.tasks.remove(&self.fingerprint);
        }
    }
}

/// Produces advice text for a reading
///
/// Cheap to clone; clones share the cache, the limiter and in-flight work.
#[derive(Clone)]
pub struct AdviceGenerator {
    inner: Arc<GeneratorInner>,
}

impl AdviceGenerator {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        client: Arc<dyn InferenceClient>,
        cache: Arc<AdviceCache>,
        limiter: RateLimiter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(GeneratorInner {
                store,
                client,
                cache,
                limiter,
                policy,
                in_flight: Mutex::new(InFlight::default()),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<AdviceCache> {
        &self.inner.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn inference_configured(&self) -> bool {
        self.inner.client.is_configured()
    }

    /// Advice for one reading of a user
    ///
    /// Resolves to text for every inference behaviour; only a missing user
    /// or a storage failure is an error.
    pub async fn generate_advice(
        &self,
        user_id: i64,
        systolic: u16,
        diastolic: u16,
    ) -> Result<String, AdviceError> {
        let fingerprint = Fingerprint::new(user_id, systolic, diastolic);

        if let Some(text) = self.inner.cache.get(&fingerprint) {
            debug!("Advice cache hit for {}", fingerprint);
            return Ok(text);
        }

        self.join_or_spawn(fingerprint).await
    }

    /// Join the in-flight miss for this fingerprint or start one
    fn join_or_spawn(&self, fingerprint: Fingerprint) -> AdviceFuture {
        let mut in_flight = self.inner.in_flight();
        if let Some((_, existing)) = in_flight.tasks.get(&fingerprint) {
            debug!("Joining in-flight advice request for {}", fingerprint);
            return existing.clone();
        }

        in_flight.next_id += 1;
        let slot = InFlightSlot {
            inner: self.inner.clone(),
            fingerprint,
            id: in_flight.next_id,
        };

        // The task owns the work so a dropped caller still fills the cache
        let task = tokio::spawn(async move {
            let result = resolve_miss(&slot.inner, fingerprint).await;
            drop(slot);
            result
        });

        let future = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    error!("Advice task for {} failed: {}", fingerprint, join_error);
                    Ok(FALLBACK_UNAVAILABLE.to_string())
                }
            }
        }
        .boxed()
        .shared();

        let id = in_flight.next_id;
        in_flight.tasks.insert(fingerprint, (id, future.clone()));
        future
    }

    /// Free-form completion through the limiter and retry policy, uncached
    pub async fn chat(&self, message: &str) -> Result<String, InferenceError> {
        let inner = &self.inner;
        match call_with_retry(inner.client.as_ref(), &inner.limiter, &inner.policy, message).await {
            InferenceOutcome::Generated(text) => Ok(text),
            InferenceOutcome::RateLimited => Err(InferenceError::RateLimited),
            InferenceOutcome::Failed(err) => Err(err),
        }
    }
}

async fn resolve_miss(inner: &GeneratorInner, fingerprint: Fingerprint) -> Result<String, AdviceError> {
    // A miss that finished just before this task started may have filled the cache
    if let Some(text) = inner.cache.get(&fingerprint) {
        return Ok(text);
    }

    let user = inner
        .store
        .get_user(fingerprint.user_id)
        .await
        .map_err(|e| AdviceError::Storage(e.to_string()))?
        .map(convert_to_domain_user)
        .ok_or(AdviceError::UserNotFound(fingerprint.user_id))?;

    let prompt = build_advice_prompt(
        &PatientContext::from(&user),
        fingerprint.systolic,
        fingerprint.diastolic,
    );

    match call_with_retry(inner.client.as_ref(), &inner.limiter, &inner.policy, &prompt).await {
        InferenceOutcome::Generated(text) => {
            inner.cache.put(fingerprint, text.clone());
            info!("Generated advice for {}", fingerprint);
            Ok(text)
        }
        InferenceOutcome::RateLimited => {
            warn!("Advice for {} fell back after rate limiting", fingerprint);
            Ok(FALLBACK_RATE_LIMITED.to_string())
        }
        InferenceOutcome::Failed(err) => {
            warn!("Advice for {} fell back: {}", fingerprint, err);
            Ok(FALLBACK_UNAVAILABLE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registered_store, FailingStore, ScriptedInferenceClient};
    use std::time::Duration;
    use tokio::time::Instant;

    fn generator(store: Arc<dyn ReadingStore>, client: Arc<ScriptedInferenceClient>) -> AdviceGenerator {
        AdviceGenerator::new(
            store,
            client,
            Arc::new(AdviceCache::default()),
            RateLimiter::new(Duration::from_secs(1)),
            RetryPolicy::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_then_hit() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_ok("High BP detected"));
        let generator = generator(store, client.clone());

        let first = generator.generate_advice(1234, 180, 110).await.unwrap();
        assert_eq!(first, "High BP detected");
        assert_eq!(generator.cache().get(&Fingerprint::new(1234, 180, 110)).as_deref(), Some("High BP detected"));

        let second = generator.generate_advice(1234, 180, 110).await.unwrap();
        assert_eq!(second, "High BP detected");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_store_and_limiter() {
        let client = Arc::new(ScriptedInferenceClient::always_ok("unused"));
        let generator = generator(Arc::new(FailingStore), client.clone());
        generator.cache().put(Fingerprint::new(1234, 120, 80), "cached".to_string());

        // Hold the only permit: a hit must not wait for it
        let _permit = generator.limiter().acquire().await;
        let start = Instant::now();
        let text = generator.generate_advice(1234, 120, 80).await.unwrap();

        assert_eq!(text, "cached");
        assert_eq!(Instant::now(), start);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_user() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_ok("unused"));
        let generator = generator(store, client.clone());

        let err = generator.generate_advice(4321, 120, 80).await.unwrap_err();
        assert_eq!(err, AdviceError::UserNotFound(4321));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure() {
        let client = Arc::new(ScriptedInferenceClient::always_ok("unused"));
        let generator = generator(Arc::new(FailingStore), client);

        let err = generator.generate_advice(1234, 120, 80).await.unwrap_err();
        assert!(matches!(err, AdviceError::Storage(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_fallback_is_not_cached() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_err(InferenceError::RateLimited));
        let generator = generator(store, client.clone());

        let start = Instant::now();
        let text = generator.generate_advice(1234, 150, 95).await.unwrap();

        assert_eq!(text, FALLBACK_RATE_LIMITED);
        assert_eq!(client.calls(), 3);
        assert_eq!(Instant::now() - start, Duration::from_secs(6));
        assert!(generator.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failure_fallback() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_err(InferenceError::Upstream { status: 500 }));
        let generator = generator(store, client.clone());

        let text = generator.generate_advice(1234, 150, 95).await.unwrap();
        assert_eq!(text, FALLBACK_UNAVAILABLE);
        assert_eq!(client.calls(), 1);
        assert!(generator.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_client_falls_back() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::panicking());
        let generator = generator(store, client);

        let text = generator.generate_advice(1234, 150, 95).await.unwrap();
        assert_eq!(text, FALLBACK_UNAVAILABLE);
        assert!(generator.inner.in_flight().tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_are_coalesced() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_ok("Shared advice").with_latency(Duration::from_millis(500)));
        let generator = generator(store, client.clone());

        let requests = (0..5).map(|_| generator.generate_advice(1234, 140, 90));
        let results = futures::future::join_all(requests).await;

        for result in results {
            assert_eq!(result.unwrap(), "Shared advice");
        }
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_distinct_misses_respect_limiter() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_ok("ok").with_latency(Duration::from_millis(200)));
        let generator = generator(store, client.clone());

        let requests = (0..4).map(|i| generator.generate_advice(1234, 120 + i, 80));
        futures::future::join_all(requests).await;

        assert_eq!(client.calls(), 4);
        assert_eq!(client.max_in_flight(), 1);
        let starts = client.call_starts();
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_leaves_limiter_to_other_requests() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::scripted(vec![
            Err(InferenceError::RateLimited),
            Ok("advice for 130/85".to_string()),
            Ok("advice for 150/95".to_string()),
        ]));
        let generator = generator(store, client.clone());
        let start = Instant::now();

        let backing_off = generator.generate_advice(1234, 150, 95);
        let later = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            generator.generate_advice(1234, 130, 85).await
        };
        let (first, second) = tokio::join!(backing_off, later);

        assert_eq!(first.unwrap(), "advice for 150/95");
        assert_eq!(second.unwrap(), "advice for 130/85");
        let offsets: Vec<Duration> = client.call_starts().iter().map(|at| *at - start).collect();
        assert_eq!(
            offsets,
            vec![Duration::ZERO, Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_request_still_fills_cache() {
        let store = registered_store(1234).await;
        let client = Arc::new(ScriptedInferenceClient::always_ok("Eventually").with_latency(Duration::from_secs(2)));
        let generator = generator(store, client.clone());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            generator.generate_advice(1234, 130, 85),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            generator.cache().get(&Fingerprint::new(1234, 130, 85)).as_deref(),
            Some("Eventually")
        );
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_passthrough() {
        let client = Arc::new(ScriptedInferenceClient::always_ok("Hello there"));
        let generator = generator(Arc::new(FailingStore), client);
        assert_eq!(generator.chat("Hi").await.unwrap(), "Hello there");
        assert!(generator.cache().is_empty());
    }
}
