use std::sync::Arc;

use bp_guide_data::repository::ReadingStore;
use bp_guide_domain::config::AdviceConfig;
use bp_guide_domain::health::{HealthService, HealthServiceTrait};
use bp_guide_domain::services::advice::{AdviceCache, AdviceGenerator, InferenceClient, RateLimiter};
use bp_guide_domain::services::notifier::Notifier;
use bp_guide_domain::services::report::ReportService;
use bp_guide_domain::services::{create_default_blood_pressure_service, BloodPressureServiceTrait};

/// Services shared by every handler
///
/// Built once at startup; the advice cache and rate limiter inside
/// `advice` are the only instances in the process.
#[derive(Clone)]
pub struct AppState {
    pub readings: Arc<dyn BloodPressureServiceTrait>,
    pub advice: AdviceGenerator,
    pub reports: Arc<ReportService>,
    pub health: Arc<dyn HealthServiceTrait>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        client: Arc<dyn InferenceClient>,
        notifier: Arc<dyn Notifier>,
        config: &AdviceConfig,
    ) -> Self {
        let readings = create_default_blood_pressure_service(store.clone());
        let advice = AdviceGenerator::new(
            store.clone(),
            client,
            Arc::new(AdviceCache::new(config.cache_ttl, config.cache_capacity)),
            RateLimiter::new(config.min_interval),
            config.retry.clone(),
        );
        let reports = Arc::new(ReportService::new(readings.clone(), notifier));
        let health: Arc<dyn HealthServiceTrait> = Arc::new(HealthService::new(store, advice.clone()));

        Self {
            readings,
            advice,
            reports,
            health,
        }
    }
}
