//! Domain layer health check functionality
//! Reports on the reading store and the advice pipeline

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use bp_guide_data::repository::ReadingStore;

use crate::services::advice::AdviceGenerator;

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    /// Status of the component
    pub status: ComponentStatus,
    /// Optional details about the component status
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    /// Overall system status
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;
}

/// Health of the store and the advice pipeline
pub struct HealthService {
    store: Arc<dyn ReadingStore>,
    advice: AdviceGenerator,
}

impl HealthService {
    pub fn new(store: Arc<dyn ReadingStore>, advice: AdviceGenerator) -> Self {
        Self { store, advice }
    }

    async fn database_component(&self) -> HealthComponent {
        match self.store.status().await {
            Ok(info) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(info),
            },
            Err(e) => {
                warn!("Database health check failed: {}", e);
                HealthComponent {
                    status: ComponentStatus::Unhealthy,
                    details: Some(e.to_string()),
                }
            }
        }
    }

    fn advice_component(&self) -> HealthComponent {
        let cached = self.advice.cache().len();
        let limiter = if self.advice.limiter().is_busy() { "busy" } else { "idle" };
        if self.advice.inference_configured() {
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(format!(
                    "Inference configured, {} cached answers, limiter {}",
                    cached, limiter
                )),
            }
        } else {
            // Advice still resolves, but only to fallback text
            HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some(format!(
                    "Inference not configured, {} cached answers, limiter {}",
                    cached, limiter
                )),
            }
        }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let database = self.database_component().await;
        let advice = self.advice_component();

        let status = if database.status == ComponentStatus::Unhealthy {
            SystemStatus::Unhealthy
        } else if database.status == ComponentStatus::Degraded
            || advice.status != ComponentStatus::Healthy
        {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        };

        SystemHealth {
            status,
            components: vec![
                ("database".to_string(), database),
                ("advice".to_string(), advice),
            ]
            .into_iter()
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::advice::{AdviceCache, RateLimiter, RetryPolicy};
    use crate::testing::{FailingStore, ScriptedInferenceClient};
    use bp_guide_data::repository::InMemoryRepository;

    fn advice(store: Arc<dyn ReadingStore>, client: ScriptedInferenceClient) -> AdviceGenerator {
        AdviceGenerator::new(
            store,
            Arc::new(client),
            Arc::new(AdviceCache::default()),
            RateLimiter::default(),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_healthy_system() {
        let store: Arc<dyn ReadingStore> = Arc::new(InMemoryRepository::new());
        let service = HealthService::new(store.clone(), advice(store, ScriptedInferenceClient::always_ok("ok")));

        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Healthy);
        assert!(health.components.contains_key("database"));
        assert!(health.components.contains_key("advice"));
    }

    #[tokio::test]
    async fn test_unconfigured_inference_is_degraded() {
        let store: Arc<dyn ReadingStore> = Arc::new(InMemoryRepository::new());
        let client = ScriptedInferenceClient::always_ok("ok").unconfigured();
        let service = HealthService::new(store.clone(), advice(store, client));

        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.components["advice"].status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_failing_store_is_unhealthy() {
        let store: Arc<dyn ReadingStore> = Arc::new(FailingStore);
        let service = HealthService::new(store.clone(), advice(store, ScriptedInferenceClient::always_ok("ok")));

        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Unhealthy);
        assert_eq!(health.components["database"].status, ComponentStatus::Unhealthy);
    }
}
