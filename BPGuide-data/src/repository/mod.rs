// Repository module structure
pub mod errors;
mod blood_pressure;
mod in_memory;
#[cfg(feature = "sqlite")]
mod storage;
mod user;

use async_trait::async_trait;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use blood_pressure::{next_recorded_at, ReadingRepositoryTrait};
pub use in_memory::InMemoryRepository;
#[cfg(feature = "sqlite")]
pub use storage::SqliteRepository;
pub use user::UserRepositoryTrait;

/// The full storage contract: users, readings and a liveness probe
#[async_trait]
pub trait ReadingStore: UserRepositoryTrait + ReadingRepositoryTrait + Send + Sync {
    /// Describe the backing store, failing if it cannot be reached
    async fn status(&self) -> Result<String, RepositoryError>;
}
