// Testing utilities and mock implementations for the domain layer
// Compiled for this crate's tests and for dependents enabling the "mock" feature

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use bp_guide_data::models::blood_pressure::{NewReading, ReadingRecord, VisitUpdate};
use bp_guide_data::models::user::{NewUser, StoredGender, UserRecord};
use bp_guide_data::repository::{
    InMemoryRepository, ReadingRepositoryTrait, ReadingStore, RepositoryError, UserRepositoryTrait,
};

use crate::entities::blood_pressure::BloodPressureReading;
use crate::services::advice::inference::{InferenceClient, InferenceError};
use crate::services::notifier::{EmailMessage, Notifier, NotifierError};

#[derive(Debug, Clone)]
enum Behaviour {
    Reply(Result<String, InferenceError>),
    Script(Arc<Mutex<VecDeque<Result<String, InferenceError>>>>),
    Panic,
}

/// Inference client with canned answers and call accounting
#[derive(Debug)]
pub struct ScriptedInferenceClient {
    behaviour: Behaviour,
    latency: Duration,
    configured: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    starts: Mutex<Vec<Instant>>,
}

impl ScriptedInferenceClient {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            latency: Duration::ZERO,
            configured: true,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with `text`
    pub fn always_ok(text: &str) -> Self {
        Self::with_behaviour(Behaviour::Reply(Ok(text.to_string())))
    }

    /// Every call fails with `error`
    pub fn always_err(error: InferenceError) -> Self {
        Self::with_behaviour(Behaviour::Reply(Err(error)))
    }

    /// Calls take answers in order; once exhausted they fail with `EmptyResponse`
    pub fn scripted(answers: Vec<Result<String, InferenceError>>) -> Self {
        Self::with_behaviour(Behaviour::Script(Arc::new(Mutex::new(answers.into()))))
    }

    /// Every call panics
    pub fn panicking() -> Self {
        Self::with_behaviour(Behaviour::Panic)
    }

    /// Each call sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Report the client as missing credentials
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_starts(&self) -> Vec<Instant> {
        self.starts.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInferenceClient {
    async fn complete(&self, _prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut starts) = self.starts.lock() {
            starts.push(Instant::now());
        }
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.behaviour {
            Behaviour::Reply(answer) => answer.clone(),
            Behaviour::Script(answers) => answers
                .lock()
                .ok()
                .and_then(|mut answers| answers.pop_front())
                .unwrap_or(Err(InferenceError::EmptyResponse)),
            Behaviour::Panic => panic!("scripted inference client panicked"),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Store whose every operation fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

fn unavailable() -> RepositoryError {
    RepositoryError::Task("store unavailable".to_string())
}

#[async_trait]
impl UserRepositoryTrait for FailingStore {
    async fn get_user(&self, _user_id: i64) -> Result<Option<UserRecord>, RepositoryError> {
        Err(unavailable())
    }

    async fn user_exists(&self, _user_id: i64) -> Result<bool, RepositoryError> {
        Err(unavailable())
    }

    async fn register_user(
        &self,
        _user: NewUser,
        _first_reading: NewReading,
    ) -> Result<(UserRecord, ReadingRecord), RepositoryError> {
        Err(unavailable())
    }
}

#[async_trait]
impl ReadingRepositoryTrait for FailingStore {
    async fn insert_reading(&self, _user_id: i64, _reading: NewReading) -> Result<ReadingRecord, RepositoryError> {
        Err(unavailable())
    }

    async fn list_readings(&self, _user_id: i64) -> Result<Vec<ReadingRecord>, RepositoryError> {
        Err(unavailable())
    }

    async fn record_visit(&self, _visit: VisitUpdate) -> Result<ReadingRecord, RepositoryError> {
        Err(unavailable())
    }
}

#[async_trait]
impl ReadingStore for FailingStore {
    async fn status(&self) -> Result<String, RepositoryError> {
        Err(unavailable())
    }
}

/// Notifier that keeps sent messages, optionally failing every send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        if self.fail {
            return Err(NotifierError::Transport("relay unreachable".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

/// Profile of the standard test user: 45, Male, English, no problems
pub fn test_user(user_id: i64) -> NewUser {
    NewUser {
        user_id,
        name: "Test User".to_string(),
        age: 45,
        gender: StoredGender::Male,
        language: "English".to_string(),
        problem: "none".to_string(),
    }
}

/// In-memory store holding the standard test user with one 120/80 reading
pub async fn registered_store(user_id: i64) -> Arc<dyn ReadingStore> {
    let store = InMemoryRepository::new();
    store
        .register_user(test_user(user_id), NewReading { systolic: 120, diastolic: 80 })
        .await
        .expect("registering the test user in an empty store");
    Arc::new(store)
}

/// Three ascending readings for a user, one minute apart
pub fn sample_history(user_id: i64) -> Vec<BloodPressureReading> {
    let start = Utc::now() - chrono::Duration::minutes(3);
    [(120, 80), (135, 85), (150, 95)]
        .into_iter()
        .enumerate()
        .map(|(i, (systolic, diastolic))| BloodPressureReading {
            id: i as i64 + 1,
            user_id,
            systolic,
            diastolic,
            recorded_at: start + chrono::Duration::minutes(i as i64),
        })
        .collect()
}
