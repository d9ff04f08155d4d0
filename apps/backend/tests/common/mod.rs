//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext wiring the real router to an in-memory upstream
//! - FakeUpstream, a scripted vocabulary API
//! - Helpers for driving sessions over HTTP
//!
//! No external services are required.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use serde_json::Value;

use learnflow_backend::{build_router, AppState};
use learnflow_core::{
    CollectionId, FlowError, PronunciationResult, Result, Task, Transport, WordOutcome,
};

/// Scripted stand-in for the vocabulary API.
pub struct FakeUpstream {
    pub tasks: Vec<Task>,
    pub fail_fetch: bool,
    /// The scorer accepts clips but never answers.
    pub hang_scoring: bool,
    pub pronunciation: std::result::Result<PronunciationResult, FlowError>,
    pub requested_word_ids: Mutex<Vec<Vec<i64>>>,
    pub submitted_clips: Mutex<Vec<(String, String, Vec<u8>)>>,
    pub outcomes: Mutex<Vec<(CollectionId, Vec<WordOutcome>)>>,
}

impl FakeUpstream {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            fail_fetch: false,
            hang_scoring: false,
            pronunciation: Ok(PronunciationResult {
                ok: true,
                points: 3.0,
                dtw: Some(101.5),
            }),
            requested_word_ids: Mutex::new(Vec::new()),
            submitted_clips: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn hanging_scorer(tasks: Vec<Task>) -> Self {
        Self {
            hang_scoring: true,
            ..Self::with_tasks(tasks)
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::with_tasks(Vec::new())
        }
    }
}

#[async_trait]
impl Transport for FakeUpstream {
    async fn fetch_tasks(&self, _collection_id: CollectionId, word_ids: &[i64]) -> Result<Vec<Task>> {
        self.requested_word_ids.lock().unwrap().push(word_ids.to_vec());
        if self.fail_fetch {
            return Err(FlowError::Transport("upstream returned 503".into()));
        }
        Ok(self.tasks.clone())
    }

    async fn fetch_repeat_tasks(&self, _collection_id: CollectionId) -> Result<Vec<Task>> {
        if self.fail_fetch {
            return Err(FlowError::Transport("upstream returned 503".into()));
        }
        Ok(self.tasks.clone())
    }

    async fn submit_pronunciation(
        &self,
        task_id: &str,
        word: &str,
        audio: Vec<u8>,
    ) -> Result<PronunciationResult> {
        self.submitted_clips
            .lock()
            .unwrap()
            .push((task_id.to_string(), word.to_string(), audio));
        if self.hang_scoring {
            std::future::pending::<()>().await;
        }
        self.pronunciation.clone()
    }

    async fn submit_outcomes(&self, collection_id: CollectionId, outcomes: &[WordOutcome]) -> Result<()> {
        self.outcomes
            .lock()
            .unwrap()
            .push((collection_id, outcomes.to_vec()));
        Ok(())
    }
}

/// Scoring deadline used by every test server.
pub const SCORING_TIMEOUT: Duration = Duration::from_millis(100);

/// Test context holding the fake upstream and the router built over it.
pub struct TestContext {
    pub upstream: Arc<FakeUpstream>,
    state: AppState,
    app: Router,
}

impl TestContext {
    pub fn new(upstream: FakeUpstream) -> Self {
        let upstream = Arc::new(upstream);
        let state = AppState::new(upstream.clone(), Some(7)).with_scoring_timeout(SCORING_TIMEOUT);
        Self {
            upstream,
            app: build_router(state.clone()),
            state,
        }
    }

    /// Number of sessions the server still holds.
    pub async fn live_sessions(&self) -> usize {
        self.state.sessions.len().await
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self::new(FakeUpstream::with_tasks(tasks))
    }

    /// Get a test server over the router.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.app.clone()).unwrap()
    }

    /// Wait for the background outcome report to land.
    pub async fn wait_for_outcomes(&self) -> Vec<(CollectionId, Vec<WordOutcome>)> {
        for _ in 0..50 {
            let outcomes = self.upstream.outcomes.lock().unwrap().clone();
            if !outcomes.is_empty() {
                return outcomes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Vec::new()
    }
}

/// Create a learn session and return its id and body.
pub async fn create_learn_session(server: &TestServer, word_ids: &[i64]) -> (String, Value) {
    let response = server
        .post("/api/sessions")
        .json(&fixtures::create_learn_request(5, word_ids))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["id"].as_str().unwrap().to_string();
    (id, body)
}

/// POST an action to a session and return the response body.
pub async fn act(server: &TestServer, id: &str, action: &str, body: Value) -> Value {
    let response = server
        .post(&format!("/api/sessions/{id}/{action}"))
        .json(&body)
        .await;
    response.assert_status_ok();
    response.json()
}

/// Position of `text` in a JSON string array.
pub fn position_of(items: &Value, text: &str) -> usize {
    items
        .as_array()
        .unwrap()
        .iter()
        .position(|v| v == text)
        .unwrap()
}
