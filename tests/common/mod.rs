//! Shared fixtures: an in-process mock backend and in-memory collaborators.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use zuno::app::LearningApp;
use zuno::auth::{AuthError, IdentityProvider};
use zuno::config::Config;
use zuno::goals::{GoalStore, GoalStoreError};
use zuno::models::*;

/// A canned response, optionally delayed.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
    pub delay_ms: u64,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            delay_ms: 0,
        }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            delay_ms: 0,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// One request as seen by the backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub struct MockState {
    requests: Mutex<Vec<Recorded>>,
    defaults: Mutex<HashMap<String, Reply>>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
}

/// The task/grading service, served on a random local port.
pub struct MockBackend {
    pub url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend failed");
        });

        let backend = Self {
            url: format!("http://{}", addr),
            state,
        };
        backend.reply("/daily-plan", Reply::ok(json!([])));
        backend.reply("/progress", Reply::ok(progress_json(0, 0, 0, 0.0, 0.0)));
        backend.reply(
            "/weekly-summary",
            Reply::ok(json!({ "mentor_summary_text": "Solid week." })),
        );
        backend.reply("/chat", Reply::ok(json!({ "response": "Happy to help." })));
        backend.reply(
            "/submit-task",
            Reply::ok(json!({ "score": 70, "ai_feedback": "Fine." })),
        );
        backend
    }

    /// Answer every request to `path` with `reply` once the queue is empty.
    pub fn reply(&self, path: &str, reply: Reply) {
        self.state
            .defaults
            .lock()
            .unwrap()
            .insert(path.to_string(), reply);
    }

    /// Answer the next request to `path` with `reply`.
    pub fn enqueue(&self, path: &str, reply: Reply) {
        self.state
            .queued
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    pub fn reset_requests(&self) {
        self.state.requests.lock().unwrap().clear();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let queued = state
        .queued
        .lock()
        .unwrap()
        .get_mut(&path)
        .and_then(VecDeque::pop_front);
    let reply = queued.or_else(|| state.defaults.lock().unwrap().get(&path).cloned());
    let Some(reply) = reply else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if reply.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(reply.delay_ms)).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body)).into_response()
}

pub fn task_json(id: i64, topic: &str, completed: bool) -> Value {
    json!({
        "id": id,
        "goal_id": 1,
        "subject": "Rust",
        "level": "Beginner",
        "topic": topic,
        "resource_link": "https://doc.rust-lang.org/book/",
        "task_description": format!("Study {}", topic),
        "is_completed": completed,
    })
}

pub fn progress_json(
    streak: u32,
    total: u32,
    completed: u32,
    percentage: f64,
    average: f64,
) -> Value {
    json!({
        "current_streak": streak,
        "total_tasks": total,
        "completed_tasks": completed,
        "completion_percentage": percentage,
        "average_score": average,
    })
}

pub fn live_session() -> Session {
    Session {
        user_id: Uuid::new_v4(),
        access_token: "token-abc".to_string(),
        refresh_token: Some("refresh-abc".to_string()),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

pub fn expired_session() -> Session {
    Session {
        expires_at: Utc::now() - chrono::Duration::minutes(5),
        ..live_session()
    }
}

/// Identity provider that always issues the same session.
pub struct StaticIdentity {
    session: Session,
    pub fail_refresh: AtomicBool,
    pub refreshes: AtomicUsize,
    pub sign_outs: AtomicUsize,
}

impl StaticIdentity {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            fail_refresh: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
            sign_outs: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, AuthError> {
        Ok(self.session.clone())
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<Option<Session>, AuthError> {
        Ok(Some(self.session.clone()))
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected {
                status: 400,
                message: "Invalid Refresh Token".to_string(),
            });
        }
        Ok(Session {
            access_token: "rotated".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            ..session.clone()
        })
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Goal table kept in memory.
#[derive(Default)]
pub struct MemoryGoalStore {
    goals: Mutex<Vec<Goal>>,
    pub fail_inserts: AtomicBool,
    /// Store the batch but answer as if nothing was echoed back.
    pub short_response: AtomicBool,
    pub batches: AtomicUsize,
}

impl MemoryGoalStore {
    pub fn goals(&self) -> Vec<Goal> {
        self.goals.lock().unwrap().clone()
    }

    pub fn seed(&self, session: &Session, subject: &str) {
        let mut goals = self.goals.lock().unwrap();
        let id = goals.len() as GoalId + 1;
        goals.push(Goal {
            id,
            user_id: session.user_id,
            subject: subject.to_string(),
            exam_or_skill: Some(DEFAULT_MASTERY_TARGET.to_string()),
            daily_time_minutes: 60,
            target_date: Utc::now().date_naive(),
            detected_level: Some(DEFAULT_DETECTED_LEVEL.to_string()),
        });
    }
}

#[async_trait]
impl GoalStore for MemoryGoalStore {
    async fn has_goals(&self, session: &Session) -> Result<bool, GoalStoreError> {
        Ok(self
            .goals
            .lock()
            .unwrap()
            .iter()
            .any(|g| g.user_id == session.user_id))
    }

    async fn insert_goals(
        &self,
        _session: &Session,
        goals: &[NewGoal],
    ) -> Result<Vec<Goal>, GoalStoreError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(GoalStoreError::Status {
                status: 500,
                body: "insert failed".to_string(),
            });
        }

        let mut stored = self.goals.lock().unwrap();
        let created: Vec<Goal> = goals
            .iter()
            .enumerate()
            .map(|(i, goal)| Goal {
                id: (stored.len() + i) as GoalId + 1,
                user_id: goal.user_id,
                subject: goal.subject.clone(),
                exam_or_skill: Some(goal.exam_or_skill.clone()),
                daily_time_minutes: goal.daily_time_minutes,
                target_date: goal.target_date,
                detected_level: Some(goal.detected_level.clone()),
            })
            .collect();
        stored.extend(created.iter().cloned());
        if self.short_response.load(Ordering::SeqCst) {
            return Err(GoalStoreError::Partial {
                submitted: goals.len(),
                returned: 0,
            });
        }
        Ok(created)
    }
}

/// An app wired to the mock backend and in-memory collaborators.
pub struct Harness {
    pub backend: MockBackend,
    pub identity: Arc<StaticIdentity>,
    pub goals: Arc<MemoryGoalStore>,
    pub app: LearningApp,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_session(live_session()).await
    }

    pub async fn with_session(session: Session) -> Self {
        Self::build(session, None).await
    }

    /// An app that resolves its session from `session_file`.
    pub async fn with_session_file(session: Session, session_file: std::path::PathBuf) -> Self {
        Self::build(session, Some(session_file)).await
    }

    async fn build(session: Session, session_file: Option<std::path::PathBuf>) -> Self {
        let backend = MockBackend::start().await;
        let identity = Arc::new(StaticIdentity::new(session));
        let goals = Arc::new(MemoryGoalStore::default());
        let config = Config {
            api_url: backend.url.clone(),
            ..Config::default()
        };
        let app = LearningApp::new(&config, identity.clone(), goals.clone(), session_file);
        Self {
            backend,
            identity,
            goals,
            app,
        }
    }

    /// Same as [`new`](Self::new), already signed in.
    pub async fn signed_in() -> Self {
        let harness = Self::new().await;
        harness
            .app
            .sign_in("learner@example.com", "secret")
            .await
            .expect("Sign in failed");
        harness
    }
}
