//! Testing utilities for the Taskflow workspace
//!
//! Transports that script, pause or break requests, plus record fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tf_client::storage::{write_json, MemoryStorage};
use tf_client::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use tf_client::{RequestOptions, Taskflow, SESSION_STORAGE_KEY};
use tf_core::{ProjectId, Session, Task, TaskId, TaskPriority, TaskStatus, User, UserId, UserRole};
use tf_mock::MockBackend;
use tokio::sync::Notify;
use tokio::time::Instant;

/// One request seen by a test transport
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: HttpRequest,
    pub at: Instant,
}

/// Replays queued outcomes in order and records every request
///
/// Once the queue is empty every request gets a 500.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response
    pub fn respond(&self, status: u16, body: Value) -> &Self {
        self.script.lock().push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue the same response `times` times
    pub fn respond_times(&self, times: usize, status: u16, body: Value) -> &Self {
        for _ in 0..times {
            self.respond(status, body.clone());
        }
        self
    }

    /// Queue a failure with no response
    pub fn fail(&self, error: TransportError) -> &Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Gaps between consecutive calls
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let calls = self.calls.lock();
        calls.windows(2).map(|w| w[1].at - w[0].at).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            request,
            at: Instant::now(),
        });
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(500, Value::Null)))
    }
}

/// Holds an armed request until released, then forwards it
#[derive(Debug)]
pub struct GatedTransport<T> {
    inner: T,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl<T: Transport> GatedTransport<T> {
    pub fn new(inner: T) -> Arc<Self> {
        Arc::new(Self {
            inner,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    /// Hold the next request
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until the armed request is being held
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held request through
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl<T: Transport> Transport for GatedTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.send(request).await
    }
}

/// Fails the next `n` requests with a connection error, then forwards
#[derive(Debug)]
pub struct FaultInjectingTransport<T> {
    inner: T,
    remaining: AtomicUsize,
}

impl<T: Transport> FaultInjectingTransport<T> {
    pub fn new(inner: T) -> Arc<Self> {
        Arc::new(Self {
            inner,
            remaining: AtomicUsize::new(0),
        })
    }

    /// Fail the next `n` requests
    pub fn fail_next(&self, n: usize) {
        self.remaining.store(n, Ordering::SeqCst);
    }

    pub fn pending_faults(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Transport> Transport for FaultInjectingTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let inject = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if inject {
            return Err(TransportError::Connect("injected fault".to_string()));
        }
        self.inner.send(request).await
    }
}

pub fn sample_user(role: UserRole) -> User {
    User {
        id: UserId::generate(),
        email: format!("{}@example.test", role.as_str()),
        name: format!("Test {}", role.as_str()),
        role,
        avatar_color: None,
    }
}

pub fn sample_session(role: UserRole) -> Session {
    Session::new(format!("token-{}", role.as_str()), sample_user(role))
}

pub fn sample_task(project_id: &ProjectId, title: &str, status: TaskStatus) -> Task {
    let now = Utc::now();
    Task {
        id: TaskId::generate(),
        project_id: project_id.clone(),
        title: title.to_string(),
        description: String::new(),
        status,
        priority: TaskPriority::Medium,
        due_date: None,
        assignee_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// Memory storage already holding a persisted session
pub fn storage_with_session(session: &Session) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    write_json(storage.as_ref(), SESSION_STORAGE_KEY, session);
    storage
}

/// Client wired to a fresh seeded mock backend, no retries
pub fn mock_app() -> (Taskflow, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::ephemeral());
    let app = Taskflow::with_transport(
        backend.clone(),
        RequestOptions::no_retry(),
        Arc::new(MemoryStorage::new()),
    );
    (app, backend)
}
