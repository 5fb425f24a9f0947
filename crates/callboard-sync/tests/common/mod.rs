//! In-memory fakes shared by the scenario tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use callboard_api::{ApiError, CallsApi};
use callboard_core::ids::{CallId, ConversationId, TenantId, UserId};
use callboard_core::retry::BackoffConfig;
use callboard_core::types::{
    Call, CallFilters, Conversation, ConversationFilters, ConversationStatus, DashboardStats, Page,
    PageRequest,
};
use callboard_session::{AuthEvent, LogoutReason, SessionError};
use callboard_sync::{
    CallStore, Connector, Credentials, NotificationCenter, RealtimeConfig, RealtimeSync,
    SessionHandle, Transport, TransportError,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot};

// ─────────────────────────────────────────────────────────────────────────────
// Event-stream server
// ─────────────────────────────────────────────────────────────────────────────

/// How the fake server treats one connection attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Refuse the socket.
    Refuse,
    /// Accept and answer the handshake with `authenticated`.
    Accept,
    /// Accept and answer the handshake with `authentication_error`.
    Reject,
}

/// Server end of one accepted connection.
pub struct ServerSide {
    /// Frames the client sent, handshake included.
    pub received: mpsc::UnboundedReceiver<String>,
    /// Push a frame to the client. Dropping it closes the connection.
    pub push: mpsc::UnboundedSender<String>,
}

impl ServerSide {
    /// Push an `{event, data}` frame.
    pub fn send(&self, event: &str, data: Value) {
        self.push
            .send(json!({ "event": event, "data": data }).to_string())
            .unwrap();
    }

    /// Push raw text.
    pub fn send_raw(&self, text: &str) {
        self.push.send(text.to_string()).unwrap();
    }

    /// Next frame the client sent, decoded.
    pub async fn next_frame(&mut self) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .unwrap()
            .unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

/// Scripted connector. Attempts beyond the script use `fallback`.
pub struct FakeConnector {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    attempts: AtomicUsize,
    tokens: Arc<Mutex<Vec<String>>>,
    accepted: mpsc::UnboundedSender<ServerSide>,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeConnector {
    /// Connector plus the stream of accepted server ends.
    pub fn new(
        script: impl IntoIterator<Item = Reply>,
        fallback: Reply,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerSide>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            attempts: AtomicUsize::new(0),
            tokens: Arc::new(Mutex::new(Vec::new())),
            accepted,
            hold: Mutex::new(None),
        });
        (connector, rx)
    }

    /// Park the next connection attempt until the returned sender fires.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock() = Some(rx);
        tx
    }

    /// Connection attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Access tokens presented in handshakes, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().take();
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        let reply = self.script.lock().pop_front().unwrap_or(self.fallback);
        if reply == Reply::Refuse {
            return Err(TransportError::ConnectionFailed("connection refused".into()));
        }
        let (to_server, received) = mpsc::unbounded_channel();
        let (push, from_server) = mpsc::unbounded_channel();
        let _ = self.accepted.send(ServerSide { received, push });
        Ok(Box::new(FakeTransport {
            reply,
            pending: VecDeque::new(),
            to_server,
            from_server,
            tokens: self.tokens.clone(),
        }))
    }
}

struct FakeTransport {
    reply: Reply,
    pending: VecDeque<String>,
    to_server: mpsc::UnboundedSender<String>,
    from_server: mpsc::UnboundedReceiver<String>,
    tokens: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let frame: Value = serde_json::from_str(&text).unwrap();
        if frame["event"] == "auth" {
            let token = frame["data"]["token"].as_str().unwrap_or_default();
            self.tokens.lock().push(token.to_string());
            let answer = match self.reply {
                Reply::Reject => json!({"event": "authentication_error", "data": {"message": "jwt expired"}}),
                _ => json!({"event": "authenticated", "data": {"tenantId": "t1"}}),
            };
            self.pending.push_back(answer.to_string());
        }
        self.to_server
            .send(text)
            .map_err(|_| TransportError::SendFailed("server gone".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if let Some(text) = self.pending.pop_front() {
            return Some(Ok(text));
        }
        self.from_server.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.from_server.close();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Session stub: renewals swap in `fresh-<n>` tokens or fail as scripted.
pub struct FakeSession {
    credentials: Mutex<Option<Credentials>>,
    events: broadcast::Sender<AuthEvent>,
    renew_failures: Mutex<VecDeque<bool>>,
    renewals: AtomicUsize,
}

impl FakeSession {
    /// Signed out.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            credentials: Mutex::new(None),
            events: broadcast::channel(16).0,
            renew_failures: Mutex::new(VecDeque::new()),
            renewals: AtomicUsize::new(0),
        })
    }

    /// Signed in with `stale-token`, without emitting an event.
    pub fn signed_in() -> Arc<Self> {
        let session = Self::new();
        *session.credentials.lock() = Some(Self::credentials_with("stale-token"));
        session
    }

    fn credentials_with(token: &str) -> Credentials {
        Credentials {
            access_token: token.into(),
            user_id: UserId::new("u1"),
            tenant_id: TenantId::new("t1"),
        }
    }

    /// Sign in and announce it.
    pub fn login(&self) {
        *self.credentials.lock() = Some(Self::credentials_with("stale-token"));
        let _ = self.events.send(AuthEvent::Authenticated {
            user_id: UserId::new("u1"),
            tenant_id: TenantId::new("t1"),
        });
    }

    /// Sign out and announce it.
    pub fn logout(&self) {
        *self.credentials.lock() = None;
        let _ = self.events.send(AuthEvent::LoggedOut {
            reason: LogoutReason::UserRequested,
        });
    }

    /// Make the next renewal fail.
    pub fn fail_next_renewal(&self) {
        self.renew_failures.lock().push_back(true);
    }

    /// Renewals requested so far.
    pub fn renewals(&self) -> usize {
        self.renewals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionHandle for FakeSession {
    fn credentials(&self) -> Option<Credentials> {
        self.credentials.lock().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn renew(&self) -> Result<(), SessionError> {
        let n = self.renewals.fetch_add(1, Ordering::SeqCst) + 1;
        if self.renew_failures.lock().pop_front().unwrap_or(false) {
            return Err(SessionError::Api(ApiError::Unauthorized));
        }
        let mut creds = self.credentials.lock();
        match creds.as_mut() {
            Some(c) => {
                c.access_token = format!("fresh-{n}");
                Ok(())
            }
            None => Err(SessionError::NotAuthenticated),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// REST
// ─────────────────────────────────────────────────────────────────────────────

/// REST stub serving fixed snapshots.
#[derive(Default)]
pub struct FakeCallsApi {
    /// Served by `list_conversations`.
    pub conversations: Mutex<Vec<Conversation>>,
    /// Served by `get_conversation`, by id.
    pub conversation_by_id: Mutex<Vec<Conversation>>,
    /// `get_conversation` calls.
    pub conversation_fetches: AtomicUsize,
}

#[async_trait]
impl CallsApi for FakeCallsApi {
    async fn list_calls(&self, _: &CallFilters, _: &PageRequest) -> Result<Page<Call>, ApiError> {
        Ok(Page::default())
    }

    async fn get_call(&self, _: &CallId) -> Result<Call, ApiError> {
        Err(ApiError::Network("not served".into()))
    }

    async fn list_conversations(
        &self,
        _: &ConversationFilters,
        _: &PageRequest,
    ) -> Result<Page<Conversation>, ApiError> {
        Ok(Page {
            items: self.conversations.lock().clone(),
            pagination: None,
        })
    }

    async fn get_conversation(&self, id: &ConversationId) -> Result<Conversation, ApiError> {
        let _ = self.conversation_fetches.fetch_add(1, Ordering::SeqCst);
        self.conversation_by_id
            .lock()
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Network("not served".into()))
    }

    async fn request_takeover(&self, _: &ConversationId) -> Result<(), ApiError> {
        Ok(())
    }

    async fn update_conversation_status(
        &self,
        _: &ConversationId,
        _: ConversationStatus,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn add_conversation_note(&self, _: &ConversationId, _: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        Ok(DashboardStats::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

/// Config with `max_attempts` and a 1s base delay.
pub fn config(max_attempts: u32) -> RealtimeConfig {
    RealtimeConfig {
        url: "ws://test/events".into(),
        backoff: BackoffConfig {
            max_attempts,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
        },
        handshake_timeout: Duration::from_secs(5),
        outbound_buffer: 8,
    }
}

/// Everything a scenario needs.
pub struct Harness {
    pub sync: RealtimeSync,
    pub store: Arc<CallStore>,
    pub api: Arc<FakeCallsApi>,
    pub notifications: Arc<NotificationCenter>,
}

/// Wait until `pred` holds for the connection status.
pub async fn wait_status(
    sync: &RealtimeSync,
    pred: impl FnMut(&callboard_sync::ConnectionStatus) -> bool,
) -> callboard_sync::ConnectionStatus {
    let mut rx = sync.watch_status();
    let status = tokio::time::timeout(Duration::from_secs(120), rx.wait_for(pred))
        .await
        .expect("status never reached")
        .unwrap();
    *status
}

/// Poll `cond` until it holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held");
}

/// Wire a synchronizer over the fakes.
pub fn harness(
    config: RealtimeConfig,
    connector: Arc<FakeConnector>,
    session: Arc<dyn SessionHandle>,
) -> Harness {
    let api = Arc::new(FakeCallsApi::default());
    let store = Arc::new(CallStore::new(api.clone()));
    let notifications = Arc::new(NotificationCenter::new());
    let sync = RealtimeSync::new(
        config,
        connector,
        session,
        store.clone(),
        notifications.clone(),
    );
    Harness {
        sync,
        store,
        api,
        notifications,
    }
}

pub fn call_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "tenantId": "t1",
        "fromNumber": "+15550001",
        "toNumber": "+15550002",
        "direction": "inbound",
        "status": status,
        "startTime": "2025-01-01T10:00:00Z",
        "createdAt": "2025-01-01T10:00:00Z",
        "updatedAt": "2025-01-01T10:00:00Z"
    })
}

pub fn conversation_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "callId": "call_1",
        "tenantId": "t1",
        "status": status,
        "startTime": "2025-01-01T10:00:00Z",
        "createdAt": "2025-01-01T10:00:00Z",
        "updatedAt": "2025-01-01T10:00:00Z"
    })
}

pub fn conversation(id: &str, status: &str) -> Conversation {
    serde_json::from_value(conversation_json(id, status)).unwrap()
}
