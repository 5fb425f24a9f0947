//! Real-time synchronizer.
//!
//! Owns at most one connection task ("link"). The link connects, performs the
//! authentication handshake, then pumps inbound events into the
//! [`CallStore`] and outbound room requests onto the socket. Transport
//! failures move it through `Reconnecting { attempt }` with exponential
//! backoff until the attempt budget is spent, after which the status settles
//! on closed-and-degraded and the link ends. A rejected handshake triggers one
//! credential renewal and one more handshake before the link gives up. A
//! credential revoked on an open link is renewed before reconnecting; if the
//! link delivered no event first, the revocation counts as a failed attempt.
//!
//! [`RealtimeSync::disconnect`] cancels the link and publishes `Closed`
//! immediately. Status updates from a cancelled link are discarded, so no
//! transition can follow an explicit disconnect.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use callboard_core::ids::{CallId, ConversationId};
use callboard_core::retry::BackoffConfig;
use callboard_core::types::{CallStatus, MessageSender};
use callboard_settings::RealtimeSettings;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::errors::TransportError;
use crate::notify::{Notification, Notifier};
use crate::protocol::{self, InboundEvent, OutboundMessage};
use crate::session::SessionHandle;
use crate::status::{ConnectionState, ConnectionStatus};
use crate::store::CallStore;
use crate::transport::{Connector, Transport};

/// Connection parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Event-stream URL.
    pub url: String,
    /// Attempt budget and retry delays.
    pub backoff: BackoffConfig,
    /// Time allowed for the server to answer the handshake.
    pub handshake_timeout: Duration,
    /// Capacity of the outbound control-message queue.
    pub outbound_buffer: usize,
}

impl RealtimeConfig {
    /// From loaded settings.
    pub fn from_settings(settings: &RealtimeSettings) -> Self {
        Self {
            url: settings.socket_url.clone(),
            backoff: settings.backoff(),
            handshake_timeout: settings.handshake_timeout(),
            outbound_buffer: settings.outbound_buffer,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::from_settings(&RealtimeSettings::default())
    }
}

/// A narrower server-side subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Room {
    Call(CallId),
    Conversation(ConversationId),
}

impl Room {
    fn join(&self) -> OutboundMessage {
        match self {
            Self::Call(id) => OutboundMessage::JoinCall(id.clone()),
            Self::Conversation(id) => OutboundMessage::JoinConversation(id.clone()),
        }
    }

    fn leave(&self) -> OutboundMessage {
        match self {
            Self::Call(id) => OutboundMessage::LeaveCall(id.clone()),
            Self::Conversation(id) => OutboundMessage::LeaveConversation(id.clone()),
        }
    }
}

struct Link {
    id: u64,
    cancel: CancellationToken,
    outbound: mpsc::Sender<OutboundMessage>,
    _task: JoinHandle<()>,
}

/// Why one connection attempt did not produce an open link.
#[derive(Debug)]
enum AttemptError {
    Transport(TransportError),
    NoSession,
    Rejected(String),
    RenewalFailed,
}

/// Why an open link stopped.
enum LinkEnd {
    Cancelled,
    Dropped(String),
    Revoked(String),
}

struct SyncInner {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    session: Arc<dyn SessionHandle>,
    store: Arc<CallStore>,
    notifier: Arc<dyn Notifier>,
    status: watch::Sender<ConnectionStatus>,
    link: Mutex<Option<Link>>,
    next_link: AtomicU64,
    rooms: Mutex<HashSet<Room>>,
}

/// Keeps the [`CallStore`] in step with server-side changes.
#[derive(Clone)]
pub struct RealtimeSync {
    inner: Arc<SyncInner>,
}

impl std::fmt::Debug for RealtimeSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSync")
            .field("url", &self.inner.config.url)
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}

impl RealtimeSync {
    /// Synchronizer writing into `store`. Nothing connects until
    /// [`connect`](Self::connect).
    pub fn new(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        session: Arc<dyn SessionHandle>,
        store: Arc<CallStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            inner: Arc::new(SyncInner {
                config,
                connector,
                session,
                store,
                notifier,
                status,
                link: Mutex::new(None),
                next_link: AtomicU64::new(0),
                rooms: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Observe connection status changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// The store this synchronizer writes into.
    pub fn store(&self) -> &Arc<CallStore> {
        &self.inner.store
    }

    /// Start connecting. No-op while a link is already running.
    pub fn connect(&self) {
        let mut slot = self.inner.link.lock();
        if slot.is_some() {
            debug!("real-time link already running");
            return;
        }
        let id = self.inner.next_link.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let (outbound, rx) = mpsc::channel(self.inner.config.outbound_buffer.max(1));
        let _ = self
            .inner
            .status
            .send_replace(ConnectionStatus::new(ConnectionState::Connecting));
        info!(link = id, url = %self.inner.config.url, "opening real-time link");
        let task = tokio::spawn(run_link(self.inner.clone(), id, cancel.clone(), rx));
        *slot = Some(Link {
            id,
            cancel,
            outbound,
            _task: task,
        });
    }

    /// Tear down the link and publish `Closed` immediately. No reconnection
    /// follows. Room subscriptions are forgotten.
    pub fn disconnect(&self) {
        let link = self.inner.link.lock().take();
        if let Some(link) = link {
            info!(link = link.id, "closing real-time link");
            link.cancel.cancel();
        }
        self.inner.rooms.lock().clear();
        let _ = self.inner.status.send_replace(ConnectionStatus::default());
    }

    /// Subscribe to events scoped to one call.
    pub fn join_call(&self, id: CallId) {
        self.join(Room::Call(id));
    }

    /// Drop the call-scoped subscription.
    pub fn leave_call(&self, id: CallId) {
        self.leave(Room::Call(id));
    }

    /// Subscribe to events scoped to one conversation.
    pub fn join_conversation(&self, id: ConversationId) {
        self.join(Room::Conversation(id));
    }

    /// Drop the conversation-scoped subscription.
    pub fn leave_conversation(&self, id: ConversationId) {
        self.leave(Room::Conversation(id));
    }

    fn join(&self, room: Room) {
        let message = room.join();
        if self.inner.rooms.lock().insert(room) {
            self.inner.send_if_open(message);
        }
    }

    fn leave(&self, room: Room) {
        let message = room.leave();
        if self.inner.rooms.lock().remove(&room) {
            self.inner.send_if_open(message);
        }
    }
}

impl SyncInner {
    /// Publish `status` if link `id` is still current.
    fn publish(&self, id: u64, status: ConnectionStatus) {
        let slot = self.link.lock();
        if slot.as_ref().is_some_and(|l| l.id == id) {
            let _ = self.status.send_replace(status);
        }
    }

    /// End link `id` with a final status if it is still current.
    fn finish(&self, id: u64, status: ConnectionStatus) -> bool {
        let mut slot = self.link.lock();
        if slot.as_ref().is_some_and(|l| l.id == id) {
            *slot = None;
            let _ = self.status.send_replace(status);
            true
        } else {
            false
        }
    }

    /// Fire-and-forget a control message. Dropped when not open or the
    /// queue is full; rooms are re-joined on every open anyway.
    fn send_if_open(&self, message: OutboundMessage) {
        if !self.status.borrow().is_open() {
            debug!(event = message.name(), "not connected, deferring room request");
            return;
        }
        let slot = self.link.lock();
        let Some(link) = slot.as_ref() else {
            return;
        };
        if let Err(e) = link.outbound.try_send(message) {
            warn!(error = %e, "outbound queue full, dropping room request");
        }
    }

    fn rooms_snapshot(&self) -> Vec<Room> {
        self.rooms.lock().iter().cloned().collect()
    }

    // ── Handshake ───────────────────────────────────────────────────────

    /// Connect and authenticate, renewing the credential and retrying once
    /// if the server rejects it.
    async fn open_authenticated(&self) -> Result<Box<dyn Transport>, AttemptError> {
        match self.handshake().await {
            Err(AttemptError::Rejected(reason)) => {
                warn!(%reason, "handshake rejected, renewing credential");
                if let Err(e) = self.session.renew().await {
                    warn!(error = %e, "credential renewal failed");
                    return Err(AttemptError::RenewalFailed);
                }
                self.handshake().await
            }
            other => other,
        }
    }

    #[instrument(skip_all, fields(url = %self.config.url))]
    async fn handshake(&self) -> Result<Box<dyn Transport>, AttemptError> {
        let creds = self.session.credentials().ok_or(AttemptError::NoSession)?;
        let mut transport = self
            .connector
            .connect(&self.config.url)
            .await
            .map_err(AttemptError::Transport)?;

        let auth = OutboundMessage::Auth {
            token: creds.access_token,
            tenant_id: creds.tenant_id,
            user_id: creds.user_id,
        };
        if let Err(e) = transport.send_text(auth.encode()).await {
            transport.close().await;
            return Err(AttemptError::Transport(e));
        }

        let ack =
            tokio::time::timeout(self.config.handshake_timeout, await_ack(transport.as_mut())).await;
        match ack {
            Ok(Ok(())) => Ok(transport),
            Ok(Err(e)) => {
                transport.close().await;
                Err(e)
            }
            Err(_) => {
                transport.close().await;
                Err(AttemptError::Transport(TransportError::HandshakeTimeout))
            }
        }
    }

    // ── Open link ───────────────────────────────────────────────────────

    async fn pump(
        &self,
        transport: &mut dyn Transport,
        cancel: &CancellationToken,
        outbound: &mut mpsc::Receiver<OutboundMessage>,
        delivered: &mut u64,
    ) -> LinkEnd {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    transport.close().await;
                    return LinkEnd::Cancelled;
                }
                Some(message) = outbound.recv() => {
                    debug!(event = message.name(), "sending control message");
                    if let Err(e) = transport.send_text(message.encode()).await {
                        return LinkEnd::Dropped(e.to_string());
                    }
                }
                frame = transport.recv() => match frame {
                    None => return LinkEnd::Dropped("closed by server".into()),
                    Some(Err(e)) => return LinkEnd::Dropped(e.to_string()),
                    Some(Ok(text)) => match protocol::decode(&text) {
                        Ok(InboundEvent::AuthenticationError { message }) => {
                            return LinkEnd::Revoked(message);
                        }
                        Ok(event) => {
                            if !matches!(event, InboundEvent::Authenticated { .. }) {
                                *delivered += 1;
                            }
                            self.dispatch(event);
                        }
                        Err(e) => warn!(error = %e, "dropping malformed event"),
                    },
                },
            }
        }
    }

    async fn rejoin_rooms(&self, transport: &mut dyn Transport) -> Result<(), TransportError> {
        for room in self.rooms_snapshot() {
            let message = room.join();
            debug!(event = message.name(), "re-joining room");
            transport.send_text(message.encode()).await?;
        }
        Ok(())
    }

    /// Apply one event: the cache write happens first and synchronously,
    /// notifications never block it.
    fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::CallCreated(call) => {
                let message = format!("New {} call from {}", call.direction, call.from_number);
                let _ = self.store.apply_call(call);
                self.notify(Notification::info(message).with_title("New Call"));
            }
            InboundEvent::CallUpdated(call) => {
                let completed = (call.status == CallStatus::Completed)
                    .then(|| format!("Call ended after {}", call.duration_label()));
                let _ = self.store.apply_call(call);
                if let Some(message) = completed {
                    self.notify(Notification::info(message).with_title("Call Completed"));
                }
            }
            InboundEvent::CallEnded(call) => {
                let _ = self.store.apply_call(call);
            }
            InboundEvent::ConversationCreated(conversation) => {
                let _ = self.store.apply_conversation(conversation);
                self.notify(
                    Notification::info("New conversation started").with_title("New Conversation"),
                );
            }
            InboundEvent::ConversationUpdated(conversation) => {
                let _ = self.store.apply_conversation(conversation);
            }
            InboundEvent::ConversationMessage {
                conversation_id,
                message,
            } => {
                let from_caller = message.sender == MessageSender::Caller;
                let _ = self.store.append_message(&conversation_id, message);
                self.refetch_conversation(conversation_id);
                if from_caller {
                    self.notify(
                        Notification::info("New message in conversation").with_title("New Message"),
                    );
                }
            }
            InboundEvent::TakeoverRequested { conversation_id } => {
                let at = self.store.now();
                let _ = self.store.mark_takeover_requested(&conversation_id, at);
                self.notify(
                    Notification::warning("Manual takeover requested for conversation")
                        .with_title("Takeover Request"),
                );
            }
            InboundEvent::HumanJoined { conversation_id } => {
                debug!(?conversation_id, "human agent joined");
                self.notify(
                    Notification::success("Human agent has joined the conversation")
                        .with_title("Agent Joined"),
                );
            }
            InboundEvent::SystemNotification {
                level,
                title,
                message,
            } => {
                let mut n = Notification::new(level, message);
                n.title = title;
                self.notify(n);
            }
            InboundEvent::SystemMaintenance { message } => {
                self.notify(Notification::warning(message).with_title("System Maintenance"));
            }
            InboundEvent::SystemUpdate { requires_reload } => {
                if requires_reload {
                    self.notify(
                        Notification::info("A system update is available. Please refresh the page.")
                            .with_title("System Update"),
                    );
                }
            }
            InboundEvent::PhoneProvisioned { number } => {
                self.notify(
                    Notification::success(format!("Phone number {number} has been provisioned"))
                        .with_title("Number Provisioned"),
                );
            }
            InboundEvent::PhoneStatusChanged(data) => {
                debug!(%data, "phone number status changed");
            }
            InboundEvent::Authenticated { .. } | InboundEvent::AuthenticationError { .. } => {
                debug!("handshake reply outside handshake, ignoring");
            }
            InboundEvent::Unknown(name) => {
                debug!(event = %name, "ignoring unknown event");
            }
        }
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Pull the authoritative copy after a streamed message, off the
    /// delivery path.
    fn refetch_conversation(&self, id: ConversationId) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        drop(handle.spawn(async move {
            if let Err(e) = store.fetch_conversation(&id).await {
                debug!(conversation_id = %id, error = %e, "conversation re-fetch failed");
            }
        }));
    }
}

/// Wait for `authenticated` or `authentication_error`.
async fn await_ack(transport: &mut dyn Transport) -> Result<(), AttemptError> {
    loop {
        match transport.recv().await {
            None => return Err(AttemptError::Transport(TransportError::Closed)),
            Some(Err(e)) => return Err(AttemptError::Transport(e)),
            Some(Ok(text)) => match protocol::decode(&text) {
                Ok(InboundEvent::Authenticated { tenant_id }) => {
                    debug!(?tenant_id, "handshake accepted");
                    return Ok(());
                }
                Ok(InboundEvent::AuthenticationError { message }) => {
                    return Err(AttemptError::Rejected(message));
                }
                Ok(other) => debug!(event = other.name(), "event before handshake reply, ignoring"),
                Err(e) => warn!(error = %e, "malformed frame during handshake"),
            },
        }
    }
}

/// Connection task: connect, pump, reconnect with backoff, give up.
async fn run_link(
    inner: Arc<SyncInner>,
    id: u64,
    cancel: CancellationToken,
    mut outbound: mpsc::Receiver<OutboundMessage>,
) {
    let backoff = inner.config.backoff.clone();
    // Failed attempts and backoff sleeps in the current sequence. A sequence
    // starts at connect or when an open link drops. A link revoked before it
    // delivered anything continues the sequence it opened in.
    let mut failures: u32 = 0;
    let mut retries: u32 = 0;
    let mut reconnecting = false;
    let mut ever_opened = false;

    loop {
        if reconnecting {
            if backoff.is_exhausted(failures) {
                warn!(link = id, failures, "giving up on real-time link");
                if inner.finish(id, ConnectionStatus::gave_up()) {
                    let message = if ever_opened {
                        "Failed to reconnect to real-time updates"
                    } else {
                        "Failed to connect to real-time updates"
                    };
                    inner.notify(Notification::error(message).with_title("Connection Failed"));
                }
                return;
            }
            let attempt = failures + 1;
            inner.publish(
                id,
                ConnectionStatus::new(ConnectionState::Reconnecting { attempt }),
            );
            retries += 1;
            let delay = backoff.delay_after(retries);
            debug!(link = id, attempt, ?delay, "waiting before reconnect");
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }

        let attempt = tokio::select! {
            () = cancel.cancelled() => return,
            result = inner.open_authenticated() => result,
        };

        match attempt {
            Ok(mut transport) => {
                let resumed = ever_opened;
                let (prior_failures, prior_retries) = (failures, retries);
                failures = 0;
                retries = 0;
                reconnecting = false;
                ever_opened = true;
                inner.publish(id, ConnectionStatus::new(ConnectionState::Open));
                info!(link = id, "real-time link open");
                inner.notify(if resumed {
                    Notification::success("Reconnected to real-time updates")
                } else {
                    Notification::success("Connected to real-time updates")
                });

                let mut delivered = 0;
                let end = match inner.rejoin_rooms(transport.as_mut()).await {
                    Ok(()) => {
                        inner
                            .pump(transport.as_mut(), &cancel, &mut outbound, &mut delivered)
                            .await
                    }
                    Err(e) => LinkEnd::Dropped(e.to_string()),
                };
                match end {
                    LinkEnd::Cancelled => return,
                    LinkEnd::Dropped(reason) => {
                        warn!(link = id, %reason, "real-time link lost");
                        transport.close().await;
                        inner.notify(Notification::warning(
                            "Connection lost. Attempting to reconnect...",
                        ));
                        reconnecting = true;
                    }
                    LinkEnd::Revoked(reason) => {
                        warn!(link = id, %reason, delivered, "credential revoked on open link");
                        transport.close().await;
                        if delivered == 0 {
                            failures = prior_failures;
                            retries = prior_retries;
                        }
                        failures += 1;
                        reconnecting = true;
                        if backoff.is_exhausted(failures) {
                            continue;
                        }
                        if let Err(e) = inner.session.renew().await {
                            warn!(link = id, error = %e, "credential renewal failed");
                            if inner.finish(id, ConnectionStatus::default()) {
                                inner.notify(Notification::error(
                                    "Authentication failed for real-time updates",
                                ));
                            }
                            return;
                        }
                    }
                }
            }
            Err(AttemptError::Transport(e)) => {
                failures += 1;
                warn!(link = id, failures, error = %e, "real-time connection attempt failed");
                reconnecting = true;
            }
            Err(AttemptError::NoSession) => {
                debug!(link = id, "no session, closing real-time link");
                let _ = inner.finish(id, ConnectionStatus::default());
                return;
            }
            Err(AttemptError::Rejected(reason)) => {
                warn!(link = id, %reason, "handshake rejected after renewal");
                if inner.finish(id, ConnectionStatus::gave_up()) {
                    inner.notify(Notification::error(
                        "Authentication failed for real-time updates",
                    ));
                }
                return;
            }
            Err(AttemptError::RenewalFailed) => {
                if inner.finish(id, ConnectionStatus::default()) {
                    inner.notify(Notification::error(
                        "Authentication failed for real-time updates",
                    ));
                }
                return;
            }
        }
    }
}
