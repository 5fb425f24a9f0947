//! Synchronizer scenarios over an in-memory event stream.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use callboard_core::ids::{CallId, ConversationId};
use callboard_core::types::{CallStatus, ConversationStatus, PageRequest};
use callboard_sync::{ConnectionState, SessionGate};
use common::{
    FakeConnector, FakeSession, Reply, call_json, config, conversation, conversation_json,
    eventually, harness, wait_status,
};
use serde_json::json;

fn messages(h: &common::Harness) -> Vec<String> {
    h.notifications
        .recent()
        .into_iter()
        .map(|n| n.message)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn login_opens_and_logout_closes_without_reconnecting() {
    let (connector, _servers) = FakeConnector::new([], Reply::Accept);
    let release = connector.hold_next();
    let session = FakeSession::new();
    let h = harness(config(3), connector.clone(), session.clone());
    let _gate = SessionGate::new(session.clone(), h.sync.clone()).spawn();

    assert_eq!(h.sync.status().state, ConnectionState::Closed);
    session.login();
    let _ = wait_status(&h.sync, |s| s.state == ConnectionState::Connecting).await;
    release.send(()).unwrap();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;

    session.logout();
    let closed = wait_status(&h.sync, |s| s.state == ConnectionState::Closed).await;
    assert!(!closed.degraded);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(h.sync.status().state, ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn logout_clears_the_cache() {
    let (connector, _servers) = FakeConnector::new([], Reply::Accept);
    let session = FakeSession::new();
    let h = harness(config(3), connector, session.clone());
    let _gate = SessionGate::new(session.clone(), h.sync.clone()).spawn();

    session.login();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let _ = h.store.apply_conversation(conversation("c1", "active"));

    session.logout();
    let _ = wait_status(&h.sync, |s| s.state == ConnectionState::Closed).await;
    eventually(|| h.store.conversations().is_empty()).await;
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_exactly_n_failed_attempts() {
    let (connector, _servers) = FakeConnector::new([], Reply::Refuse);
    let h = harness(config(3), connector.clone(), FakeSession::signed_in());
    let started = tokio::time::Instant::now();

    h.sync.connect();
    let status = wait_status(&h.sync, |s| s.degraded).await;
    assert_eq!(status.state, ConnectionState::Closed);
    assert_eq!(connector.attempts(), 3);
    // 1s then 2s between the three attempts
    assert_eq!(started.elapsed(), Duration::from_secs(3));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 3);
    assert!(messages(&h).contains(&"Failed to connect to real-time updates".to_string()));
}

#[tokio::test(start_paused = true)]
async fn dropped_link_reconnects_within_budget() {
    let (connector, mut servers) = FakeConnector::new([Reply::Accept], Reply::Refuse);
    let h = harness(config(2), connector.clone(), FakeSession::signed_in());

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    drop(servers.recv().await.unwrap());

    let status = wait_status(&h.sync, |s| s.degraded).await;
    assert_eq!(status.state, ConnectionState::Closed);
    assert_eq!(connector.attempts(), 3);

    let seen = messages(&h);
    assert!(seen.contains(&"Connection lost. Attempting to reconnect...".to_string()));
    assert!(seen.contains(&"Failed to reconnect to real-time updates".to_string()));
}

#[tokio::test(start_paused = true)]
async fn dropped_link_recovers() {
    let (connector, mut servers) =
        FakeConnector::new([Reply::Accept, Reply::Refuse], Reply::Accept);
    let h = harness(config(5), connector.clone(), FakeSession::signed_in());

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    drop(servers.recv().await.unwrap());

    let _ = wait_status(&h.sync, |s| s.state == ConnectionState::Reconnecting { attempt: 2 }).await;
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    assert_eq!(connector.attempts(), 3);
    assert!(messages(&h).contains(&"Reconnected to real-time updates".to_string()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Handshake
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rejected_handshake_renews_and_retries_once() {
    let (connector, _servers) = FakeConnector::new([Reply::Reject], Reply::Accept);
    let session = FakeSession::signed_in();
    let h = harness(config(3), connector.clone(), session.clone());

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    assert_eq!(session.renewals(), 1);
    assert_eq!(connector.tokens(), vec!["stale-token", "fresh-1"]);
}

#[tokio::test(start_paused = true)]
async fn second_rejection_closes() {
    let (connector, _servers) = FakeConnector::new([], Reply::Reject);
    let session = FakeSession::signed_in();
    let h = harness(config(3), connector.clone(), session.clone());

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.state == ConnectionState::Closed).await;
    assert_eq!(connector.attempts(), 2);
    assert_eq!(session.renewals(), 1);
    assert!(messages(&h).contains(&"Authentication failed for real-time updates".to_string()));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_renewal_closes() {
    let (connector, _servers) = FakeConnector::new([Reply::Reject], Reply::Accept);
    let session = FakeSession::signed_in();
    session.fail_next_renewal();
    let h = harness(config(3), connector.clone(), session.clone());

    h.sync.connect();
    let status = wait_status(&h.sync, |s| s.state == ConnectionState::Closed).await;
    assert!(!status.degraded);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn revoked_credential_on_open_link_renews_and_reconnects() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let session = FakeSession::signed_in();
    let h = harness(config(3), connector.clone(), session.clone());

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let server = servers.recv().await.unwrap();
    server.send("authentication_error", json!({"message": "token revoked"}));

    let second = servers.recv().await.unwrap();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    assert_eq!(connector.attempts(), 2);
    assert_eq!(connector.tokens(), vec!["stale-token", "fresh-1"]);
    drop(second);
}

#[tokio::test(start_paused = true)]
async fn repeated_revocation_gives_up_within_budget() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let session = FakeSession::signed_in();
    let h = harness(config(3), connector.clone(), session.clone());
    let started = tokio::time::Instant::now();

    h.sync.connect();
    let mut accepted = Vec::new();
    let status = loop {
        tokio::select! {
            server = servers.recv() => {
                let server = server.unwrap();
                server.send("authentication_error", json!({"message": "tenant suspended"}));
                accepted.push(server);
                assert!(accepted.len() <= 3, "revoked link kept reconnecting");
            }
            status = wait_status(&h.sync, |s| s.degraded) => break status,
        }
    };

    assert_eq!(status.state, ConnectionState::Closed);
    assert_eq!(connector.attempts(), 3);
    // No renewal once the budget is spent
    assert_eq!(session.renewals(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(3));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 3);
    assert!(messages(&h).contains(&"Failed to reconnect to real-time updates".to_string()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Event application
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn event_overrides_older_snapshot() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let h = harness(config(3), connector, FakeSession::signed_in());
    h.api.conversations.lock().push(conversation("c1", "waiting"));
    let _ = h.store.fetch_conversations(PageRequest::default()).await.unwrap();

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let server = servers.recv().await.unwrap();
    server.send(
        "conversation:updated",
        json!({"conversation": conversation_json("c1", "active")}),
    );

    let id = ConversationId::new("c1");
    eventually(|| h.store.conversation(&id).unwrap().status == ConversationStatus::Active).await;
    assert_eq!(h.store.conversations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn back_to_back_updates_and_malformed_frames() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let h = harness(config(3), connector.clone(), FakeSession::signed_in());

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let server = servers.recv().await.unwrap();

    server.send("call:updated", json!({"call": call_json("call_1", "active")}));
    server.send_raw("{not json");
    server.send("call:updated", json!({"call": {"status": "completed"}}));
    server.send("call:updated", json!({"call": call_json("call_1", "completed")}));

    let id = CallId::new("call_1");
    eventually(|| {
        h.store
            .call(&id)
            .is_some_and(|c| c.status == CallStatus::Completed)
    })
    .await;
    assert_eq!(h.store.calls().len(), 1);
    assert!(h.sync.status().is_open());
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn streamed_message_appends_then_refetches() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let h = harness(config(3), connector, FakeSession::signed_in());
    let _ = h.store.apply_conversation(conversation("c1", "active"));
    h.api
        .conversation_by_id
        .lock()
        .push(conversation("c1", "escalated"));

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let server = servers.recv().await.unwrap();
    server.send(
        "conversation:message",
        json!({
            "conversationId": "c1",
            "message": {
                "id": "m1",
                "conversationId": "c1",
                "sender": "caller",
                "content": "Can I speak to someone?",
                "timestamp": "2025-01-01T10:01:00Z"
            }
        }),
    );

    eventually(|| h.api.conversation_fetches.load(Ordering::SeqCst) == 1).await;
    let id = ConversationId::new("c1");
    eventually(|| h.store.conversation(&id).unwrap().status == ConversationStatus::Escalated).await;
    assert!(messages(&h).contains(&"New message in conversation".to_string()));
}

#[tokio::test(start_paused = true)]
async fn takeover_event_sets_flag() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let h = harness(config(3), connector, FakeSession::signed_in());
    let _ = h.store.apply_conversation(conversation("c1", "active"));

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let server = servers.recv().await.unwrap();
    server.send("conversation:takeover_requested", json!({"conversationId": "c1"}));

    let id = ConversationId::new("c1");
    eventually(|| {
        h.store
            .conversation(&id)
            .unwrap()
            .metadata
            .human_takeover_requested
    })
    .await;
    assert!(messages(&h).contains(&"Manual takeover requested for conversation".to_string()));
}

#[tokio::test(start_paused = true)]
async fn realtime_disabled_ignores_events() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let h = harness(config(3), connector, FakeSession::signed_in());
    h.store.set_realtime_enabled(false);

    h.sync.connect();
    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    let server = servers.recv().await.unwrap();
    server.send("call:created", json!({"call": call_json("call_9", "ringing")}));
    server.send("system:maintenance", json!({"message": "Down at noon"}));

    eventually(|| messages(&h).contains(&"Down at noon".to_string())).await;
    assert!(h.store.calls().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Rooms
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rooms_are_joined_on_open_and_rejoined_after_reconnect() {
    let (connector, mut servers) = FakeConnector::new([], Reply::Accept);
    let release = connector.hold_next();
    let h = harness(config(3), connector, FakeSession::signed_in());

    h.sync.connect();
    h.sync.join_conversation(ConversationId::new("c1"));
    release.send(()).unwrap();

    let mut server = servers.recv().await.unwrap();
    assert_eq!(server.next_frame().await["event"], "auth");
    let join = server.next_frame().await;
    assert_eq!(join["event"], "join:conversation");
    assert_eq!(join["data"]["conversationId"], "c1");

    let _ = wait_status(&h.sync, |s| s.is_open()).await;
    h.sync.join_call(CallId::new("call_1"));
    let join = server.next_frame().await;
    assert_eq!(join["event"], "join:call");
    assert_eq!(join["data"]["callId"], "call_1");

    h.sync.leave_call(CallId::new("call_1"));
    assert_eq!(server.next_frame().await["event"], "leave:call");

    drop(server);
    let mut server = servers.recv().await.unwrap();
    assert_eq!(server.next_frame().await["event"], "auth");
    let rejoin = server.next_frame().await;
    assert_eq!(rejoin["event"], "join:conversation");
    assert_eq!(rejoin["data"]["conversationId"], "c1");
}
