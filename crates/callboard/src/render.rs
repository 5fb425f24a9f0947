//! Plain-text rendering for terminal output.

use std::fmt::Write as _;

use callboard_core::types::{Call, Conversation, DashboardStats, PaginationMeta, User};
use callboard_sync::{Notification, NotificationLevel};
use chrono::{DateTime, Utc};

pub fn user(user: &User, expires_at: Option<DateTime<Utc>>) -> String {
    let mut out = format!(
        "{} <{}> tenant {}",
        user.display_name(),
        user.email,
        user.tenant_id
    );
    if let Some(at) = expires_at {
        let _ = write!(out, ", token expires {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    out
}

pub fn calls(calls: &[Call], pagination: Option<&PaginationMeta>) -> String {
    if calls.is_empty() {
        return "No calls.".to_string();
    }
    let mut out = String::new();
    for call in calls {
        let _ = writeln!(
            out,
            "{:<28} {:<10} {:<9} {:>7}  {} -> {}",
            call.id,
            call.status.as_str(),
            call.direction,
            call.duration_label(),
            call.from_number,
            call.to_number
        );
    }
    out.push_str(&footer(calls.len(), pagination));
    out
}

pub fn conversations(items: &[Conversation], pagination: Option<&PaginationMeta>) -> String {
    if items.is_empty() {
        return "No conversations.".to_string();
    }
    let mut out = String::new();
    for c in items {
        let takeover = if c.metadata.human_takeover_requested {
            "  [takeover]"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:<28} {:<9} {:<7} {:>3} msgs  {}{}",
            c.id,
            c.status.as_str(),
            c.priority.as_str(),
            c.messages.len(),
            c.subject.as_deref().unwrap_or("-"),
            takeover
        );
    }
    out.push_str(&footer(items.len(), pagination));
    out
}

fn footer(shown: usize, pagination: Option<&PaginationMeta>) -> String {
    match pagination {
        Some(p) => format!(
            "page {}/{} ({} total)",
            p.current_page, p.total_pages, p.total_count
        ),
        None => format!("{shown} shown"),
    }
}

pub fn stats(stats: &DashboardStats) -> String {
    let c = &stats.calls;
    let v = &stats.conversations;
    let p = &stats.phone_numbers;
    format!(
        "calls:          {} total, {} active, {} completed, {} missed, avg {:.0}s\n\
         conversations:  {} total, {} active, {} waiting, {} resolved, {} closed\n\
         ai handle rate: {:.1}%  escalation rate: {:.1}%\n\
         phone numbers:  {} total, {} active, {} available",
        c.total,
        c.active,
        c.completed,
        c.missed,
        c.average_duration,
        v.total,
        v.active,
        v.waiting,
        v.resolved,
        v.closed,
        v.ai_handle_rate * 100.0,
        v.escalation_rate * 100.0,
        p.total,
        p.active,
        p.available,
    )
}

pub fn notification(n: &Notification) -> String {
    let tag = match n.level {
        NotificationLevel::Info => "info",
        NotificationLevel::Success => " ok ",
        NotificationLevel::Warning => "warn",
        NotificationLevel::Error => "err ",
    };
    let time = n.created_at.format("%H:%M:%S");
    match &n.title {
        Some(title) => format!("{time} [{tag}] {title}: {}", n.message),
        None => format!("{time} [{tag}] {}", n.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, status: &str, duration: Option<u64>) -> Call {
        let mut value = json!({
            "id": id,
            "tenantId": "t1",
            "fromNumber": "+15550001",
            "toNumber": "+15550002",
            "direction": "inbound",
            "status": status,
            "startTime": "2025-01-01T10:00:00Z",
            "createdAt": "2025-01-01T10:00:00Z",
            "updatedAt": "2025-01-01T10:00:00Z"
        });
        if let Some(d) = duration {
            value["duration"] = json!(d);
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn call_rows_and_footer() {
        let out = calls(&[call("call_1", "completed", Some(75)), call("call_2", "ringing", None)], None);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("call_1"));
        assert!(lines[0].contains("completed"));
        assert!(lines[0].contains("+15550001 -> +15550002"));
        assert!(lines[1].contains("ringing"));
        assert_eq!(lines[2], "2 shown");
    }

    #[test]
    fn footer_uses_pagination() {
        let meta = PaginationMeta {
            current_page: 2,
            total_pages: 5,
            total_count: 93,
            limit: 20,
            has_next: true,
            has_previous: true,
        };
        let out = calls(&[call("call_1", "active", None)], Some(&meta));
        assert!(out.ends_with("page 2/5 (93 total)"));
    }

    #[test]
    fn empty_lists() {
        assert_eq!(calls(&[], None), "No calls.");
        assert_eq!(conversations(&[], None), "No conversations.");
    }

    #[test]
    fn conversation_takeover_marker() {
        let mut c: Conversation = serde_json::from_value(json!({
            "id": "conv_1",
            "callId": "call_1",
            "tenantId": "t1",
            "status": "active",
            "startTime": "2025-01-01T10:00:00Z",
            "createdAt": "2025-01-01T10:00:00Z",
            "updatedAt": "2025-01-01T10:00:00Z"
        }))
        .unwrap();
        assert!(!conversations(std::slice::from_ref(&c), None).contains("[takeover]"));
        c.mark_takeover_requested(Utc::now());
        assert!(conversations(&[c], None).contains("[takeover]"));
    }

    #[test]
    fn notification_with_and_without_title() {
        let n = Notification::warning("Connection lost");
        assert!(notification(&n).ends_with("[warn] Connection lost"));
        let n = Notification::info("Caller said hi").with_title("New message");
        assert!(notification(&n).ends_with("[info] New message: Caller said hi"));
    }

    #[test]
    fn stats_block() {
        let out = stats(&DashboardStats::default());
        assert_eq!(out.lines().count(), 4);
        assert!(out.starts_with("calls:"));
    }
}
