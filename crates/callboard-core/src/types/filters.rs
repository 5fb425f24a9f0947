//! List filters for calls and conversations.
//!
//! A filter set is merged field-by-field: a patch only overrides the fields
//! it sets. [`to_query`](CallFilters::to_query) renders the set as query
//! pairs, with multi-valued fields comma-joined.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::calls::{CallDirection, CallStatus, ConversationPriority, ConversationStatus};

fn join<T>(values: &[T], name: impl Fn(&T) -> &'static str) -> String {
    values.iter().map(name).collect::<Vec<_>>().join(",")
}

fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Filters for the call list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallFilters {
    /// Statuses to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<CallStatus>>,
    /// Directions to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Vec<CallDirection>>,
    /// Earliest start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    /// Latest start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Number substring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Minimum duration, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u64>,
    /// Maximum duration, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
    /// Only calls with a recording.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_recording: Option<bool>,
    /// Only calls with a conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_conversation: Option<bool>,
}

impl CallFilters {
    /// Overlay every field `patch` sets.
    pub fn merge(&mut self, patch: CallFilters) {
        macro_rules! take {
            ($($f:ident),*) => { $( if patch.$f.is_some() { self.$f = patch.$f; } )* };
        }
        take!(
            status,
            direction,
            date_from,
            date_to,
            phone_number,
            min_duration,
            max_duration,
            has_recording,
            has_conversation
        );
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query-string pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(v) = &self.status {
            q.push(("status".into(), join(v, |s| s.as_str())));
        }
        if let Some(v) = &self.direction {
            q.push((
                "direction".into(),
                join(v, |d| match d {
                    CallDirection::Inbound => "inbound",
                    CallDirection::Outbound => "outbound",
                }),
            ));
        }
        if let Some(v) = self.date_from {
            q.push(("dateFrom".into(), ts(v)));
        }
        if let Some(v) = self.date_to {
            q.push(("dateTo".into(), ts(v)));
        }
        if let Some(v) = &self.phone_number {
            q.push(("phoneNumber".into(), v.clone()));
        }
        if let Some(v) = self.min_duration {
            q.push(("minDuration".into(), v.to_string()));
        }
        if let Some(v) = self.max_duration {
            q.push(("maxDuration".into(), v.to_string()));
        }
        if let Some(v) = self.has_recording {
            q.push(("hasRecording".into(), v.to_string()));
        }
        if let Some(v) = self.has_conversation {
            q.push(("hasConversation".into(), v.to_string()));
        }
        q
    }
}

/// Filters for the conversation list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationFilters {
    /// Statuses to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<ConversationStatus>>,
    /// Priorities to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Vec<ConversationPriority>>,
    /// Assigned operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Earliest start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    /// Latest start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Required tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Only AI-handled conversations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_handled: Option<bool>,
    /// Only conversations that booked an appointment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_appointment: Option<bool>,
}

impl ConversationFilters {
    /// Overlay every field `patch` sets.
    pub fn merge(&mut self, patch: ConversationFilters) {
        macro_rules! take {
            ($($f:ident),*) => { $( if patch.$f.is_some() { self.$f = patch.$f; } )* };
        }
        take!(
            status,
            priority,
            assigned_to,
            date_from,
            date_to,
            tags,
            ai_handled,
            has_appointment
        );
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query-string pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(v) = &self.status {
            q.push(("status".into(), join(v, |s| s.as_str())));
        }
        if let Some(v) = &self.priority {
            q.push(("priority".into(), join(v, |p| p.as_str())));
        }
        if let Some(v) = &self.assigned_to {
            q.push(("assignedTo".into(), v.clone()));
        }
        if let Some(v) = self.date_from {
            q.push(("dateFrom".into(), ts(v)));
        }
        if let Some(v) = self.date_to {
            q.push(("dateTo".into(), ts(v)));
        }
        if let Some(v) = &self.tags {
            q.push(("tags".into(), v.join(",")));
        }
        if let Some(v) = self.ai_handled {
            q.push(("aiHandled".into(), v.to_string()));
        }
        if let Some(v) = self.has_appointment {
            q.push(("hasAppointment".into(), v.to_string()));
        }
        q
    }
}
