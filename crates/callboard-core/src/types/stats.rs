//! Dashboard statistics.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallStats {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    pub missed: u64,
    /// Seconds.
    pub average_duration: f64,
    /// Seconds.
    pub total_duration: f64,
    pub conversion_rate: f64,
}

/// Conversation counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationStats {
    pub total: u64,
    pub active: u64,
    pub waiting: u64,
    pub resolved: u64,
    pub closed: u64,
    /// Seconds.
    pub average_response_time: f64,
    pub ai_handle_rate: f64,
    pub escalation_rate: f64,
}

/// Phone number inventory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhoneNumberStats {
    pub total: u64,
    pub active: u64,
    pub available: u64,
}

/// Backend health as reported by the stats endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    #[default]
    Healthy,
    Warning,
    Error,
}

/// Backend status block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStats {
    /// Seconds.
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    pub status: SystemHealth,
}

/// Payload of `GET /dashboard/stats`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub calls: CallStats,
    pub conversations: ConversationStats,
    pub phone_numbers: PhoneNumberStats,
    pub system: SystemStats,
}
