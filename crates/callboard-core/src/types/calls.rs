//! Call and conversation records.
//!
//! These are full representations: the real-time channel pushes whole
//! records, never diffs, so every field the server knows about is carried.

use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CallId, ConversationId, MessageId, TenantId};

/// A record keyed by a server-issued ID.
pub trait Entity: Clone + Send + Sync + 'static {
    /// ID type.
    type Id: Clone + Eq + Hash + std::fmt::Display + Send + Sync;

    /// The record's ID.
    fn id(&self) -> &Self::Id;
}

// ─────────────────────────────────────────────────────────────────────────────
// Calls
// ─────────────────────────────────────────────────────────────────────────────

/// Call direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    /// Caller dialed the tenant.
    Inbound,
    /// The tenant dialed out.
    Outbound,
}

impl std::fmt::Display for CallDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
        }
    }
}

/// Call lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Ringing, not yet answered.
    Ringing,
    /// In progress.
    Active,
    /// Ended normally.
    Completed,
    /// Failed to connect.
    Failed,
    /// Callee busy.
    Busy,
    /// Nobody answered.
    NoAnswer,
    /// Cancelled before connect.
    Cancelled,
}

impl CallStatus {
    /// Wire name (`"no_answer"` etc.).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Busy => "busy",
            Self::NoAnswer => "no_answer",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Approximate caller location.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerLocation {
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Audio quality report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallQuality {
    /// Quality score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Detected issues.
    #[serde(default)]
    pub issues: Vec<String>,
}

/// A transfer between participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTransfer {
    /// Transfer ID.
    pub id: String,
    /// Participant handing off.
    pub from_participant: String,
    /// Participant receiving.
    pub to_participant: String,
    /// Why the transfer happened.
    #[serde(default)]
    pub reason: String,
    /// When.
    pub timestamp: DateTime<Utc>,
    /// Whether the transfer connected.
    #[serde(default)]
    pub successful: bool,
}

/// Free-form call metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetadata {
    /// Telephony provider call SID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_call_sid: Option<String>,
    /// Caller location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_location: Option<CallerLocation>,
    /// Quality report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_quality: Option<CallQuality>,
    /// Transfers during the call.
    #[serde(default)]
    pub transfer_history: Vec<CallTransfer>,
    /// Operator notes.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Role of a call participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// The person calling.
    Caller,
    /// The person called.
    Recipient,
    /// The AI receptionist.
    AiAssistant,
    /// A human operator.
    HumanAgent,
}

/// Connection state of a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// On the call.
    Connected,
    /// Left the call.
    Disconnected,
    /// Being rung.
    Ringing,
    /// Busy.
    Busy,
}

/// A party on a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParticipant {
    /// Participant ID.
    pub id: String,
    /// Phone number.
    pub number: String,
    /// Role.
    pub role: ParticipantRole,
    /// Joined at.
    pub joined_at: DateTime<Utc>,
    /// Left at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
    /// Connection state.
    pub status: ParticipantStatus,
    /// Muted.
    #[serde(default)]
    pub muted: bool,
    /// On hold.
    #[serde(default)]
    pub on_hold: bool,
}

/// A phone call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Call ID.
    pub id: CallId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Originating number.
    pub from_number: String,
    /// Destination number.
    pub to_number: String,
    /// Direction.
    pub direction: CallDirection,
    /// Status.
    pub status: CallStatus,
    /// Start time.
    pub start_time: DateTime<Utc>,
    /// End time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Recording URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    /// Billed cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Metadata.
    #[serde(default)]
    pub metadata: CallMetadata,
    /// Participants.
    #[serde(default)]
    pub participants: Vec<CallParticipant>,
    /// Conversations held during the call.
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Last updated at.
    pub updated_at: DateTime<Utc>,
}

impl Call {
    /// Duration formatted as `m:ss`.
    pub fn duration_label(&self) -> String {
        let secs = self.duration.unwrap_or(0);
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

impl Entity for Call {
    type Id = CallId;

    fn id(&self) -> &CallId {
        &self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations
// ─────────────────────────────────────────────────────────────────────────────

/// Conversation status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Being handled.
    Active,
    /// Waiting on the caller or an operator.
    Waiting,
    /// Resolved.
    Resolved,
    /// Closed.
    Closed,
    /// Escalated to a human.
    Escalated,
}

impl ConversationStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Escalated => "escalated",
        }
    }
}

/// Conversation priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPriority {
    /// Low.
    Low,
    /// Normal.
    #[default]
    Normal,
    /// High.
    High,
    /// Urgent.
    Urgent,
}

impl ConversationPriority {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Who sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    /// The caller.
    Caller,
    /// The AI receptionist.
    AiAssistant,
    /// A human operator.
    HumanAgent,
    /// System-generated.
    System,
}

/// Kind of message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain text.
    #[default]
    Text,
    /// Audio snippet.
    Audio,
    /// A system action.
    SystemAction,
    /// Transfer requested.
    TransferRequest,
    /// An appointment was booked.
    AppointmentScheduled,
}

/// One message within a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    /// Message ID.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Sender.
    pub sender: MessageSender,
    /// Message body.
    pub content: String,
    /// Kind.
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    /// Sent at.
    pub timestamp: DateTime<Utc>,
    /// NLU annotations (confidence, intent, entities, sentiment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A booked appointment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Appointment ID.
    pub id: String,
    /// Scheduled time.
    pub datetime: DateTime<Utc>,
    /// Booked service.
    pub service: String,
    /// Confirmed by the caller.
    #[serde(default)]
    pub confirmed: bool,
}

/// Handling flags and outcomes of a conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    /// Handled by the AI receptionist.
    #[serde(default)]
    pub ai_handled: bool,
    /// An operator asked to take over from the AI.
    #[serde(default)]
    pub human_takeover_requested: bool,
    /// When the takeover was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_takeover_at: Option<DateTime<Utc>>,
    /// Why it was escalated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
    /// CSAT score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_satisfaction: Option<f64>,
    /// Appointment booked during the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_scheduled: Option<Appointment>,
}

/// A conversation thread attached to a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// Owning call.
    pub call_id: CallId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Status.
    pub status: ConversationStatus,
    /// Priority.
    #[serde(default)]
    pub priority: ConversationPriority,
    /// Subject line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// AI summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Start time.
    pub start_time: DateTime<Utc>,
    /// End time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Assigned operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Messages, oldest first.
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    /// Metadata flags.
    #[serde(default)]
    pub metadata: ConversationMetadata,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Last updated at.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Append a message unless one with the same ID is already present.
    ///
    /// Returns `true` if the message was appended.
    pub fn push_message(&mut self, message: ConversationMessage) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        if message.timestamp > self.updated_at {
            self.updated_at = message.timestamp;
        }
        self.messages.push(message);
        true
    }

    /// Flag the conversation as awaiting a human takeover.
    pub fn mark_takeover_requested(&mut self, at: DateTime<Utc>) {
        self.metadata.human_takeover_requested = true;
        self.metadata.human_takeover_at = Some(at);
    }
}

impl Entity for Conversation {
    type Id = ConversationId;

    fn id(&self) -> &ConversationId {
        &self.id
    }
}
