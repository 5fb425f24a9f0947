//! Event-stream wire protocol.
//!
//! Every frame is a JSON text message `{"event": "<name>", "data": {...}}`.
//! Entity events carry the full updated record, never a diff.
//!
//! | direction | event | data |
//! |---|---|---|
//! | out | `auth` | `{token, tenantId, userId}` |
//! | in | `authenticated` | `{tenantId}` |
//! | in | `authentication_error` | `{message}` |
//! | in | `call:created` / `call:updated` / `call:ended` | `{call}` |
//! | in | `conversation:created` / `conversation:updated` | `{conversation}` |
//! | in | `conversation:message` | `{conversationId, message}` |
//! | in | `conversation:takeover_requested` | `{conversationId}` |
//! | in | `conversation:human_joined` | `{conversationId?}` |
//! | in | `system:notification` | `{type, title?, message}` |
//! | in | `system:maintenance` | `{message}` |
//! | in | `system:update` | `{requiresReload}` |
//! | in | `phone:provisioned` | `{number}` |
//! | in | `phone:status_changed` | any |
//! | out | `join:call` / `leave:call` | `{callId}` |
//! | out | `join:conversation` / `leave:conversation` | `{conversationId}` |

use callboard_core::ids::{CallId, ConversationId, TenantId, UserId};
use callboard_core::types::{Call, Conversation, ConversationMessage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::notify::NotificationLevel;

/// Raw `{event, data}` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name.
    pub event: String,
    /// Payload.
    #[serde(default)]
    pub data: Value,
}

/// A decoded inbound event.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// Handshake accepted.
    Authenticated {
        /// Tenant the channel is scoped to.
        tenant_id: Option<TenantId>,
    },
    /// Handshake (or a later credential check) rejected.
    AuthenticationError {
        /// Server explanation.
        message: String,
    },
    /// `call:created`.
    CallCreated(Call),
    /// `call:updated`.
    CallUpdated(Call),
    /// `call:ended`.
    CallEnded(Call),
    /// `conversation:created`.
    ConversationCreated(Conversation),
    /// `conversation:updated`.
    ConversationUpdated(Conversation),
    /// `conversation:message`.
    ConversationMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// The new message.
        message: ConversationMessage,
    },
    /// `conversation:takeover_requested`.
    TakeoverRequested {
        /// Target conversation.
        conversation_id: ConversationId,
    },
    /// `conversation:human_joined`.
    HumanJoined {
        /// Target conversation, when sent.
        conversation_id: Option<ConversationId>,
    },
    /// `system:notification`.
    SystemNotification {
        /// Severity.
        level: NotificationLevel,
        /// Optional title.
        title: Option<String>,
        /// Body.
        message: String,
    },
    /// `system:maintenance`.
    SystemMaintenance {
        /// Body.
        message: String,
    },
    /// `system:update`.
    SystemUpdate {
        /// The client should reload.
        requires_reload: bool,
    },
    /// `phone:provisioned`.
    PhoneProvisioned {
        /// The new number.
        number: String,
    },
    /// `phone:status_changed`.
    PhoneStatusChanged(Value),
    /// Any other event name.
    Unknown(String),
}

impl InboundEvent {
    /// Wire name, for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AuthenticationError { .. } => "authentication_error",
            Self::CallCreated(_) => "call:created",
            Self::CallUpdated(_) => "call:updated",
            Self::CallEnded(_) => "call:ended",
            Self::ConversationCreated(_) => "conversation:created",
            Self::ConversationUpdated(_) => "conversation:updated",
            Self::ConversationMessage { .. } => "conversation:message",
            Self::TakeoverRequested { .. } => "conversation:takeover_requested",
            Self::HumanJoined { .. } => "conversation:human_joined",
            Self::SystemNotification { .. } => "system:notification",
            Self::SystemMaintenance { .. } => "system:maintenance",
            Self::SystemUpdate { .. } => "system:update",
            Self::PhoneProvisioned { .. } => "phone:provisioned",
            Self::PhoneStatusChanged(_) => "phone:status_changed",
            Self::Unknown(name) => name,
        }
    }
}

// ── Payload shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticatedPayload {
    #[serde(default)]
    tenant_id: Option<TenantId>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct CallPayload {
    call: Call,
}

#[derive(Deserialize)]
struct ConversationPayload {
    conversation: Conversation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    conversation_id: ConversationId,
    message: ConversationMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationRef {
    conversation_id: ConversationId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionalConversationRef {
    #[serde(default)]
    conversation_id: Option<ConversationId>,
}

#[derive(Deserialize)]
struct SystemNotificationPayload {
    #[serde(rename = "type", default)]
    level: NotificationLevel,
    #[serde(default)]
    title: Option<String>,
    message: String,
}

#[derive(Deserialize)]
struct MessageOnly {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    #[serde(default)]
    requires_reload: bool,
}

#[derive(Deserialize)]
struct ProvisionedPayload {
    number: String,
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    let data = if data.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|e| ProtocolError::Payload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<InboundEvent, ProtocolError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| ProtocolError::Frame(e.to_string()))?;
    decode_frame(frame)
}

/// Decode an already-parsed frame.
pub fn decode_frame(frame: Frame) -> Result<InboundEvent, ProtocolError> {
    let Frame { event, data } = frame;
    let ev = event.as_str();
    Ok(match ev {
        "authenticated" => {
            let p: AuthenticatedPayload = payload(ev, data)?;
            InboundEvent::Authenticated {
                tenant_id: p.tenant_id,
            }
        }
        "authentication_error" => {
            let p: ErrorPayload = payload(ev, data)?;
            InboundEvent::AuthenticationError { message: p.message }
        }
        "call:created" => InboundEvent::CallCreated(payload::<CallPayload>(ev, data)?.call),
        "call:updated" => InboundEvent::CallUpdated(payload::<CallPayload>(ev, data)?.call),
        "call:ended" => InboundEvent::CallEnded(payload::<CallPayload>(ev, data)?.call),
        "conversation:created" => InboundEvent::ConversationCreated(
            payload::<ConversationPayload>(ev, data)?.conversation,
        ),
        "conversation:updated" => InboundEvent::ConversationUpdated(
            payload::<ConversationPayload>(ev, data)?.conversation,
        ),
        "conversation:message" => {
            let p: MessagePayload = payload(ev, data)?;
            InboundEvent::ConversationMessage {
                conversation_id: p.conversation_id,
                message: p.message,
            }
        }
        "conversation:takeover_requested" => {
            let p: ConversationRef = payload(ev, data)?;
            InboundEvent::TakeoverRequested {
                conversation_id: p.conversation_id,
            }
        }
        "conversation:human_joined" => {
            let p: OptionalConversationRef = payload(ev, data)?;
            InboundEvent::HumanJoined {
                conversation_id: p.conversation_id,
            }
        }
        "system:notification" => {
            let p: SystemNotificationPayload = payload(ev, data)?;
            InboundEvent::SystemNotification {
                level: p.level,
                title: p.title,
                message: p.message,
            }
        }
        "system:maintenance" => InboundEvent::SystemMaintenance {
            message: payload::<MessageOnly>(ev, data)?.message,
        },
        "system:update" => InboundEvent::SystemUpdate {
            requires_reload: payload::<UpdatePayload>(ev, data)?.requires_reload,
        },
        "phone:provisioned" => InboundEvent::PhoneProvisioned {
            number: payload::<ProvisionedPayload>(ev, data)?.number,
        },
        "phone:status_changed" => InboundEvent::PhoneStatusChanged(data),
        _ => InboundEvent::Unknown(event),
    })
}

/// A client-to-server control message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Handshake.
    Auth {
        /// Access credential.
        token: String,
        /// Tenant of the session.
        tenant_id: TenantId,
        /// Signed-in user.
        user_id: UserId,
    },
    /// `join:call`.
    JoinCall(CallId),
    /// `leave:call`.
    LeaveCall(CallId),
    /// `join:conversation`.
    JoinConversation(ConversationId),
    /// `leave:conversation`.
    LeaveConversation(ConversationId),
}

impl OutboundMessage {
    /// Wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::JoinCall(_) => "join:call",
            Self::LeaveCall(_) => "leave:call",
            Self::JoinConversation(_) => "join:conversation",
            Self::LeaveConversation(_) => "leave:conversation",
        }
    }

    /// As a wire frame.
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::Auth {
                token,
                tenant_id,
                user_id,
            } => serde_json::json!({ "token": token, "tenantId": tenant_id, "userId": user_id }),
            Self::JoinCall(id) | Self::LeaveCall(id) => serde_json::json!({ "callId": id }),
            Self::JoinConversation(id) | Self::LeaveConversation(id) => {
                serde_json::json!({ "conversationId": id })
            }
        };
        Frame {
            event: self.name().to_string(),
            data,
        }
    }

    /// Serialized text frame.
    pub fn encode(&self) -> String {
        let frame = self.to_frame();
        serde_json::json!({ "event": frame.event, "data": frame.data }).to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
