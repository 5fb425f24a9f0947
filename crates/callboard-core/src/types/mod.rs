//! Domain types exchanged with the REST API and the real-time channel.
//!
//! All types serialize as `camelCase` JSON to match the server.

pub mod api;
pub mod auth;
pub mod calls;
pub mod filters;
pub mod preferences;
pub mod stats;

pub use api::{ApiEnvelope, ApiErrorBody, Page, PageRequest, PaginationMeta, ResponseMeta, SortOrder};
pub use auth::{
    AuthTokens, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TenantSummary, User,
    UserPatch, UserRole, UserStatus,
};
pub use calls::{
    Appointment, Call, CallDirection, CallMetadata, CallParticipant, CallQuality, CallStatus,
    CallTransfer, CallerLocation, Conversation, ConversationMessage, ConversationMetadata,
    ConversationPriority, ConversationStatus, Entity, MessageSender, MessageType,
    ParticipantRole, ParticipantStatus,
};
pub use filters::{CallFilters, ConversationFilters};
pub use preferences::{Theme, UiPreferences};
pub use stats::{CallStats, ConversationStats, DashboardStats, PhoneNumberStats, SystemHealth, SystemStats};
