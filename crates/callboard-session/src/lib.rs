//! # callboard-session
//!
//! Session lifecycle for the callboard client.
//!
//! - [`SessionManager`] logs in and out, renews the access token ahead of
//!   expiry with at most one renewal in flight, and restores a persisted
//!   session at startup.
//! - [`AuthEvents`] broadcasts every authentication transition so the
//!   real-time layer can follow it.
//! - [`storage`] persists the session and UI preferences as versioned JSON
//!   documents with owner-only permissions.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod manager;
pub mod storage;
pub mod timer;

pub use errors::{SessionError, StorageError};
pub use events::{AuthEvent, AuthEvents, LogoutReason};
pub use manager::{AuthPhase, DEFAULT_RENEWAL_LEAD, Rehydration, SessionManager, renewal_delay};
pub use storage::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
pub use timer::OneShotTimer;
