//! # callboard-core
//!
//! Foundation types, errors, branded IDs, and utilities for the callboard client.
//!
//! This crate provides the shared vocabulary that all other callboard crates depend on:
//!
//! - **Branded IDs**: `CallId`, `ConversationId`, `UserId`, `TenantId` as newtypes
//! - **Domain types**: calls, conversations, users, tokens, dashboard stats, filters
//! - **API envelope**: the `{success, data, error, meta}` shape every REST reply uses
//! - **Errors**: [`ErrorCategory`] taxonomy shared by every crate's error enum
//! - **Backoff**: reconnection delay math
//! - **Clock**: wall-clock abstraction that can follow tokio's paused time in tests
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod clock;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod retry;
pub mod types;

pub use clock::{Clock, SystemClock, TokioClock};
pub use errors::ErrorCategory;
pub use ids::{CallId, ConversationId, MessageId, TenantId, UserId};
pub use types::*;
