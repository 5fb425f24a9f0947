//! # callboard-api
//!
//! REST client for the callboard backend.
//!
//! - [`HttpClient`] routes each path to its service base URL, applies the
//!   configured timeout and decodes the `{success, data, error, meta}` envelope
//!   into a classified [`ApiError`].
//! - [`AuthApi`] covers login, renewal and logout.
//! - [`CallsApi`] covers calls, conversations and dashboard stats, with
//!   bearer auth from an [`AccessTokenProvider`] and one renew-and-retry on 401.

#![deny(unsafe_code)]

pub mod auth;
pub mod calls;
pub mod client;
pub mod errors;
pub mod routing;
pub mod token;

pub use auth::{AuthApi, HttpAuthApi};
pub use calls::{CallsApi, HttpCallsApi};
pub use client::{ApiRequest, Decoded, HttpClient};
pub use errors::ApiError;
pub use routing::{Service, ServiceUrls};
pub use token::AccessTokenProvider;
