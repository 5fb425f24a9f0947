//! Call, conversation and dashboard endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use callboard_core::ids::{CallId, ConversationId};
use callboard_core::types::{
    Call, CallFilters, Conversation, ConversationFilters, ConversationStatus, DashboardStats, Page,
    PageRequest,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::{ApiRequest, Decoded, HttpClient};
use crate::errors::ApiError;
use crate::token::AccessTokenProvider;

/// Operations on the call service.
#[async_trait]
pub trait CallsApi: Send + Sync {
    /// `GET /calls`.
    async fn list_calls(
        &self,
        filters: &CallFilters,
        page: &PageRequest,
    ) -> Result<Page<Call>, ApiError>;

    /// `GET /calls/{id}`.
    async fn get_call(&self, id: &CallId) -> Result<Call, ApiError>;

    /// `GET /conversations`.
    async fn list_conversations(
        &self,
        filters: &ConversationFilters,
        page: &PageRequest,
    ) -> Result<Page<Conversation>, ApiError>;

    /// `GET /conversations/{id}`.
    async fn get_conversation(&self, id: &ConversationId) -> Result<Conversation, ApiError>;

    /// `POST /conversations/{id}/takeover`.
    async fn request_takeover(&self, id: &ConversationId) -> Result<(), ApiError>;

    /// `PATCH /conversations/{id}` with `{status}`.
    async fn update_conversation_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), ApiError>;

    /// `POST /conversations/{id}/notes` with `{note}`.
    async fn add_conversation_note(&self, id: &ConversationId, note: &str)
    -> Result<(), ApiError>;

    /// `GET /dashboard/stats`.
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;
}

/// [`CallsApi`] over HTTP with bearer auth.
///
/// A 401 asks the token provider to renew once and retries the request once;
/// a second 401 is returned to the caller.
#[derive(Clone)]
pub struct HttpCallsApi {
    client: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl std::fmt::Debug for HttpCallsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCallsApi").finish_non_exhaustive()
    }
}

impl HttpCallsApi {
    /// Wrap a configured client and token source.
    pub fn new(client: HttpClient, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self { client, tokens }
    }

    async fn authorized<T: DeserializeOwned>(
        &self,
        req: ApiRequest<'_>,
    ) -> Result<Decoded<T>, ApiError> {
        let token = self.tokens.access_token();
        match self.client.send(&req, token.as_deref()).await {
            Err(ApiError::Unauthorized) => {
                debug!("401 from call service, renewing and retrying once");
                self.tokens.renew().await?;
                let token = self.tokens.access_token();
                self.client.send(&req, token.as_deref()).await
            }
            other => other,
        }
    }
}

fn page<T>(decoded: Decoded<Vec<T>>) -> Page<T> {
    Page {
        items: decoded.data.unwrap_or_default(),
        pagination: decoded.meta.and_then(|m| m.pagination),
    }
}

#[async_trait]
impl CallsApi for HttpCallsApi {
    #[instrument(skip_all, fields(page = page_req.page))]
    async fn list_calls(
        &self,
        filters: &CallFilters,
        page_req: &PageRequest,
    ) -> Result<Page<Call>, ApiError> {
        let mut query = page_req.to_query();
        query.extend(filters.to_query());
        let req = ApiRequest::get("/calls").query(query);
        Ok(page(self.authorized(req).await?))
    }

    #[instrument(skip_all, fields(call_id = %id))]
    async fn get_call(&self, id: &CallId) -> Result<Call, ApiError> {
        let path = format!("/calls/{id}");
        self.authorized(ApiRequest::get(&path)).await?.require("call")
    }

    #[instrument(skip_all, fields(page = page_req.page))]
    async fn list_conversations(
        &self,
        filters: &ConversationFilters,
        page_req: &PageRequest,
    ) -> Result<Page<Conversation>, ApiError> {
        let mut query = page_req.to_query();
        query.extend(filters.to_query());
        let req = ApiRequest::get("/conversations").query(query);
        Ok(page(self.authorized(req).await?))
    }

    #[instrument(skip_all, fields(conversation_id = %id))]
    async fn get_conversation(&self, id: &ConversationId) -> Result<Conversation, ApiError> {
        let path = format!("/conversations/{id}");
        self.authorized(ApiRequest::get(&path))
            .await?
            .require("conversation")
    }

    #[instrument(skip_all, fields(conversation_id = %id))]
    async fn request_takeover(&self, id: &ConversationId) -> Result<(), ApiError> {
        let path = format!("/conversations/{id}/takeover");
        let _: Decoded<Value> = self.authorized(ApiRequest::post(&path)).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(conversation_id = %id, status = status.as_str()))]
    async fn update_conversation_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), ApiError> {
        let path = format!("/conversations/{id}");
        let req = ApiRequest::patch(&path).json(serde_json::json!({ "status": status }));
        let _: Decoded<Value> = self.authorized(req).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(conversation_id = %id))]
    async fn add_conversation_note(
        &self,
        id: &ConversationId,
        note: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/conversations/{id}/notes");
        let req = ApiRequest::post(&path).json(serde_json::json!({ "note": note }));
        let _: Decoded<Value> = self.authorized(req).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.authorized(ApiRequest::get("/dashboard/stats"))
            .await?
            .require("dashboard stats")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
