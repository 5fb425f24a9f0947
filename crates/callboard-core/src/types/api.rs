//! REST response envelope and pagination.

use serde::{Deserialize, Serialize};

/// Error body carried inside an unsuccessful envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Machine-readable code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Offending field, for validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Extra structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Pagination block of a list response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationMeta {
    /// 1-based current page.
    pub current_page: u32,
    /// Page count.
    pub total_pages: u32,
    /// Total matching records.
    pub total_count: u64,
    /// Page size.
    pub limit: u32,
    /// A next page exists.
    pub has_next: bool,
    /// A previous page exists.
    pub has_previous: bool,
}

/// Envelope metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Pagination, for list endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

/// `{ success, data?, error?, meta? }` wrapper around every REST response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error body when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    /// Metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

/// One page of a list endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    /// Records on this page.
    pub items: Vec<T>,
    /// Pagination info, when the server sent it.
    pub pagination: Option<PaginationMeta>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: None,
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortOrder {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Page selection for list endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    /// 1-based page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Sort key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Sort direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl PageRequest {
    /// Query-string pairs for this page selection.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(by) = &self.sort_by {
            q.push(("sortBy".into(), by.clone()));
        }
        if let Some(order) = self.sort_order {
            q.push(("sortOrder".into(), order.as_str().into()));
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_success_with_pagination() {
        let env: ApiEnvelope<Vec<u32>> = serde_json::from_str(
            r#"{"success":true,"data":[1,2],"meta":{"pagination":{"currentPage":2,"totalPages":5,"totalCount":90,"limit":20,"hasNext":true,"hasPrevious":true}}}"#,
        )
        .unwrap();
        assert!(env.success);
        assert_eq!(env.data, Some(vec![1, 2]));
        let p = env.meta.unwrap().pagination.unwrap();
        assert_eq!(p.current_page, 2);
        assert!(p.has_next);
    }

    #[test]
    fn envelope_failure_without_data() {
        let env: ApiEnvelope<Vec<u32>> = serde_json::from_str(
            r#"{"success":false,"error":{"code":"NOT_FOUND","message":"nope"}}"#,
        )
        .unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.error.unwrap().code, "NOT_FOUND");
    }

    #[test]
    fn page_request_defaults_and_query() {
        let req = PageRequest::default();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 20);
        let q = PageRequest {
            sort_by: Some("startTime".into()),
            sort_order: Some(SortOrder::Asc),
            ..req
        }
        .to_query();
        assert!(q.contains(&("sortBy".into(), "startTime".into())));
        assert!(q.contains(&("sortOrder".into(), "asc".into())));
    }
}
