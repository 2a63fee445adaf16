//! `GET /api/search/docs?q=&limit=`

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::docs::{DocHit, clamp_limit};
use crate::error::ApiError;
use crate::state::SharedState;

/// Query string.
#[derive(Debug, Deserialize)]
pub struct DocsQuery {
    /// Search terms.
    pub q: Option<String>,
    /// Maximum results, capped at 50.
    pub limit: Option<String>,
}

/// Search results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsResponse {
    success: bool,
    query: String,
    result_count: usize,
    results: Vec<DocHit>,
}

/// Keyword search over the documentation index. Free.
///
/// # Errors
///
/// 400 when `q` is missing or blank.
pub async fn search_docs(
    State(state): State<SharedState>,
    Query(query): Query<DocsQuery>,
) -> Result<Json<DocsResponse>, ApiError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::BadRequest("Provide ?q=search+terms"))?;

    let results = state.docs.search(q, clamp_limit(query.limit.as_deref()));
    Ok(Json(DocsResponse {
        success: true,
        query: q.to_owned(),
        result_count: results.len(),
        results,
    }))
}
