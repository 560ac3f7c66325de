use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::{
    CacheTarget, CannibalizedKeyword, ContentItem, ContentSummary, ContentUpdate, KeywordMapping,
    KeywordMappingRow, LinkBundle, NewContent, NewKeywordMapping, OrphanPage, QualityReport,
    RegenerationSummary, SitemapKind,
};

use super::AppState;

type Shared = State<Arc<AppState>>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// Sitemaps and robots
// ============================================================================

async fn sitemap_response(state: &AppState, kind: SitemapKind) -> Result<Response> {
    let xml = state.app.sitemaps.get_sitemap(kind).await?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

pub async fn sitemap_index(State(state): Shared) -> Result<Response> {
    sitemap_response(&state, SitemapKind::Index).await
}

pub async fn sitemap_core(State(state): Shared) -> Result<Response> {
    sitemap_response(&state, SitemapKind::Core).await
}

pub async fn sitemap_content(State(state): Shared) -> Result<Response> {
    sitemap_response(&state, SitemapKind::Content).await
}

pub async fn robots(State(state): Shared) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.app.sitemaps.robots_txt(),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub success: bool,
    pub invalidated: usize,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An empty body invalidates everything; a body that is present must parse.
pub async fn invalidate_sitemap(
    State(state): Shared,
    body: Bytes,
) -> Result<Json<InvalidateResponse>> {
    let request: InvalidateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        InvalidateRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let target = match request.kind.as_deref() {
        None => CacheTarget::All,
        Some(raw) => raw.parse::<CacheTarget>().map_err(AppError::bad_request)?,
    };
    let invalidated = state.app.sitemaps.invalidate_cache(target).await?;

    let kind = match target {
        CacheTarget::All => "all".to_string(),
        CacheTarget::Kind(kind) => kind.to_string(),
    };
    Ok(Json(InvalidateResponse {
        success: true,
        invalidated,
        kind,
    }))
}

// ============================================================================
// Keywords
// ============================================================================

pub async fn map_keyword(
    State(state): Shared,
    Json(mapping): Json<NewKeywordMapping>,
) -> Result<Json<KeywordMapping>> {
    Ok(Json(state.app.keywords.map_keyword(mapping).await?))
}

pub async fn keyword_mappings(State(state): Shared) -> Result<Json<Vec<KeywordMappingRow>>> {
    Ok(Json(state.app.keywords.list_keyword_mappings().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CannibalizationResponse {
    pub cannibalized_keywords: Vec<CannibalizedKeyword>,
    pub count: usize,
    pub has_issues: bool,
}

pub async fn cannibalization_check(State(state): Shared) -> Result<Json<CannibalizationResponse>> {
    let cannibalized_keywords = state.app.keywords.detect_cannibalization().await?;
    Ok(Json(CannibalizationResponse {
        count: cannibalized_keywords.len(),
        has_issues: !cannibalized_keywords.is_empty(),
        cannibalized_keywords,
    }))
}

// ============================================================================
// Internal links
// ============================================================================

pub async fn internal_links(
    State(state): Shared,
    Path(content_id): Path<i64>,
) -> Result<Json<LinkBundle>> {
    Ok(Json(state.app.linking.generate_links(content_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanPagesResponse {
    pub orphan_pages: Vec<OrphanPage>,
    pub count: usize,
}

pub async fn orphan_pages(State(state): Shared) -> Result<Json<OrphanPagesResponse>> {
    let orphan_pages = state.app.linking.detect_orphan_pages().await?;
    Ok(Json(OrphanPagesResponse {
        count: orphan_pages.len(),
        orphan_pages,
    }))
}

pub async fn regenerate_links(State(state): Shared) -> Result<Json<RegenerationSummary>> {
    Ok(Json(state.app.linking.regenerate_all_links().await?))
}

pub async fn quality_report(State(state): Shared) -> Result<Json<QualityReport>> {
    Ok(Json(state.app.quality.generate_report().await?))
}

// ============================================================================
// Content
// ============================================================================

pub async fn list_content(State(state): Shared) -> Result<Json<Vec<ContentSummary>>> {
    Ok(Json(state.app.list_content().await?))
}

pub async fn get_content(State(state): Shared, Path(id): Path<i64>) -> Result<Json<ContentItem>> {
    Ok(Json(state.app.get_content(id).await?))
}

pub async fn create_content(
    State(state): Shared,
    Json(content): Json<NewContent>,
) -> Result<(StatusCode, Json<ContentItem>)> {
    let item = state.app.create_content(content).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_content(
    State(state): Shared,
    Path(id): Path<i64>,
    Json(update): Json<ContentUpdate>,
) -> Result<Json<ContentItem>> {
    Ok(Json(state.app.update_content(id, update).await?))
}

pub async fn delete_content(State(state): Shared, Path(id): Path<i64>) -> Result<StatusCode> {
    state.app.delete_content(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
