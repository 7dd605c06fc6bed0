//! Component CRUD handlers
//!
//! Interactive creates and updates run through the same value normalizer
//! as bulk ingestion, so "deployed" in a form field and "deployed" in a
//! spreadsheet cell land as the same canonical status.

use crate::db::components::{
    delete_component, find_id_by_external_key, get_component, insert_record, list_components,
    update_record, ComponentFilter, StoredComponent,
};
use crate::error::{ApiError, ApiResult};
use crate::ingest::normalize::{normalize_complexity, normalize_date, normalize_status, DATE_FORMATS};
use crate::ingest::reconcile::generate_external_key;
use crate::ingest::types::CanonicalComponentRecord;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{Datelike, Utc};
use ctrk_common::events::{ComponentAction, TrackerEvent};
use serde::Deserialize;
use serde_json::{json, Value};

/// Query parameters for component listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub tower: Option<String>,
    pub status: Option<String>,
    pub complexity: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// POST /api/components request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComponentRequest {
    pub component_id: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub tower: Option<String>,
    pub app_group: Option<String>,
    pub component_type: Option<String>,
    pub status: Option<String>,
    pub complexity: Option<String>,
    pub change_type: Option<String>,
    pub release_date: Option<String>,
}

/// PUT /api/components/:id request body; absent fields keep their value
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComponentRequest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub tower: Option<String>,
    pub app_group: Option<String>,
    pub component_type: Option<String>,
    pub status: Option<String>,
    pub complexity: Option<String>,
    pub change_type: Option<String>,
    pub release_date: Option<String>,
}

/// GET /api/components - list with optional filters
pub async fn get_components(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = ComponentFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        tower: query.tower.filter(|s| !s.trim().is_empty()),
        status: query.status.filter(|s| !s.trim().is_empty()),
        complexity: query.complexity.filter(|s| !s.trim().is_empty()),
        year: query.year,
        month: query.month,
    };

    let components = list_components(&state.db, &filter).await?;

    Ok(Json(json!({
        "success": true,
        "count": components.len(),
        "components": components,
    })))
}

/// POST /api/components - create one component
pub async fn create_component(
    State(state): State<AppState>,
    Json(request): Json<CreateComponentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Component name is required".to_string()));
    }

    let external_key = request
        .component_id
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(generate_external_key);

    let release_date = request
        .release_date
        .as_deref()
        .and_then(|raw| normalize_date(raw, DATE_FORMATS));
    let now = Utc::now();

    let record = CanonicalComponentRecord {
        external_key: Some(external_key.clone()),
        label: request.name.trim().to_string(),
        version: request.version.unwrap_or_else(|| "1.0.0".to_string()),
        description: request.description.unwrap_or_default(),
        tower: request.tower.unwrap_or_else(|| "General".to_string()),
        app_group: request.app_group.unwrap_or_else(|| "Default Team".to_string()),
        component_type: request.component_type.unwrap_or_else(|| "Service".to_string()),
        status: normalize_status(request.status.as_deref().unwrap_or("")),
        complexity: normalize_complexity(request.complexity.as_deref().unwrap_or("")),
        change_type: request.change_type.unwrap_or_else(|| "New".to_string()),
        release_month: release_date.map(|d| d.month()).unwrap_or_else(|| now.month()),
        release_year: release_date.map(|d| d.year()).unwrap_or_else(|| now.year()),
        release_date,
    };

    let mut conn = state.db.acquire().await.map_err(anyhow::Error::from)?;
    if find_id_by_external_key(&mut conn, &external_key)
        .await
        .map_err(anyhow::Error::from)?
        .is_some()
    {
        return Err(ApiError::BadRequest(format!(
            "Component with key {} already exists",
            external_key
        )));
    }
    insert_record(&mut conn, &external_key, &record)
        .await
        .map_err(anyhow::Error::from)?;
    drop(conn);

    let stored = crate::db::components::get_by_external_key(&state.db, &external_key)
        .await?
        .ok_or_else(|| ApiError::Internal("Created component vanished".to_string()))?;

    state.event_bus.emit_lossy(TrackerEvent::ComponentUpdate {
        action: ComponentAction::Created,
        external_key: stored.external_key.clone(),
        label: stored.label.clone(),
        timestamp: Utc::now(),
    });

    tracing::info!(external_key = %stored.external_key, "Component created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "component": stored,
            "message": "Component created successfully",
        })),
    ))
}

/// PUT /api/components/:id - partial update
pub async fn update_component(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateComponentRequest>,
) -> ApiResult<Json<Value>> {
    let existing = get_component(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Component not found: {}", id)))?;

    let record = merge_update(&existing, &request);

    let mut conn = state.db.acquire().await.map_err(anyhow::Error::from)?;
    update_record(&mut conn, &existing.external_key, &record)
        .await
        .map_err(anyhow::Error::from)?;
    drop(conn);

    let stored = get_component(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Internal("Updated component vanished".to_string()))?;

    state.event_bus.emit_lossy(TrackerEvent::ComponentUpdate {
        action: ComponentAction::Updated,
        external_key: stored.external_key.clone(),
        label: stored.label.clone(),
        timestamp: Utc::now(),
    });

    Ok(Json(json!({
        "success": true,
        "component": stored,
        "message": "Component updated successfully",
    })))
}

/// DELETE /api/components/:id
pub async fn remove_component(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let existing = get_component(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Component not found: {}", id)))?;

    delete_component(&state.db, id).await?;

    state.event_bus.emit_lossy(TrackerEvent::ComponentUpdate {
        action: ComponentAction::Deleted,
        external_key: existing.external_key,
        label: existing.label,
        timestamp: Utc::now(),
    });

    Ok(Json(json!({
        "success": true,
        "message": "Component deleted successfully",
    })))
}

/// Overlay patch fields onto the stored row
fn merge_update(
    existing: &StoredComponent,
    patch: &UpdateComponentRequest,
) -> CanonicalComponentRecord {
    // An unparseable date in the patch keeps the stored value
    let release_date = match patch.release_date.as_deref() {
        Some(raw) => normalize_date(raw, DATE_FORMATS).or(existing.release_date),
        None => existing.release_date,
    };

    // Stored enum strings round-trip through the normalizer unchanged
    let status = normalize_status(patch.status.as_deref().unwrap_or(&existing.status));
    let complexity =
        normalize_complexity(patch.complexity.as_deref().unwrap_or(&existing.complexity));

    let (release_month, release_year) = match (patch.release_date.as_deref(), release_date) {
        (Some(_), Some(date)) => (date.month(), date.year()),
        _ => (existing.release_month, existing.release_year),
    };

    CanonicalComponentRecord {
        external_key: Some(existing.external_key.clone()),
        label: patch.name.clone().unwrap_or_else(|| existing.label.clone()),
        version: patch
            .version
            .clone()
            .unwrap_or_else(|| existing.version.clone()),
        description: patch
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone()),
        tower: patch.tower.clone().unwrap_or_else(|| existing.tower.clone()),
        app_group: patch
            .app_group
            .clone()
            .unwrap_or_else(|| existing.app_group.clone()),
        component_type: patch
            .component_type
            .clone()
            .unwrap_or_else(|| existing.component_type.clone()),
        status,
        complexity,
        change_type: patch
            .change_type
            .clone()
            .unwrap_or_else(|| existing.change_type.clone()),
        release_month,
        release_year,
        release_date,
    }
}

/// Build component CRUD routes
pub fn component_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/components",
            get(get_components).post(create_component),
        )
        .route(
            "/api/components/:id",
            put(update_component).delete(remove_component),
        )
}
