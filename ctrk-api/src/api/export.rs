//! CSV export of the component store

use crate::db::components::load_all_components;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

/// GET /api/export - every component as a CSV attachment
///
/// Column names mirror the upload alias tables, so an exported file
/// re-imports cleanly with stable keys (and therefore updates in place).
pub async fn export_components(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let components = load_all_components(&state.db).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "componentId",
            "name",
            "version",
            "description",
            "tower",
            "owner",
            "type",
            "status",
            "complexity",
            "changeType",
            "month",
            "year",
            "releaseDate",
            "lastUpdated",
            "createdAt",
        ])
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    for component in &components {
        writer
            .write_record([
                component.external_key.as_str(),
                component.label.as_str(),
                component.version.as_str(),
                component.description.as_str(),
                component.tower.as_str(),
                component.app_group.as_str(),
                component.component_type.as_str(),
                component.status.as_str(),
                component.complexity.as_str(),
                component.change_type.as_str(),
                &component.release_month.to_string(),
                &component.release_year.to_string(),
                &component
                    .release_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                &component.last_updated.to_rfc3339(),
                &component.created_at.to_rfc3339(),
            ])
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(rows = components.len(), "Component export generated");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"components_export.csv\"",
            ),
        ],
        bytes,
    ))
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export", get(export_components))
}
