//! Component persistence
//!
//! The reconciler drives the `*_record` functions against a transaction
//! connection; the CRUD handlers use the pool-level helpers. All
//! create-vs-update decisions key on `external_key`.

use crate::ingest::types::CanonicalComponentRecord;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// One persisted component row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredComponent {
    pub id: i64,
    pub external_key: String,
    pub label: String,
    pub version: String,
    pub description: String,
    pub tower: String,
    pub app_group: String,
    pub component_type: String,
    pub status: String,
    pub complexity: String,
    pub change_type: String,
    pub release_month: u32,
    pub release_year: i32,
    pub release_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Optional list filters, all combined with AND
#[derive(Debug, Default, Clone)]
pub struct ComponentFilter {
    /// LIKE match over label, description, external key, and app group
    pub search: Option<String>,
    pub tower: Option<String>,
    pub status: Option<String>,
    pub complexity: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

fn row_to_component(row: &sqlx::sqlite::SqliteRow) -> Result<StoredComponent> {
    let release_date: Option<String> = row.get("release_date");
    let last_updated: String = row.get("last_updated");
    let created_at: String = row.get("created_at");

    Ok(StoredComponent {
        id: row.get("id"),
        external_key: row.get("external_key"),
        label: row.get("label"),
        version: row.get("version"),
        description: row.get("description"),
        tower: row.get("tower"),
        app_group: row.get("app_group"),
        component_type: row.get("component_type"),
        status: row.get("status"),
        complexity: row.get("complexity"),
        change_type: row.get("change_type"),
        release_month: row.get::<i64, _>("release_month") as u32,
        release_year: row.get::<i64, _>("release_year") as i32,
        release_date: release_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()?,
        last_updated: DateTime::parse_from_rfc3339(&last_updated)?.with_timezone(&Utc),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

const SELECT_COLUMNS: &str = "id, external_key, label, version, description, tower, app_group, \
     component_type, status, complexity, change_type, release_month, release_year, \
     release_date, last_updated, created_at";

/// Look up the row id for a business key, if one exists
///
/// Runs on the caller's connection so reconciliation lookups observe
/// uncommitted inserts from earlier in the same transaction.
pub async fn find_id_by_external_key(
    conn: &mut SqliteConnection,
    external_key: &str,
) -> sqlx::Result<Option<i64>> {
    let row = sqlx::query("SELECT id FROM components WHERE external_key = ?")
        .bind(external_key)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(|r| r.get("id")))
}

/// Insert a canonical record under the given business key
pub async fn insert_record(
    conn: &mut SqliteConnection,
    external_key: &str,
    record: &CanonicalComponentRecord,
) -> sqlx::Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO components
            (external_key, label, version, description, tower, app_group,
             component_type, status, complexity, change_type,
             release_month, release_year, release_date, last_updated, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(external_key)
    .bind(&record.label)
    .bind(&record.version)
    .bind(&record.description)
    .bind(&record.tower)
    .bind(&record.app_group)
    .bind(&record.component_type)
    .bind(record.status.as_str())
    .bind(record.complexity.as_str())
    .bind(&record.change_type)
    .bind(record.release_month as i64)
    .bind(record.release_year as i64)
    .bind(record.release_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Field-by-field overwrite of the row owning the given business key
pub async fn update_record(
    conn: &mut SqliteConnection,
    external_key: &str,
    record: &CanonicalComponentRecord,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE components SET
            label = ?, version = ?, description = ?, tower = ?, app_group = ?,
            component_type = ?, status = ?, complexity = ?, change_type = ?,
            release_month = ?, release_year = ?, release_date = ?, last_updated = ?
        WHERE external_key = ?
        "#,
    )
    .bind(&record.label)
    .bind(&record.version)
    .bind(&record.description)
    .bind(&record.tower)
    .bind(&record.app_group)
    .bind(&record.component_type)
    .bind(record.status.as_str())
    .bind(record.complexity.as_str())
    .bind(&record.change_type)
    .bind(record.release_month as i64)
    .bind(record.release_year as i64)
    .bind(record.release_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(Utc::now().to_rfc3339())
    .bind(external_key)
    .execute(conn)
    .await?;

    Ok(())
}

/// Load one component by row id
pub async fn get_component(pool: &SqlitePool, id: i64) -> Result<Option<StoredComponent>> {
    let row = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM components WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_component).transpose()
}

/// Load one component by business key
pub async fn get_by_external_key(
    pool: &SqlitePool,
    external_key: &str,
) -> Result<Option<StoredComponent>> {
    let row = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM components WHERE external_key = ?"
    ))
    .bind(external_key)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_component).transpose()
}

/// List components, filtered, newest change first
pub async fn list_components(
    pool: &SqlitePool,
    filter: &ComponentFilter,
) -> Result<Vec<StoredComponent>> {
    let mut sql = format!("SELECT {SELECT_COLUMNS} FROM components WHERE 1=1");
    let mut binds: Vec<String> = Vec::new();

    if let Some(search) = &filter.search {
        sql.push_str(
            " AND (label LIKE ? OR description LIKE ? OR external_key LIKE ? OR app_group LIKE ?)",
        );
        let pattern = format!("%{}%", search);
        binds.extend([pattern.clone(), pattern.clone(), pattern.clone(), pattern]);
    }
    if let Some(tower) = &filter.tower {
        sql.push_str(" AND tower = ?");
        binds.push(tower.clone());
    }
    if let Some(status) = &filter.status {
        sql.push_str(" AND status = ?");
        binds.push(status.clone());
    }
    if let Some(complexity) = &filter.complexity {
        sql.push_str(" AND complexity = ?");
        binds.push(complexity.clone());
    }
    if let Some(year) = filter.year {
        sql.push_str(" AND release_year = ?");
        binds.push(year.to_string());
    }
    if let Some(month) = filter.month {
        sql.push_str(" AND release_month = ?");
        binds.push(month.to_string());
    }

    sql.push_str(" ORDER BY last_updated DESC");

    let mut query = sqlx::query(&sql);
    for bind in &binds {
        query = query.bind(bind);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_component).collect()
}

/// Load every component ordered by key, for export
pub async fn load_all_components(pool: &SqlitePool) -> Result<Vec<StoredComponent>> {
    let rows = sqlx::query(&format!(
        "SELECT {SELECT_COLUMNS} FROM components ORDER BY external_key"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_component).collect()
}

/// Delete a component by row id; false when no such row
pub async fn delete_component(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM components WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Count all components
pub async fn count_components(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM components")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
