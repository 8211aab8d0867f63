//! Dining table queries

use shared::models::{DiningTable, TableStatus};
use sqlx::{PgConnection, PgExecutor};

use super::BoxError;

pub async fn list_tables(exec: impl PgExecutor<'_>) -> Result<Vec<DiningTable>, BoxError> {
    let rows: Vec<DiningTable> = sqlx::query_as(
        r#"
        SELECT id, name, capacity, status, location, is_active
        FROM dining_tables
        ORDER BY capacity, id
        "#,
    )
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

pub async fn find_table(exec: impl PgExecutor<'_>, id: i64) -> Result<Option<DiningTable>, BoxError> {
    let row: Option<DiningTable> = sqlx::query_as(
        "SELECT id, name, capacity, status, location, is_active FROM dining_tables WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}

/// Lock one table row for the rest of the transaction
pub async fn lock_table(conn: &mut PgConnection, id: i64) -> Result<Option<DiningTable>, BoxError> {
    let row: Option<DiningTable> = sqlx::query_as(
        r#"
        SELECT id, name, capacity, status, location, is_active
        FROM dining_tables
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Lock every active table that could seat `party_size`, plus `also`
///
/// `also` is the table a rescheduled booking currently sits on, so it is
/// locked in the same id-ordered pass as the candidates. Rows are always
/// locked in id order so concurrent bookings cannot deadlock on each other.
pub async fn lock_tables_for_party(
    conn: &mut PgConnection,
    party_size: i32,
    also: Option<i64>,
) -> Result<Vec<DiningTable>, BoxError> {
    let rows: Vec<DiningTable> = sqlx::query_as(
        r#"
        SELECT id, name, capacity, status, location, is_active
        FROM dining_tables
        WHERE (is_active AND capacity >= $1) OR id = $2
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(party_size)
    .bind(also)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Lock the given tables in id order
pub async fn lock_tables_by_ids(
    conn: &mut PgConnection,
    ids: &[i64],
) -> Result<Vec<DiningTable>, BoxError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<DiningTable> = sqlx::query_as(
        r#"
        SELECT id, name, capacity, status, location, is_active
        FROM dining_tables
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Lock all tables (sweeper pass)
pub async fn lock_all_tables(conn: &mut PgConnection) -> Result<Vec<DiningTable>, BoxError> {
    let rows: Vec<DiningTable> = sqlx::query_as(
        r#"
        SELECT id, name, capacity, status, location, is_active
        FROM dining_tables
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn set_status(
    exec: impl PgExecutor<'_>,
    id: i64,
    status: TableStatus,
    now: i64,
) -> Result<bool, BoxError> {
    let rows = sqlx::query("UPDATE dining_tables SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Move tables from `from` to `to`; rows no longer in `from` are skipped
pub async fn transition_many(
    conn: &mut PgConnection,
    ids: &[i64],
    from: TableStatus,
    to: TableStatus,
    now: i64,
) -> Result<u64, BoxError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let rows = sqlx::query(
        r#"
        UPDATE dining_tables SET status = $1, updated_at = $2
        WHERE id = ANY($3) AND status = $4
        "#,
    )
    .bind(to.as_str())
    .bind(now)
    .bind(ids)
    .bind(from.as_str())
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}
