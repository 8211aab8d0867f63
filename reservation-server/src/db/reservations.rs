//! Reservation queries
//!
//! Active statuses (PENDING, CONFIRMED, SEATED) are inlined in the SQL so
//! the partial index on `start_at` applies.

use shared::models::{Reservation, ReservationQuery, ReservationStatus};
use sqlx::{PgConnection, PgExecutor};

use crate::booking::TimeWindow;

use super::BoxError;

pub async fn list_reservations(
    exec: impl PgExecutor<'_>,
    query: &ReservationQuery,
) -> Result<Vec<Reservation>, BoxError> {
    let rows: Vec<Reservation> = sqlx::query_as(
        r#"
        SELECT id, table_id, customer_id, party_size, start_at, end_at, status,
               note, order_id, created_at, updated_at
        FROM reservations
        WHERE ($1::BIGINT IS NULL OR end_at > $1)
          AND ($2::BIGINT IS NULL OR start_at < $2)
          AND ($3::TEXT IS NULL OR status = $3)
          AND ($4::BIGINT IS NULL OR table_id = $4)
        ORDER BY start_at, id
        LIMIT 500
        "#,
    )
    .bind(query.from)
    .bind(query.to)
    .bind(query.status.map(|s| s.as_str()))
    .bind(query.table_id)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

pub async fn find_reservation(
    exec: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<Reservation>, BoxError> {
    let row: Option<Reservation> = sqlx::query_as(
        r#"
        SELECT id, table_id, customer_id, party_size, start_at, end_at, status,
               note, order_id, created_at, updated_at
        FROM reservations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(row)
}

pub async fn lock_reservation(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Reservation>, BoxError> {
    let row: Option<Reservation> = sqlx::query_as(
        r#"
        SELECT id, table_id, customer_id, party_size, start_at, end_at, status,
               note, order_id, created_at, updated_at
        FROM reservations
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Active reservations on `table_ids` overlapping `window`
///
/// Same predicate as [`TimeWindow::overlaps`]: `start_at < end AND end_at > start`.
pub async fn active_overlapping(
    exec: impl PgExecutor<'_>,
    table_ids: &[i64],
    window: &TimeWindow,
) -> Result<Vec<Reservation>, BoxError> {
    if table_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<Reservation> = sqlx::query_as(
        r#"
        SELECT id, table_id, customer_id, party_size, start_at, end_at, status,
               note, order_id, created_at, updated_at
        FROM reservations
        WHERE table_id = ANY($1)
          AND status IN ('PENDING', 'CONFIRMED', 'SEATED')
          AND start_at < $2
          AND end_at > $3
        ORDER BY start_at, id
        "#,
    )
    .bind(table_ids)
    .bind(window.end())
    .bind(window.start())
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

/// Active reservations on one table that have not ended yet
pub async fn active_for_table(
    exec: impl PgExecutor<'_>,
    table_id: i64,
    now: i64,
) -> Result<Vec<Reservation>, BoxError> {
    let rows: Vec<Reservation> = sqlx::query_as(
        r#"
        SELECT id, table_id, customer_id, party_size, start_at, end_at, status,
               note, order_id, created_at, updated_at
        FROM reservations
        WHERE table_id = $1
          AND status IN ('PENDING', 'CONFIRMED', 'SEATED')
          AND end_at > $2
        ORDER BY start_at, id
        "#,
    )
    .bind(table_id)
    .bind(now)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

/// Lock the active reservations a sweep at `now` must look at
///
/// Anything already started or starting within the lookahead, plus every
/// seated party; later bookings cannot influence the pass. Locked in id
/// order, before any table row.
pub async fn lock_sweep_candidates(
    conn: &mut PgConnection,
    now: i64,
    lookahead_ms: i64,
) -> Result<Vec<Reservation>, BoxError> {
    let rows: Vec<Reservation> = sqlx::query_as(
        r#"
        SELECT id, table_id, customer_id, party_size, start_at, end_at, status,
               note, order_id, created_at, updated_at
        FROM reservations
        WHERE status IN ('PENDING', 'CONFIRMED', 'SEATED')
          AND (start_at <= $1 OR status = 'SEATED')
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(now.saturating_add(lookahead_ms))
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn insert_reservation(
    conn: &mut PgConnection,
    r: &Reservation,
) -> Result<(), BoxError> {
    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, table_id, customer_id, party_size, start_at, end_at, status,
            note, order_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(r.id)
    .bind(r.table_id)
    .bind(r.customer_id)
    .bind(r.party_size)
    .bind(r.start_at)
    .bind(r.end_at)
    .bind(r.status.as_str())
    .bind(&r.note)
    .bind(r.order_id)
    .bind(r.created_at)
    .bind(r.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Persist a rescheduled reservation (table, party, window, note)
pub async fn update_reservation(
    conn: &mut PgConnection,
    r: &Reservation,
) -> Result<(), BoxError> {
    sqlx::query(
        r#"
        UPDATE reservations SET
            table_id = $1, party_size = $2, start_at = $3, end_at = $4,
            note = $5, updated_at = $6
        WHERE id = $7
        "#,
    )
    .bind(r.table_id)
    .bind(r.party_size)
    .bind(r.start_at)
    .bind(r.end_at)
    .bind(&r.note)
    .bind(r.updated_at)
    .bind(r.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn attach_order(
    conn: &mut PgConnection,
    reservation_id: i64,
    order_id: i64,
) -> Result<(), BoxError> {
    sqlx::query("UPDATE reservations SET order_id = $1 WHERE id = $2")
        .bind(order_id)
        .bind(reservation_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_status(
    exec: impl PgExecutor<'_>,
    id: i64,
    status: ReservationStatus,
    now: i64,
) -> Result<(), BoxError> {
    sqlx::query("UPDATE reservations SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

/// Close out many reservations at once; rows no longer active are skipped
pub async fn close_many(
    conn: &mut PgConnection,
    ids: &[i64],
    status: ReservationStatus,
    now: i64,
) -> Result<u64, BoxError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let rows = sqlx::query(
        r#"
        UPDATE reservations SET status = $1, updated_at = $2
        WHERE id = ANY($3) AND status IN ('PENDING', 'CONFIRMED', 'SEATED')
        "#,
    )
    .bind(status.as_str())
    .bind(now)
    .bind(ids)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Orders attached to the given reservations
pub async fn order_ids_for(
    exec: impl PgExecutor<'_>,
    reservation_ids: &[i64],
) -> Result<Vec<i64>, BoxError> {
    if reservation_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT order_id FROM reservations WHERE id = ANY($1) AND order_id IS NOT NULL",
    )
    .bind(reservation_ids)
    .fetch_all(exec)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
