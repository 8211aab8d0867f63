//! Dining table endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{DiningTable, Reservation, ReservationQuery, TableStatusUpdate};
use shared::util::now_millis;

use crate::db;
use crate::services::booking;
use crate::state::AppState;

use super::{ApiResult, internal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tables", get(list))
        .route("/api/tables/{id}", get(get_by_id))
        .route("/api/tables/{id}/status", put(update_status))
        .route("/api/tables/{id}/reservations", get(schedule))
}

/// GET /api/tables - all tables, smallest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<DiningTable>> {
    let tables = db::tables::list_tables(&state.pool).await.map_err(internal)?;
    Ok(Json(tables))
}

/// GET /api/tables/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DiningTable> {
    let table = db::tables::find_table(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::TableNotFound).with_detail("table_id", id))?;
    Ok(Json(table))
}

/// PUT /api/tables/{id}/status - maintenance on/off, manual hold
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TableStatusUpdate>,
) -> ApiResult<DiningTable> {
    let table = booking::set_table_status(&state, id, payload.status).await?;
    Ok(Json(table))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// Defaults to now
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// GET /api/tables/{id}/reservations - upcoming bookings on one table
pub async fn schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Vec<Reservation>> {
    let filter = ReservationQuery {
        from: Some(query.from.unwrap_or_else(now_millis)),
        to: query.to,
        status: None,
        table_id: Some(id),
    };
    let reservations = db::reservations::list_reservations(&state.pool, &filter)
        .await
        .map_err(internal)?;
    Ok(Json(reservations))
}
