//! Reservation and availability endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityQuery, BookingResult, DiningTable, Reservation, ReservationCreate,
    ReservationQuery, ReservationStatus, ReservationUpdate,
};

use crate::db;
use crate::services::booking;
use crate::state::AppState;

use super::{ApiResult, internal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/availability", get(availability))
        .route("/api/reservations", get(list).post(create))
        .route("/api/reservations/{id}", get(get_by_id).put(update))
        .route("/api/reservations/{id}/confirm", post(confirm))
        .route("/api/reservations/{id}/seat", post(seat))
        .route("/api/reservations/{id}/complete", post(complete))
        .route("/api/reservations/{id}/cancel", post(cancel))
        .route("/api/reservations/{id}/no-show", post(no_show))
}

/// GET /api/availability?party_size&start_at&end_at
pub async fn availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Vec<DiningTable>> {
    let tables = booking::availability(&state, &query).await?;
    Ok(Json(tables))
}

/// GET /api/reservations?from&to&status&table_id
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReservationQuery>,
) -> ApiResult<Vec<Reservation>> {
    let reservations = db::reservations::list_reservations(&state.pool, &query)
        .await
        .map_err(internal)?;
    Ok(Json(reservations))
}

/// POST /api/reservations
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ReservationCreate>,
) -> ApiResult<BookingResult> {
    let result = booking::create_reservation(&state, payload).await?;
    Ok(Json(result))
}

/// GET /api/reservations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Reservation> {
    let reservation = db::reservations::find_reservation(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::new(ErrorCode::ReservationNotFound).with_detail("reservation_id", id)
        })?;
    Ok(Json(reservation))
}

/// PUT /api/reservations/{id} - reschedule / resize / move
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReservationUpdate>,
) -> ApiResult<BookingResult> {
    let result = booking::reschedule_reservation(&state, id, payload).await?;
    Ok(Json(result))
}

async fn transition(state: &AppState, id: i64, target: ReservationStatus) -> ApiResult<Reservation> {
    let reservation = booking::transition_reservation(state, id, target).await?;
    Ok(Json(reservation))
}

pub async fn confirm(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Reservation> {
    transition(&state, id, ReservationStatus::Confirmed).await
}

pub async fn seat(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Reservation> {
    transition(&state, id, ReservationStatus::Seated).await
}

pub async fn complete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Reservation> {
    transition(&state, id, ReservationStatus::Completed).await
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Reservation> {
    transition(&state, id, ReservationStatus::Cancelled).await
}

pub async fn no_show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Reservation> {
    transition(&state, id, ReservationStatus::NoShow).await
}
