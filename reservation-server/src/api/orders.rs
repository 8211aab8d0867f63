//! Pre-order lookup

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use shared::error::{AppError, ErrorCode};
use shared::models::OrderDetail;

use crate::db;
use crate::state::AppState;

use super::{ApiResult, internal};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders/{id}", get(get_by_id))
}

/// GET /api/orders/{id} - order with its items
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<OrderDetail> {
    let order = db::orders::find_order_detail(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", id))?;
    Ok(Json(order))
}
