//! Menu item lookup for pre-orders

use shared::models::MenuItem;
use sqlx::PgExecutor;

use super::BoxError;

pub async fn find_items(exec: impl PgExecutor<'_>, ids: &[i64]) -> Result<Vec<MenuItem>, BoxError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<MenuItem> = sqlx::query_as(
        "SELECT id, name, price, is_available FROM menu_items WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}
