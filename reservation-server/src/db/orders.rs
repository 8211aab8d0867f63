//! Pre-order persistence

use shared::models::{Order, OrderDetail, OrderItem, OrderStatus};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::BoxError;

/// Insert an order together with its items
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &Order,
    items: &[OrderItem],
) -> Result<(), BoxError> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, reservation_id, customer_id, table_id, status, total, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(order.id)
    .bind(order.reservation_id)
    .bind(order.customer_id)
    .bind(order.table_id)
    .bind(order.status.as_str())
    .bind(order.total)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;

    for item in items {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, menu_item_id, name, quantity, unit_price, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.menu_item_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.note)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Move pending orders to `status`; settled orders are left alone
pub async fn settle_orders(
    exec: impl PgExecutor<'_>,
    ids: &[i64],
    status: OrderStatus,
) -> Result<u64, BoxError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let rows = sqlx::query("UPDATE orders SET status = $1 WHERE id = ANY($2) AND status = 'PENDING'")
        .bind(status.as_str())
        .bind(ids)
        .execute(exec)
        .await?;
    Ok(rows.rows_affected())
}

pub async fn find_order_detail(pool: &PgPool, id: i64) -> Result<Option<OrderDetail>, BoxError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT id, reservation_id, customer_id, table_id, status, total, created_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(order) = order else {
        return Ok(None);
    };

    let items: Vec<OrderItem> = sqlx::query_as(
        r#"
        SELECT id, order_id, menu_item_id, name, quantity, unit_price, note
        FROM order_items
        WHERE order_id = $1
        ORDER BY id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(OrderDetail { order, items }))
}
