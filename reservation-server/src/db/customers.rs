//! Customer lookup

use shared::models::{Customer, CustomerInput};
use sqlx::PgConnection;

use super::BoxError;

/// Find the customer by normalized phone, creating it on first booking
///
/// A returning customer keeps their id; name and e-mail are refreshed from
/// the latest booking.
pub async fn find_or_create(
    conn: &mut PgConnection,
    input: &CustomerInput,
    now: i64,
) -> Result<Customer, BoxError> {
    let customer: Customer = sqlx::query_as(
        r#"
        INSERT INTO customers (id, name, phone, email, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (phone) DO UPDATE SET
            name = EXCLUDED.name,
            email = COALESCE(EXCLUDED.email, customers.email)
        RETURNING id, name, phone, email, created_at
        "#,
    )
    .bind(shared::util::snowflake_id())
    .bind(input.name.trim())
    .bind(input.normalized_phone())
    .bind(input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()))
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(customer)
}
