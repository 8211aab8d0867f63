//! Booking transactions and sweeps against a real PostgreSQL
//!
//! Each test gets a fresh database with the crate migrations applied
//! (`DATABASE_URL` must point at a server the test user can create
//! databases on).

use std::time::Duration;

use reservation_server::booking::BookingRules;
use reservation_server::scheduler::TableSweeper;
use reservation_server::services::booking;
use reservation_server::{AppState, ServiceError, db};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityQuery, CustomerInput, PreOrderItem, ReservationCreate, ReservationStatus,
    ReservationUpdate, TableStatus,
};
use shared::util::{MINUTE_MS, now_millis};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const HOUR_MS: i64 = 60 * MINUTE_MS;

fn state(pool: PgPool) -> AppState {
    AppState::with_pool(pool, BookingRules::default())
}

fn code(err: ServiceError) -> ErrorCode {
    AppError::from(err).code
}

async fn seed_table(pool: &PgPool, id: i64, capacity: i32, status: TableStatus) {
    sqlx::query("INSERT INTO dining_tables (id, name, capacity, status) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("T{id}"))
        .bind(capacity)
        .bind(status.as_str())
        .execute(pool)
        .await
        .unwrap();
}

async fn seed_menu_item(pool: &PgPool, id: i64, cents: i64, available: bool) {
    sqlx::query("INSERT INTO menu_items (id, name, price, is_available) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("Dish {id}"))
        .bind(Decimal::new(cents, 2))
        .bind(available)
        .execute(pool)
        .await
        .unwrap();
}

/// Insert a booking as it would look after the fact, bypassing the
/// past-start check, with an optional PENDING pre-order
async fn seed_reservation(
    pool: &PgPool,
    id: i64,
    table_id: i64,
    start_at: i64,
    end_at: i64,
    status: ReservationStatus,
    order_id: Option<i64>,
) {
    sqlx::query(
        "INSERT INTO customers (id, name, phone, created_at) VALUES ($1, 'Walk In', $2, 0)",
    )
    .bind(id)
    .bind(format!("+1555{id:07}"))
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        r#"
        INSERT INTO reservations
            (id, table_id, customer_id, party_size, start_at, end_at, status, created_at, updated_at)
        VALUES ($1, $2, $1, 2, $3, $4, $5, 0, 0)
        "#,
    )
    .bind(id)
    .bind(table_id)
    .bind(start_at)
    .bind(end_at)
    .bind(status.as_str())
    .execute(pool)
    .await
    .unwrap();

    if let Some(order_id) = order_id {
        sqlx::query(
            r#"
            INSERT INTO orders (id, reservation_id, customer_id, table_id, status, total, created_at)
            VALUES ($1, $2, $2, $3, 'PENDING', 0, 0)
            "#,
        )
        .bind(order_id)
        .bind(id)
        .bind(table_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("UPDATE reservations SET order_id = $1 WHERE id = $2")
            .bind(order_id)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }
}

fn request(phone: &str, party_size: i32, start_at: i64, table_id: Option<i64>) -> ReservationCreate {
    ReservationCreate {
        customer: CustomerInput {
            name: "Ana Ruiz".to_string(),
            phone: phone.to_string(),
            email: None,
        },
        party_size,
        start_at,
        end_at: None,
        table_id,
        note: None,
        pre_order: Vec::new(),
    }
}

fn line(menu_item_id: i64, quantity: i32) -> PreOrderItem {
    PreOrderItem {
        menu_item_id,
        quantity,
        note: None,
    }
}

async fn table_status(pool: &PgPool, id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM dining_tables WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn reservation_status(pool: &PgPool, id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM reservations WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn order_status(pool: &PgPool, id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

// ========================================================================
// Double booking
// ========================================================================

#[sqlx::test(migrations = "./migrations")]
async fn second_booking_for_only_table_is_refused(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    let state = state(pool.clone());
    let start = now_millis() + 3 * HOUR_MS;

    let first = booking::create_reservation(&state, request("+34 600 000 001", 2, start, None))
        .await
        .unwrap();
    assert_eq!(first.reservation.table_id, 1);
    assert_eq!(first.reservation.end_at, start + 2 * HOUR_MS);

    // Overlapping by half an hour
    let err = booking::create_reservation(
        &state,
        request("+34 600 000 002", 2, start + HOUR_MS + 30 * MINUTE_MS, None),
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::NoTableAvailable);

    let err = booking::create_reservation(&state, request("+34 600 000 002", 2, start, Some(1)))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::ReservationConflict);

    // Touching windows share the table
    let next = booking::create_reservation(
        &state,
        request("+34 600 000 002", 2, start + 2 * HOUR_MS, None),
    )
    .await
    .unwrap();
    assert_eq!(next.reservation.table_id, 1);
    assert_eq!(count(&pool, "reservations").await, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_bookings_get_one_table(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    let state = state(pool.clone());
    let start = now_millis() + 3 * HOUR_MS;

    let (a, b) = tokio::join!(
        booking::create_reservation(&state, request("+34 600 000 001", 2, start, None)),
        booking::create_reservation(&state, request("+34 600 000 002", 3, start, None)),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let loser = if let Err(e) = a { e } else { b.unwrap_err() };
    assert_eq!(code(loser), ErrorCode::NoTableAvailable);
    assert_eq!(count(&pool, "reservations").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn first_fit_takes_smallest_table_that_seats_party(pool: PgPool) {
    seed_table(&pool, 1, 6, TableStatus::Free).await;
    seed_table(&pool, 2, 2, TableStatus::Free).await;
    seed_table(&pool, 3, 4, TableStatus::Free).await;
    seed_table(&pool, 4, 4, TableStatus::Free).await;
    let state = state(pool);
    let start = now_millis() + 3 * HOUR_MS;

    let first = booking::create_reservation(&state, request("+34 600 000 001", 3, start, None))
        .await
        .unwrap();
    assert_eq!(first.reservation.table_id, 3);
    assert_eq!(first.table_name, "T3");

    let second = booking::create_reservation(&state, request("+34 600 000 002", 3, start, None))
        .await
        .unwrap();
    assert_eq!(second.reservation.table_id, 4);

    let err = booking::create_reservation(&state, request("+34 600 000 003", 5, start, Some(3)))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::TableCapacityExceeded);
}

// ========================================================================
// Pre-orders
// ========================================================================

#[sqlx::test(migrations = "./migrations")]
async fn pre_order_failure_rolls_back_whole_booking(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    seed_menu_item(&pool, 10, 1250, true).await;
    seed_menu_item(&pool, 11, 900, false).await;
    let state = state(pool.clone());
    let start = now_millis() + 3 * HOUR_MS;

    let mut unavailable = request("+34 600 000 001", 2, start, None);
    unavailable.pre_order = vec![line(10, 1), line(11, 1)];
    let err = booking::create_reservation(&state, unavailable).await.unwrap_err();
    assert_eq!(code(err), ErrorCode::MenuItemUnavailable);

    let mut missing = request("+34 600 000 001", 2, start, None);
    missing.pre_order = vec![line(10, 1), line(99, 1)];
    let err = booking::create_reservation(&state, missing).await.unwrap_err();
    assert_eq!(code(err), ErrorCode::MenuItemNotFound);

    assert_eq!(count(&pool, "reservations").await, 0);
    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "order_items").await, 0);
    assert_eq!(count(&pool, "customers").await, 0);

    // The table is still bookable for the same window
    let mut valid = request("+34 600 000 001", 2, start, None);
    valid.pre_order = vec![line(10, 2), line(10, 1)];
    let result = booking::create_reservation(&state, valid).await.unwrap();
    let order = result.order.unwrap();
    assert_eq!(order.order.total, Decimal::new(3750, 2));
    assert_eq!(order.items.len(), 2);
    assert_ne!(order.items[0].id, order.items[1].id);
    assert_eq!(result.reservation.order_id, Some(order.order.id));
    assert_eq!(count(&pool, "order_items").await, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn pre_order_follows_reservation_outcome(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    seed_table(&pool, 2, 4, TableStatus::Free).await;
    seed_menu_item(&pool, 10, 1250, true).await;
    let state = state(pool.clone());
    let now = now_millis();

    let mut cancelled = request("+34 600 000 001", 2, now + 3 * HOUR_MS, Some(1));
    cancelled.pre_order = vec![line(10, 1)];
    let cancelled = booking::create_reservation(&state, cancelled).await.unwrap();
    let cancelled_order = cancelled.reservation.order_id.unwrap();

    let mut eaten = request("+34 600 000 002", 2, now + 10 * MINUTE_MS, Some(2));
    eaten.pre_order = vec![line(10, 2)];
    let eaten = booking::create_reservation(&state, eaten).await.unwrap();
    let eaten_order = eaten.reservation.order_id.unwrap();

    booking::transition_reservation(&state, cancelled.reservation.id, ReservationStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order_status(&pool, cancelled_order).await, "CANCELLED");

    // Completing needs a seated party first
    let err =
        booking::transition_reservation(&state, eaten.reservation.id, ReservationStatus::Completed)
            .await
            .unwrap_err();
    assert_eq!(code(err), ErrorCode::InvalidStatusTransition);
    assert_eq!(order_status(&pool, eaten_order).await, "PENDING");

    booking::transition_reservation(&state, eaten.reservation.id, ReservationStatus::Seated)
        .await
        .unwrap();
    booking::transition_reservation(&state, eaten.reservation.id, ReservationStatus::Completed)
        .await
        .unwrap();
    assert_eq!(order_status(&pool, eaten_order).await, "COMPLETED");
    assert_eq!(reservation_status(&pool, eaten.reservation.id).await, "COMPLETED");
    assert_eq!(table_status(&pool, 2).await, "FREE");
}

// ========================================================================
// Table status
// ========================================================================

#[sqlx::test(migrations = "./migrations")]
async fn maintenance_refused_while_table_has_bookings(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    seed_table(&pool, 2, 4, TableStatus::Free).await;
    let state = state(pool.clone());
    let start = now_millis() + 3 * HOUR_MS;

    booking::create_reservation(&state, request("+34 600 000 001", 2, start, Some(1)))
        .await
        .unwrap();

    let err = booking::set_table_status(&state, 1, TableStatus::Maintenance)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::TableHasReservations);
    assert_eq!(table_status(&pool, 1).await, "FREE");

    let table = booking::set_table_status(&state, 2, TableStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(table.status, TableStatus::Maintenance);

    let query = AvailabilityQuery {
        party_size: 2,
        start_at: start + 4 * HOUR_MS,
        end_at: None,
    };
    let free: Vec<i64> = booking::availability(&state, &query)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(free, vec![1]);

    let err = booking::create_reservation(
        &state,
        request("+34 600 000 002", 2, start + 4 * HOUR_MS, Some(2)),
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::TableUnderMaintenance);

    let err = booking::set_table_status(&state, 42, TableStatus::Free)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::TableNotFound);
}

#[sqlx::test(migrations = "./migrations")]
async fn imminent_booking_reserves_table_immediately(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    let state = state(pool.clone());

    let booked = booking::create_reservation(
        &state,
        request("+34 600 000 001", 2, now_millis() + 10 * MINUTE_MS, None),
    )
    .await
    .unwrap();
    assert_eq!(table_status(&pool, 1).await, "RESERVED");

    booking::transition_reservation(&state, booked.reservation.id, ReservationStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(table_status(&pool, 1).await, "FREE");

    let err = booking::transition_reservation(
        &state,
        booked.reservation.id,
        ReservationStatus::Confirmed,
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::InvalidStatusTransition);
}

// ========================================================================
// Reschedule
// ========================================================================

#[sqlx::test(migrations = "./migrations")]
async fn reschedule_keeps_table_or_falls_back(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    seed_table(&pool, 2, 4, TableStatus::Free).await;
    let state = state(pool);
    let start = now_millis() + 3 * HOUR_MS;

    let moving = booking::create_reservation(&state, request("+34 600 000 001", 2, start, None))
        .await
        .unwrap();
    assert_eq!(moving.reservation.table_id, 1);
    let later = booking::create_reservation(
        &state,
        request("+34 600 000 002", 2, start + 4 * HOUR_MS, Some(1)),
    )
    .await
    .unwrap();

    let kept = booking::reschedule_reservation(
        &state,
        moving.reservation.id,
        ReservationUpdate {
            note: Some("window seat".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(kept.reservation.table_id, 1);
    assert_eq!(kept.reservation.note.as_deref(), Some("window seat"));

    // Only the start moves: duration kept, table 1 is taken then
    let moved = booking::reschedule_reservation(
        &state,
        moving.reservation.id,
        ReservationUpdate {
            start_at: Some(later.reservation.start_at + 30 * MINUTE_MS),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(moved.reservation.table_id, 2);
    assert_eq!(
        moved.reservation.end_at - moved.reservation.start_at,
        2 * HOUR_MS
    );
    assert_eq!(moved.reservation.note.as_deref(), Some("window seat"));

    let err = booking::reschedule_reservation(
        &state,
        moving.reservation.id,
        ReservationUpdate {
            table_id: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::ReservationConflict);

    let err = booking::reschedule_reservation(&state, 777, ReservationUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::ReservationNotFound);
}

#[sqlx::test(migrations = "./migrations")]
async fn seated_reservation_cannot_move(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    seed_table(&pool, 2, 4, TableStatus::Free).await;
    let state = state(pool);
    let start = now_millis() + 10 * MINUTE_MS;

    let booked = booking::create_reservation(&state, request("+34 600 000 001", 2, start, None))
        .await
        .unwrap();
    let id = booked.reservation.id;
    booking::transition_reservation(&state, id, ReservationStatus::Seated)
        .await
        .unwrap();

    let err = booking::reschedule_reservation(
        &state,
        id,
        ReservationUpdate {
            start_at: Some(start + HOUR_MS),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::InvalidStatusTransition);

    let err = booking::reschedule_reservation(
        &state,
        id,
        ReservationUpdate {
            table_id: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::InvalidStatusTransition);

    let grown = booking::reschedule_reservation(
        &state,
        id,
        ReservationUpdate {
            party_size: Some(4),
            note: Some("two more joined".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(grown.reservation.party_size, 4);
    assert_eq!(grown.reservation.table_id, 1);
    assert_eq!(grown.reservation.status, ReservationStatus::Seated);
}

// ========================================================================
// Sweep
// ========================================================================

#[sqlx::test(migrations = "./migrations")]
async fn sweep_closes_overdue_bookings_and_syncs_tables(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Reserved).await;
    seed_table(&pool, 2, 4, TableStatus::Reserved).await;
    seed_table(&pool, 3, 4, TableStatus::Free).await;
    seed_table(&pool, 4, 4, TableStatus::Maintenance).await;
    let now = now_millis();

    seed_reservation(&pool, 101, 1, now - 3 * HOUR_MS, now - HOUR_MS, ReservationStatus::Seated, Some(901)).await;
    seed_reservation(&pool, 102, 2, now - 3 * HOUR_MS, now - HOUR_MS, ReservationStatus::Confirmed, Some(902)).await;
    seed_reservation(&pool, 103, 3, now + 10 * MINUTE_MS, now + 2 * HOUR_MS, ReservationStatus::Pending, None).await;
    seed_reservation(&pool, 104, 4, now + 10 * MINUTE_MS, now + 2 * HOUR_MS, ReservationStatus::Pending, None).await;

    let sweeper = TableSweeper::new(state(pool.clone()), CancellationToken::new(), 60);
    let plan = sweeper.sweep_once().await.unwrap();

    assert_eq!(plan.complete, vec![101]);
    assert_eq!(plan.no_show, vec![102]);
    assert_eq!(plan.promote, vec![3]);
    assert_eq!(plan.release, vec![1, 2]);

    assert_eq!(reservation_status(&pool, 101).await, "COMPLETED");
    assert_eq!(order_status(&pool, 901).await, "COMPLETED");
    assert_eq!(reservation_status(&pool, 102).await, "NO_SHOW");
    assert_eq!(order_status(&pool, 902).await, "CANCELLED");
    assert_eq!(reservation_status(&pool, 103).await, "PENDING");

    assert_eq!(table_status(&pool, 1).await, "FREE");
    assert_eq!(table_status(&pool, 2).await, "FREE");
    assert_eq!(table_status(&pool, 3).await, "RESERVED");
    assert_eq!(table_status(&pool, 4).await, "MAINTENANCE");

    // Second pass finds nothing left to do
    assert!(sweeper.sweep_once().await.unwrap().is_empty());
}

/// A lifecycle change holds its reservation and then wants the table;
/// the sweeper must queue behind the reservation without holding tables.
#[sqlx::test(migrations = "./migrations")]
async fn sweep_waits_behind_reservation_lock_without_deadlock(pool: PgPool) {
    seed_table(&pool, 1, 4, TableStatus::Free).await;
    let now = now_millis();
    seed_reservation(&pool, 201, 1, now + 10 * MINUTE_MS, now + 2 * HOUR_MS, ReservationStatus::Pending, None).await;

    let mut tx = pool.begin().await.unwrap();
    db::reservations::lock_reservation(&mut tx, 201)
        .await
        .unwrap()
        .unwrap();

    let sweeper = TableSweeper::new(state(pool.clone()), CancellationToken::new(), 60);
    let sweep = tokio::spawn(async move { sweeper.sweep_once().await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!sweep.is_finished());

    let table = tokio::time::timeout(Duration::from_secs(5), db::tables::lock_table(&mut tx, 1))
        .await
        .expect("table lock must not wait on the sweeper")
        .unwrap()
        .unwrap();
    assert_eq!(table.status, TableStatus::Free);
    db::reservations::set_status(&mut *tx, 201, ReservationStatus::Confirmed, now)
        .await
        .unwrap();
    db::tables::set_status(&mut *tx, 1, TableStatus::Reserved, now)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let plan = tokio::time::timeout(Duration::from_secs(5), sweep)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(plan.is_empty());
    assert_eq!(reservation_status(&pool, 201).await, "CONFIRMED");
    assert_eq!(table_status(&pool, 1).await, "RESERVED");
}
