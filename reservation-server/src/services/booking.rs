//! Booking orchestration
//!
//! Every write runs in one transaction:
//! 1. Validate the request (pure rules, no I/O)
//! 2. Lock the affected table rows `FOR UPDATE`
//! 3. Re-read overlapping reservations under the lock and decide
//! 4. Write reservation / order / table status
//! 5. Commit, audit, nudge the sweeper
//!
//! Locking the candidate tables before the overlap check serializes two
//! bookings racing for the same table; the loser sees the winner's row.
//!
//! Lock order, shared with the sweeper: customer, reservation, tables (one
//! id-ordered batch), orders. A transaction never locks a table and then
//! a reservation.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AvailabilityQuery, BookingResult, DiningTable, Order, OrderDetail, OrderItem, OrderStatus,
    PreOrderItem, Reservation, ReservationCreate, ReservationStatus, ReservationUpdate,
    TableStatus,
};
use shared::util::{format_millis, now_millis, snowflake_id};
use sqlx::PgConnection;

use crate::audit_log;
use crate::booking::allocator::check_requested_table;
use crate::booking::rules::{check_customer, check_pre_order};
use crate::booking::sweep::has_imminent_reservation;
use crate::booking::{SeatRequest, TimeWindow, assign_table, available_tables};
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// Book a table for a party
pub async fn create_reservation(
    state: &AppState,
    payload: ReservationCreate,
) -> ServiceResult<BookingResult> {
    let rules = &state.rules;
    let now = now_millis();

    // 1. Validate
    rules.check_party_size(payload.party_size)?;
    let window = rules.resolve_window(payload.start_at, payload.end_at, now)?;
    check_customer(&payload.customer)?;
    check_pre_order(&payload.pre_order)?;
    let request = SeatRequest {
        party_size: payload.party_size,
        window,
        exclude_reservation: None,
    };

    let mut tx = state.pool.begin().await?;

    // 2. Customer
    let customer = db::customers::find_or_create(&mut tx, &payload.customer, now).await?;

    // 3. Lock candidates, then pick a table against a fresh snapshot
    let tables = lock_candidates(&mut tx, payload.table_id, payload.party_size, None).await?;
    let table_ids: Vec<i64> = tables.iter().map(|t| t.id).collect();
    let existing = db::reservations::active_overlapping(&mut *tx, &table_ids, &window).await?;
    let table = assign_table(&tables, &existing, &request, payload.table_id)?.clone();

    // 4. Reservation
    let mut reservation = Reservation {
        id: snowflake_id(),
        table_id: table.id,
        customer_id: customer.id,
        party_size: payload.party_size,
        start_at: window.start(),
        end_at: window.end(),
        status: ReservationStatus::Pending,
        note: payload.note.filter(|n| !n.trim().is_empty()),
        order_id: None,
        created_at: now,
        updated_at: now,
    };
    db::reservations::insert_reservation(&mut tx, &reservation).await?;

    // 5. Optional pre-order
    let order = if payload.pre_order.is_empty() {
        None
    } else {
        let detail = create_pre_order(&mut tx, &reservation, &payload.pre_order, now).await?;
        db::reservations::attach_order(&mut tx, reservation.id, detail.order.id).await?;
        reservation.order_id = Some(detail.order.id);
        Some(detail)
    };

    // 6. Hold the table right away when the booking is already imminent
    sync_table_status(&mut tx, table.id, now, rules.lookahead_ms()).await?;

    tx.commit().await?;

    tracing::info!(
        reservation_id = reservation.id,
        table_id = table.id,
        party_size = reservation.party_size,
        start_at = %format_millis(reservation.start_at),
        end_at = %format_millis(reservation.end_at),
        "Reservation created"
    );
    audit_log!(
        "reservation.create",
        format!("reservation:{}", reservation.id),
        format!("table={} party={}", table.id, reservation.party_size)
    );
    state.nudge_sweeper();

    Ok(BookingResult {
        reservation,
        table_name: table.name,
        order,
    })
}

/// Move a reservation in time, resize the party or switch tables
///
/// Without an explicit table the current one is kept when it still fits;
/// otherwise first-fit picks a new one.
pub async fn reschedule_reservation(
    state: &AppState,
    id: i64,
    update: ReservationUpdate,
) -> ServiceResult<BookingResult> {
    let rules = &state.rules;
    let now = now_millis();

    let mut tx = state.pool.begin().await?;

    let current = db::reservations::lock_reservation(&mut tx, id)
        .await?
        .ok_or_else(|| reservation_not_found(id))?;

    if current.status.is_terminal() {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Reservation is {} and can no longer be changed", current.status),
        )
        .with_detail("reservation_id", id)
        .with_detail("status", current.status.as_str())
        .into());
    }

    let party_size = update.party_size.unwrap_or(current.party_size);
    rules.check_party_size(party_size)?;

    let moves_in_time = update.start_at.is_some_and(|s| s != current.start_at)
        || update.end_at.is_some_and(|e| e != current.end_at);
    let window = if moves_in_time {
        if current.status == ReservationStatus::Seated {
            return Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                "A seated reservation cannot be moved",
            )
            .with_detail("reservation_id", id)
            .into());
        }
        let start_at = update.start_at.unwrap_or(current.start_at);
        // Moving only the start keeps the booked duration
        let end_at = update
            .end_at
            .unwrap_or_else(|| shifted_end(&current, start_at));
        rules.resolve_window(start_at, Some(end_at), now)?
    } else {
        TimeWindow::of(&current)
    };

    let request = SeatRequest {
        party_size,
        window,
        exclude_reservation: Some(id),
    };

    let tables =
        lock_candidates(&mut tx, update.table_id, party_size, Some(current.table_id)).await?;
    let table_ids: Vec<i64> = tables.iter().map(|t| t.id).collect();
    let existing = db::reservations::active_overlapping(&mut *tx, &table_ids, &window).await?;

    let table = match update.table_id {
        Some(_) => assign_table(&tables, &existing, &request, update.table_id)?,
        None => match tables
            .iter()
            .find(|t| t.id == current.table_id)
            .filter(|t| check_requested_table(t, &existing, &request).is_ok())
        {
            Some(same) => same,
            None => assign_table(&tables, &existing, &request, None)?,
        },
    }
    .clone();

    if table.id != current.table_id && current.status == ReservationStatus::Seated {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            "A seated reservation cannot change tables",
        )
        .with_detail("reservation_id", id)
        .into());
    }

    let reservation = Reservation {
        table_id: table.id,
        party_size,
        start_at: window.start(),
        end_at: window.end(),
        note: update.note.or(current.note.clone()),
        updated_at: now,
        ..current.clone()
    };
    db::reservations::update_reservation(&mut tx, &reservation).await?;

    let lookahead_ms = rules.lookahead_ms();
    sync_table_status(&mut tx, reservation.table_id, now, lookahead_ms).await?;
    if current.table_id != reservation.table_id {
        sync_table_status(&mut tx, current.table_id, now, lookahead_ms).await?;
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id = id,
        from_table = current.table_id,
        to_table = reservation.table_id,
        start_at = %format_millis(reservation.start_at),
        end_at = %format_millis(reservation.end_at),
        "Reservation rescheduled"
    );
    audit_log!(
        "reservation.update",
        format!("reservation:{id}"),
        format!(
            "table={}->{} party={}",
            current.table_id, reservation.table_id, reservation.party_size
        )
    );
    state.nudge_sweeper();

    let order = match reservation.order_id {
        Some(order_id) => db::orders::find_order_detail(&state.pool, order_id).await?,
        None => None,
    };

    Ok(BookingResult {
        reservation,
        table_name: table.name,
        order,
    })
}

/// Move a reservation along its lifecycle
pub async fn transition_reservation(
    state: &AppState,
    id: i64,
    target: ReservationStatus,
) -> ServiceResult<Reservation> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let current = db::reservations::lock_reservation(&mut tx, id)
        .await?
        .ok_or_else(|| reservation_not_found(id))?;

    if !current.status.can_transition_to(target) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot change reservation from {} to {}", current.status, target),
        )
        .with_detail("reservation_id", id)
        .with_detail("from", current.status.as_str())
        .with_detail("to", target.as_str())
        .into());
    }

    if target == ReservationStatus::Seated && current.end_at <= now {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            "Reservation window has already passed",
        )
        .with_detail("reservation_id", id)
        .into());
    }

    db::reservations::set_status(&mut *tx, id, target, now).await?;
    sync_table_status(&mut tx, current.table_id, now, state.rules.lookahead_ms()).await?;

    if let Some(order_id) = current.order_id {
        let order_status = match target {
            ReservationStatus::Completed => Some(OrderStatus::Completed),
            ReservationStatus::Cancelled | ReservationStatus::NoShow => Some(OrderStatus::Cancelled),
            _ => None,
        };
        if let Some(order_status) = order_status {
            db::orders::settle_orders(&mut *tx, &[order_id], order_status).await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id = id,
        table_id = current.table_id,
        from = %current.status,
        to = %target,
        "Reservation status changed"
    );
    audit_log!(
        "reservation.status",
        format!("reservation:{id}"),
        format!("{}->{}", current.status, target)
    );
    state.nudge_sweeper();

    Ok(Reservation {
        status: target,
        updated_at: now,
        ..current
    })
}

/// Change a table's status by hand
///
/// Maintenance is refused while the table still has bookings ahead.
pub async fn set_table_status(
    state: &AppState,
    table_id: i64,
    status: TableStatus,
) -> ServiceResult<DiningTable> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let table = db::tables::lock_table(&mut tx, table_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::TableNotFound).with_detail("table_id", table_id))?;

    if table.status == status {
        return Ok(table);
    }

    if status == TableStatus::Maintenance {
        let upcoming = db::reservations::active_for_table(&mut *tx, table_id, now).await?;
        if let Some(first) = upcoming.first() {
            return Err(AppError::with_message(
                ErrorCode::TableHasReservations,
                format!("Table {} has {} upcoming reservation(s)", table.name, upcoming.len()),
            )
            .with_detail("table_id", table_id)
            .with_detail("reservation_id", first.id)
            .with_detail("count", upcoming.len())
            .into());
        }
    }

    db::tables::set_status(&mut *tx, table_id, status, now).await?;
    tx.commit().await?;

    tracing::info!(table_id, from = %table.status, to = %status, "Table status changed");
    audit_log!(
        "table.status",
        format!("table:{table_id}"),
        format!("{}->{}", table.status, status)
    );
    state.nudge_sweeper();

    Ok(DiningTable { status, ..table })
}

/// Tables that can take the party for the whole window, smallest first
pub async fn availability(
    state: &AppState,
    query: &AvailabilityQuery,
) -> ServiceResult<Vec<DiningTable>> {
    let rules = &state.rules;
    rules.check_party_size(query.party_size)?;
    let window = rules.resolve_window(query.start_at, query.end_at, now_millis())?;

    let tables = db::tables::list_tables(&state.pool).await?;
    let table_ids: Vec<i64> = tables.iter().map(|t| t.id).collect();
    let existing = db::reservations::active_overlapping(&state.pool, &table_ids, &window).await?;

    let request = SeatRequest {
        party_size: query.party_size,
        window,
        exclude_reservation: None,
    };
    Ok(available_tables(&tables, &existing, &request)
        .into_iter()
        .cloned()
        .collect())
}

/// Lock the requested table, or every table big enough for the party
///
/// `current` (the table a rescheduled booking sits on) joins the same
/// id-ordered batch so its status can be synced without a second lock pass.
async fn lock_candidates(
    conn: &mut PgConnection,
    requested: Option<i64>,
    party_size: i32,
    current: Option<i64>,
) -> ServiceResult<Vec<DiningTable>> {
    let tables = match requested {
        Some(table_id) => {
            let ids: Vec<i64> = std::iter::once(table_id).chain(current).collect();
            db::tables::lock_tables_by_ids(conn, &ids).await?
        }
        None => db::tables::lock_tables_for_party(conn, party_size, current).await?,
    };
    Ok(tables)
}

/// Price the pre-order from the menu and persist it
async fn create_pre_order(
    conn: &mut PgConnection,
    reservation: &Reservation,
    lines: &[PreOrderItem],
    now: i64,
) -> ServiceResult<OrderDetail> {
    let ids: Vec<i64> = lines.iter().map(|l| l.menu_item_id).collect();
    let menu = db::menu::find_items(&mut *conn, &ids).await?;

    let order_id = snowflake_id();
    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in lines {
        let menu_item = menu
            .iter()
            .find(|m| m.id == line.menu_item_id)
            .ok_or_else(|| {
                AppError::new(ErrorCode::MenuItemNotFound)
                    .with_detail("menu_item_id", line.menu_item_id)
            })?;
        if !menu_item.is_available {
            return Err(AppError::with_message(
                ErrorCode::MenuItemUnavailable,
                format!("{} is not available", menu_item.name),
            )
            .with_detail("menu_item_id", menu_item.id)
            .into());
        }
        items.push(OrderItem {
            id: fresh_item_id(&items),
            order_id,
            menu_item_id: menu_item.id,
            name: menu_item.name.clone(),
            quantity: line.quantity,
            unit_price: menu_item.price,
            note: line.note.clone(),
        });
    }

    let order = Order {
        id: order_id,
        reservation_id: Some(reservation.id),
        customer_id: reservation.customer_id,
        table_id: reservation.table_id,
        status: OrderStatus::Pending,
        total: order_total(&items),
        created_at: now,
    };
    db::orders::insert_order(conn, &order, &items).await?;

    Ok(OrderDetail { order, items })
}

/// Snowflake id not yet used by another line of the same order
///
/// Lines created in the same millisecond only differ in the 12 random bits.
fn fresh_item_id(items: &[OrderItem]) -> i64 {
    loop {
        let id = snowflake_id();
        if items.iter().all(|item| item.id != id) {
            return id;
        }
    }
}

fn order_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::line_total).sum()
}

/// Bring a FREE/RESERVED table in line with its own bookings
///
/// Same rule the sweeper applies, evaluated for one table inside the
/// caller's transaction. Maintenance tables are left alone.
async fn sync_table_status(
    conn: &mut PgConnection,
    table_id: i64,
    now: i64,
    lookahead_ms: i64,
) -> ServiceResult<()> {
    let Some(table) = db::tables::lock_table(&mut *conn, table_id).await? else {
        return Ok(());
    };
    if table.status == TableStatus::Maintenance {
        return Ok(());
    }

    let upcoming = db::reservations::active_for_table(&mut *conn, table_id, now).await?;
    let desired = if has_imminent_reservation(table_id, &upcoming, now, lookahead_ms, None) {
        TableStatus::Reserved
    } else {
        TableStatus::Free
    };

    if desired != table.status {
        db::tables::set_status(&mut *conn, table_id, desired, now).await?;
        tracing::debug!(table_id, from = %table.status, to = %desired, "Table status synced");
    }
    Ok(())
}

/// End of `current` moved to `start_at`, duration kept
fn shifted_end(current: &Reservation, start_at: i64) -> i64 {
    start_at.saturating_add(TimeWindow::of(current).duration_ms())
}

fn reservation_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::ReservationNotFound).with_detail("reservation_id", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, cents: i64) -> OrderItem {
        OrderItem {
            id: 1,
            order_id: 1,
            menu_item_id: 1,
            name: "Croquetas".into(),
            quantity,
            unit_price: Decimal::new(cents, 2),
            note: None,
        }
    }

    #[test]
    fn test_order_total_sums_lines() {
        let items = vec![item(2, 450), item(1, 1290)];
        assert_eq!(order_total(&items), Decimal::new(2190, 2));
    }

    #[test]
    fn test_empty_order_total_is_zero() {
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_item_ids_unique_within_order() {
        const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;
        let mut items = Vec::new();
        for _ in 0..500 {
            let mut line = item(1, 100);
            line.id = fresh_item_id(&items);
            items.push(line);
        }
        let mut ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert!(ids.iter().all(|id| *id > 0 && *id <= MAX_SAFE_INTEGER));
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_shifted_end_keeps_duration_and_saturates() {
        let current = Reservation {
            id: 1,
            table_id: 1,
            customer_id: 1,
            party_size: 2,
            start_at: 1_000,
            end_at: 7_201_000,
            status: ReservationStatus::Confirmed,
            note: None,
            order_id: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(shifted_end(&current, 10_000), 7_210_000);
        assert_eq!(shifted_end(&current, i64::MAX - 5), i64::MAX);
    }

    #[test]
    fn test_not_found_carries_id() {
        let err = reservation_not_found(42);
        assert_eq!(err.code, ErrorCode::ReservationNotFound);
        assert!(err.details.is_some());
    }
}
