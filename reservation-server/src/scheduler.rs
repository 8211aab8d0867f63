//! Table status sweeper
//!
//! Promotes tables to RESERVED as their next booking enters the lookahead,
//! releases them once nothing is imminent, and closes out bookings whose
//! window has passed. Runs once at startup, then every
//! `SWEEP_INTERVAL_SECS` and whenever a booking change nudges it.

use std::sync::Arc;
use std::time::Duration;

use shared::models::{OrderStatus, ReservationStatus, TableStatus};
use shared::util::now_millis;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::audit_log;
use crate::booking::{SweepPlan, plan_sweep};
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// Registered as `TaskKind::Periodic` at startup.
pub struct TableSweeper {
    state: AppState,
    shutdown: CancellationToken,
    notify: Arc<Notify>,
    period: Duration,
}

impl TableSweeper {
    pub fn new(state: AppState, shutdown: CancellationToken, interval_secs: u64) -> Self {
        let notify = state.sweep_notify.clone();
        Self {
            state,
            shutdown,
            notify,
            period: Duration::from_secs(interval_secs),
        }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.period.as_secs(), "Table sweeper started");

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // First tick fires immediately: startup sweep
                _ = ticker.tick() => {
                    self.sweep_and_log().await;
                }
                _ = self.notify.notified() => {
                    tracing::debug!("Sweep requested by booking change");
                    self.sweep_and_log().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Table sweeper received shutdown signal");
                    return;
                }
            }
        }
    }

    async fn sweep_and_log(&self) {
        match self.sweep_once().await {
            Ok(plan) if plan.is_empty() => {
                tracing::trace!("Sweep: nothing to do");
            }
            Ok(plan) => {
                tracing::info!(
                    promoted = plan.promote.len(),
                    released = plan.release.len(),
                    completed = plan.complete.len(),
                    no_show = plan.no_show.len(),
                    "Sweep applied"
                );
            }
            Err(e) => {
                let err: shared::error::AppError = e.into();
                tracing::warn!(code = %err.code, "Sweep failed: {}", err.message);
            }
        }
    }

    /// Plan and apply one pass in a single transaction
    ///
    /// Takes row locks in the same order as the booking service:
    /// reservations, then tables, then orders.
    pub async fn sweep_once(&self) -> ServiceResult<SweepPlan> {
        let now = now_millis();
        let lookahead_ms = self.state.rules.lookahead_ms();

        let mut tx = self.state.pool.begin().await?;

        let reservations =
            db::reservations::lock_sweep_candidates(&mut tx, now, lookahead_ms).await?;
        let tables = db::tables::lock_all_tables(&mut tx).await?;
        let plan = plan_sweep(&tables, &reservations, now, lookahead_ms);
        if plan.is_empty() {
            return Ok(plan);
        }

        // 1. Close out finished bookings and settle their pre-orders
        db::reservations::close_many(&mut tx, &plan.complete, ReservationStatus::Completed, now)
            .await?;
        db::reservations::close_many(&mut tx, &plan.no_show, ReservationStatus::NoShow, now)
            .await?;
        let completed_orders = db::reservations::order_ids_for(&mut *tx, &plan.complete).await?;
        db::orders::settle_orders(&mut *tx, &completed_orders, OrderStatus::Completed).await?;
        let abandoned_orders = db::reservations::order_ids_for(&mut *tx, &plan.no_show).await?;
        db::orders::settle_orders(&mut *tx, &abandoned_orders, OrderStatus::Cancelled).await?;

        // 2. Table status
        db::tables::transition_many(
            &mut tx,
            &plan.promote,
            TableStatus::Free,
            TableStatus::Reserved,
            now,
        )
        .await?;
        db::tables::transition_many(
            &mut tx,
            &plan.release,
            TableStatus::Reserved,
            TableStatus::Free,
            now,
        )
        .await?;

        tx.commit().await?;

        for id in &plan.promote {
            audit_log!("table.promote", format!("table:{id}"));
        }
        for id in &plan.release {
            audit_log!("table.release", format!("table:{id}"));
        }
        for id in &plan.complete {
            audit_log!("reservation.complete", format!("reservation:{id}"), "sweep");
        }
        for id in &plan.no_show {
            audit_log!("reservation.no_show", format!("reservation:{id}"), "sweep");
        }

        Ok(plan)
    }
}
