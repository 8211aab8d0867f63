//! Periodic table-state reconciliation plan
//!
//! A reservation is *imminent* while it is active and
//! `start_at <= now + lookahead && end_at > now`. A SEATED party holds its
//! table until `end_at` however early it was seated. The sweep keeps
//! `dining_tables.status` in line with that:
//!
//! - FREE table with an imminent reservation → RESERVED
//! - RESERVED table without one → FREE
//! - MAINTENANCE tables are left alone
//!
//! Reservations whose window has fully passed are closed out in the same
//! pass: SEATED → COMPLETED, PENDING/CONFIRMED → NO_SHOW.

use std::collections::HashSet;

use serde::Serialize;
use shared::models::{DiningTable, Reservation, ReservationStatus, TableStatus};

/// Changes one sweep pass will apply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepPlan {
    /// Tables to mark RESERVED
    pub promote: Vec<i64>,
    /// Tables to mark FREE
    pub release: Vec<i64>,
    /// Reservations to mark COMPLETED
    pub complete: Vec<i64>,
    /// Reservations to mark NO_SHOW
    pub no_show: Vec<i64>,
}

impl SweepPlan {
    pub fn is_empty(&self) -> bool {
        self.promote.is_empty()
            && self.release.is_empty()
            && self.complete.is_empty()
            && self.no_show.is_empty()
    }
}

pub fn is_imminent(reservation: &Reservation, now: i64, lookahead_ms: i64) -> bool {
    reservation.status.is_active()
        && reservation.end_at > now
        && (reservation.status == ReservationStatus::Seated
            || reservation.start_at <= now.saturating_add(lookahead_ms))
}

/// Whether `table_id` should stay RESERVED, ignoring `except`
pub fn has_imminent_reservation(
    table_id: i64,
    reservations: &[Reservation],
    now: i64,
    lookahead_ms: i64,
    except: Option<i64>,
) -> bool {
    reservations.iter().any(|r| {
        r.table_id == table_id && Some(r.id) != except && is_imminent(r, now, lookahead_ms)
    })
}

pub fn plan_sweep(
    tables: &[DiningTable],
    reservations: &[Reservation],
    now: i64,
    lookahead_ms: i64,
) -> SweepPlan {
    let mut plan = SweepPlan::default();

    for r in reservations {
        if !r.status.is_active() || r.end_at > now {
            continue;
        }
        match r.status {
            ReservationStatus::Seated => plan.complete.push(r.id),
            _ => plan.no_show.push(r.id),
        }
    }

    let held: HashSet<i64> = reservations
        .iter()
        .filter(|r| is_imminent(r, now, lookahead_ms))
        .map(|r| r.table_id)
        .collect();

    for table in tables {
        match table.status {
            TableStatus::Free if held.contains(&table.id) => plan.promote.push(table.id),
            TableStatus::Reserved if !held.contains(&table.id) => plan.release.push(table.id),
            _ => {}
        }
    }

    plan.promote.sort_unstable();
    plan.release.sort_unstable();
    plan.complete.sort_unstable();
    plan.no_show.sort_unstable();
    plan
}
