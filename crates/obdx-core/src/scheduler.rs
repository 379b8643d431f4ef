// ── Scheduler facade ──
//
// The single entry point for customers and administrators. Cheaply
// cloneable (`Arc` inside); every clone shares the same store, config
// and background task set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::booking::{self, BookingConfirmation, BookingRequest};
use crate::calendar::{self, CalendarQuery};
use crate::command::{self, Command, CommandResult};
use crate::config::SchedulerConfig;
use crate::error::CoreError;
use crate::model::{Reservation, ReservationId, ReservationStatus, Slot, SupportTicket};
use crate::reconcile::{self, ReconcileReport};
use crate::store::Store;

/// Counters shown on the administrator dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_reservations: usize,
    /// Reservations nobody has confirmed yet.
    pub new_reservations: usize,
    pub total_tickets: usize,
    pub open_tickets: usize,
}

/// Booking scheduler over an injected store accessor.
pub struct Scheduler<S: Store> {
    inner: Arc<SchedulerInner<S>>,
}

// Derived `Clone` would require `S: Clone`.
impl<S: Store> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SchedulerInner<S> {
    store: S,
    config: SchedulerConfig,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: Store> Scheduler<S> {
    /// Wrap a store. No background work starts until
    /// [`start_reconciler`](Self::start_reconciler).
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                config,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // ── Customer and administrator reads ─────────────────────────

    /// Slots visible to the query's actor, ordered by start time.
    pub async fn calendar(&self, query: &CalendarQuery) -> Result<Vec<Slot>, CoreError> {
        self.calendar_at(query, Utc::now()).await
    }

    pub async fn calendar_at(
        &self,
        query: &CalendarQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, CoreError> {
        calendar::read(&self.inner.store, &self.inner.config.expiry, query, now).await
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, CoreError> {
        Ok(self.inner.store.list_reservations().await?)
    }

    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, CoreError> {
        self.inner
            .store
            .get_reservation(id)
            .await?
            .ok_or_else(|| CoreError::not_found("reservation", id))
    }

    pub async fn list_tickets(&self) -> Result<Vec<SupportTicket>, CoreError> {
        Ok(self.inner.store.list_tickets().await?)
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, CoreError> {
        let (reservations, tickets) = futures_util::future::try_join(
            self.inner.store.list_reservations(),
            self.inner.store.list_tickets(),
        )
        .await?;

        Ok(DashboardStats {
            total_reservations: reservations.len(),
            new_reservations: reservations
                .iter()
                .filter(|r| r.status == ReservationStatus::New)
                .count(),
            total_tickets: tickets.len(),
            open_tickets: tickets.iter().filter(|t| t.status.is_open()).count(),
        })
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Book a slot for a customer.
    ///
    /// Safe to retry with the same idempotency key after any error: a
    /// finished booking is returned as-is with `replayed` set.
    pub async fn book(&self, request: BookingRequest) -> Result<BookingConfirmation, CoreError> {
        booking::book(&self.inner.store, request, Utc::now()).await
    }

    /// Execute an administrator command.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        debug!(?cmd, "executing command");
        command::route(&self.inner.store, &self.inner.config, cmd).await
    }

    // ── Reconciliation ───────────────────────────────────────────

    pub async fn reconcile(&self, repair: bool) -> Result<ReconcileReport, CoreError> {
        self.reconcile_at(Utc::now(), repair).await
    }

    /// Run the pass as of `now`. The grace period is measured from it.
    pub async fn reconcile_at(
        &self,
        now: DateTime<Utc>,
        repair: bool,
    ) -> Result<ReconcileReport, CoreError> {
        reconcile::run(&self.inner.store, &self.inner.config, now, repair).await
    }

    /// Spawn the periodic reconciliation task. Returns `false` when the
    /// configured interval is zero.
    pub async fn start_reconciler(&self) -> bool {
        let interval = self.inner.config.reconcile_interval;
        if interval.is_zero() {
            return false;
        }
        let scheduler = self.clone();
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(reconcile_task(scheduler, interval, cancel));
        self.inner.task_handles.lock().await.push(handle);
        info!(interval_secs = interval.as_secs(), "reconciler started");
        true
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }
}

async fn reconcile_task<S: Store>(
    scheduler: Scheduler<S>,
    period: std::time::Duration,
    cancel: CancellationToken,
) {
    let repair = scheduler.config().reconcile_repair;
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match scheduler.reconcile(repair).await {
                    Ok(report) if report.is_clean() => debug!("reconciliation clean"),
                    Ok(report) => info!(
                        findings = report.findings.len(),
                        repaired = report.repaired.len(),
                        "reconciliation pass finished"
                    ),
                    Err(e) => warn!(error = %e, "periodic reconciliation failed"),
                }
            }
        }
    }
}
