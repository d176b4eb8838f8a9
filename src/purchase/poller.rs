use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::catalog::contains_product;
use crate::error::AppError;
use crate::services::{PurchaseCatalog, PurchaseQuery};
use crate::session::UserContext;

use super::event::{FlowEvent, PollEvent};

#[derive(Clone)]
pub struct PollJob {
    pub generation: u64,
    pub pack_id: String,
    pub user: UserContext,
    pub catalog: Arc<dyn PurchaseCatalog>,
}

/// Polls the user's purchases until the target pack shows up.
///
/// At most one query is outstanding: the timer is reset after each query
/// settles, so a slow response delays the next tick instead of overlapping
/// it.
pub struct PurchasePoller {
    generation: u64,
    task: Option<JoinHandle<()>>,
    in_flight: Arc<AtomicBool>,
}

impl PurchasePoller {
    pub fn start(interval: Duration, job: PollJob, events: UnboundedSender<FlowEvent>) -> Self {
        let generation = job.generation;
        let in_flight = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(poll_loop(
            interval.max(Duration::from_millis(1)),
            job,
            events,
            Arc::clone(&in_flight),
        ));
        tracing::debug!(generation, ?interval, "purchase poller started");
        Self {
            generation,
            task: Some(task),
            in_flight,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn is_query_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.in_flight.store(false, Ordering::Release);
            tracing::debug!(generation = self.generation, "purchase poller stopped");
        }
    }
}

impl Drop for PurchasePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    interval: Duration,
    job: PollJob,
    events: UnboundedSender<FlowEvent>,
    in_flight: Arc<AtomicBool>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (Some(profile), Ok(authorization)) =
            (job.user.profile(), job.user.authorization_header())
        else {
            tracing::trace!(generation = job.generation, "not logged in, skipping purchase check");
            continue;
        };

        in_flight.store(true, Ordering::Release);
        let result = job
            .catalog
            .list_user_purchases(&authorization, &PurchaseQuery::received_asset_packs(profile.id))
            .await;
        in_flight.store(false, Ordering::Release);
        ticker.reset();

        let event = match result {
            Ok(purchases) if contains_product(&purchases, &job.pack_id) => {
                tracing::info!(
                    generation = job.generation,
                    pack_id = %job.pack_id,
                    "purchase confirmed"
                );
                let _ = events.send(FlowEvent::Poll(PollEvent::Confirmed {
                    generation: job.generation,
                }));
                return;
            }
            Ok(purchases) => {
                tracing::trace!(
                    generation = job.generation,
                    purchases = purchases.len(),
                    "purchase not visible yet"
                );
                continue;
            }
            Err(source) => {
                let err = AppError::purchase_check(job.pack_id.clone(), source);
                tracing::warn!(
                    generation = job.generation,
                    error = %err,
                    cause = %error_chain(&err),
                    "purchase check failed, retrying on next tick"
                );
                PollEvent::CheckFailed {
                    generation: job.generation,
                    message: err.to_string(),
                }
            }
        };

        if events.send(FlowEvent::Poll(event)).is_err() {
            return;
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
