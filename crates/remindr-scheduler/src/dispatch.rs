//! Fan-out dispatcher: one spawned task per attendee, first error wins.
//!
//! Tasks are detached once spawned. The caller's cancellation token is checked
//! only before anything starts; dropping or cancelling the caller afterwards
//! does not abort sends already in flight. Each task is bounded by its own timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::{FuturesUnordered, StreamExt};
use remindr_core::config::DispatchConfig;
use remindr_core::error::{RemindError, Result};
use remindr_core::message::compose_reminder;
use remindr_core::types::Attendee;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{DeliveryOutcome, DeliveryPipeline};

/// Per-run settings shared by every task of one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub run_id: String,
    /// Timezone the reminder text is written in. Required by the composer.
    pub timezone: Option<Tz>,
    pub dry_run: bool,
}

impl DispatchContext {
    pub fn new(timezone: Option<Tz>, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timezone,
            dry_run,
        }
    }
}

/// Counts for one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchReport {
    pub run_id: String,
    pub total: usize,
    pub sent: usize,
    pub dry_run: usize,
    pub failed: usize,
    /// Deliveries that went out with the long URL because shortening failed.
    pub degraded_links: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        if outcome.dry_run {
            self.dry_run += 1;
        } else {
            self.sent += 1;
        }
        if !outcome.shortened {
            self.degraded_links += 1;
        }
    }
}

pub struct Dispatcher {
    pipeline: Arc<DeliveryPipeline>,
    task_timeout: Duration,
    limiter: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Unbounded dispatcher with a 30 second per-task deadline.
    pub fn new(pipeline: Arc<DeliveryPipeline>) -> Self {
        Self {
            pipeline,
            task_timeout: Duration::from_secs(30),
            limiter: None,
        }
    }

    pub fn from_config(pipeline: Arc<DeliveryPipeline>, cfg: &DispatchConfig) -> Self {
        Self::new(pipeline)
            .with_task_timeout(Duration::from_secs(cfg.task_timeout_secs))
            .with_max_concurrent(cfg.max_concurrent)
    }

    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    /// Cap concurrently running deliveries. `None` (or zero) removes the cap.
    pub fn with_max_concurrent(mut self, max: Option<usize>) -> Self {
        self.limiter = max.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Deliver reminders to every attendee concurrently.
    ///
    /// Waits for all tasks. Returns the first error to occur; the rest are logged
    /// and counted in the report but otherwise dropped.
    pub async fn dispatch(
        &self,
        attendees: Vec<Attendee>,
        ctx: &DispatchContext,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport> {
        if cancel.is_cancelled() {
            return Err(RemindError::Cancelled);
        }

        let mut report = DispatchReport {
            run_id: ctx.run_id.clone(),
            total: attendees.len(),
            ..DispatchReport::default()
        };
        let reminders = compose_reminders(&attendees, ctx.timezone, Utc::now())?;
        tracing::info!(run_id = %ctx.run_id, dry_run = ctx.dry_run, "📣 Dispatching {} reminders", report.total);

        let mut tasks = FuturesUnordered::new();
        for attendee in attendees {
            let pipeline = Arc::clone(&self.pipeline);
            let limiter = self.limiter.clone();
            let reminder = reminders
                .get(&attendee.session_start)
                .cloned()
                .unwrap_or_default();
            let (dry_run, task_timeout) = (ctx.dry_run, self.task_timeout);

            tasks.push(tokio::spawn(run_task(pipeline, limiter, attendee, reminder, dry_run, task_timeout)));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(RemindError::Delivery {
                    recipient: "unknown".into(),
                    reason: format!("delivery task aborted: {e}"),
                })
            });
            match result {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(run_id = %ctx.run_id, "⚠️ {e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        tracing::info!(
            run_id = %report.run_id,
            sent = report.sent,
            dry_run = report.dry_run,
            failed = report.failed,
            degraded_links = report.degraded_links,
            "Dispatch finished"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// The reminder sentence for each distinct session start, composed once per run.
fn compose_reminders(
    attendees: &[Attendee],
    tz: Option<Tz>,
    now: DateTime<Utc>,
) -> Result<HashMap<DateTime<Utc>, Arc<str>>> {
    let mut reminders = HashMap::new();
    for attendee in attendees {
        if !reminders.contains_key(&attendee.session_start) {
            let sentence = compose_reminder(attendee.session_start, tz, now)?;
            reminders.insert(attendee.session_start, Arc::from(sentence));
        }
    }
    Ok(reminders)
}

/// One attendee's delivery. The deadline starts once a concurrency permit is held.
async fn run_task(
    pipeline: Arc<DeliveryPipeline>,
    limiter: Option<Arc<Semaphore>>,
    attendee: Attendee,
    reminder: Arc<str>,
    dry_run: bool,
    task_timeout: Duration,
) -> Result<DeliveryOutcome> {
    let _permit = match limiter {
        Some(sem) => Some(sem.acquire_owned().await.map_err(|_| RemindError::Cancelled)?),
        None => None,
    };
    match tokio::time::timeout(task_timeout, pipeline.deliver(&attendee, &reminder, dry_run)).await {
        Ok(result) => result,
        Err(_) => Err(RemindError::Delivery {
            recipient: attendee.display_name(),
            reason: RemindError::Timeout("delivery task".into()).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{enrich_all, enrich_session};
    use crate::pipeline::PipelineTimeouts;
    use crate::testing::{RecordingSender, StubRenderer, StubShortener, cell, session_starting};
    use chrono_tz::America::Chicago;

    fn dispatcher(sender: Arc<RecordingSender>, shortener: Arc<StubShortener>) -> Dispatcher {
        let pipeline = DeliveryPipeline::new(sender, shortener, Arc::new(StubRenderer::new()), PipelineTimeouts::default());
        Dispatcher::new(Arc::new(pipeline))
    }

    fn attendees(n: usize) -> Vec<Attendee> {
        let session = session_starting("s1", Utc::now() + chrono::Duration::hours(20), n);
        enrich_session(&session)
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_transport() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new()));

        let report = d
            .dispatch(attendees(3), &DispatchContext::new(Some(Chicago), true), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.dry_run, 3);
        assert_eq!(report.sent, 0);
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_shortener_failure_still_delivers_everyone() {
        let sender = Arc::new(RecordingSender::new());
        let shortener = Arc::new(StubShortener::failing_for(["p3@example.org".to_string()]));
        let d = dispatcher(sender.clone(), shortener.clone());

        let report = d
            .dispatch(attendees(5), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.sent, 5);
        assert_eq!(report.degraded_links, 1);
        assert_eq!(shortener.calls(), 5);

        let sent = sender.sent();
        assert_eq!(sent.len(), 5);
        let degraded = sent.iter().find(|m| m.to == cell(3)).unwrap();
        assert!(degraded.body.ends_with("More details: https://info.test/m/p3@example.org"));
        for m in sent.iter().filter(|m| m.to != cell(3)) {
            assert!(m.body.contains("More details: https://short.test/"), "{}", m.body);
        }
    }

    #[tokio::test]
    async fn test_transport_failure_reports_first_error_after_all_attempts() {
        let sender = Arc::new(RecordingSender::failing_for([cell(2)]));
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new()));

        let err = d
            .dispatch(attendees(5), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            RemindError::Delivery { recipient, .. } => assert_eq!(recipient, cell(2)),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sender.attempts(), 5);
        assert_eq!(sender.sent().len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_does_nothing() {
        let sender = Arc::new(RecordingSender::new());
        let shortener = Arc::new(StubShortener::new());
        let d = dispatcher(sender.clone(), shortener.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = d
            .dispatch(attendees(3), &DispatchContext::new(Some(Chicago), false), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RemindError::Cancelled));
        assert_eq!(sender.attempts(), 0);
        assert_eq!(shortener.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_start_does_not_abort_sends() {
        let sender = Arc::new(RecordingSender::new().with_delay(Duration::from_secs(1)));
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new()));
        let cancel = CancellationToken::new();
        let ctx = DispatchContext::new(Some(Chicago), false);

        // The caller gives up while sends are still sleeping.
        let abandoned = tokio::time::timeout(Duration::from_millis(10), d.dispatch(attendees(3), &ctx, &cancel)).await;
        assert!(abandoned.is_err());
        cancel.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sender.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_timezone_fails_dispatch() {
        let sender = Arc::new(RecordingSender::new());
        let shortener = Arc::new(StubShortener::new());
        let d = dispatcher(sender.clone(), shortener.clone());

        let err = d
            .dispatch(attendees(2), &DispatchContext::new(None, false), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RemindError::MissingTimezone));
        assert_eq!(sender.attempts(), 0);
        assert_eq!(shortener.calls(), 0);
    }

    #[test]
    fn test_reminder_composed_once_per_session_start() {
        let now = Utc::now();
        let sessions = vec![
            session_starting("a", now + chrono::Duration::hours(1), 3),
            session_starting("b", now + chrono::Duration::hours(30), 2),
            session_starting("c", now + chrono::Duration::hours(30), 1),
        ];
        let reminders = compose_reminders(&enrich_all(&sessions), Some(Chicago), now).unwrap();
        assert_eq!(reminders.len(), 2);
        assert!(reminders[&sessions[0].start].contains("Session today at"));
        assert!(!reminders[&sessions[1].start].contains("today"));
    }

    #[test]
    fn test_compose_without_timezone_fails_once() {
        let err = compose_reminders(&attendees(4), None, Utc::now()).unwrap_err();
        assert!(matches!(err, RemindError::MissingTimezone));
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_timeout_isolates_slow_participant() {
        let sender = Arc::new(RecordingSender::new().with_delay(Duration::from_secs(60)));
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new())).with_task_timeout(Duration::from_secs(1));

        let err = d
            .dispatch(attendees(1), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_fan_out_runs_everyone_at_once() {
        let sender = Arc::new(RecordingSender::new().with_delay(Duration::from_millis(50)));
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new()));

        d.dispatch(attendees(6), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(sender.peak_in_flight(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_concurrent_caps_in_flight_sends() {
        let sender = Arc::new(RecordingSender::new().with_delay(Duration::from_millis(50)));
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new())).with_max_concurrent(Some(2));

        let report = d
            .dispatch(attendees(6), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.sent, 6);
        assert_eq!(sender.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_multiple_sessions() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender.clone(), Arc::new(StubShortener::new()));
        let now = Utc::now();
        let sessions = vec![
            session_starting("a", now + chrono::Duration::hours(1), 2),
            session_starting("b", now + chrono::Duration::hours(30), 3),
        ];

        let report = d
            .dispatch(enrich_all(&sessions), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.sent, 5);
        let today = sender.sent().iter().filter(|m| m.body.contains("Session today at")).count();
        assert_eq!(today, 2);
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let sender = Arc::new(RecordingSender::new());
        let d = dispatcher(sender, Arc::new(StubShortener::new()));
        let report = d
            .dispatch(Vec::new(), &DispatchContext::new(Some(Chicago), false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.total, 0);
    }
}
