//! One dispatch run, from request to report.

use std::sync::Arc;

use chrono_tz::Tz;
use remindr_core::error::{RemindError, Result};
use remindr_core::period::parse_period;
use remindr_core::traits::SessionStore;
use remindr_core::types::DispatchRequest;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchContext, DispatchReport, Dispatcher};
use crate::enrich::enrich_all;

pub struct ReminderService {
    store: Arc<dyn SessionStore>,
    dispatcher: Dispatcher,
    timezone: Option<Tz>,
}

impl ReminderService {
    /// `timezone` is an IANA name. An unknown name is kept as "missing" and every
    /// run then fails with [`RemindError::MissingTimezone`].
    pub fn new(store: Arc<dyn SessionStore>, dispatcher: Dispatcher, timezone: &str) -> Self {
        let timezone = match timezone.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                tracing::warn!("⚠️ Unknown timezone {timezone:?}: {e}");
                None
            }
        };
        Self {
            store,
            dispatcher,
            timezone,
        }
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    /// Parse the window, load sessions, enrich, and fan out.
    pub async fn run(&self, request: &DispatchRequest, cancel: &CancellationToken) -> Result<DispatchReport> {
        let period = request.job_args.period.as_str();
        let window = parse_period(period)?;
        let tz = self.timezone.ok_or(RemindError::MissingTimezone)?;

        let sessions = self.store.upcoming_sessions(window).await.map_err(|e| match e {
            RemindError::StoreQuery(_) => e,
            other => RemindError::StoreQuery(other.to_string()),
        })?;
        if sessions.is_empty() {
            return Err(RemindError::NoUpcomingSessions {
                period: period.to_string(),
            });
        }
        tracing::debug!(sessions = sessions.len(), period, job = %request.job_name, "Found upcoming sessions");

        let attendees = enrich_all(&sessions);
        let ctx = DispatchContext::new(Some(tz), request.job_args.dry_run);
        self.dispatcher.dispatch(attendees, &ctx, cancel).await
    }
}
