//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Housekeeping reclaims memory held by idle clients:
//! - rate-limiter identities whose window has fully expired
//! - event bus topics with no remaining subscribers
//!
//! ```text
//! Scheduler (every HOUSEKEEPING_INTERVAL_SECS)
//!     │
//!     └─► run_housekeeping()
//!             ├─► RateLimiter::sweep(now)
//!             └─► EventBus::cleanup()
//! ```

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::kernel::ServerDeps;

/// What one housekeeping pass reclaimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub identities_swept: usize,
    pub channels_removed: usize,
}

/// Start all scheduled tasks
pub async fn start_scheduler(deps: ServerDeps, interval: Duration) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let housekeeping_job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let deps = deps.clone();
        Box::pin(async move {
            run_housekeeping(&deps).await;
        })
    })?;

    scheduler.add(housekeeping_job).await?;
    scheduler.start().await?;

    tracing::info!(
        interval_secs = interval.as_secs(),
        "Scheduled tasks started (housekeeping)"
    );
    Ok(scheduler)
}

/// Run one housekeeping pass
pub async fn run_housekeeping(deps: &ServerDeps) -> HousekeepingReport {
    let report = HousekeepingReport {
        identities_swept: deps.rate_limiter.sweep(Instant::now()),
        channels_removed: deps.event_bus.cleanup().await,
    };

    if report == HousekeepingReport::default() {
        tracing::trace!("Housekeeping found nothing to reclaim");
    } else {
        tracing::debug!(
            identities_swept = report.identities_swept,
            channels_removed = report.channels_removed,
            "Housekeeping complete"
        );
    }
    report
}
