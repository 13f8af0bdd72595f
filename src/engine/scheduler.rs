//! Background job scheduling: a daily fire-time loop for the transfer sweep
//! and an unconditional repeating ticker for the device sweep.
//!
//! Both loops run until their CancellationToken fires. A failing iteration
//! is logged and retried after the configured interval; no error terminates
//! the owning task. A tick where nothing is due is a normal no-op, never a
//! stop signal.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Fire time and retry backoff for a daily job, loaded once at startup.
#[derive(Debug, Clone, Copy)]
pub struct JobTiming {
    pub execution_hour: u32,
    pub execution_minute: u32,
    /// Sleep after a failed run before retrying.
    pub retry_interval: Duration,
}

/// Next "today at HH:MM", rolling to tomorrow when that time has passed.
pub fn next_fire_time(now: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Runs `job` once per day at the configured time until cancelled.
///
/// On job failure the loop sleeps `retry_interval` and runs the job again,
/// repeating until it succeeds or the token fires. Cancellation interrupts
/// any sleep promptly.
pub async fn run_daily<F, Fut>(
    name: &str,
    timing: JobTiming,
    cancel: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    info!(
        job = name,
        hour = timing.execution_hour,
        minute = timing.execution_minute,
        "daily job scheduled"
    );

    loop {
        let now = Local::now().naive_local();
        let fire_at = next_fire_time(now, timing.execution_hour, timing.execution_minute);
        let wait = (fire_at - now)
            .to_std()
            .unwrap_or_else(|_| Duration::from_secs(0));
        debug!(job = name, fire_at = %fire_at, "sleeping until next fire time");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(job = name, "daily job cancelled");
                return;
            }
            _ = sleep(wait) => {}
        }

        // Retry until the run succeeds; transient failures must never kill
        // the job, only delay it.
        loop {
            match job().await {
                Ok(()) => break,
                Err(e) => {
                    error!(job = name, error = %e, retry_in_secs = timing.retry_interval.as_secs(), "job run failed, will retry");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!(job = name, "daily job cancelled during retry backoff");
                            return;
                        }
                        _ = sleep(timing.retry_interval) => {}
                    }
                }
            }
        }
    }
}

/// Runs `job` on a fixed cadence until cancelled.
///
/// Failures are logged and the next tick retries naturally; an idle tick
/// (job did nothing) is indistinguishable from any other successful run.
pub async fn run_repeating<F, Fut>(
    name: &str,
    every: Duration,
    cancel: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(job = name, every_secs = every.as_secs(), "repeating job scheduled");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(job = name, "repeating job cancelled");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = job().await {
                    error!(job = name, error = %e, "job tick failed, next tick will retry");
                }
            }
        }
    }
}

/// Spawns a daily job and hands back its cancellation token.
pub fn spawn_daily<F, Fut>(name: &'static str, timing: JobTiming, job: F) -> CancellationToken
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        run_daily(name, timing, token, job).await;
    });
    cancel
}

/// Spawns a repeating job and hands back its cancellation token.
pub fn spawn_repeating<F, Fut>(name: &'static str, every: Duration, job: F) -> CancellationToken
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        run_repeating(name, every, token, job).await;
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fires_today_when_time_not_yet_passed() {
        let next = next_fire_time(dt(6, 0), 22, 30);
        assert_eq!(next, dt(22, 30));
    }

    #[test]
    fn rolls_to_tomorrow_when_time_passed() {
        let next = next_fire_time(dt(23, 0), 22, 30);
        assert_eq!(next, dt(22, 30) + chrono::Duration::days(1));
    }

    #[test]
    fn exact_fire_time_rolls_forward() {
        // "today at 22:30" evaluated at 22:30 sharp is already due
        let next = next_fire_time(dt(22, 30), 22, 30);
        assert_eq!(next, dt(22, 30) + chrono::Duration::days(1));
    }

    #[test]
    fn out_of_range_config_is_clamped() {
        let next = next_fire_time(dt(6, 0), 99, 99);
        assert_eq!(next.time(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_job_survives_failures_and_cancels() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            run_repeating("test", Duration::from_secs(60), token, move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n % 2 == 0 {
                        anyhow::bail!("boom");
                    }
                    Ok(())
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_secs(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        // first tick is immediate, then one per minute; failures never
        // stopped the loop
        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_daily_sleep() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let timing = JobTiming {
            execution_hour: 3,
            execution_minute: 0,
            retry_interval: Duration::from_secs(3600),
        };

        let handle = tokio::spawn(async move {
            run_daily("test", timing, token, || async { Ok(()) }).await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        // must return without waiting for the fire time
        handle.await.unwrap();
    }
}
