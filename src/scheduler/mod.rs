//! Polling scheduler.
//!
//! The scheduler owns one entry per cadence and is advanced with an explicit
//! [`Scheduler::tick`], so tests drive it with a simulated clock. A tick
//! fires every entry whose trigger instant falls in `(previous tick, now]`.
//!
//! Batches run inline between ticks, so the time a dispatch takes is part of
//! the window and a trigger that comes due mid-batch fires on the next tick.
//! Only the idle stretch after the last dispatch finished is clamped to two
//! tick intervals: a process that was suspended for hours does not replay the
//! batches it slept through.

mod trigger;

pub use trigger::{Trigger, parse_time};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::cadence_config::ScheduleSettings;
use crate::errors::{OrchestratorError, SchedulerError};
use crate::worker::Cadence;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Whatever executes a due batch.
#[async_trait]
pub trait BatchRunner: Send + Sync {
    async fn dispatch(&self, cadence: Cadence, batch_time: DateTime<Local>) -> Result<(), OrchestratorError>;
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub cadence: Cadence,
    pub trigger: Trigger,
    pub last_fired: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    entries: Vec<ScheduleEntry>,
    interval: Duration,
    last_tick: Option<NaiveDateTime>,
    /// The previous tick fired something that may still have been running.
    dispatched: bool,
    /// When the batches fired by the previous tick finished.
    busy_until: Option<NaiveDateTime>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: Vec::new(),
            interval,
            last_tick: None,
            dispatched: false,
            busy_until: None,
        }
    }

    pub fn with_entry(mut self, cadence: Cadence, trigger: Trigger) -> Self {
        self.entries.push(ScheduleEntry {
            cadence,
            trigger,
            last_fired: None,
        });
        self
    }

    /// Daily, weekly and monthly entries built from `[schedule]`.
    pub fn from_settings(settings: &ScheduleSettings) -> Result<Self, SchedulerError> {
        Ok(Self::new(Duration::from_secs(settings.tick_secs))
            .with_entry(
                Cadence::Daily,
                Trigger::Daily {
                    at: parse_time(&settings.daily_at)?,
                },
            )
            .with_entry(
                Cadence::Weekly,
                Trigger::Weekly {
                    day: settings.weekly_day,
                    at: parse_time(&settings.weekly_at)?,
                },
            )
            .with_entry(
                Cadence::Monthly,
                Trigger::Monthly {
                    day: settings.monthly_day,
                    at: parse_time(&settings.monthly_at)?,
                },
            ))
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lookback(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::seconds(60))
    }

    /// Record when the batches fired by the last tick finished.
    ///
    /// Without it, the next tick treats the whole gap since the last firing
    /// tick as busy time and never clamps it.
    pub fn finish_dispatch(&mut self, at: DateTime<Local>) {
        self.busy_until = Some(at.naive_local());
    }

    /// Advance to `now` and return the cadences that became due, in entry order.
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<Cadence> {
        let now = now.naive_local();
        let lookback = self.lookback();
        let (busy, idle_start) = match self.last_tick {
            None => (None, now - lookback),
            Some(prev) => {
                let busy_end = match self.busy_until {
                    Some(end) => end.max(prev).min(now),
                    None if self.dispatched => now,
                    None => prev,
                };
                (Some((prev, busy_end)), busy_end.max(prev).max(now - lookback * 2))
            }
        };
        self.last_tick = Some(now);
        self.busy_until = None;

        let mut due = Vec::new();
        for entry in &mut self.entries {
            let fired = entry.trigger.fired_between(idle_start, now).or_else(|| {
                busy.and_then(|(from, until)| entry.trigger.fired_between(from, until))
            });
            let Some(instant) = fired else {
                continue;
            };
            if entry.last_fired == Some(instant) {
                continue;
            }
            entry.last_fired = Some(instant);
            tracing::info!(cadence = %entry.cadence, "Trigger fired ({})", entry.trigger);
            due.push(entry.cadence);
        }
        self.dispatched = !due.is_empty();
        due
    }

    /// Tick, then run every due batch through `runner` in order.
    pub async fn dispatch_due<R>(&mut self, runner: &R, now: DateTime<Local>) -> Vec<Result<Cadence, SchedulerError>>
    where
        R: BatchRunner + ?Sized,
    {
        let mut outcomes = Vec::new();
        for cadence in self.tick(now) {
            let outcome = runner
                .dispatch(cadence, now)
                .await
                .map(|_| cadence)
                .map_err(|source| SchedulerError::Dispatch { cadence, source });
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Poll until `shutdown` resolves. Dispatch errors are logged and the loop
    /// keeps going; shutdown is observed between ticks.
    pub async fn run_until<R, C, F>(&mut self, runner: &R, clock: &C, shutdown: F)
    where
        R: BatchRunner + ?Sized,
        C: Clock + ?Sized,
        F: Future<Output = ()>,
    {
        tracing::info!("Scheduler started (check every {}s)", self.interval.as_secs());
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    let now = clock.now();
                    let outcomes = self.dispatch_due(runner, now).await;
                    if !outcomes.is_empty() {
                        self.finish_dispatch(clock.now());
                    }
                    for outcome in outcomes {
                        match outcome {
                            Ok(cadence) => tracing::info!(%cadence, "Scheduled batch complete"),
                            Err(e) => tracing::error!("Scheduler tick error: {}", e),
                        }
                    }
                }
            }
        }
    }
}
