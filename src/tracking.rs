use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::clock::{Clock, TimerHandle, TICK_PERIOD};
use crate::dog::{Dog, DogId, Roster};
use crate::metrics::{MetricSample, MetricSource};
use crate::notify::Notification;
use crate::util::format_hms;

/// Metrics are refreshed on every tick where elapsed seconds is a multiple of this.
pub const METRIC_REFRESH_TICKS: u64 = 5;

/// How long final totals stay on screen after a stop.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(3);

/// Longest grace delay honoured; larger values are clamped to it.
pub const MAX_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Status {
    Idle,
    Active,
    Paused,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Always [`TICK_PERIOD`] outside of tests: elapsed time counts ticks as seconds.
    pub tick_period: Duration,
    pub grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_period: TICK_PERIOD,
            grace: DEFAULT_GRACE,
        }
    }
}

/// Accumulated readings of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub distance_m: u32,
    pub speed_kmh: f64,
    pub heart_rate_bpm: Option<u16>,
    pub calories: u32,
}

impl Metrics {
    fn apply(&mut self, sample: MetricSample) {
        self.distance_m = self.distance_m.saturating_add(sample.distance_delta_m);
        self.speed_kmh = sample.speed_kmh;
        self.heart_rate_bpm = Some(sample.heart_rate_bpm);
        self.calories = self.calories.saturating_add(sample.calories_delta);
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m as f64 / 1000.0
    }
}

/// What the widgets need to draw the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: Status,
    pub dog_name: Option<String>,
    pub elapsed_secs: u64,
    pub elapsed_display: String,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub heart_rate_bpm: Option<u16>,
    pub calories: u32,
    /// Final totals of a stopped session still on display.
    pub finishing: bool,
}

/// Totals of a finished session, handed to whoever wants to keep them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub dog_id: DogId,
    pub dog_name: String,
    pub started_at: DateTime<Local>,
    pub elapsed_secs: u64,
    pub distance_km: f64,
    pub calories: u32,
    pub last_speed_kmh: f64,
    pub last_heart_rate_bpm: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stopped {
    pub notification: Notification,
    pub summary: SessionSummary,
}

/// Result of driving the session clock up to some instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub ticks: u32,
    pub reset: bool,
}

impl PollOutcome {
    pub fn changed(&self) -> bool {
        self.ticks > 0 || self.reset
    }
}

/// The tracking session state machine.
///
/// All operations are synchronous and total: a request that makes no sense in
/// the current state is ignored and returns `None`.
#[derive(Debug)]
pub struct Session<M: MetricSource> {
    status: Status,
    selected: Option<Dog>,
    elapsed_secs: u64,
    metrics: Metrics,
    started_at: Option<DateTime<Local>>,
    clock: Clock,
    timer: Option<TimerHandle>,
    source: M,
    grace: Duration,
    reset_at: Option<Instant>,
}

impl<M: MetricSource> Session<M> {
    pub fn new(source: M, config: SessionConfig) -> Self {
        Self {
            status: Status::Idle,
            selected: None,
            elapsed_secs: 0,
            metrics: Metrics::default(),
            started_at: None,
            clock: Clock::new(config.tick_period),
            timer: None,
            source,
            grace: config.grace.min(MAX_GRACE),
            reset_at: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn elapsed_display(&self) -> String {
        format_hms(self.elapsed_secs)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn selected_dog(&self) -> Option<&Dog> {
        self.selected.as_ref()
    }

    pub fn is_ticking(&self) -> bool {
        self.clock.is_armed()
    }

    /// Picks the dog for the next session. Only allowed while idle.
    pub fn select_dog(&mut self, index: usize, roster: &Roster) -> Option<Notification> {
        if self.status != Status::Idle {
            log::debug!("ignoring dog selection while {}", self.status);
            return None;
        }
        let dog = roster.get(index)?;
        self.selected = Some(dog.clone());
        Some(Notification::DogSelected {
            name: dog.name.clone(),
        })
    }

    /// The single-button entry point: start when idle, otherwise toggle pause.
    pub fn primary_action(&mut self, now: Instant) -> Option<Notification> {
        match self.status {
            Status::Idle => self.start(now),
            Status::Active => self.pause(now),
            Status::Paused => self.resume(now),
        }
    }

    pub fn start(&mut self, now: Instant) -> Option<Notification> {
        if self.status != Status::Idle {
            return None;
        }
        let Some(dog) = self.selected.as_ref() else {
            log::warn!("cannot start a session without a selected dog");
            return None;
        };
        let dog_name = dog.name.clone();

        if self.reset_at.is_some() {
            self.reset();
        }

        self.status = Status::Active;
        self.started_at = Some(Local::now());
        self.timer = Some(self.clock.arm(now));
        log::debug!("session started with {}", dog_name);

        Some(Notification::Started { dog: dog_name })
    }

    pub fn pause(&mut self, now: Instant) -> Option<Notification> {
        if self.status != Status::Active {
            return None;
        }
        self.settle(now);
        self.disarm();
        self.status = Status::Paused;
        Some(Notification::Paused)
    }

    pub fn resume(&mut self, now: Instant) -> Option<Notification> {
        if self.status != Status::Paused {
            return None;
        }
        self.timer = Some(self.clock.arm(now));
        self.status = Status::Active;
        Some(Notification::Resumed)
    }

    /// Ends the session. Totals stay visible until the grace delay passes.
    pub fn stop(&mut self, now: Instant) -> Option<Stopped> {
        if self.status == Status::Idle {
            return None;
        }
        self.settle(now);
        self.disarm();
        self.status = Status::Idle;
        self.reset_at = Some(now.checked_add(self.grace).unwrap_or(now));

        let dog = self.selected.as_ref()?;
        let summary = SessionSummary {
            dog_id: dog.id.clone(),
            dog_name: dog.name.clone(),
            started_at: self.started_at.unwrap_or_else(Local::now),
            elapsed_secs: self.elapsed_secs,
            distance_km: self.metrics.distance_km(),
            calories: self.metrics.calories,
            last_speed_kmh: self.metrics.speed_kmh,
            last_heart_rate_bpm: self.metrics.heart_rate_bpm,
        };

        Some(Stopped {
            notification: Notification::Ended {
                distance_km: summary.distance_km,
                elapsed_secs: summary.elapsed_secs,
            },
            summary,
        })
    }

    /// Applies every tick due by `now` and the post-stop reset once it is due.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        let mut outcome = PollOutcome {
            ticks: self.settle(now),
            reset: false,
        };

        if matches!(self.reset_at, Some(at) if now >= at) {
            self.reset();
            outcome.reset = true;
        }

        outcome
    }

    /// The next instant at which [`Session::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.clock.next_due(), self.reset_at) {
            (Some(tick), Some(reset)) => Some(tick.min(reset)),
            (tick, reset) => tick.or(reset),
        }
    }

    /// One clock period. Does nothing unless the session is active.
    pub fn tick(&mut self) {
        if self.status != Status::Active {
            return;
        }
        self.elapsed_secs += 1;
        if self.elapsed_secs % METRIC_REFRESH_TICKS == 0 {
            let sample = self.source.sample();
            self.metrics.apply(sample);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            dog_name: self.selected.as_ref().map(|d| d.name.clone()),
            elapsed_secs: self.elapsed_secs,
            elapsed_display: self.elapsed_display(),
            distance_km: self.metrics.distance_km(),
            speed_kmh: self.metrics.speed_kmh,
            heart_rate_bpm: self.metrics.heart_rate_bpm,
            calories: self.metrics.calories,
            finishing: self.reset_at.is_some(),
        }
    }

    /// Applies ticks that came due before a transition takes the clock away.
    fn settle(&mut self, now: Instant) -> u32 {
        let due = self.clock.due_ticks(now);
        for _ in 0..due {
            self.tick();
        }
        due
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.timer.take() {
            self.clock.cancel(&handle);
        }
    }

    fn reset(&mut self) {
        self.elapsed_secs = 0;
        self.metrics = Metrics::default();
        self.started_at = None;
        self.reset_at = None;
    }
}
