use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Longest the loop sleeps when nothing is scheduled.
pub const IDLE_WAIT: Duration = Duration::from_secs(1);

/// What woke the tracking loop.
#[derive(Clone, Debug)]
pub enum TrailEvent {
    Key(KeyEvent),
    Resize,
    /// A deadline passed or the idle wait ran out without input.
    Wake,
}

/// Where key and resize events come from.
pub trait InputSource {
    fn wait(&self, timeout: Duration) -> Result<TrailEvent, RecvTimeoutError>;
}

impl InputSource for Receiver<TrailEvent> {
    fn wait(&self, timeout: Duration) -> Result<TrailEvent, RecvTimeoutError> {
        self.recv_timeout(timeout)
    }
}

/// Spawns the reader thread for terminal input and returns its channel.
///
/// The thread exits when the receiver is dropped or the terminal fails.
pub fn terminal_input() -> Receiver<TrailEvent> {
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || loop {
        let forwarded = match event::read() {
            Ok(CtEvent::Key(key)) => tx.send(TrailEvent::Key(key)),
            Ok(CtEvent::Resize(_, _)) => tx.send(TrailEvent::Resize),
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("terminal input failed: {}", e);
                break;
            }
        };
        if forwarded.is_err() {
            break;
        }
    });

    rx
}

/// Waits for input, but never past the next deadline of the session.
pub struct EventLoop<I: InputSource> {
    input: I,
    idle_wait: Duration,
}

impl<I: InputSource> EventLoop<I> {
    pub fn new(input: I) -> Self {
        Self::with_idle_wait(input, IDLE_WAIT)
    }

    pub fn with_idle_wait(input: I, idle_wait: Duration) -> Self {
        Self { input, idle_wait }
    }

    /// How long to block at `now` so that `deadline` is not overslept.
    pub fn timeout(&self, now: Instant, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(at) => at.saturating_duration_since(now).min(self.idle_wait),
            None => self.idle_wait,
        }
    }

    /// Next input event, or [`TrailEvent::Wake`] once `deadline` is reached.
    pub fn next_event(&self, now: Instant, deadline: Option<Instant>) -> TrailEvent {
        let timeout = self.timeout(now, deadline);
        match self.input.wait(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => TrailEvent::Wake,
            Err(RecvTimeoutError::Disconnected) => {
                // Input is gone for good; keep the clock running without spinning.
                std::thread::sleep(timeout);
                TrailEvent::Wake
            }
        }
    }
}
