use std::time::{Duration, Instant};

/// Default tick period of the session clock.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const MIN_PERIOD: Duration = Duration::from_millis(1);
const MAX_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Owned registration of an armed clock.
///
/// Returned by [`Clock::arm`] and handed back to [`Clock::cancel`]. A handle
/// from an earlier arming is stale and cancelling it does nothing.
#[derive(Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: u64,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    id: u64,
    next_due: Instant,
}

/// Periodic scheduler polled from the owner's event loop.
///
/// The clock never fires by itself: the loop calls [`Clock::due_ticks`] and
/// applies whatever whole periods have elapsed. Everything runs on one thread,
/// so a tick can never interleave with a state transition.
#[derive(Debug)]
pub struct Clock {
    period: Duration,
    armed: Option<Armed>,
    next_id: u64,
}

impl Clock {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.clamp(MIN_PERIOD, MAX_PERIOD),
            armed: None,
            next_id: 0,
        }
    }

    /// Starts ticking one period after `now`. Re-arming replaces any previous
    /// registration.
    pub fn arm(&mut self, now: Instant) -> TimerHandle {
        self.next_id += 1;
        let id = self.next_id;
        // An instant this close to the end of time never comes due.
        self.armed = now.checked_add(self.period).map(|next_due| Armed { id, next_due });
        if self.armed.is_none() {
            log::warn!("clock period overflows the monotonic clock, not arming");
        }
        TimerHandle { id }
    }

    /// Deschedules the registration behind `handle`. Idempotent.
    pub fn cancel(&mut self, handle: &TimerHandle) {
        if matches!(self.armed, Some(armed) if armed.id == handle.id) {
            self.armed = None;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// When the next tick comes due, if armed.
    pub fn next_due(&self) -> Option<Instant> {
        self.armed.map(|armed| armed.next_due)
    }

    /// Number of ticks that came due up to `now`, advancing the deadline past
    /// each of them.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let Some(mut armed) = self.armed else {
            return 0;
        };

        let mut fired = 0;
        while armed.next_due <= now {
            fired += 1;
            match armed.next_due.checked_add(self.period) {
                Some(next) => armed.next_due = next,
                None => {
                    self.armed = None;
                    return fired;
                }
            }
        }
        self.armed = Some(armed);
        fired
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_clock_never_fires() {
        let mut clock = Clock::default();
        let now = Instant::now();
        assert_eq!(clock.due_ticks(now + Duration::from_secs(30)), 0);
    }

    #[test]
    fn fires_once_per_whole_period() {
        let mut clock = Clock::default();
        let t0 = Instant::now();
        let _handle = clock.arm(t0);

        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(999)), 0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_secs(1)), 1);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(1500)), 0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(4200)), 3);
    }

    #[test]
    fn cancel_stops_ticks_and_is_idempotent() {
        let mut clock = Clock::default();
        let t0 = Instant::now();
        let handle = clock.arm(t0);

        clock.cancel(&handle);
        clock.cancel(&handle);

        assert!(!clock.is_armed());
        assert_eq!(clock.due_ticks(t0 + Duration::from_secs(10)), 0);
    }

    #[test]
    fn stale_handle_does_not_cancel_new_registration() {
        let mut clock = Clock::default();
        let t0 = Instant::now();
        let old = clock.arm(t0);
        let _new = clock.arm(t0 + Duration::from_secs(2));

        clock.cancel(&old);

        assert!(clock.is_armed());
        assert_eq!(clock.due_ticks(t0 + Duration::from_secs(3)), 1);
    }

    #[test]
    fn zero_period_is_bumped() {
        let mut clock = Clock::new(Duration::ZERO);
        let t0 = Instant::now();
        let _handle = clock.arm(t0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(5)), 5);
    }

    #[test]
    fn next_due_follows_the_armed_deadline() {
        let mut clock = Clock::default();
        let t0 = Instant::now();
        assert_eq!(clock.next_due(), None);

        let handle = clock.arm(t0);
        assert_eq!(clock.next_due(), Some(t0 + Duration::from_secs(1)));
        clock.due_ticks(t0 + Duration::from_millis(2500));
        assert_eq!(clock.next_due(), Some(t0 + Duration::from_secs(3)));

        clock.cancel(&handle);
        assert_eq!(clock.next_due(), None);
    }

    #[test]
    fn huge_period_is_capped() {
        let mut clock = Clock::new(Duration::from_secs(u64::MAX));
        let t0 = Instant::now();
        let _handle = clock.arm(t0);
        assert_eq!(clock.next_due(), Some(t0 + MAX_PERIOD));
    }
}
