use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::util::round_one_decimal;

/// One refresh worth of readings from a metric source.
///
/// Distance and calories are reported as increments so accumulated totals can
/// only grow, whatever the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub distance_delta_m: u32,
    pub speed_kmh: f64,
    pub heart_rate_bpm: u16,
    pub calories_delta: u32,
}

/// Anything that can produce the periodic metric refresh: the simulator
/// today, device telemetry later.
pub trait MetricSource {
    fn sample(&mut self) -> MetricSample;
}

impl<S: MetricSource + ?Sized> MetricSource for Box<S> {
    fn sample(&mut self) -> MetricSample {
        (**self).sample()
    }
}

pub const DISTANCE_STEP_M: u32 = 10;
pub const CALORIES_STEP: u32 = 2;
pub const SPEED_RANGE_KMH: (f64, f64) = (8.0, 12.0);
pub const HEART_RATE_RANGE_BPM: (u16, u16) = (120, 180);

/// Random stand-in for GPS and a heart-rate monitor.
#[derive(Debug)]
pub struct SimulatedMetrics {
    rng: StdRng,
}

impl SimulatedMetrics {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence of samples for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SimulatedMetrics {
    fn sample(&mut self) -> MetricSample {
        let (min_speed, max_speed) = SPEED_RANGE_KMH;
        let (min_hr, max_hr) = HEART_RATE_RANGE_BPM;

        MetricSample {
            distance_delta_m: DISTANCE_STEP_M,
            speed_kmh: round_one_decimal(self.rng.gen_range(min_speed..=max_speed)),
            heart_rate_bpm: self.rng.gen_range(min_hr..=max_hr),
            calories_delta: CALORIES_STEP,
        }
    }
}
