use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Gaussian draws are clamped to this many standard deviations.
const GAUSSIAN_CLAMP: f64 = 5.0;
const MIN_JITTER_SECS: f64 = 0.001;

/// Shape of one polling tier's wait: `floor + |uniform(0, spread) + gaussian(mean, std_dev)|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterProfile {
    pub floor_secs: f64,
    pub uniform_spread_secs: f64,
    pub gaussian_mean_secs: f64,
    pub gaussian_std_dev_secs: f64,
}

/// Broad search cadence, shared out across every tracked family.
pub const BROAD_CADENCE: JitterProfile = JitterProfile {
    floor_secs: 5.0,
    uniform_spread_secs: 30.0,
    gaussian_mean_secs: 30.0,
    gaussian_std_dev_secs: 7.0,
};

/// Focused cadence used while watching a single item's page.
pub const FOCUSED_CADENCE: JitterProfile = JitterProfile {
    floor_secs: 5.0,
    uniform_spread_secs: 8.0,
    gaussian_mean_secs: 8.0,
    gaussian_std_dev_secs: 2.0,
};

impl JitterProfile {
    /// The random part of the wait, before any division.
    pub fn jitter<R: Rng>(&self, rng: &mut R) -> f64 {
        let uniform = if self.uniform_spread_secs > 0.0 {
            rng.gen_range(0.0..self.uniform_spread_secs)
        } else {
            0.0
        };
        let z: f64 = rng.sample(StandardNormal);
        let gaussian =
            self.gaussian_mean_secs + self.gaussian_std_dev_secs * z.clamp(-GAUSSIAN_CLAMP, GAUSSIAN_CLAMP);

        (uniform + gaussian).abs()
    }

    /// Wait in seconds with the jitter shared across `divisor` families.
    ///
    /// The floor is never divided, and the result is always strictly above it.
    pub fn sample_secs<R: Rng>(&self, rng: &mut R, divisor: usize) -> f64 {
        let jitter = self.jitter(rng) / divisor.max(1) as f64;
        self.floor_secs + jitter.max(MIN_JITTER_SECS)
    }

    /// Largest value `sample_secs` can return for the given divisor.
    pub fn upper_bound_secs(&self, divisor: usize) -> f64 {
        let lowest = self.gaussian_mean_secs - GAUSSIAN_CLAMP * self.gaussian_std_dev_secs;
        let highest = self.uniform_spread_secs
            + self.gaussian_mean_secs
            + GAUSSIAN_CLAMP * self.gaussian_std_dev_secs;
        let jitter = highest.abs().max(lowest.abs());
        self.floor_secs + (jitter / divisor.max(1) as f64).max(MIN_JITTER_SECS)
    }
}

// Out-of-range waits saturate instead of panicking; NaN waits are zero.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 { Duration::MAX } else { Duration::ZERO })
}

/// Produces jittered delays for both polling tiers.
pub struct IntervalGenerator {
    rng: StdRng,
    broad: JitterProfile,
    focused: JitterProfile,
}

impl IntervalGenerator {
    pub fn new() -> Self {
        Self::with_profiles(BROAD_CADENCE, FOCUSED_CADENCE)
    }

    pub fn with_profiles(broad: JitterProfile, focused: JitterProfile) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            broad,
            focused,
        }
    }

    pub fn seeded(seed: u64, broad: JitterProfile, focused: JitterProfile) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            broad,
            focused,
        }
    }

    /// Delay after one family's broad cycle; more families means shorter waits each.
    pub fn broad(&mut self, family_count: usize) -> Duration {
        secs_to_duration(self.broad.sample_secs(&mut self.rng, family_count))
    }

    /// Delay between two ticks of a focused watch.
    pub fn focused(&mut self) -> Duration {
        secs_to_duration(self.focused.sample_secs(&mut self.rng, 1))
    }
}

impl Default for IntervalGenerator {
    fn default() -> Self {
        Self::new()
    }
}
