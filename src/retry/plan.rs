use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::errors::Error;

/// Strategy for adding randomness to delay calculations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitterStrategy {
    None,
    Full,
    Decorrelated,
}

/// Backoff configuration for the refresh endpoint.
#[derive(Clone, Debug)]
pub struct RetryPlan {
    pub max_attempts: u8,
    pub initial_delay: Duration,
    pub multiplier: f32,
    pub max_delay: Duration,
    pub jitter: JitterStrategy,
}

impl RetryPlan {
    pub fn new(
        max_attempts: u8,
        initial_delay: Duration,
        multiplier: f32,
        max_delay: Duration,
        jitter: JitterStrategy,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier,
            max_delay,
            jitter,
        }
    }

    pub fn default_plan() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            jitter: JitterStrategy::Full,
        }
    }

    /// A plan that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default_plan()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u8, rng: &mut impl Rng) -> Duration {
        if attempt <= 1 {
            return self.initial_delay;
        }
        let exp = self.multiplier.powi(i32::from(attempt) - 1) as f64;
        let delay = self.initial_delay.mul_f64(exp).min(self.max_delay);
        match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => delay.mul_f64(rng.gen_range(0.0..1.0)),
            JitterStrategy::Decorrelated => delay.mul_f64(rng.gen_range(0.5..1.5)),
        }
    }
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self::default_plan()
    }
}

impl FromStr for JitterStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(Error::Config(format!(
                "Unknown jitter strategy '{}'; expected 'none', 'full' or 'decorrelated'",
                other
            ))),
        }
    }
}
