use std::time::Duration;

/// Specifies how the minimum request interval grows after the server signals throttling.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Uses the same interval no matter how many throttled responses were seen.
    Fixed(Duration),
    /// Uses an exponential interval.
    /// The interval is calculated as `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        /// The interval for attempt zero.
        base: Duration,
        /// The multiplicative factor for each consecutive throttled response.
        factor: f64,
        /// The maximum interval.
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: crate::governor::constants::BACKOFF_BASE,
            factor: 2.0,
            max: crate::governor::constants::BACKOFF_MAX,
        }
    }
}

impl Backoff {
    /// The interval to impose after the `attempt`-th consecutive throttled response.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential { base, factor, max } => {
                let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = base.as_secs_f64() * factor.powi(exp);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    *max
                } else {
                    Duration::from_secs_f64(secs.max(0.0))
                }
            }
        }
    }
}
