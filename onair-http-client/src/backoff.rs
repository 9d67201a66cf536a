//! Backoff policies.
//!
//! A [`BackoffPolicy`] decides how long to wait before the next attempt, or
//! that no further attempt should be made. Policies are stateful: call
//! [`BackoffPolicy::reset`] before starting a new logical operation. The
//! [`retry`](crate::retry()) primitive does this for you.

use std::time::Duration;
use tokio::time::Instant;

/// Strategy yielding wait durations and a stop condition.
pub trait BackoffPolicy: Send + Sync {
    /// Duration to wait before the next attempt, or `None` to stop retrying.
    fn next_backoff(&mut self) -> Option<Duration>;

    /// Restore the initial state.
    fn reset(&mut self) {}
}

impl<P: BackoffPolicy + ?Sized> BackoffPolicy for Box<P> {
    fn next_backoff(&mut self) -> Option<Duration> {
        (**self).next_backoff()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Extension methods for backoff policies.
pub trait BackoffPolicyExt: BackoffPolicy + Sized {
    /// Stop after `max_retries` retries (`max_retries + 1` attempts in total).
    fn with_max_retries(self, max_retries: u32) -> WithMaxRetries<Self> {
        WithMaxRetries::new(self, max_retries)
    }
}

impl<P: BackoffPolicy + Sized> BackoffPolicyExt for P {}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopBackoff;

impl BackoffPolicy for StopBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}

/// Retry immediately, forever. Usually combined with
/// [`BackoffPolicyExt::with_max_retries`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroBackoff;

impl BackoffPolicy for ZeroBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(Duration::ZERO)
    }
}

/// Constant delay between retries, forever.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    /// Create a constant backoff.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffPolicy for ConstantBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.delay)
    }
}

/// Linear backoff: the delay grows by a fixed step each retry, up to `max`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    max: Duration,
    attempt: u32,
}

impl LinearBackoff {
    /// Create a linear backoff.
    pub fn new(step: Duration, max: Duration) -> Self {
        Self {
            step,
            max,
            attempt: 0,
        }
    }
}

impl BackoffPolicy for LinearBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        Some(self.step.saturating_mul(self.attempt).min(self.max))
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Exponential backoff with optional jitter and an elapsed-time limit.
///
/// Each delay is `current * (1 ± randomization_factor)`, after which `current`
/// is multiplied by `multiplier` and capped at `max_interval`. Once
/// `max_elapsed_time` has passed since the last reset, the policy stops.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay.
    pub initial_interval: Duration,
    /// Growth factor applied after each retry.
    pub multiplier: f64,
    /// Upper bound for the un-jittered delay.
    pub max_interval: Duration,
    /// Jitter ratio in `[0, 1]`. `0` disables jitter.
    pub randomization_factor: f64,
    /// Stop retrying after this much time. `None` retries forever.
    pub max_elapsed_time: Option<Duration>,
    current: Duration,
    started: Instant,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl ExponentialBackoff {
    /// Create an exponential backoff starting at `initial_interval`.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            randomization_factor: 0.5,
            max_elapsed_time: Some(Duration::from_secs(15 * 60)),
            current: initial_interval,
            started: Instant::now(),
        }
    }

    /// Set the growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the maximum un-jittered delay.
    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Set the jitter ratio, clamped to `[0, 1]`.
    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Set or remove the elapsed-time limit.
    pub fn with_max_elapsed_time(mut self, limit: Option<Duration>) -> Self {
        self.max_elapsed_time = limit;
        self
    }

    /// Time elapsed since the last reset.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }
        let nanos = interval.as_nanos() as f64;
        let delta = self.randomization_factor * nanos;
        from_nanos_f64(nanos - delta + fastrand::f64() * 2.0 * delta)
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(limit) = self.max_elapsed_time
            && self.elapsed() > limit
        {
            return None;
        }

        let delay = self.jittered(self.current);
        let next = self.current.as_nanos() as f64 * self.multiplier;
        self.current = if next >= self.max_interval.as_nanos() as f64 {
            self.max_interval
        } else {
            from_nanos_f64(next)
        };
        Some(delay)
    }

    fn reset(&mut self) {
        self.current = self.initial_interval;
        self.started = Instant::now();
    }
}

fn from_nanos_f64(nanos: f64) -> Duration {
    Duration::from_nanos(nanos.round().max(0.0) as u64)
}

/// Wraps a policy and stops after a fixed number of retries.
#[derive(Debug, Clone)]
pub struct WithMaxRetries<P> {
    inner: P,
    max_retries: u32,
    retries: u32,
}

impl<P: BackoffPolicy> WithMaxRetries<P> {
    /// Wrap `inner`, allowing at most `max_retries` retries.
    pub fn new(inner: P, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            retries: 0,
        }
    }

    /// Get the wrapped policy.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: BackoffPolicy> BackoffPolicy for WithMaxRetries<P> {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;
        self.inner.next_backoff()
    }

    fn reset(&mut self) {
        self.retries = 0;
        self.inner.reset();
    }
}
