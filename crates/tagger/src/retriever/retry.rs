//! Exponential backoff for transient lookup failures.

use rand::Rng;

use super::*;

/// Upper bound on the random delay added to every backoff.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// How often and how patiently a failed lookup is retried.
///
/// The delay before retry `n` (1-indexed) is `min(base_delay * multiplier^(n-1), max_delay)`
/// plus up to a quarter second of jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Attempts including the first one, at least 1
  max_attempts: u32,
  /// Delay before the first retry
  base_delay:   Duration,
  /// Cap on any single delay
  max_delay:    Duration,
  /// Growth factor between consecutive delays
  multiplier:   f64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay:   Duration::from_millis(500),
      max_delay:    Duration::from_secs(8),
      multiplier:   2.0,
    }
  }
}

impl RetryPolicy {
  /// Creates a policy making at most `max_attempts` attempts with default delays.
  pub fn with_max_attempts(max_attempts: u32) -> Self {
    Self { max_attempts: max_attempts.max(1), ..Self::default() }
  }

  /// Replaces the base and maximum delays.
  pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
    self.base_delay = base_delay;
    self.max_delay = max_delay.max(base_delay);
    self
  }

  /// The configured attempt budget.
  pub fn max_attempts(&self) -> u32 { self.max_attempts }

  /// Decides whether to retry after `attempt` (1-indexed) failed with `error`.
  ///
  /// Returns the delay to wait, or `None` when the error is not transient or the attempt
  /// budget is spent.
  pub fn should_retry(&self, error: &TaggerError, attempt: u32) -> Option<Duration> {
    if !error.is_transient() {
      trace!("Not retrying permanent failure: {error}");
      return None;
    }
    if attempt >= self.max_attempts {
      debug!(attempt, max = self.max_attempts, "Lookup attempts exhausted");
      return None;
    }
    let delay = self.delay_for(attempt);
    debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying lookup");
    Some(delay)
  }

  /// Backoff delay after `attempt` failed, jitter included.
  fn delay_for(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
    let capped = scaled.min(self.max_delay.as_secs_f64());
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_secs_f64(capped) + Duration::from_millis(jitter)
  }
}
