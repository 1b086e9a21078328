//! Store configuration

use std::time::Duration;

/// Retry policy for durable log appends
///
/// Each attempt is bounded by `attempt_timeout`. After a failed attempt the
/// writer waits `initial_backoff * 2^(attempt - 1)`, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendPolicy {
    /// Total attempts before giving up (at least one is always made)
    pub max_attempts: u32,
    /// Upper bound for a single append call
    pub attempt_timeout: Duration,
    /// Delay after the first failure
    pub initial_backoff: Duration,
    /// Upper bound for the delay between attempts
    pub max_backoff: Duration,
}

impl Default for AppendPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl AppendPolicy {
    /// A policy that makes exactly one attempt
    pub fn single_attempt(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay to wait after `failures` consecutive failed attempts
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Configuration for a [`Store`](crate::Store)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the writer's command queue; `apply` waits when it is full
    pub queue_capacity: usize,
    /// Capacity of the accepted-operation broadcast; slower subscribers lag
    pub event_capacity: usize,
    /// Retry policy for durable appends
    pub append: AppendPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            event_capacity: 1024,
            append: AppendPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_append_policy(mut self, policy: AppendPolicy) -> Self {
        self.append = policy;
        self
    }
}
