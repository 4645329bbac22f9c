//! Bounded retry and sampling loops.
//
// Two blocking primitives live here: `poll_until`, the bounded predicate
// retry used by `Ahk::ready` to ride out engine startup/shutdown latency,
// and `wait_until`, the generic sample-until-condition loop behind
// `Script::wait_pixel`. Both take an explicit iteration bound; nothing in
// this crate loops on an external condition without one.

use crate::error::{AhkError, AhkResult};
use std::thread::sleep;
use std::time::Duration;

/// Defines a policy for retrying a check.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// The maximum number of attempts.
    pub max_attempts: u32,
    /// The delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy that performs exactly one non-blocking check.
    pub fn nowait() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Policy with `max_attempts` checks at the default inter-attempt delay.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(100),
        }
    }
}

/// Evaluate `check` up to `policy.max_attempts` times, sleeping
/// `policy.delay` between attempts.
///
/// Returns `true` on the first successful check, `false` once the budget is
/// exhausted. The delay is only slept between attempts, never after the
/// last one.
pub fn poll_until<F>(policy: &RetryPolicy, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for attempt in 0..policy.max_attempts {
        if check() {
            return true;
        }
        if attempt + 1 < policy.max_attempts {
            sleep(policy.delay);
        }
    }
    false
}

/// Repeatedly sample a value until it satisfies `accept`, bounded by
/// `max_samples`.
///
/// Returns the first accepted sample, or [`AhkError::PollTimeout`] when the
/// budget runs out. `interval` is slept between samples.
///
/// # Example
///
/// ```rust,ignore
/// let value = wait_until(
///     || bridge.get("counter"),
///     |v| v == "10",
///     Duration::from_millis(50),
///     20,
/// )?;
/// ```
pub fn wait_until<T, S, P>(
    mut sample: S,
    mut accept: P,
    interval: Duration,
    max_samples: u32,
) -> AhkResult<T>
where
    S: FnMut() -> AhkResult<T>,
    P: FnMut(&T) -> bool,
{
    for attempt in 0..max_samples {
        let value = sample()?;
        if accept(&value) {
            return Ok(value);
        }
        if attempt + 1 < max_samples {
            sleep(interval);
        }
    }
    Err(AhkError::PollTimeout {
        attempts: max_samples,
    })
}
