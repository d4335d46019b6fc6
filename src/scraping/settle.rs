//! Waiting for the table to re-render after a control change.
//!
//! The page gives no "done" signal, so the row count is polled until it
//! stops changing. The wait is bounded; reaching the bound is not an error.

use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub poll_interval: Duration,
    /// Consecutive identical readings needed to call the table stable
    pub stable_polls: u32,
    /// Never return before this much time has passed
    pub min_wait: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            stable_polls: 3,
            min_wait: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Readings stopped changing; carries the final reading
    Stable(usize),
    /// Still changing when the bound was hit
    TimedOut,
    /// Readings unavailable; slept the full bound instead
    FixedDelay,
}

/// Poll `read_count` until it reports the same value `stable_polls` times in a
/// row, or until `max_wait` has elapsed.
///
/// `baseline` is the reading taken before the control change. While the
/// table still shows that count the re-render has not been observed, so a
/// repeat of it only counts as stable once the full `max_wait` has passed.
pub fn wait_until_stable<F>(
    policy: &SettlePolicy,
    max_wait: Duration,
    baseline: Option<usize>,
    mut read_count: F,
) -> SettleOutcome
where
    F: FnMut() -> Result<usize>,
{
    let started = Instant::now();
    let mut last: Option<usize> = None;
    let mut streak = 0u32;
    let mut changed = baseline.is_none();

    loop {
        match read_count() {
            Ok(reading) => {
                if last == Some(reading) {
                    streak += 1;
                } else {
                    last = Some(reading);
                    streak = 1;
                }
                if baseline != Some(reading) {
                    changed = true;
                }
                debug!("Settle reading {} (streak {})", reading, streak);

                let elapsed = started.elapsed();
                let stable = streak >= policy.stable_polls;
                if stable && changed && elapsed >= policy.min_wait.min(max_wait) {
                    return SettleOutcome::Stable(reading);
                }
                if elapsed >= max_wait {
                    if stable {
                        debug!("Row count unchanged at {} after {:?}", reading, max_wait);
                        return SettleOutcome::Stable(reading);
                    }
                    warn!(
                        "Table still changing after {:?}; continuing with current rows",
                        max_wait
                    );
                    return SettleOutcome::TimedOut;
                }
            }
            Err(e) => {
                warn!("Cannot observe table ({:#}); falling back to fixed delay", e);
                let remaining = max_wait.saturating_sub(started.elapsed());
                std::thread::sleep(remaining);
                return SettleOutcome::FixedDelay;
            }
        }

        let remaining = max_wait.saturating_sub(started.elapsed());
        std::thread::sleep(policy.poll_interval.min(remaining));
    }
}
