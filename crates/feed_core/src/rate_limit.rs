use std::time::Duration;

/// Delay between cycles when the rate-limit window still has room.
pub const BASELINE_DELAY: Duration = Duration::from_secs(2);

/// Rate-limit counters reported alongside one feed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitSnapshot {
    pub used: i64,
    pub remaining: i64,
    pub reset_seconds: i64,
}

impl RateLimitSnapshot {
    /// Builds a snapshot from raw header values; absent or unparseable values become 0.
    pub fn from_raw(used: Option<&str>, remaining: Option<&str>, reset: Option<&str>) -> Self {
        Self {
            used: parse_counter(used),
            remaining: parse_counter(remaining),
            reset_seconds: parse_counter(reset),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 1
    }
}

/// Accepts integers and decimal renderings such as `"598.0"` (truncated).
fn parse_counter(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim) else {
        return 0;
    };
    if let Ok(value) = raw.parse::<i64>() {
        return value;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub baseline: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            baseline: BASELINE_DELAY,
        }
    }
}

impl DelayPolicy {
    pub fn new(baseline: Duration) -> Self {
        Self { baseline }
    }

    /// Delay before the next fetch given the latest snapshot.
    ///
    /// An exhausted window waits `reset + 1` seconds so the window has rolled
    /// over; the result is never shorter than one second.
    pub fn delay_for(&self, snapshot: &RateLimitSnapshot) -> Duration {
        if snapshot.is_exhausted() {
            let reset = u64::try_from(snapshot.reset_seconds).unwrap_or(0);
            Duration::from_secs(reset.saturating_add(1))
        } else {
            self.baseline
        }
    }
}

/// Shorthand for [`DelayPolicy::delay_for`] with the default baseline.
pub fn compute_delay(snapshot: &RateLimitSnapshot) -> Duration {
    DelayPolicy::default().delay_for(snapshot)
}
