use chrono::{DateTime, Duration, Utc};

/// Exam countdown measured from a fixed start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: DateTime<Utc>,
    limit: Duration,
}

impl Countdown {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, limit: Duration) -> Self {
        Self { started_at, limit }
    }

    #[must_use]
    pub fn from_secs(started_at: DateTime<Utc>, limit_secs: u32) -> Self {
        Self::new(started_at, Duration::seconds(i64::from(limit_secs)))
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Limit in whole seconds, saturating at `u32::MAX`.
    #[must_use]
    pub fn limit_secs(&self) -> u32 {
        u32::try_from(self.limit.num_seconds().max(0)).unwrap_or(u32::MAX)
    }

    /// Time left at `now` in whole seconds, never negative.
    ///
    /// Only fully elapsed seconds count, so the display holds the full limit
    /// for the first second and reaches zero exactly at the limit.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.limit.num_seconds() - self.elapsed_secs(now)).max(0)
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        Duration::seconds(self.remaining_secs(now))
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) <= 0
    }

    /// Remaining time as zero-padded `MM:SS`.
    #[must_use]
    pub fn format_mmss(&self, now: DateTime<Utc>) -> String {
        let secs = self.remaining_secs(now);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Seconds elapsed since the start, never negative.
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn counts_down_and_clamps_at_zero() {
        let start = fixed_now();
        let c = Countdown::from_secs(start, 90);
        assert_eq!(c.remaining_secs(start), 90);
        assert_eq!(c.format_mmss(start), "01:30");
        assert_eq!(c.format_mmss(start + Duration::seconds(31)), "00:59");
        assert!(!c.is_expired(start + Duration::seconds(89)));
        assert!(c.is_expired(start + Duration::seconds(90)));
        assert_eq!(c.remaining_secs(start + Duration::hours(2)), 0);
        assert_eq!(c.format_mmss(start + Duration::hours(2)), "00:00");
    }

    #[test]
    fn partial_seconds_are_not_counted_as_elapsed() {
        let start = fixed_now();
        let c = Countdown::from_secs(start, 60);

        let early = start + Duration::milliseconds(500);
        assert_eq!(c.remaining_secs(early), 60);
        assert_eq!(c.format_mmss(early), "01:00");

        let almost = start + Duration::milliseconds(59_500);
        assert_eq!(c.remaining_secs(almost), 1);
        assert_eq!(c.format_mmss(almost), "00:01");
        assert!(!c.is_expired(almost));

        assert!(c.is_expired(start + Duration::seconds(60)));
        assert_eq!(c.remaining(start + Duration::milliseconds(30_250)), Duration::seconds(30));
    }

    #[test]
    fn long_limits_show_total_minutes() {
        let start = fixed_now();
        let c = Countdown::new(start, Duration::minutes(120));
        assert_eq!(c.format_mmss(start), "120:00");
        assert_eq!(c.limit_secs(), 7200);
    }

    #[test]
    fn elapsed_is_never_negative() {
        let start = fixed_now();
        let c = Countdown::from_secs(start, 10);
        assert_eq!(c.elapsed_secs(start - Duration::seconds(5)), 0);
        assert_eq!(c.elapsed_secs(start + Duration::seconds(5)), 5);
    }
}
