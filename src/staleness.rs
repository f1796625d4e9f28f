use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

/// Point in time before which a branch's last commit makes it stale.
///
/// Computed once per run and shared read-only by every repository pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff(DateTime<Utc>);

impl Cutoff {
    /// `now` minus the retention window. Fails when the window reaches past
    /// the representable date range.
    pub fn new(now: DateTime<Utc>, retention_days: u32) -> Result<Self> {
        Duration::try_days(i64::from(retention_days))
            .and_then(|window| now.checked_sub_signed(window))
            .map(Cutoff)
            .with_context(|| {
                format!(
                    "Retention window of {} days is out of range",
                    retention_days
                )
            })
    }

    #[cfg(test)]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Cutoff(timestamp)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A branch is stale only when its last commit is known and strictly older
/// than the cutoff. Unknown commit times are never stale.
pub fn is_stale(last_commit_time: Option<DateTime<Utc>>, cutoff: &Cutoff) -> bool {
    matches!(last_commit_time, Some(t) if t < cutoff.timestamp())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn cutoff() -> Cutoff {
        Cutoff::at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_unknown_time_is_never_stale() {
        assert!(!is_stale(None, &cutoff()));
    }

    #[test]
    fn test_older_commits_are_stale() {
        let c = cutoff();
        let t1 = c.timestamp() - Duration::days(800);
        let t2 = c.timestamp() - Duration::seconds(1);
        assert!(is_stale(Some(t1), &c));
        assert!(is_stale(Some(t2), &c));
    }

    #[test]
    fn test_cutoff_boundary_is_fresh() {
        let c = cutoff();
        assert!(!is_stale(Some(c.timestamp()), &c));
        assert!(!is_stale(Some(c.timestamp() + Duration::days(1)), &c));
    }

    #[test]
    fn test_retention_window() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let c = Cutoff::new(now, 365).unwrap();
        assert_eq!(
            c.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_oversized_retention_window_rejected() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert!(Cutoff::new(now, 100_000_000).is_err());
        assert!(Cutoff::new(now, u32::MAX).is_err());
        assert!(Cutoff::new(now, 0).is_ok());
    }
}
