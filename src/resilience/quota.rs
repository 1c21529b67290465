//! Daily request quota shared by the paid tier.

use crate::error::GeocodeError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Counts requests against a fixed per-UTC-day limit.
///
/// The counter resets when the UTC day rolls over. Charging is atomic, so
/// concurrent callers cannot overspend by more than the number of calls
/// racing the limit.
#[derive(Debug)]
pub struct DailyQuota {
    limit: u64,
    used_today: AtomicU64,
    quota_day: AtomicU64,
}

impl DailyQuota {
    /// Create a quota allowing `limit` requests per UTC day.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used_today: AtomicU64::new(0),
            quota_day: AtomicU64::new(current_epoch_day()),
        }
    }

    /// The configured per-day limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Requests charged against today's quota.
    pub fn used_today(&self) -> u64 {
        self.roll_day();
        self.used_today.load(Ordering::Relaxed)
    }

    /// Whether the quota is already spent for today.
    pub fn is_exhausted(&self) -> bool {
        self.roll_day();
        self.used_today.load(Ordering::SeqCst) >= self.limit
    }

    /// Charge one request, failing when the daily limit is reached.
    pub fn charge(&self) -> Result<(), GeocodeError> {
        self.roll_day();
        let used = self.used_today.fetch_add(1, Ordering::SeqCst);
        if used >= self.limit {
            warn!(limit = self.limit, "daily quota exhausted");
            return Err(GeocodeError::QuotaExceeded {
                message: format!("daily quota of {} requests exhausted", self.limit),
            });
        }
        Ok(())
    }

    /// Reset the usage counter when the UTC day has rolled over.
    fn roll_day(&self) {
        let today = current_epoch_day();
        let recorded = self.quota_day.load(Ordering::SeqCst);
        if recorded != today
            && self
                .quota_day
                .compare_exchange(recorded, today, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.used_today.store(0, Ordering::SeqCst);
        }
    }
}

fn current_epoch_day() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        / 86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_up_to_the_limit() {
        let quota = DailyQuota::new(2);
        assert!(quota.charge().is_ok());
        assert!(quota.charge().is_ok());
        assert_eq!(quota.used_today(), 2);

        let err = quota.charge().unwrap_err();
        assert!(matches!(err, GeocodeError::QuotaExceeded { .. }));
    }

    #[test]
    fn exhaustion_is_observable_without_charging() {
        let quota = DailyQuota::new(1);
        assert!(!quota.is_exhausted());

        quota.charge().unwrap();
        assert!(quota.is_exhausted());
        // Peeking did not consume anything further.
        assert_eq!(quota.used_today(), 1);
    }

    #[test]
    fn zero_limit_rejects_immediately() {
        let quota = DailyQuota::new(0);
        assert!(quota.is_exhausted());
        assert!(quota.charge().is_err());
    }
}
