//! Usage quota policy.
//!
//! Only the daily ceiling gates access. Monthly counts are computed for
//! reporting and deliberately do not deny requests.
//!
//! Counts are read fresh from the interaction log on each request and the
//! check is not atomic with the later insert, so concurrent requests from one
//! user can overshoot the ceiling by the number in flight.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::models::SubscriptionTier;

/// Daily coaching ceiling for the free tier
pub const FREE_DAILY_LIMIT: u32 = 50;

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Request may proceed
    Allow,
    /// Request is refused, with the reason shown to the user
    Deny(String),
}

impl QuotaDecision {
    /// True for [`QuotaDecision::Allow`]
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Daily ceiling for a tier; `None` means unlimited
#[must_use]
pub const fn daily_limit(tier: SubscriptionTier) -> Option<u32> {
    match tier {
        SubscriptionTier::Free => Some(FREE_DAILY_LIMIT),
        SubscriptionTier::Pro | SubscriptionTier::Studio => None,
    }
}

/// Apply the policy table to today's count
#[must_use]
pub fn check_quota(tier: SubscriptionTier, daily_count: u32) -> QuotaDecision {
    match daily_limit(tier) {
        Some(limit) if daily_count >= limit => QuotaDecision::Deny(format!(
            "Daily coaching limit of {limit} reached for {} tier",
            tier.label()
        )),
        _ => QuotaDecision::Allow,
    }
}

/// Local midnight of the day containing `now`, as UTC
#[must_use]
pub fn start_of_day(now: DateTime<Local>) -> DateTime<Utc> {
    local_instant(now.date_naive().and_time(NaiveTime::MIN), now)
}

/// Local midnight on the first of the month containing `now`, as UTC
#[must_use]
pub fn start_of_month(now: DateTime<Local>) -> DateTime<Utc> {
    let first = now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive());
    local_instant(first.and_time(NaiveTime::MIN), now)
}

/// Resolve a local wall-clock time, taking the earlier instant across DST folds
fn local_instant(naive: NaiveDateTime, fallback: DateTime<Local>) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or(fallback)
        .with_timezone(&Utc)
}
