use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use configs::{BonusRule, MembershipConfig};
use crate::errors::ServiceError;

/// Bonus table and upper bound for a single renewal.
#[derive(Debug, Clone)]
pub struct RenewalPolicy {
    pub bonus_rules: Vec<BonusRule>,
    pub max_renewal_days: i64,
}

impl From<&MembershipConfig> for RenewalPolicy {
    fn from(cfg: &MembershipConfig) -> Self {
        Self { bonus_rules: cfg.bonus_rules.clone(), max_renewal_days: cfg.max_renewal_days }
    }
}

impl Default for RenewalPolicy {
    fn default() -> Self { Self::from(&MembershipConfig::default()) }
}

impl RenewalPolicy {
    /// Bonus of the rule with the largest `min_days` not above `days`; 0 when none applies.
    pub fn bonus_for(&self, days: i64) -> i64 {
        self.bonus_rules
            .iter()
            .filter(|r| r.min_days <= days)
            .max_by_key(|r| r.min_days)
            .map(|r| r.bonus_days)
            .unwrap_or(0)
    }

    pub fn validate_days(&self, days: i64) -> Result<(), ServiceError> {
        if days < 1 || days > self.max_renewal_days {
            return Err(ServiceError::Validation(format!("days must be within 1..={}", self.max_renewal_days)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenewalPlan {
    pub previous_end: DateTime<Utc>,
    /// `max(previous_end, now)`: an expired membership restarts from now
    pub base: DateTime<Utc>,
    pub days: i64,
    pub bonus_days: i64,
    pub new_end: DateTime<Utc>,
}

impl RenewalPlan {
    pub fn total_days(&self) -> i64 { self.days + self.bonus_days }

    pub fn was_expired(&self) -> bool { self.previous_end < self.base }
}

/// `new_end = max(current_end, now) + days + bonus(days)`
pub fn compute_renewal(
    current_end: DateTime<Utc>,
    now: DateTime<Utc>,
    days: i64,
    policy: &RenewalPolicy,
) -> Result<RenewalPlan, ServiceError> {
    policy.validate_days(days)?;
    plan_accepted(current_end, now, days, policy)
}

/// Plan for a day count that was validated when the renewal was requested.
///
/// Settling a paid renewal must not re-check `max_renewal_days`; the bound may
/// have been lowered after the order was paid.
pub(crate) fn plan_accepted(
    current_end: DateTime<Utc>,
    now: DateTime<Utc>,
    days: i64,
    policy: &RenewalPolicy,
) -> Result<RenewalPlan, ServiceError> {
    let base = current_end.max(now);
    let bonus_days = policy.bonus_for(days);
    let new_end = base
        .checked_add_signed(Duration::days(days + bonus_days))
        .ok_or_else(|| ServiceError::Validation("renewal overflows the calendar".into()))?;
    Ok(RenewalPlan { previous_end: current_end, base, days, bonus_days, new_end })
}
