use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Cents, units};

/// Job-board subscription tiers.
///
/// Stored profiles may name a plan this build does not know; those
/// deserialize to `Unrecognized` and get a daily quota of zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionPlan {
    Starter,
    Growth,
    Business,
    Enterprise,
    #[serde(other)]
    Unrecognized,
}

/// Applications allowed per calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyLimit {
    Limited(u32),
    Unlimited,
}

impl DailyLimit {
    pub fn allows(&self, used: u32) -> bool {
        match self {
            DailyLimit::Limited(limit) => used < *limit,
            DailyLimit::Unlimited => true,
        }
    }
}

impl std::fmt::Display for DailyLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DailyLimit::Limited(limit) => write!(f, "{}", limit),
            DailyLimit::Unlimited => write!(f, "Unlimited"),
        }
    }
}

impl SubscriptionPlan {
    pub const PURCHASABLE: [SubscriptionPlan; 4] = [
        SubscriptionPlan::Starter,
        SubscriptionPlan::Growth,
        SubscriptionPlan::Business,
        SubscriptionPlan::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Starter => "Starter",
            SubscriptionPlan::Growth => "Growth",
            SubscriptionPlan::Business => "Business",
            SubscriptionPlan::Enterprise => "Enterprise",
            SubscriptionPlan::Unrecognized => "Unrecognized",
        }
    }

    /// Parse a plan name; anything unknown maps to `Unrecognized`.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "starter" => SubscriptionPlan::Starter,
            "growth" => SubscriptionPlan::Growth,
            "business" => SubscriptionPlan::Business,
            "enterprise" => SubscriptionPlan::Enterprise,
            _ => SubscriptionPlan::Unrecognized,
        }
    }

    pub fn daily_limit(&self) -> DailyLimit {
        match self {
            SubscriptionPlan::Starter => DailyLimit::Limited(5),
            SubscriptionPlan::Growth => DailyLimit::Limited(15),
            SubscriptionPlan::Business | SubscriptionPlan::Enterprise => DailyLimit::Unlimited,
            SubscriptionPlan::Unrecognized => DailyLimit::Limited(0),
        }
    }

    /// Purchase price, `None` for plans that cannot be bought.
    pub fn price(&self) -> Option<Cents> {
        match self {
            SubscriptionPlan::Starter => Some(units(500)),
            SubscriptionPlan::Growth => Some(units(1000)),
            SubscriptionPlan::Business => Some(units(2500)),
            SubscriptionPlan::Enterprise => Some(units(5000)),
            SubscriptionPlan::Unrecognized => None,
        }
    }

    pub fn duration_days(&self) -> i64 {
        match self {
            SubscriptionPlan::Starter | SubscriptionPlan::Growth => 30,
            SubscriptionPlan::Business => 60,
            SubscriptionPlan::Enterprise => 90,
            SubscriptionPlan::Unrecognized => 0,
        }
    }

    /// Starter subscribers only see non-premium listings.
    pub fn includes_premium_jobs(&self) -> bool {
        !matches!(
            self,
            SubscriptionPlan::Starter | SubscriptionPlan::Unrecognized
        )
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubscription {
    pub plan: SubscriptionPlan,
    pub expiry_date: NaiveDate,
    pub applications_today: u32,
    pub last_application_date: NaiveDate,
}

impl JobSubscription {
    /// Start a subscription on `today` running for the plan's duration.
    pub fn start(plan: SubscriptionPlan, today: NaiveDate) -> Self {
        Self {
            plan,
            expiry_date: today + Duration::days(plan.duration_days()),
            applications_today: 0,
            last_application_date: today,
        }
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.expiry_date
    }

    pub fn daily_limit(&self) -> DailyLimit {
        self.plan.daily_limit()
    }
}

/// Roll the daily counter over when `today` differs from the last
/// application date. Pure: the caller persists the result.
pub fn apply_daily_quota_check(subscription: &JobSubscription, today: NaiveDate) -> JobSubscription {
    if subscription.last_application_date == today {
        return subscription.clone();
    }
    JobSubscription {
        applications_today: 0,
        last_application_date: today,
        ..subscription.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDecision {
    pub allowed: bool,
    pub subscription: JobSubscription,
}

/// Take one application slot for `today` if the plan's quota allows it.
/// A denied request leaves the (rolled-over) counter untouched.
pub fn consume_application_slot(subscription: &JobSubscription, today: NaiveDate) -> SlotDecision {
    let mut subscription = apply_daily_quota_check(subscription, today);
    let allowed = subscription.daily_limit().allows(subscription.applications_today);
    if allowed {
        subscription.applications_today += 1;
    }
    SlotDecision {
        allowed,
        subscription,
    }
}
