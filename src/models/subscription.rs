// src/models/subscription.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::premium::PremiumFeatureGrant;

/// Lifecycle state of a subscription.
///
/// ```text
/// incomplete -> active | canceled
/// active     -> past_due | canceled
/// past_due   -> active | canceled
/// canceled   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Incomplete,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, next),
            (Incomplete, Active)
                | (Incomplete, Canceled)
                | (Active, PastDue)
                | (Active, Canceled)
                | (PastDue, Active)
                | (PastDue, Canceled)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SubscriptionStatus::Canceled
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            // Stripe spells it both ways depending on the object.
            "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
            other => Err(format!("unknown subscription status '{}'", other)),
        }
    }
}

/// Billing plan of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Yearly,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PlanType::Monthly),
            "yearly" => Ok(PlanType::Yearly),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

/// A stored subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    /// Payment-provider subscription reference (e.g. `sub_...`).
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan: PlanType,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Active status and a billing period that has not ended yet.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.current_period_end > now
    }
}

/// Record handed to the store when a subscription is started.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: i64,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan: PlanType,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

/// DTO for starting a subscription.
#[derive(Debug, Deserialize)]
pub struct StartSubscriptionRequest {
    pub plan: PlanType,
}

/// Response of `POST /api/subscription`.
#[derive(Debug, Serialize)]
pub struct StartSubscriptionResponse {
    pub subscription: Subscription,
    /// Present while the first invoice still needs client-side confirmation.
    pub client_secret: Option<String>,
}

/// Response of `GET /api/subscription`.
#[derive(Debug, Serialize)]
pub struct SubscriptionOverview {
    pub has_premium: bool,
    pub subscription: Option<Subscription>,
    pub features: Vec<PremiumFeatureGrant>,
}
