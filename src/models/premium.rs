// src/models/premium.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Features unlocked by an active subscription, granted in bulk.
pub const PREMIUM_FEATURES: [&str; 4] = [
    "detailed_insights",
    "progress_tracking",
    "personalized_strategies",
    "printable_reports",
];

pub fn is_premium_feature(feature_id: &str) -> bool {
    PREMIUM_FEATURES.contains(&feature_id)
}

/// Time-bounded permission tying a user to a named premium feature.
/// Unique per (user_id, feature_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumFeatureGrant {
    pub user_id: i64,
    pub feature_id: String,
    pub expires_at: DateTime<Utc>,
    pub granted_at: DateTime<Utc>,
}

impl PremiumFeatureGrant {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
