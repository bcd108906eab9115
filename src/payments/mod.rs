// src/payments/mod.rs

pub mod stripe;

use std::{collections::HashMap, sync::LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    error::AppError,
    models::{
        payment::PaymentIntent,
        subscription::{PlanType, SubscriptionStatus},
    },
};

pub use stripe::StripeGateway;

/// Provider object ids (`pi_...`, `sub_...`, `cus_...`) are plain tokens.
static PROVIDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,4}_[A-Za-z0-9]+$").expect("valid provider id regex"));

/// Rejects anything that is not shaped like a provider object id before it
/// is used in a request path.
pub fn ensure_provider_id(id: &str) -> Result<&str, AppError> {
    if PROVIDER_ID.is_match(id) {
        Ok(id)
    } else {
        Err(AppError::BadRequest(format!("Invalid provider reference '{}'", id)))
    }
}

/// Subscription as reported by the payment provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    /// Secret of the first invoice's payment, when it still needs confirmation.
    pub client_secret: Option<String>,
}

/// Payment provider operations used by the entitlement flows.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, AppError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError>;

    /// Returns the provider customer id.
    async fn create_customer(&self, user_id: i64, username: &str) -> Result<String, AppError>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: PlanType,
    ) -> Result<ProviderSubscription, AppError>;

    async fn retrieve_subscription(&self, id: &str) -> Result<ProviderSubscription, AppError>;

    /// Stops renewal; the current period stays paid.
    async fn cancel_subscription(&self, id: &str) -> Result<(), AppError>;
}
