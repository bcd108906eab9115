// src/store/mod.rs

//! Persistence seams.
//!
//! Handlers and services only see these traits; `AppState` carries an
//! `Arc<dyn Store>` backed by Postgres or, for development, by memory.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        premium::PremiumFeatureGrant,
        quiz_result::{NewQuizResult, QuizResult},
        subscription::{NewSubscription, Subscription, SubscriptionStatus},
        user::User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn set_payment_customer(&self, user_id: i64, customer_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait QuizResultStore: Send + Sync {
    /// Assigns the id and defaults `created_at` to now.
    async fn save_quiz_result(&self, candidate: NewQuizResult) -> Result<QuizResult, AppError>;
    async fn get_quiz_result(&self, id: i64) -> Result<Option<QuizResult>, AppError>;
    /// Newest first.
    async fn list_quiz_results(&self, user_id: i64) -> Result<Vec<QuizResult>, AppError>;
    /// Sets `premium_paid = true` and records the payment reference.
    async fn mark_quiz_result_paid(
        &self,
        id: i64,
        payment_reference: &str,
    ) -> Result<QuizResult, AppError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Status `active` with `current_period_end > now`; latest period end wins.
    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError>;
    /// Most recently created subscription regardless of status.
    async fn get_latest_subscription(&self, user_id: i64) -> Result<Option<Subscription>, AppError>;
    async fn get_subscription(&self, id: i64) -> Result<Option<Subscription>, AppError>;
    async fn create_subscription(&self, record: NewSubscription) -> Result<Subscription, AppError>;
    async fn update_subscription_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Result<Subscription, AppError>;
    /// Records a new billing period reported by the provider.
    async fn renew_subscription_period(
        &self,
        id: i64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError>;
}

#[async_trait]
pub trait PremiumFeatureStore: Send + Sync {
    /// Upserts the (user, feature) grant, keeping the later expiry.
    async fn add_user_premium_feature(
        &self,
        user_id: i64,
        feature_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PremiumFeatureGrant, AppError>;
    async fn list_user_premium_features(
        &self,
        user_id: i64,
    ) -> Result<Vec<PremiumFeatureGrant>, AppError>;
}

/// Everything the application needs from storage.
pub trait Store: UserStore + QuizResultStore + SubscriptionStore + PremiumFeatureStore {}

impl<T> Store for T where T: UserStore + QuizResultStore + SubscriptionStore + PremiumFeatureStore {}
