// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

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
    store::{PremiumFeatureStore, QuizResultStore, SubscriptionStore, UserStore},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, User>,
    quiz_results: HashMap<i64, QuizResult>,
    subscriptions: HashMap<i64, Subscription>,
    grants: HashMap<(i64, String), PremiumFeatureGrant>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store for development and tests.
///
/// Each operation takes the lock once, so single-row updates are atomic
/// just like their Postgres counterparts.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalServerError("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            payment_customer_id: None,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn set_payment_customer(&self, user_id: i64, customer_id: &str) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(AppError::NotFound("User not found".to_string()))?;
        user.payment_customer_id = Some(customer_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl QuizResultStore for MemoryStore {
    async fn save_quiz_result(&self, candidate: NewQuizResult) -> Result<QuizResult, AppError> {
        let mut tables = self.lock()?;
        let result = QuizResult {
            id: tables.next_id(),
            user_id: candidate.user_id,
            total_score: candidate.total_score,
            scores: candidate.scores,
            category: candidate.category,
            answers: candidate.answers,
            premium_paid: false,
            payment_id: None,
            created_at: candidate.created_at.unwrap_or_else(Utc::now),
        };
        tables.quiz_results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn get_quiz_result(&self, id: i64) -> Result<Option<QuizResult>, AppError> {
        Ok(self.lock()?.quiz_results.get(&id).cloned())
    }

    async fn list_quiz_results(&self, user_id: i64) -> Result<Vec<QuizResult>, AppError> {
        let tables = self.lock()?;
        let mut results: Vec<QuizResult> = tables
            .quiz_results
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(results)
    }

    async fn mark_quiz_result_paid(
        &self,
        id: i64,
        payment_reference: &str,
    ) -> Result<QuizResult, AppError> {
        let mut tables = self.lock()?;
        let result = tables
            .quiz_results
            .get_mut(&id)
            .ok_or(AppError::NotFound("Quiz result not found".to_string()))?;
        if !result.premium_paid {
            result.premium_paid = true;
            result.payment_id = Some(payment_reference.to_string());
        }
        Ok(result.clone())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.is_active_at(now))
            .max_by_key(|s| (s.current_period_end, s.id))
            .cloned())
    }

    async fn get_latest_subscription(&self, user_id: i64) -> Result<Option<Subscription>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| (s.created_at, s.id))
            .cloned())
    }

    async fn get_subscription(&self, id: i64) -> Result<Option<Subscription>, AppError> {
        Ok(self.lock()?.subscriptions.get(&id).cloned())
    }

    async fn create_subscription(&self, record: NewSubscription) -> Result<Subscription, AppError> {
        let mut tables = self.lock()?;
        let subscription = Subscription {
            id: tables.next_id(),
            user_id: record.user_id,
            provider_subscription_id: record.provider_subscription_id,
            status: record.status,
            plan: record.plan,
            current_period_start: record.current_period_start,
            current_period_end: record.current_period_end,
            canceled_at: None,
            created_at: Utc::now(),
        };
        tables
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn update_subscription_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Result<Subscription, AppError> {
        let mut tables = self.lock()?;
        let subscription = tables
            .subscriptions
            .get_mut(&id)
            .ok_or(AppError::NotFound("Subscription not found".to_string()))?;
        subscription.status = status;
        if canceled_at.is_some() {
            subscription.canceled_at = canceled_at;
        }
        Ok(subscription.clone())
    }

    async fn renew_subscription_period(
        &self,
        id: i64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let mut tables = self.lock()?;
        let subscription = tables
            .subscriptions
            .get_mut(&id)
            .ok_or(AppError::NotFound("Subscription not found".to_string()))?;
        subscription.current_period_start = period_start;
        subscription.current_period_end = period_end;
        Ok(subscription.clone())
    }
}

#[async_trait]
impl PremiumFeatureStore for MemoryStore {
    async fn add_user_premium_feature(
        &self,
        user_id: i64,
        feature_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PremiumFeatureGrant, AppError> {
        let mut tables = self.lock()?;
        let grant = tables
            .grants
            .entry((user_id, feature_id.to_string()))
            .and_modify(|g| {
                if expires_at > g.expires_at {
                    g.expires_at = expires_at;
                }
            })
            .or_insert_with(|| PremiumFeatureGrant {
                user_id,
                feature_id: feature_id.to_string(),
                expires_at,
                granted_at: Utc::now(),
            });
        Ok(grant.clone())
    }

    async fn list_user_premium_features(
        &self,
        user_id: i64,
    ) -> Result<Vec<PremiumFeatureGrant>, AppError> {
        let tables = self.lock()?;
        let mut grants: Vec<PremiumFeatureGrant> = tables
            .grants
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.feature_id.cmp(&b.feature_id));
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{
        quiz_result::{Category, DimensionScores},
        subscription::PlanType,
    };

    fn new_result(user_id: i64) -> NewQuizResult {
        NewQuizResult {
            user_id,
            total_score: 0,
            scores: DimensionScores::default(),
            category: Category::Low,
            answers: (0..15).map(|i| (i, 0)).collect(),
            created_at: None,
        }
    }

    fn new_subscription(user_id: i64, status: SubscriptionStatus, end: DateTime<Utc>) -> NewSubscription {
        NewSubscription {
            user_id,
            provider_subscription_id: "sub_test".to_string(),
            status,
            plan: PlanType::Monthly,
            current_period_start: end - Duration::days(30),
            current_period_end: end,
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();
        let err = store.create_user("alice", "hash").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn saved_result_defaults_to_unpaid() {
        let store = MemoryStore::new();
        let saved = store.save_quiz_result(new_result(1)).await.unwrap();
        assert!(!saved.premium_paid);
        assert!(saved.payment_id.is_none());

        let paid = store.mark_quiz_result_paid(saved.id, "pi_1").await.unwrap();
        assert!(paid.premium_paid);
        assert_eq!(paid.payment_id.as_deref(), Some("pi_1"));

        let again = store.mark_quiz_result_paid(saved.id, "pi_2").await.unwrap();
        assert_eq!(again.payment_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn active_subscription_ignores_expired_and_canceled() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .create_subscription(new_subscription(1, SubscriptionStatus::Active, now - Duration::days(1)))
            .await
            .unwrap();
        store
            .create_subscription(new_subscription(1, SubscriptionStatus::Canceled, now + Duration::days(10)))
            .await
            .unwrap();
        assert!(store.get_active_subscription(1, now).await.unwrap().is_none());

        let live = store
            .create_subscription(new_subscription(1, SubscriptionStatus::Active, now + Duration::days(20)))
            .await
            .unwrap();
        let active = store.get_active_subscription(1, now).await.unwrap().unwrap();
        assert_eq!(active.id, live.id);
        assert!(store.get_active_subscription(2, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn grants_are_deduplicated_keeping_later_expiry() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store
            .add_user_premium_feature(1, "progress_tracking", now + Duration::days(30))
            .await
            .unwrap();
        store
            .add_user_premium_feature(1, "progress_tracking", now + Duration::days(5))
            .await
            .unwrap();
        let grant = store
            .add_user_premium_feature(1, "progress_tracking", now + Duration::days(60))
            .await
            .unwrap();

        let grants = store.list_user_premium_features(1).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].expires_at, now + Duration::days(60));
        assert_eq!(grant, grants[0]);
    }
}
