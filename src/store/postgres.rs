// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        premium::PremiumFeatureGrant,
        quiz_result::{AnswerSet, DimensionScores, NewQuizResult, QuizResult},
        subscription::{NewSubscription, Subscription, SubscriptionStatus},
        user::User,
    },
    store::{PremiumFeatureStore, QuizResultStore, SubscriptionStore, UserStore},
};

const USER_COLUMNS: &str = "id, username, password, payment_customer_id, created_at";

const QUIZ_RESULT_COLUMNS: &str = "id, user_id, total_score, inattention_score, \
     hyperactivity_score, impulsivity_score, category, answers, premium_paid, payment_id, created_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, provider_subscription_id, status, plan, \
     current_period_start, current_period_end, canceled_at, created_at";

/// Postgres-backed store. Every mutation is a single statement.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    payment_customer_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password: row.password,
            payment_customer_id: row.payment_customer_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct QuizResultRow {
    id: i64,
    user_id: i64,
    total_score: i32,
    inattention_score: i32,
    hyperactivity_score: i32,
    impulsivity_score: i32,
    category: String,
    answers: Json<AnswerSet>,
    premium_paid: bool,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuizResultRow> for QuizResult {
    type Error = AppError;

    fn try_from(row: QuizResultRow) -> Result<Self, Self::Error> {
        Ok(QuizResult {
            id: row.id,
            user_id: row.user_id,
            total_score: row.total_score,
            scores: DimensionScores {
                inattention: row.inattention_score,
                hyperactivity: row.hyperactivity_score,
                impulsivity: row.impulsivity_score,
            },
            category: row.category.parse().map_err(AppError::InternalServerError)?,
            answers: row.answers.0,
            premium_paid: row.premium_paid,
            payment_id: row.payment_id,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SubscriptionRow {
    id: i64,
    user_id: i64,
    provider_subscription_id: String,
    status: String,
    plan: String,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = AppError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: row.id,
            user_id: row.user_id,
            provider_subscription_id: row.provider_subscription_id,
            status: row.status.parse().map_err(AppError::InternalServerError)?,
            plan: row.plan.parse().map_err(AppError::InternalServerError)?,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            canceled_at: row.canceled_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct GrantRow {
    user_id: i64,
    feature_id: String,
    expires_at: DateTime<Utc>,
    granted_at: DateTime<Utc>,
}

impl From<GrantRow> for PremiumFeatureGrant {
    fn from(row: GrantRow) -> Self {
        PremiumFeatureGrant {
            user_id: row.user_id,
            feature_id: row.feature_id,
            expires_at: row.expires_at,
            granted_at: row.granted_at,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Username '{}' already exists", username))
            }
            _ => {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(row.into())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn set_payment_customer(&self, user_id: i64, customer_id: &str) -> Result<(), AppError> {
        let updated = sqlx::query("UPDATE users SET payment_customer_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QuizResultStore for PgStore {
    async fn save_quiz_result(&self, candidate: NewQuizResult) -> Result<QuizResult, AppError> {
        let row = sqlx::query_as::<_, QuizResultRow>(&format!(
            r#"
            INSERT INTO quiz_results
                (user_id, total_score, inattention_score, hyperactivity_score,
                 impulsivity_score, category, answers, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
            RETURNING {}
            "#,
            QUIZ_RESULT_COLUMNS
        ))
        .bind(candidate.user_id)
        .bind(candidate.total_score)
        .bind(candidate.scores.inattention)
        .bind(candidate.scores.hyperactivity)
        .bind(candidate.scores.impulsivity)
        .bind(candidate.category.as_str())
        .bind(Json(&candidate.answers))
        .bind(candidate.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save quiz result: {:?}", e);
            AppError::from(e)
        })?;

        row.try_into()
    }

    async fn get_quiz_result(&self, id: i64) -> Result<Option<QuizResult>, AppError> {
        sqlx::query_as::<_, QuizResultRow>(&format!(
            "SELECT {} FROM quiz_results WHERE id = $1",
            QUIZ_RESULT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(QuizResult::try_from)
        .transpose()
    }

    async fn list_quiz_results(&self, user_id: i64) -> Result<Vec<QuizResult>, AppError> {
        sqlx::query_as::<_, QuizResultRow>(&format!(
            "SELECT {} FROM quiz_results WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            QUIZ_RESULT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(QuizResult::try_from)
        .collect()
    }

    async fn mark_quiz_result_paid(
        &self,
        id: i64,
        payment_reference: &str,
    ) -> Result<QuizResult, AppError> {
        // The first payment wins; a concurrent confirm just reads it back.
        let updated = sqlx::query_as::<_, QuizResultRow>(&format!(
            r#"
            UPDATE quiz_results
            SET premium_paid = TRUE, payment_id = $2
            WHERE id = $1 AND premium_paid = FALSE
            RETURNING {}
            "#,
            QUIZ_RESULT_COLUMNS
        ))
        .bind(id)
        .bind(payment_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark quiz result {} as paid: {:?}", id, e);
            AppError::from(e)
        })?;

        match updated {
            Some(row) => row.try_into(),
            None => self
                .get_quiz_result(id)
                .await?
                .ok_or(AppError::NotFound("Quiz result not found".to_string())),
        }
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE user_id = $1 AND status = 'active' AND current_period_end > $2
            ORDER BY current_period_end DESC, id DESC
            LIMIT 1
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn get_latest_subscription(&self, user_id: i64) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn get_subscription(&self, id: i64) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn create_subscription(&self, record: NewSubscription) -> Result<Subscription, AppError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            INSERT INTO subscriptions
                (user_id, provider_subscription_id, status, plan,
                 current_period_start, current_period_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(record.user_id)
        .bind(&record.provider_subscription_id)
        .bind(record.status.as_str())
        .bind(record.plan.as_str())
        .bind(record.current_period_start)
        .bind(record.current_period_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "Subscription '{}' already recorded",
                record.provider_subscription_id
            )),
            _ => {
                tracing::error!("Failed to create subscription: {:?}", e);
                AppError::from(e)
            }
        })?;

        row.try_into()
    }

    async fn update_subscription_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
        canceled_at: Option<DateTime<Utc>>,
    ) -> Result<Subscription, AppError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET status = $2, canceled_at = COALESCE($3, canceled_at)
            WHERE id = $1
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(canceled_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Subscription not found".to_string()))?;

        row.try_into()
    }

    async fn renew_subscription_period(
        &self,
        id: i64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET current_period_start = $2, current_period_end = $3
            WHERE id = $1
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id)
        .bind(period_start)
        .bind(period_end)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Subscription not found".to_string()))?;

        row.try_into()
    }
}

#[async_trait]
impl PremiumFeatureStore for PgStore {
    async fn add_user_premium_feature(
        &self,
        user_id: i64,
        feature_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PremiumFeatureGrant, AppError> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            INSERT INTO user_premium_features (user_id, feature_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, feature_id) DO UPDATE SET
                expires_at = GREATEST(user_premium_features.expires_at, EXCLUDED.expires_at)
            RETURNING user_id, feature_id, expires_at, granted_at
            "#,
        )
        .bind(user_id)
        .bind(feature_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_user_premium_features(
        &self,
        user_id: i64,
    ) -> Result<Vec<PremiumFeatureGrant>, AppError> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT user_id, feature_id, expires_at, granted_at
            FROM user_premium_features
            WHERE user_id = $1
            ORDER BY feature_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PremiumFeatureGrant::from).collect())
    }
}
