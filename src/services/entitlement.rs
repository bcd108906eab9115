// src/services/entitlement.rs

//! Access decisions for paid reports and premium features, plus the flows
//! that change them (report payment confirmation, subscription lifecycle).

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        payment::CreateReportPaymentResponse,
        premium::{PREMIUM_FEATURES, PremiumFeatureGrant, is_premium_feature},
        quiz_result::QuizResult,
        subscription::{
            NewSubscription, PlanType, StartSubscriptionResponse, Subscription,
            SubscriptionOverview, SubscriptionStatus,
        },
    },
    payments::PaymentGateway,
    store::Store,
};

/// Price of the detailed report checkout.
#[derive(Debug, Clone)]
pub struct ReportPricing {
    pub amount_cents: i64,
    pub currency: String,
}

/// The detailed report of a result is visible once it has been paid for.
pub fn can_view_report(result: &QuizResult) -> bool {
    result.premium_paid
}

pub struct EntitlementManager {
    store: Arc<dyn Store>,
    payments: Arc<dyn PaymentGateway>,
    pricing: ReportPricing,
}

impl EntitlementManager {
    pub fn new(
        store: Arc<dyn Store>,
        payments: Arc<dyn PaymentGateway>,
        pricing: ReportPricing,
    ) -> Self {
        Self {
            store,
            payments,
            pricing,
        }
    }

    /// Loads a result and checks that `user_id` owns it.
    pub async fn owned_result(&self, user_id: i64, result_id: i64) -> Result<QuizResult, AppError> {
        let result = self
            .store
            .get_quiz_result(result_id)
            .await?
            .ok_or(AppError::NotFound("Quiz result not found".to_string()))?;

        if result.user_id != user_id {
            tracing::warn!(
                "User {} tried to access quiz result {} owned by user {}",
                user_id,
                result_id,
                result.user_id
            );
            return Err(AppError::Forbidden(
                "Quiz result belongs to another user".to_string(),
            ));
        }
        Ok(result)
    }

    /// Owned and paid result, ready for the detailed report.
    pub async fn paid_result(&self, user_id: i64, result_id: i64) -> Result<QuizResult, AppError> {
        let result = self.owned_result(user_id, result_id).await?;
        if !can_view_report(&result) {
            return Err(AppError::PaymentRequired(
                "Detailed report has not been purchased".to_string(),
            ));
        }
        Ok(result)
    }

    /// Opens a checkout for the detailed report of one result.
    pub async fn create_report_payment(
        &self,
        user_id: i64,
        result_id: i64,
    ) -> Result<CreateReportPaymentResponse, AppError> {
        let result = self.owned_result(user_id, result_id).await?;
        if result.premium_paid {
            return Err(AppError::Conflict(
                "Detailed report already purchased".to_string(),
            ));
        }

        let metadata = HashMap::from([
            ("quiz_result_id".to_string(), result.id.to_string()),
            ("user_id".to_string(), user_id.to_string()),
        ]);
        let intent = self
            .payments
            .create_payment_intent(self.pricing.amount_cents, &self.pricing.currency, metadata)
            .await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            AppError::Upstream(format!("payment intent {} has no client secret", intent.id))
        })?;

        tracing::info!(
            "Created payment intent {} for quiz result {} (user {})",
            intent.id,
            result.id,
            user_id
        );

        Ok(CreateReportPaymentResponse {
            payment_intent_id: intent.id,
            client_secret,
            amount_cents: self.pricing.amount_cents,
            currency: self.pricing.currency.clone(),
        })
    }

    /// Verifies a completed charge and unlocks the detailed report.
    ///
    /// The flag only ever moves from unpaid to paid. Confirming an already
    /// paid result returns it unchanged.
    pub async fn confirm_report_payment(
        &self,
        user_id: i64,
        result_id: i64,
        payment_intent_id: &str,
    ) -> Result<QuizResult, AppError> {
        let result = self.owned_result(user_id, result_id).await?;
        if result.premium_paid {
            tracing::info!("Quiz result {} already paid, nothing to confirm", result.id);
            return Ok(result);
        }

        let intent = self.payments.retrieve_payment_intent(payment_intent_id).await?;
        if !intent.succeeded() {
            tracing::info!(
                "Payment intent {} for quiz result {} is '{}'",
                intent.id,
                result.id,
                intent.status
            );
            return Err(AppError::PaymentRequired(
                "Payment not completed successfully".to_string(),
            ));
        }

        // Only intents opened by `create_report_payment` for this result and user count.
        let tagged = |key: &str, expected: i64| {
            intent.metadata.get(key).map(String::as_str) == Some(expected.to_string().as_str())
        };
        if !tagged("quiz_result_id", result.id) || !tagged("user_id", user_id) {
            tracing::warn!(
                "Payment intent {} is not a report payment for quiz result {} (user {})",
                intent.id,
                result.id,
                user_id
            );
            return Err(AppError::BadRequest(
                "Payment does not belong to this quiz result".to_string(),
            ));
        }

        let updated = self
            .store
            .mark_quiz_result_paid(result.id, &intent.id)
            .await?;
        tracing::info!(
            "Quiz result {} unlocked by payment {}",
            updated.id,
            intent.id
        );
        Ok(updated)
    }

    /// Premium access requires an active subscription right now.
    pub async fn has_premium_access(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self
            .store
            .get_active_subscription(user_id, now)
            .await?
            .is_some())
    }

    async fn valid_grant(
        &self,
        user_id: i64,
        feature_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PremiumFeatureGrant>, AppError> {
        Ok(self
            .store
            .list_user_premium_features(user_id)
            .await?
            .into_iter()
            .find(|g| g.feature_id == feature_id && g.is_valid_at(now)))
    }

    /// True while an unexpired grant exists, independent of subscription status.
    pub async fn has_feature(
        &self,
        user_id: i64,
        feature_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self.valid_grant(user_id, feature_id, now).await?.is_some())
    }

    /// The grant behind [`has_feature`](Self::has_feature). Unknown feature
    /// names are `NotFound`, missing or expired grants `PaymentRequired`.
    pub async fn feature_grant(
        &self,
        user_id: i64,
        feature_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PremiumFeatureGrant, AppError> {
        if !is_premium_feature(feature_id) {
            return Err(AppError::NotFound(format!(
                "Unknown premium feature '{}'",
                feature_id
            )));
        }

        self.valid_grant(user_id, feature_id, now)
            .await?
            .ok_or(AppError::PaymentRequired(
                "Premium subscription required".to_string(),
            ))
    }

    pub async fn overview(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionOverview, AppError> {
        let has_premium = self.has_premium_access(user_id, now).await?;
        let subscription = self.store.get_latest_subscription(user_id).await?;
        let features = self
            .store
            .list_user_premium_features(user_id)
            .await?
            .into_iter()
            .filter(|g| g.is_valid_at(now))
            .collect();

        Ok(SubscriptionOverview {
            has_premium,
            subscription,
            features,
        })
    }

    async fn grant_premium_features(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<PremiumFeatureGrant>, AppError> {
        let mut grants = Vec::with_capacity(PREMIUM_FEATURES.len());
        for feature_id in PREMIUM_FEATURES {
            grants.push(
                self.store
                    .add_user_premium_feature(user_id, feature_id, expires_at)
                    .await?,
            );
        }
        tracing::info!(
            "Granted {} premium features to user {} until {}",
            grants.len(),
            user_id,
            expires_at
        );
        Ok(grants)
    }

    async fn payment_customer(&self, user_id: i64) -> Result<String, AppError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        if let Some(customer_id) = user.payment_customer_id {
            return Ok(customer_id);
        }

        let customer_id = self.payments.create_customer(user.id, &user.username).await?;
        self.store.set_payment_customer(user.id, &customer_id).await?;
        Ok(customer_id)
    }

    /// Starts a plan. Rejected while an earlier subscription is incomplete,
    /// active or past due.
    pub async fn start_subscription(
        &self,
        user_id: i64,
        plan: PlanType,
        now: DateTime<Utc>,
    ) -> Result<StartSubscriptionResponse, AppError> {
        // At most one non-terminal subscription per user, and it is always the latest.
        if let Some(open) = self.store.get_latest_subscription(user_id).await? {
            if !open.status.is_terminal() {
                tracing::info!(
                    "User {} tried to start a plan while subscription {} is {}",
                    user_id,
                    open.id,
                    open.status
                );
                return Err(AppError::Conflict(if open.is_active_at(now) {
                    "An active subscription already exists".to_string()
                } else {
                    format!(
                        "Subscription {} is still {}; sync or cancel it first",
                        open.id, open.status
                    )
                }));
            }
        }

        let customer_id = self.payment_customer(user_id).await?;
        let remote = self.payments.create_subscription(&customer_id, plan).await?;

        let subscription = self
            .store
            .create_subscription(NewSubscription {
                user_id,
                provider_subscription_id: remote.id,
                status: remote.status,
                plan,
                current_period_start: remote.current_period_start,
                current_period_end: remote.current_period_end,
            })
            .await?;

        tracing::info!(
            "User {} started {} subscription {} ({})",
            user_id,
            plan,
            subscription.id,
            subscription.status
        );

        if subscription.status == SubscriptionStatus::Active {
            self.grant_premium_features(user_id, subscription.current_period_end)
                .await?;
        }

        Ok(StartSubscriptionResponse {
            subscription,
            client_secret: remote.client_secret,
        })
    }

    /// Stops renewal. Existing grants stay valid until they expire.
    pub async fn cancel_subscription(
        &self,
        user_id: i64,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let subscription = self
            .store
            .get_subscription(subscription_id)
            .await?
            .ok_or(AppError::NotFound("Subscription not found".to_string()))?;

        if subscription.user_id != user_id {
            tracing::warn!(
                "User {} tried to cancel subscription {} owned by user {}",
                user_id,
                subscription.id,
                subscription.user_id
            );
            return Err(AppError::Forbidden(
                "Subscription belongs to another user".to_string(),
            ));
        }

        if !subscription
            .status
            .can_transition_to(SubscriptionStatus::Canceled)
        {
            return Err(AppError::Conflict(format!(
                "Subscription is already {}",
                subscription.status
            )));
        }

        self.payments
            .cancel_subscription(&subscription.provider_subscription_id)
            .await?;

        let canceled = self
            .store
            .update_subscription_status(subscription.id, SubscriptionStatus::Canceled, Some(now))
            .await?;
        tracing::info!(
            "Subscription {} canceled; access runs until {}",
            canceled.id,
            canceled.current_period_end
        );
        Ok(canceled)
    }

    /// Pulls the latest subscription's status and period from the provider.
    pub async fn sync_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let mut subscription = self
            .store
            .get_latest_subscription(user_id)
            .await?
            .ok_or(AppError::NotFound("No subscription found".to_string()))?;

        if subscription.status.is_terminal() {
            return Ok(subscription);
        }

        let remote = self
            .payments
            .retrieve_subscription(&subscription.provider_subscription_id)
            .await?;

        let previous = subscription.status;
        if remote.status != previous {
            if previous.can_transition_to(remote.status) {
                let canceled_at = (remote.status == SubscriptionStatus::Canceled).then_some(now);
                subscription = self
                    .store
                    .update_subscription_status(subscription.id, remote.status, canceled_at)
                    .await?;
                tracing::info!(
                    "Subscription {} moved {} -> {}",
                    subscription.id,
                    previous,
                    subscription.status
                );
            } else {
                tracing::warn!(
                    "Ignoring provider transition {} -> {} for subscription {}",
                    previous,
                    remote.status,
                    subscription.id
                );
            }
        }

        let renewed = remote.current_period_end != subscription.current_period_end;
        if renewed && subscription.status != SubscriptionStatus::Canceled {
            subscription = self
                .store
                .renew_subscription_period(
                    subscription.id,
                    remote.current_period_start,
                    remote.current_period_end,
                )
                .await?;
        }

        let reestablished = subscription.status == SubscriptionStatus::Active
            && (previous != SubscriptionStatus::Active || renewed);
        if reestablished {
            self.grant_premium_features(user_id, subscription.current_period_end)
                .await?;
        }

        Ok(subscription)
    }
}
