// src/payments/stripe.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    config::StripeConfig,
    error::AppError,
    models::{
        payment::PaymentIntent,
        subscription::{PlanType, SubscriptionStatus},
    },
    payments::{PaymentGateway, ProviderSubscription, ensure_provider_id},
};

/// Talks to Stripe's form-encoded REST API.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    items: Option<SubscriptionItems>,
    /// Either an invoice id or, when expanded, the invoice object.
    latest_invoice: Option<Value>,
}

/// Collapses Stripe's subscription statuses onto the local state machine.
pub fn map_status(status: &str) -> Result<SubscriptionStatus, AppError> {
    match status {
        "incomplete" => Ok(SubscriptionStatus::Incomplete),
        "active" | "trialing" => Ok(SubscriptionStatus::Active),
        "past_due" | "unpaid" | "paused" => Ok(SubscriptionStatus::PastDue),
        "canceled" | "incomplete_expired" => Ok(SubscriptionStatus::Canceled),
        other => Err(AppError::Upstream(format!(
            "unexpected subscription status '{}'",
            other
        ))),
    }
}

fn timestamp(secs: Option<i64>, field: &str) -> Result<DateTime<Utc>, AppError> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| AppError::Upstream(format!("subscription is missing {}", field)))
}

impl TryFrom<SubscriptionObject> for ProviderSubscription {
    type Error = AppError;

    fn try_from(obj: SubscriptionObject) -> Result<Self, Self::Error> {
        // Newer API versions only report the period on the subscription items.
        let first_item = obj.items.as_ref().and_then(|items| items.data.first());
        let period_start = obj
            .current_period_start
            .or_else(|| first_item.and_then(|i| i.current_period_start));
        let period_end = obj
            .current_period_end
            .or_else(|| first_item.and_then(|i| i.current_period_end));

        let client_secret = obj.latest_invoice.as_ref().and_then(|invoice| {
            invoice
                .pointer("/payment_intent/client_secret")
                .or_else(|| invoice.pointer("/confirmation_secret/client_secret"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        Ok(ProviderSubscription {
            status: map_status(&obj.status)?,
            current_period_start: timestamp(period_start, "current_period_start")?,
            current_period_end: timestamp(period_end, "current_period_end")?,
            client_secret,
            id: obj.id,
        })
    }
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, AppError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AppError> {
        let url = self
            .config
            .api_base
            .join(path)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.config.secret_key))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| format!("Stripe responded with {}", status));

        tracing::warn!("Stripe request failed ({}): {}", status, message);

        Err(match status {
            StatusCode::PAYMENT_REQUIRED => AppError::PaymentRequired(message),
            StatusCode::NOT_FOUND => AppError::BadRequest(message),
            _ => AppError::Upstream(message),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, AppError> {
        let mut form = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        form.extend(
            metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value)),
        );

        let request = self.request(Method::POST, "v1/payment_intents")?.form(&form);
        self.send(request).await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        let id = ensure_provider_id(id)?;
        let request = self.request(Method::GET, &format!("v1/payment_intents/{}", id))?;
        self.send(request).await
    }

    async fn create_customer(&self, user_id: i64, username: &str) -> Result<String, AppError> {
        let form = [
            ("name", username.to_string()),
            ("metadata[user_id]", user_id.to_string()),
        ];
        let request = self.request(Method::POST, "v1/customers")?.form(&form);
        let customer: CustomerObject = self.send(request).await?;
        Ok(customer.id)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: PlanType,
    ) -> Result<ProviderSubscription, AppError> {
        let form = [
            ("customer", ensure_provider_id(customer_id)?.to_string()),
            ("items[0][price]", self.config.price_for(plan).to_string()),
            ("payment_behavior", "default_incomplete".to_string()),
            ("expand[0]", "latest_invoice.payment_intent".to_string()),
            ("metadata[plan]", plan.as_str().to_string()),
        ];
        let request = self.request(Method::POST, "v1/subscriptions")?.form(&form);
        let subscription: SubscriptionObject = self.send(request).await?;
        subscription.try_into()
    }

    async fn retrieve_subscription(&self, id: &str) -> Result<ProviderSubscription, AppError> {
        let id = ensure_provider_id(id)?;
        let request = self.request(Method::GET, &format!("v1/subscriptions/{}", id))?;
        let subscription: SubscriptionObject = self.send(request).await?;
        subscription.try_into()
    }

    async fn cancel_subscription(&self, id: &str) -> Result<(), AppError> {
        let id = ensure_provider_id(id)?;
        let form = [("cancel_at_period_end", "true")];
        let request = self
            .request(Method::POST, &format!("v1/subscriptions/{}", id))?
            .form(&form);
        let _: SubscriptionObject = self.send(request).await?;
        Ok(())
    }
}
