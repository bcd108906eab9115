// src/models/payment.rs

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Stripe PaymentIntent ids look like `pi_3Nx...`.
pub static PAYMENT_INTENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pi_[A-Za-z0-9]{1,255}$").expect("valid payment intent regex"));

/// Outcome of a PaymentIntent as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// DTO for starting the detailed report checkout.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportPaymentRequest {
    #[validate(range(min = 1))]
    pub quiz_result_id: i64,
}

/// Response of `POST /api/payments/report`.
#[derive(Debug, Serialize)]
pub struct CreateReportPaymentResponse {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// DTO for confirming a completed checkout.
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmReportPaymentRequest {
    #[validate(range(min = 1))]
    pub quiz_result_id: i64,
    #[validate(regex(path = *PAYMENT_INTENT_ID, message = "Invalid payment intent id"))]
    pub payment_intent_id: String,
}
