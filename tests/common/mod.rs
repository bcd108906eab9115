// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use adhd_check::{
    config::{Config, StripeConfig},
    payments::StripeGateway,
    routes,
    state::AppState,
    store::MemoryStore,
};
use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};

const THIRTY_DAYS: i64 = 30 * 24 * 60 * 60;

/// In-process stand-in for the parts of the Stripe REST API the app calls.
#[derive(Default)]
pub struct MockStripe {
    intents: Mutex<HashMap<String, Value>>,
    subscriptions: Mutex<HashMap<String, Value>>,
    customers: Mutex<Vec<String>>,
    next_subscription_status: Mutex<Option<String>>,
}

impl MockStripe {
    /// Simulates the browser completing the checkout.
    pub fn succeed_intent(&self, id: &str) {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(id).expect("unknown payment intent");
        intent["status"] = json!("succeeded");
    }

    /// Stores an already paid intent that no report checkout created.
    pub fn insert_untagged_intent(&self, id: &str) {
        let intent = json!({
            "id": id,
            "object": "payment_intent",
            "amount": 999,
            "currency": "usd",
            "status": "succeeded",
            "client_secret": format!("{}_secret_mock", id),
            "metadata": {},
        });
        self.intents.lock().unwrap().insert(id.to_string(), intent);
    }

    /// Status handed to subscriptions created from now on.
    pub fn set_next_subscription_status(&self, status: &str) {
        *self.next_subscription_status.lock().unwrap() = Some(status.to_string());
    }

    pub fn set_subscription_status(&self, id: &str, status: &str) {
        let mut subs = self.subscriptions.lock().unwrap();
        let sub = subs.get_mut(id).expect("unknown subscription");
        sub["status"] = json!(status);
    }

    /// Moves the billing period forward by one cycle.
    pub fn renew_subscription(&self, id: &str) {
        let mut subs = self.subscriptions.lock().unwrap();
        let sub = subs.get_mut(id).expect("unknown subscription");
        let item = &mut sub["items"]["data"][0];
        let end = item["current_period_end"].as_i64().unwrap();
        item["current_period_start"] = json!(end);
        item["current_period_end"] = json!(end + THIRTY_DAYS);
    }

    pub fn subscription(&self, id: &str) -> Value {
        self.subscriptions.lock().unwrap()[id].clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.lock().unwrap().len()
    }
}

fn not_found(kind: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "message": format!("No such {}: '{}'", kind, id) } })),
    )
        .into_response()
}

fn metadata(form: &HashMap<String, String>) -> Value {
    let pairs: serde_json::Map<String, Value> = form
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix("metadata[")
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|name| (name.to_string(), json!(value)))
        })
        .collect();
    Value::Object(pairs)
}

async fn create_intent(
    State(stripe): State<Arc<MockStripe>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut intents = stripe.intents.lock().unwrap();
    let id = format!("pi_mock{}", intents.len() + 1);
    let intent = json!({
        "id": id,
        "object": "payment_intent",
        "amount": form.get("amount").and_then(|a| a.parse::<i64>().ok()),
        "currency": form.get("currency"),
        "status": "requires_payment_method",
        "client_secret": format!("{}_secret_mock", id),
        "metadata": metadata(&form),
    });
    intents.insert(id, intent.clone());
    Json(intent).into_response()
}

async fn get_intent(State(stripe): State<Arc<MockStripe>>, Path(id): Path<String>) -> Response {
    match stripe.intents.lock().unwrap().get(&id) {
        Some(intent) => Json(intent.clone()).into_response(),
        None => not_found("payment_intent", &id),
    }
}

async fn create_customer(
    State(stripe): State<Arc<MockStripe>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut customers = stripe.customers.lock().unwrap();
    let id = format!("cus_mock{}", customers.len() + 1);
    customers.push(id.clone());
    Json(json!({ "id": id, "object": "customer", "name": form.get("name") })).into_response()
}

async fn create_subscription(
    State(stripe): State<Arc<MockStripe>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let status = stripe
        .next_subscription_status
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| "active".to_string());
    let mut subs = stripe.subscriptions.lock().unwrap();
    let id = format!("sub_mock{}", subs.len() + 1);
    let start = Utc::now().timestamp();
    let sub = json!({
        "id": id,
        "object": "subscription",
        "customer": form.get("customer"),
        "status": status,
        "cancel_at_period_end": false,
        "items": { "data": [{
            "price": { "id": form.get("items[0][price]") },
            "current_period_start": start,
            "current_period_end": start + THIRTY_DAYS,
        }] },
        "latest_invoice": { "payment_intent": { "client_secret": format!("{}_secret_mock", id) } },
        "metadata": metadata(&form),
    });
    subs.insert(id, sub.clone());
    Json(sub).into_response()
}

async fn get_subscription(
    State(stripe): State<Arc<MockStripe>>,
    Path(id): Path<String>,
) -> Response {
    match stripe.subscriptions.lock().unwrap().get(&id) {
        Some(sub) => Json(sub.clone()).into_response(),
        None => not_found("subscription", &id),
    }
}

async fn update_subscription(
    State(stripe): State<Arc<MockStripe>>,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut subs = stripe.subscriptions.lock().unwrap();
    let Some(sub) = subs.get_mut(&id) else {
        return not_found("subscription", &id);
    };
    if let Some(flag) = form.get("cancel_at_period_end") {
        sub["cancel_at_period_end"] = json!(flag == "true");
    }
    Json(sub.clone()).into_response()
}

async fn spawn_mock_stripe() -> (String, Arc<MockStripe>) {
    let stripe = Arc::new(MockStripe::default());

    let app = Router::new()
        .route("/v1/payment_intents", post(create_intent))
        .route("/v1/payment_intents/{id}", get(get_intent))
        .route("/v1/customers", post(create_customer))
        .route("/v1/subscriptions", post(create_subscription))
        .route(
            "/v1/subscriptions/{id}",
            get(get_subscription).post(update_subscription),
        )
        .with_state(stripe.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}/", port), stripe)
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub stripe: Arc<MockStripe>,
}

/// Spawns the app on a random port, backed by the in-memory store and a
/// mock payment provider.
pub async fn spawn_app() -> TestApp {
    let (stripe_base, stripe) = spawn_mock_stripe().await;

    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        report_price_cents: 999,
        report_currency: "usd".to_string(),
        stripe: StripeConfig {
            secret_key: "sk_test_mock".to_string(),
            api_base: stripe_base.parse().unwrap(),
            price_monthly: "price_monthly_mock".to_string(),
            price_yearly: "price_yearly_mock".to_string(),
        },
    };

    let gateway = StripeGateway::new(config.stripe.clone()).unwrap();
    let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(gateway), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        stripe,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a fresh user and returns its bearer token.
    pub async fn signed_in_user(&self) -> String {
        // Truncate UUID to keep the username within 20 chars
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let password = "password123";

        let res = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 201);

        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);

        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Submits the same answer for every question and returns the response.
    pub async fn submit_uniform(&self, token: &str, value: u8) -> reqwest::Response {
        let answers: HashMap<String, u8> = (0..15).map(|i| (i.to_string(), value)).collect();
        self.client
            .post(self.url("/api/quiz/submit"))
            .bearer_auth(token)
            .json(&json!({ "answers": answers }))
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}
