// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, payment, premium, quiz, subscription},
    state::AppState,
    utils::jwt::auth_middleware,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, payments, subscription, premium).
/// * Protects everything but registration, login and the question list with JWT auth.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/questions", get(quiz::get_questions))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/submit", post(quiz::submit_quiz))
                .route("/results", get(quiz::list_results))
                .route("/results/{id}", get(quiz::get_result))
                .route("/results/{id}/report", get(quiz::get_report))
                .layer(auth_layer.clone()),
        );

    let payment_routes = Router::new()
        .route("/report", post(payment::create_report_payment))
        .route("/report/confirm", post(payment::confirm_report_payment))
        .layer(auth_layer.clone());

    let subscription_routes = Router::new()
        .route(
            "/",
            get(subscription::get_subscription).post(subscription::start_subscription),
        )
        .route("/sync", post(subscription::sync_subscription))
        .route("/{id}/cancel", post(subscription::cancel_subscription))
        .layer(auth_layer.clone());

    let premium_routes = Router::new()
        .route("/features/{feature}", get(premium::get_feature))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/payments", payment_routes)
        .nest("/api/subscription", subscription_routes)
        .nest("/api/premium", premium_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{Config, StripeConfig},
        payments::StripeGateway,
        store::MemoryStore,
    };

    fn test_router() -> Router {
        let config = Config {
            database_url: None,
            jwt_secret: "secret".to_string(),
            jwt_expiration: 60,
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            cors_origins: vec!["http://localhost:5173".to_string(), "not a header\n".to_string()],
            report_price_cents: 999,
            report_currency: "usd".to_string(),
            stripe: StripeConfig {
                secret_key: "sk_test".to_string(),
                api_base: "http://127.0.0.1:9/".parse().unwrap(),
                price_monthly: "price_m".to_string(),
                price_yearly: "price_y".to_string(),
            },
        };
        let gateway = StripeGateway::new(config.stripe.clone()).unwrap();
        create_router(AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(gateway),
            config,
        ))
    }

    #[tokio::test]
    async fn questions_route_is_public() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/quiz/questions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["questions"].as_array().unwrap().len(), 15);
    }

    #[tokio::test]
    async fn premium_routes_need_a_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/subscription")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/quiz/questions")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }
}
