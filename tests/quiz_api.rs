// tests/quiz_api.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_rejects_duplicates_and_short_passwords() {
    let app = spawn_app().await;
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let body = json!({ "username": username, "password": "password123" });
    let first = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);
    let user: Value = first.json().await.unwrap();
    assert_eq!(user["username"], username.as_str());
    assert!(user.get("password").is_none());

    let again = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 409);

    let short = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": "shorty_pw", "password": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(short.status().as_u16(), 400);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = spawn_app().await;
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    app.client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": username, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn questions_are_public() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/quiz/questions"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 15);
    assert_eq!(questions[0]["id"], 0);
    assert_eq!(body["scale"].as_array().unwrap().len(), 4);
    assert_eq!(body["scale"][3]["label"], "Always");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/quiz/submit"))
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(app.url("/api/quiz/results"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn incomplete_or_out_of_range_answers_are_rejected() {
    let app = spawn_app().await;
    let token = app.signed_in_user().await;

    let partial: serde_json::Map<String, Value> =
        (0..14).map(|i| (i.to_string(), json!(1))).collect();
    let response = app
        .post(&token, "/api/quiz/submit", json!({ "answers": partial }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.submit_uniform(&token, 4).await;
    assert_eq!(response.status().as_u16(), 400);

    let mut extra: serde_json::Map<String, Value> =
        (0..15).map(|i| (i.to_string(), json!(1))).collect();
    extra.insert("15".to_string(), json!(1));
    let response = app
        .post(&token, "/api/quiz/submit", json!({ "answers": extra }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let results: Value = app.get(&token, "/api/quiz/results").await.json().await.unwrap();
    assert!(results.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_answers_get_a_json_error() {
    let app = spawn_app().await;
    let token = app.signed_in_user().await;

    for value in [json!(300), json!(-1), json!("often")] {
        let answers: serde_json::Map<String, Value> =
            (0..15).map(|i| (i.to_string(), value.clone())).collect();
        let response = app
            .post(&token, "/api/quiz/submit", json!({ "answers": answers }))
            .await;
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body("{\"username\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn submit_scores_and_classifies() {
    let app = spawn_app().await;
    let token = app.signed_in_user().await;

    let response = app.submit_uniform(&token, 2).await;
    assert_eq!(response.status().as_u16(), 201);
    let high: Value = response.json().await.unwrap();
    assert_eq!(high["total_score"], 30);
    assert_eq!(high["max_score"], 45);
    assert_eq!(high["category"], "high");
    assert_eq!(high["scores"]["inattention"], 18);
    assert_eq!(high["scores"]["hyperactivity"], 6);
    assert_eq!(high["scores"]["impulsivity"], 6);
    assert_eq!(high["premium_paid"], false);
    assert!(high.get("answers").is_none());

    let response = app.submit_uniform(&token, 0).await;
    assert_eq!(response.status().as_u16(), 201);
    let low: Value = response.json().await.unwrap();
    assert_eq!(low["category"], "low");
    assert_eq!(low["total_score"], 0);

    let results: Value = app.get(&token, "/api/quiz/results").await.json().await.unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);
    // Newest first
    assert_eq!(results[0]["id"], low["id"]);
    assert_eq!(results[1]["id"], high["id"]);

    let one = app
        .get(&token, &format!("/api/quiz/results/{}", high["id"]))
        .await;
    assert_eq!(one.status().as_u16(), 200);
    let one: Value = one.json().await.unwrap();
    assert_eq!(one["category"], "high");
}

#[tokio::test]
async fn results_are_private_to_their_owner() {
    let app = spawn_app().await;
    let owner = app.signed_in_user().await;
    let stranger = app.signed_in_user().await;

    let result: Value = app.submit_uniform(&owner, 1).await.json().await.unwrap();
    let path = format!("/api/quiz/results/{}", result["id"]);

    assert_eq!(app.get(&stranger, &path).await.status().as_u16(), 403);
    assert_eq!(
        app.get(&stranger, &format!("{}/report", path)).await.status().as_u16(),
        403
    );
    assert_eq!(
        app.get(&owner, "/api/quiz/results/999999").await.status().as_u16(),
        404
    );

    let theirs: Value = app.get(&stranger, "/api/quiz/results").await.json().await.unwrap();
    assert!(theirs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn report_requires_payment() {
    let app = spawn_app().await;
    let token = app.signed_in_user().await;

    let result: Value = app.submit_uniform(&token, 3).await.json().await.unwrap();
    let response = app
        .get(&token, &format!("/api/quiz/results/{}/report", result["id"]))
        .await;

    assert_eq!(response.status().as_u16(), 402);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
