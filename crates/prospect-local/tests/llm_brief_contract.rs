use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use prospect_local::{generate_brief, OpenAiCompatClient};
use serde_json::{json, Value};
use std::net::SocketAddr;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1/chat/completions")
}

#[tokio::test]
async fn brief_round_trips_through_chat_completions() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            // Fail closed on a malformed request so the assertion below catches it.
            let auth_ok = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer test-key");
            let shape_ok = body["model"] == "test-model"
                && body["temperature"] == 0.2
                && body["messages"][0]["role"] == "system"
                && body["messages"][0]["content"] == "You are a senior B2B sales strategist."
                && body["messages"][1]["content"]
                    .as_str()
                    .is_some_and(|p| p.contains("Company: Acme (acme.com)"));
            if !(auth_ok && shape_ok) {
                return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad request"})));
            }
            (
                StatusCode::OK,
                Json(json!({
                    "choices": [{"message": {"content": "Here you go: {\"sales_thesis\": {\"primary_angle\": \"consolidate\"}}"}}],
                    "usage": {"prompt_tokens": 900, "completion_tokens": 120}
                })),
            )
        }),
    );
    let url = serve(app).await;
    let llm = OpenAiCompatClient::new(reqwest::Client::new(), url, "test-key", "test-model");

    let brief = generate_brief(
        Some(&llm),
        &json!({"company": {"name": "Acme"}}),
        "acme.com",
        Some("Acme"),
    )
    .await;
    assert_eq!(brief, json!({"sales_thesis": {"primary_angle": "consolidate"}}));
}

#[tokio::test]
async fn upstream_failure_becomes_error_value() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let url = serve(app).await;
    let llm = OpenAiCompatClient::new(reqwest::Client::new(), url, "k", "m");

    let brief = generate_brief(Some(&llm), &json!({}), "acme.com", None).await;
    assert_eq!(brief, json!({"error": "LLM request failed: slow down"}));
}

#[tokio::test]
async fn non_json_reply_keeps_raw_text() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"output_text": "I cannot help with that."})) }),
    );
    let url = serve(app).await;
    let llm = OpenAiCompatClient::new(reqwest::Client::new(), url, "k", "m");

    let brief = generate_brief(Some(&llm), &json!({}), "acme.com", None).await;
    assert_eq!(brief["error"], "LLM response was not valid JSON.");
    assert_eq!(brief["raw"], "I cannot help with that.");
}
