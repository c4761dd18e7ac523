#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, missing_debug_implementations, clippy::print_stdout)]
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use waypost_server::error::AppError;
use waypost_server::services::code_service::CodeService;

mod common;

async fn redeem(app: &common::TestApp, code: &str) -> reqwest::Response {
    app.client
        .post(format!("{}/codes/verify", app.api_url))
        .json(&json!({ "code": code }))
        .send()
        .await
        .unwrap()
}

async fn issue_code(app: &common::TestApp, open_id: &str) -> String {
    let resp = app
        .client
        .post(format!("{}/wechat/webhook", app.api_url))
        .header("content-type", "application/xml")
        .body(common::text_message_xml("gh_account", open_id, "验证码"))
        .send()
        .await
        .unwrap();

    let body = resp.text().await.unwrap();
    body.split_once("您的验证码是：").map(|(_, rest)| rest.chars().take(6).collect()).unwrap()
}

#[tokio::test]
async fn test_redeem_unknown_code_returns_404() {
    let app = common::TestApp::spawn().await;

    let resp = redeem(&app, "123456").await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redeem_rejects_malformed_codes() {
    let app = common::TestApp::spawn().await;

    for bad in ["12345", "1234567", "12a456", "      "] {
        let resp = redeem(&app, bad).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "code {bad:?} should be rejected");
    }
}

#[tokio::test]
async fn test_issue_then_redeem_joins_profile() {
    let app = common::TestApp::spawn().await;

    let code = issue_code(&app, "oUser123").await;

    let resp = redeem(&app, &code).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let profile: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(profile["open_id"], "oUser123");
    assert_eq!(profile["subscribed"], true);
    assert!(profile["nickname"].is_string());
}

#[tokio::test]
async fn test_second_redeem_reports_already_used() {
    let app = common::TestApp::spawn().await;

    let code = issue_code(&app, "oUser456").await;

    assert_eq!(redeem(&app, &code).await.status(), StatusCode::OK);
    assert_eq!(redeem(&app, &code).await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_redeem_for_unsubscribed_user_rejected() {
    let app =
        common::TestApp::spawn_with_profiles(Arc::new(common::StubProfileFetcher { subscribed: false })).await;

    let code = issue_code(&app, "oUser789").await;

    let resp = redeem(&app, &code).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_redeem_rate_limit_throttles_bursts() {
    let mut config = common::get_test_config();
    config.rate_limit.redeem_per_second = 1;
    config.rate_limit.redeem_burst = 1;
    let app = common::TestApp::spawn_with_config(config).await;

    let first = redeem(&app, "123456").await;
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = redeem(&app, "123456").await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

// Store-level properties, driven against the service directly.

fn test_store() -> CodeService {
    common::setup_tracing();
    CodeService::new(&common::get_test_config().codes)
}

#[tokio::test]
async fn test_verify_succeeds_exactly_once() {
    let store = test_store();

    let code = store.generate("oUserA");
    assert_eq!(store.verify(&code).unwrap(), "oUserA");

    assert!(matches!(store.verify(&code), Err(AppError::CodeAlreadyUsed)));
}

#[tokio::test]
async fn test_verify_never_issued_code_not_found() {
    let store = test_store();

    assert!(matches!(store.verify("000000"), Err(AppError::CodeNotFound)));
}

#[tokio::test]
async fn test_verify_after_ttl_reports_expired_and_evicts() {
    let store = test_store();
    let now = OffsetDateTime::now_utc();

    let code = store.generate_at("oUserB", now);
    let after_ttl = now + time::Duration::seconds(601);

    assert!(matches!(store.verify_at(&code, after_ttl), Err(AppError::CodeExpired)));
    // Eviction happened on the way out, so the entry is now plain not-found.
    assert!(matches!(store.verify_at(&code, after_ttl), Err(AppError::CodeNotFound)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_expiry_boundary_is_exclusive() {
    let store = test_store();
    let now = OffsetDateTime::now_utc();

    let code = store.generate_at("oUserC", now);
    // Exactly at the expiry instant the code is still redeemable.
    let at_ttl = now + time::Duration::seconds(600);

    assert_eq!(store.verify_at(&code, at_ttl).unwrap(), "oUserC");
}

#[tokio::test]
async fn test_sweep_evicts_expired_regardless_of_used() {
    let store = test_store();
    let now = OffsetDateTime::now_utc();

    let redeemed = store.generate_at("oUserD", now);
    let _pending = store.generate_at("oUserE", now);
    assert_eq!(store.verify_at(&redeemed, now).unwrap(), "oUserD");

    assert_eq!(store.sweep_expired_at(now + time::Duration::seconds(1)), 0);
    assert_eq!(store.len(), 2);

    assert_eq!(store.sweep_expired_at(now + time::Duration::seconds(601)), 2);
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_generates_yield_distinct_entries() {
    let store = test_store();

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.generate(&format!("oUser{i}")) })
        })
        .collect();

    let mut codes = Vec::new();
    for task in tasks {
        codes.push(task.await.unwrap());
    }

    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), 100, "generation must re-roll live collisions");
    assert_eq!(store.len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifies_redeem_at_most_once() {
    let store = test_store();
    let code = store.generate("oUserF");

    let barrier = Arc::new(tokio::sync::Barrier::new(100));
    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let store = store.clone();
            let code = code.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                store.verify(&code)
            })
        })
        .collect();

    let mut successes = 0;
    let mut already_used = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(open_id) => {
                assert_eq!(open_id, "oUserF");
                successes += 1;
            }
            Err(AppError::CodeAlreadyUsed) => already_used += 1,
            Err(e) => panic!("unexpected redemption failure: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(already_used, 99);
}
