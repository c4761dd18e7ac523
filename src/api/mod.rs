use crate::api::rate_limit::{RateLimiter, log_rate_limit_events};
use crate::config::Config;
use crate::services::code_service::CodeService;
use crate::services::profile_service::ProfileFetcher;
use crate::services::reply_service::ReplyService;
use crate::services::signature_service::SignatureService;
use axum::body::Body;
use axum::http::Request;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod codes;
pub mod health;
pub mod middleware;
pub mod rate_limit;
pub mod webhook;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub signatures: SignatureService,
    pub codes: CodeService,
    pub replies: ReplyService,
    pub profiles: Arc<dyn ProfileFetcher>,
    pub rate_limit: RateLimiter,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub signatures: SignatureService,
    pub codes: CodeService,
    pub replies: ReplyService,
    pub profiles: Arc<dyn ProfileFetcher>,
}

/// Configures and returns the primary application router.
///
/// The redemption route carries a strict per-IP rate limit tier: the code
/// keyspace is only 10^6, so redemption attempts must not be free to brute
/// force. The webhook route is never throttled; the platform retries
/// aggressively and expects a 2xx acknowledgment.
///
/// # Panics
/// Panics if the rate limiter configuration cannot be constructed.
pub fn app_router(config: Config, services: ServiceContainer) -> Router {
    let rate_limit = RateLimiter::new(config.server.trusted_proxies.clone());

    let redeem_interval_ns = 1_000_000_000 / config.rate_limit.redeem_per_second.max(1);
    let redeem_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(redeem_interval_ns))
            .burst_size(config.rate_limit.redeem_burst)
            .key_extractor(rate_limit.extractor.clone())
            .finish()
            .expect("Failed to build redemption rate limiter config"),
    );

    let state = AppState {
        config,
        signatures: services.signatures,
        codes: services.codes,
        replies: services.replies,
        profiles: services.profiles,
        rate_limit,
    };

    let webhook_routes = Router::new()
        .route("/wechat/webhook", get(webhook::verify_handshake).post(webhook::receive_message));

    // Sensitive route with strict limits
    let redeem_routes =
        Router::new().route("/codes/verify", post(codes::redeem)).layer(GovernorLayer::new(redeem_conf));

    Router::new()
        .nest("/v1", webhook_routes.merge(redeem_routes))
        .layer(from_fn_with_state(state.clone(), log_rate_limit_events))
        .layer(PropagateRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            middleware::MakeRequestUuidOrHeader,
        ))
        .with_state(state)
}

pub fn mgmt_router() -> Router {
    Router::new().route("/livez", get(health::livez))
}
