use sha1::{Digest, Sha1};
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use waypost_server::api::{self, ServiceContainer};
use waypost_server::config::{
    CodeConfig, Config, LogFormat, RateLimitConfig, ServerConfig, TelemetryConfig, WechatConfig,
};
use waypost_server::domain::profile::UserProfile;
use waypost_server::error::Result;
use waypost_server::services::code_service::CodeService;
use waypost_server::services::profile_service::ProfileFetcher;
use waypost_server::services::reply_service::ReplyService;
use waypost_server::services::signature_service::SignatureService;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("waypost_server=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

#[allow(dead_code)]
pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // 0 means let OS choose
            mgmt_port: 0,
            shutdown_timeout_secs: 1,
            trusted_proxies: vec!["127.0.0.1/32".parse().unwrap()],
        },
        wechat: WechatConfig {
            app_id: "wx-test-app".to_string(),
            app_secret: "test-secret".to_string(),
            token: "t0k3n".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
        },
        codes: CodeConfig { ttl_secs: 600, sweep_interval_secs: 300 },
        rate_limit: RateLimitConfig { redeem_per_second: 10_000, redeem_burst: 10_000 },
        telemetry: TelemetryConfig { otlp_endpoint: None, log_format: LogFormat::Text },
    }
}

/// Stands in for the WeChat profile API so redemption tests never leave the
/// process.
#[derive(Debug, Clone)]
pub struct StubProfileFetcher {
    pub subscribed: bool,
}

#[async_trait::async_trait]
impl ProfileFetcher for StubProfileFetcher {
    async fn fetch_profile(&self, open_id: &str) -> Result<UserProfile> {
        Ok(UserProfile {
            open_id: open_id.to_string(),
            nickname: "测试用户".to_string(),
            avatar_url: "https://example.com/avatar.jpg".to_string(),
            language: "zh_CN".to_string(),
            country: "中国".to_string(),
            province: "上海".to_string(),
            city: "上海".to_string(),
            subscribed: self.subscribed,
            union_id: None,
            remark: None,
        })
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub api_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub codes: CodeService,
    pub config: Config,
}

impl TestApp {
    #[allow(dead_code)]
    pub async fn spawn() -> Self {
        Self::spawn_with(get_test_config(), Arc::new(StubProfileFetcher { subscribed: true })).await
    }

    #[allow(dead_code)]
    pub async fn spawn_with_config(config: Config) -> Self {
        Self::spawn_with(config, Arc::new(StubProfileFetcher { subscribed: true })).await
    }

    #[allow(dead_code)]
    pub async fn spawn_with_profiles(profiles: Arc<dyn ProfileFetcher>) -> Self {
        Self::spawn_with(get_test_config(), profiles).await
    }

    pub async fn spawn_with(config: Config, profiles: Arc<dyn ProfileFetcher>) -> Self {
        setup_tracing();

        let signatures = SignatureService::new(config.wechat.token.clone());
        let codes = CodeService::new(&config.codes);
        let replies = ReplyService::new(codes.clone());
        let services = ServiceContainer { signatures, codes: codes.clone(), replies, profiles };

        let app_router = api::app_router(config.clone(), services);
        let mgmt_app = api::mgmt_router();

        let api_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind api listener");
        let api_addr = api_listener.local_addr().expect("api listener addr");
        tokio::spawn(async move {
            axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("api server");
        });

        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mgmt listener");
        let mgmt_addr = mgmt_listener.local_addr().expect("mgmt listener addr");
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("mgmt server");
        });

        Self {
            api_url: format!("http://{api_addr}/v1"),
            mgmt_url: format!("http://{mgmt_addr}"),
            client: reqwest::Client::new(),
            codes,
            config,
        }
    }
}

/// Computes the handshake signature the way the platform does: sort the
/// token, timestamp, and nonce lexicographically, concatenate, SHA-1, hex.
#[allow(dead_code)]
pub fn sign(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut params = [token, timestamp, nonce];
    params.sort_unstable();

    let mut hasher = Sha1::new();
    for param in params {
        hasher.update(param.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Inbound text message payload as the platform delivers it.
#[allow(dead_code)]
pub fn text_message_xml(to_user: &str, from_user: &str, content: &str) -> String {
    format!(
        "<xml>\
         <ToUserName>{to_user}</ToUserName>\
         <FromUserName>{from_user}</FromUserName>\
         <CreateTime>1700000000</CreateTime>\
         <MsgType>text</MsgType>\
         <Content>{content}</Content>\
         <MsgId>1234567890123456</MsgId>\
         </xml>"
    )
}
