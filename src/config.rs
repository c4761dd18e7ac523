use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub wechat: WechatConfig,

    #[command(flatten)]
    pub codes: CodeConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "WAYPOST_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "WAYPOST_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management endpoints (liveness probe)
    #[arg(long, env = "WAYPOST_MGMT_PORT", default_value_t = 3001)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "WAYPOST_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "WAYPOST_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,
}

#[derive(Clone, Debug, Args)]
pub struct WechatConfig {
    /// Official Account app id
    #[arg(long, env = "WAYPOST_WECHAT_APP_ID")]
    pub app_id: String,

    /// Official Account app secret
    #[arg(long, env = "WAYPOST_WECHAT_APP_SECRET")]
    pub app_secret: String,

    /// Shared token for the webhook signature handshake
    #[arg(long, env = "WAYPOST_WECHAT_TOKEN")]
    pub token: String,

    /// Base URL of the WeChat platform API
    #[arg(long, env = "WAYPOST_WECHAT_API_BASE", default_value = "https://api.weixin.qq.com")]
    pub api_base: String,
}

#[derive(Clone, Debug, Args)]
pub struct CodeConfig {
    /// Verification code time-to-live in seconds
    #[arg(long, env = "WAYPOST_CODE_TTL_SECS", default_value_t = 600)]
    pub ttl_secs: u64,

    /// How often to sweep expired verification codes
    #[arg(long, env = "WAYPOST_CODE_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed for code redemption
    #[arg(long, env = "WAYPOST_REDEEM_RATE_LIMIT_PER_SECOND", default_value_t = 2)]
    pub redeem_per_second: u32,

    /// Burst allowance for code redemption
    #[arg(long, env = "WAYPOST_REDEEM_RATE_LIMIT_BURST", default_value_t = 5)]
    pub redeem_burst: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces and metrics; telemetry export is disabled when unset
    #[arg(long, env = "WAYPOST_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "WAYPOST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
