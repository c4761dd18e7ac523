use serde::Serialize;

/// Subscriber profile joined to a redeemed verification code via the
/// sender's open id.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub open_id: String,
    pub nickname: String,
    pub avatar_url: String,
    pub language: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub subscribed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub union_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}
