use crate::api::AppState;
use crate::error::{AppError, Result};
use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    code: String,
}

/// Redeems a verification code and joins the open id it was issued to
/// against the platform profile API.
pub async fn redeem(State(state): State<AppState>, Json(payload): Json<RedeemRequest>) -> Result<impl IntoResponse> {
    if payload.code.len() != 6 || !payload.code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest("code must be exactly 6 digits".to_string()));
    }

    let open_id = state.codes.verify(&payload.code)?;
    let profile = state.profiles.fetch_profile(&open_id).await?;

    // The profile API returns a stub record for users who unsubscribed after
    // requesting a code; there is nothing useful to join against.
    if !profile.subscribed {
        return Err(AppError::NotSubscribed);
    }

    Ok(Json(profile))
}
