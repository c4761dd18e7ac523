use crate::api::AppState;
use crate::domain::message::InboundMessage;
use crate::error::{AppError, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// Body the platform expects when a message is acknowledged without a reply.
const ACK_BODY: &str = "success";

#[derive(Debug, Deserialize)]
pub struct HandshakeParams {
    #[serde(default)]
    signature: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    nonce: String,
    #[serde(default)]
    echostr: String,
}

/// GET path of the webhook: the platform's endpoint-ownership handshake.
/// Echoes `echostr` verbatim when the signature checks out.
pub async fn verify_handshake(
    State(state): State<AppState>,
    Query(params): Query<HandshakeParams>,
) -> Result<impl IntoResponse> {
    if state.signatures.verify(&params.signature, &params.timestamp, &params.nonce) {
        Ok(params.echostr)
    } else {
        Err(AppError::SignatureInvalid)
    }
}

/// POST path of the webhook: decode the message, run the reply policy, and
/// serialize the reply. A policy that yields no reply is acknowledged with
/// the literal body `success`; a decode failure is the only error path.
pub async fn receive_message(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let message = InboundMessage::decode(&body)?;
    tracing::debug!(msg_type = message.msg_type(), "Webhook message received");

    match state.replies.reply(&message) {
        Some(reply) => {
            let xml = reply.to_xml()?;
            Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response())
        }
        None => Ok(ACK_BODY.into_response()),
    }
}
