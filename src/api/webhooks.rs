use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::middleware::error::{get_request_id_from_headers, with_request_id};
use crate::services::reconciliation::ReconciliationService;

pub struct WebhookState {
    pub reconciliation: Arc<ReconciliationService>,
}

/// POST /nowpayments-webhook
///
/// Unauthenticated provider callback; authenticity comes from the
/// `x-nowpayments-sig` HMAC header. Every failure returns a non-2xx status
/// so the provider's retry mechanism redelivers the callback.
pub async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: axum::http::HeaderMap,
    body: String,
) -> impl IntoResponse {
    let request_id = get_request_id_from_headers(&headers);
    let signature = headers
        .get("x-nowpayments-sig")
        .and_then(|v| v.to_str().ok());

    match state
        .reconciliation
        .process(body.as_bytes(), signature)
        .await
    {
        Ok(receipt) => {
            info!(
                payment_id = %receipt.payment_id,
                payment_status = %receipt.payment_status,
                outcome = ?receipt.outcome,
                "webhook processed"
            );
            (StatusCode::OK, Json(serde_json::json!({"success": true}))).into_response()
        }
        Err(e) => with_request_id(e, request_id).into_response(),
    }
}
