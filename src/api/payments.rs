use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{bearer_token, IdentityVerifier};
use crate::error::AppError;
use crate::middleware::error::{get_request_id_from_headers, with_request_id};
use crate::services::payment_intent::{DepositReceipt, PaymentIntentService, PaymentType};
use crate::services::status_poll::{PaymentStatusView, StatusPollService};

pub struct PaymentsState {
    pub identity: Arc<IdentityVerifier>,
    pub intent: Arc<PaymentIntentService>,
    pub poll: Arc<StatusPollService>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentBody {
    pub amount_eur: f64,
    pub pay_currency: String,
    #[serde(default)]
    pub payment_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusBody {
    pub payment_id: String,
}

#[derive(Debug, Serialize)]
pub struct CurrenciesResponse {
    pub currencies: Vec<String>,
}

/// POST /nowpayments/create-payment
pub async fn create_payment(
    State(state): State<Arc<PaymentsState>>,
    headers: HeaderMap,
    Json(body): Json<CreatePaymentBody>,
) -> Result<Json<DepositReceipt>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let attach = |e: AppError| with_request_id(e, request_id.clone());

    let token = bearer_token(&headers).map_err(attach)?;
    let user_id = state.identity.resolve_user(token).await.map_err(attach)?;
    let payment_type = PaymentType::parse(body.payment_type.as_deref()).map_err(attach)?;

    info!(
        user_id = %user_id,
        amount_eur = body.amount_eur,
        pay_currency = %body.pay_currency,
        payment_type = payment_type.as_str(),
        "create-payment requested"
    );

    state
        .intent
        .create_deposit(user_id, body.amount_eur, &body.pay_currency, payment_type)
        .await
        .map(Json)
        .map_err(attach)
}

/// GET /nowpayments/currencies
pub async fn get_currencies(
    State(state): State<Arc<PaymentsState>>,
    headers: HeaderMap,
) -> Result<Json<CurrenciesResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let attach = |e: AppError| with_request_id(e, request_id.clone());

    let token = bearer_token(&headers).map_err(attach)?;
    let _user_id = state.identity.resolve_user(token).await.map_err(attach)?;

    let currencies = state.intent.supported_currencies().await.map_err(attach)?;
    Ok(Json(CurrenciesResponse { currencies }))
}

/// POST /nowpayments/payment-status
pub async fn payment_status(
    State(state): State<Arc<PaymentsState>>,
    headers: HeaderMap,
    Json(body): Json<PaymentStatusBody>,
) -> Result<Json<PaymentStatusView>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let attach = |e: AppError| with_request_id(e, request_id.clone());

    let token = bearer_token(&headers).map_err(attach)?;
    let user_id = state.identity.resolve_user(token).await.map_err(attach)?;

    state
        .poll
        .check(user_id, &body.payment_id)
        .await
        .map(Json)
        .map_err(attach)
}
