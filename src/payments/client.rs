use crate::config::NowPaymentsConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::{
    CreatePaymentRequest, MinAmountQuote, PaymentQuote, ProviderPaymentState,
};
use crate::payments::utils::PaymentHttpClient;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::info;

/// NOWPayments REST client
///
/// Holds the API key and base URL explicitly; constructed once at startup
/// and injected into the services.
pub struct NowPaymentsClient {
    config: NowPaymentsConfig,
    http: PaymentHttpClient,
}

impl NowPaymentsClient {
    pub fn new(config: NowPaymentsConfig) -> PaymentResult<Self> {
        let http = PaymentHttpClient::new(
            Duration::from_secs(config.request_timeout),
            config.max_retries,
        )?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn decimal_from_f64(value: f64, field: &str) -> PaymentResult<BigDecimal> {
        BigDecimal::try_from(value).map_err(|_| PaymentError::ProviderError {
            provider: "nowpayments".to_string(),
            message: format!("provider returned a non-finite {}", field),
            provider_code: None,
            retryable: false,
        })
    }
}

#[async_trait]
impl PaymentGateway for NowPaymentsClient {
    async fn available_currencies(&self) -> PaymentResult<Vec<String>> {
        let raw: CurrenciesResponse = self
            .http
            .request_json(
                reqwest::Method::GET,
                &self.endpoint("/currencies"),
                None,
                &[("x-api-key", &self.config.api_key)],
            )
            .await?;

        Ok(raw
            .currencies
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect())
    }

    async fn min_amount(&self, pay_currency: &str) -> PaymentResult<MinAmountQuote> {
        let url = format!(
            "{}?currency_from={}&currency_to=eur&fiat_equivalent=eur",
            self.endpoint("/min-amount"),
            pay_currency.to_lowercase()
        );
        let raw: MinAmountResponse = self
            .http
            .request_json(
                reqwest::Method::GET,
                &url,
                None,
                &[("x-api-key", &self.config.api_key)],
            )
            .await?;

        Ok(MinAmountQuote {
            currency_from: raw.currency_from,
            min_amount: Self::decimal_from_f64(raw.min_amount, "min_amount")?,
            fiat_equivalent: raw
                .fiat_equivalent
                .map(|v| Self::decimal_from_f64(v, "fiat_equivalent"))
                .transpose()?,
        })
    }

    async fn create_payment(&self, request: CreatePaymentRequest) -> PaymentResult<PaymentQuote> {
        let price_amount =
            request
                .price_amount
                .to_f64()
                .ok_or_else(|| PaymentError::ValidationError {
                    message: format!("amount {} is not representable", request.price_amount),
                    field: Some("price_amount".to_string()),
                })?;
        let payload = serde_json::json!({
            "price_amount": price_amount,
            "price_currency": request.price_currency,
            "pay_currency": request.pay_currency,
            "order_id": request.order_id,
            "order_description": request.order_description,
            "ipn_callback_url": request.ipn_callback_url,
        });

        let raw: CreatePaymentWire = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/payment"),
                Some(&payload),
                &[
                    ("x-api-key", &self.config.api_key),
                    ("Content-Type", "application/json"),
                ],
            )
            .await?;

        info!(
            payment_id = %raw.payment_id,
            pay_currency = %raw.pay_currency,
            "nowpayments payment created"
        );

        let expires_at = raw.expiration_estimate_date.as_deref().and_then(|d| {
            chrono::DateTime::parse_from_rfc3339(d)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .ok()
        });

        Ok(PaymentQuote {
            payment_id: raw.payment_id,
            payment_status: raw.payment_status,
            pay_address: raw.pay_address,
            pay_amount: Self::decimal_from_f64(raw.pay_amount, "pay_amount")?,
            pay_currency: raw.pay_currency,
            network: raw.network,
            expires_at,
        })
    }

    async fn payment_status(&self, payment_id: &str) -> PaymentResult<ProviderPaymentState> {
        let raw: PaymentStatusWire = self
            .http
            .request_json(
                reqwest::Method::GET,
                &self.endpoint(&format!("/payment/{}", payment_id)),
                None,
                &[("x-api-key", &self.config.api_key)],
            )
            .await?;

        Ok(ProviderPaymentState {
            payment_id: raw.payment_id,
            payment_status: raw.payment_status,
            pay_address: raw.pay_address,
            pay_amount: raw.pay_amount,
            actually_paid: raw.actually_paid,
            payin_hash: raw.payin_hash,
            confirmations: raw.confirmations,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CurrenciesResponse {
    currencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MinAmountResponse {
    currency_from: String,
    min_amount: f64,
    #[serde(default)]
    fiat_equivalent: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentWire {
    #[serde(deserialize_with = "id_as_string")]
    payment_id: String,
    payment_status: String,
    pay_address: String,
    pay_amount: f64,
    pay_currency: String,
    #[serde(default)]
    network: Option<String>,
    #[serde(default)]
    expiration_estimate_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusWire {
    #[serde(deserialize_with = "id_as_string")]
    payment_id: String,
    payment_status: String,
    #[serde(default)]
    pay_address: Option<String>,
    #[serde(default)]
    pay_amount: Option<f64>,
    #[serde(default)]
    actually_paid: Option<f64>,
    #[serde(default)]
    payin_hash: Option<String>,
    #[serde(default)]
    confirmations: Option<i64>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdWire {
        String(String),
        Number(serde_json::Number),
    }

    match IdWire::deserialize(deserializer)? {
        IdWire::String(s) => Ok(s),
        IdWire::Number(n) => Ok(n.to_string()),
    }
}
