use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Pay-in currencies the platform accepts, lowercase provider tickers
pub const SUPPORTED_PAY_CURRENCIES: &[&str] =
    &["btc", "eth", "usdttrc20", "usdterc20", "usdtbsc", "usdc"];

/// Internal transaction lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Completed,
    Failed,
}

impl DepositStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Completed => "completed",
            DepositStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider-reported payment status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Waiting,
    Confirming,
    Sending,
    PartiallyPaid,
    Confirmed,
    Finished,
    Failed,
    Expired,
    Refunded,
    Unknown,
}

impl ProviderStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "waiting" => ProviderStatus::Waiting,
            "confirming" => ProviderStatus::Confirming,
            "sending" => ProviderStatus::Sending,
            "partially_paid" => ProviderStatus::PartiallyPaid,
            "confirmed" => ProviderStatus::Confirmed,
            "finished" => ProviderStatus::Finished,
            "failed" => ProviderStatus::Failed,
            "expired" => ProviderStatus::Expired,
            "refunded" => ProviderStatus::Refunded,
            _ => ProviderStatus::Unknown,
        }
    }

    /// Internal state this provider status settles to.
    ///
    /// `None` for vocabulary we do not recognize: the raw value is still
    /// recorded on the row, but the internal state is left alone.
    pub fn settlement(&self) -> Option<DepositStatus> {
        match self {
            ProviderStatus::Waiting
            | ProviderStatus::Confirming
            | ProviderStatus::Sending
            | ProviderStatus::PartiallyPaid => Some(DepositStatus::Pending),
            ProviderStatus::Confirmed | ProviderStatus::Finished => Some(DepositStatus::Completed),
            ProviderStatus::Failed | ProviderStatus::Expired | ProviderStatus::Refunded => {
                Some(DepositStatus::Failed)
            }
            ProviderStatus::Unknown => None,
        }
    }
}

/// Outbound request for a new provider payment
#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub price_amount: BigDecimal,
    pub price_currency: String,
    pub pay_currency: String,
    pub order_id: String,
    pub order_description: String,
    pub ipn_callback_url: String,
}

/// Provider-issued deposit quote: pay this amount to this address
#[derive(Debug, Clone)]
pub struct PaymentQuote {
    pub payment_id: String,
    pub payment_status: String,
    pub pay_address: String,
    pub pay_amount: BigDecimal,
    pub pay_currency: String,
    pub network: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Minimum-amount constraint for a pay currency
#[derive(Debug, Clone)]
pub struct MinAmountQuote {
    pub currency_from: String,
    /// Minimal payable amount in the pay currency
    pub min_amount: BigDecimal,
    /// EUR equivalent of the floor, when the provider reports one
    pub fiat_equivalent: Option<BigDecimal>,
}

/// Current provider-side view of a payment, as returned by the status API
#[derive(Debug, Clone, Serialize)]
pub struct ProviderPaymentState {
    pub payment_id: String,
    pub payment_status: String,
    pub pay_address: Option<String>,
    pub pay_amount: Option<f64>,
    pub actually_paid: Option<f64>,
    pub payin_hash: Option<String>,
    pub confirmations: Option<i64>,
}

/// Strict schema for the provider's IPN callback body.
///
/// Only `payment_id` and `payment_status` are required; everything else is
/// metadata we pass through. A payload missing the required fields is a
/// validation failure, never a panic.
#[derive(Debug, Clone, Deserialize)]
pub struct IpnPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    pub payment_status: String,
    #[serde(default)]
    pub pay_address: Option<String>,
    #[serde(default)]
    pub pay_amount: Option<f64>,
    #[serde(default)]
    pub actually_paid: Option<f64>,
    #[serde(default)]
    pub payin_hash: Option<String>,
    #[serde(default)]
    pub outcome_amount: Option<f64>,
    #[serde(default)]
    pub outcome_currency: Option<String>,
}

/// The provider sends `payment_id` as a JSON number in IPN callbacks but as
/// a string in some REST responses; accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Number(n) => Ok(n.to_string()),
    }
}
