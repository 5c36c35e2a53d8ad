//! Deposit creation: validation, provider quote, fee split, pending row

use crate::database::profile_repository::ProfileRepository;
use crate::database::transaction_repository::{NewDeposit, TransactionRepository};
use crate::error::{
    AppError, AppErrorKind, AppResult, DomainError, ValidationError,
};
use crate::payments::error::PaymentError;
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::{CreatePaymentRequest, SUPPORTED_PAY_CURRENCIES};
use bigdecimal::{BigDecimal, RoundingMode};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Deposit bounds in the settlement currency
pub const MIN_DEPOSIT_EUR: i64 = 10;
pub const MAX_DEPOSIT_EUR: i64 = 10_000;
/// Platform fee on regular deposits, percent of the gross amount
pub const DEPOSIT_FEE_PERCENT: i64 = 2;

/// What a deposit pays for. Rentals carry no platform fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentType {
    Deposit,
    Rental,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Rental => "rental",
        }
    }

    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("deposit") => Ok(PaymentType::Deposit),
            Some("rental") => Ok(PaymentType::Rental),
            Some(other) => Err(AppError::new(AppErrorKind::Validation(
                ValidationError::MalformedPayload {
                    reason: format!("unknown payment_type '{}'", other),
                },
            ))),
        }
    }
}

/// Split a gross EUR amount into (fee, net) per the platform fee policy.
pub fn fee_split(gross: &BigDecimal, payment_type: PaymentType) -> (BigDecimal, BigDecimal) {
    let fee = match payment_type {
        PaymentType::Rental => BigDecimal::from(0).with_scale(2),
        PaymentType::Deposit => (gross * BigDecimal::from(DEPOSIT_FEE_PERCENT)
            / BigDecimal::from(100))
        .with_scale_round(2, RoundingMode::HalfUp),
    };
    let net = gross - &fee;
    (fee, net)
}

/// Response for a created deposit: the quote plus the fee breakdown
#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    pub transaction_id: Uuid,
    pub payment_id: String,
    pub pay_address: String,
    #[serde(with = "bigdecimal_string")]
    pub pay_amount: BigDecimal,
    pub pay_currency: String,
    pub payment_status: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(with = "bigdecimal_string")]
    pub amount_eur: BigDecimal,
    #[serde(with = "bigdecimal_string")]
    pub net_amount: BigDecimal,
    #[serde(with = "bigdecimal_string")]
    pub fee_amount: BigDecimal,
}

mod bigdecimal_string {
    use bigdecimal::BigDecimal;
    use serde::{Serialize, Serializer};

    pub fn serialize<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_string().serialize(serializer)
    }
}

pub struct PaymentIntentService {
    gateway: Arc<dyn PaymentGateway>,
    transactions: Arc<TransactionRepository>,
    profiles: Arc<ProfileRepository>,
    ipn_callback_url: String,
}

impl PaymentIntentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        transactions: Arc<TransactionRepository>,
        profiles: Arc<ProfileRepository>,
        ipn_callback_url: String,
    ) -> Self {
        Self {
            gateway,
            transactions,
            profiles,
            ipn_callback_url,
        }
    }

    /// Validate the request, obtain a provider quote, and persist one
    /// pending transaction row. No balance is touched here.
    pub async fn create_deposit(
        &self,
        user_id: Uuid,
        amount_eur: f64,
        pay_currency: &str,
        payment_type: PaymentType,
    ) -> AppResult<DepositReceipt> {
        let amount = validate_amount(amount_eur)?;
        let currency = validate_currency(pay_currency)?;

        // Per-currency floor from the provider, compared in EUR
        let floor = self.gateway.min_amount(&currency).await.map_err(AppError::from)?;
        if let Some(floor_eur) = floor.fiat_equivalent {
            if amount < floor_eur {
                return Err(AppError::new(AppErrorKind::Validation(
                    ValidationError::BelowProviderMinimum {
                        currency: currency.clone(),
                        floor_eur: floor_eur.to_string(),
                    },
                )));
            }
        }

        // Reject up front if there is no profile row to credit later
        self.profiles
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::ProfileNotFound {
                    user_id: user_id.to_string(),
                }))
            })?;

        let order_id = format!("{}_{}", user_id, chrono::Utc::now().timestamp());
        let quote = self
            .gateway
            .create_payment(CreatePaymentRequest {
                price_amount: amount.clone(),
                price_currency: "eur".to_string(),
                pay_currency: currency.clone(),
                order_id,
                order_description: "Advertising account deposit".to_string(),
                ipn_callback_url: self.ipn_callback_url.clone(),
            })
            .await
            .map_err(|e| translate_provider_error(e, &amount, &currency))?;

        let (fee_amount, net_amount) = fee_split(&amount, payment_type);

        let row = self
            .transactions
            .create_deposit(&NewDeposit {
                user_id,
                transaction_type: payment_type.as_str().to_string(),
                amount: net_amount.clone(),
                gross_amount: amount.clone(),
                fee_amount: fee_amount.clone(),
                currency: "EUR".to_string(),
                coin_type: currency.clone(),
                network: quote.network.clone(),
                payment_status: quote.payment_status.clone(),
                nowpayments_id: quote.payment_id.clone(),
                pay_address: quote.pay_address.clone(),
                pay_amount: quote.pay_amount.clone(),
                pay_currency: quote.pay_currency.clone(),
                expires_at: quote.expires_at,
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    AppError::new(AppErrorKind::Domain(DomainError::DuplicateDeposit {
                        payment_id: quote.payment_id.clone(),
                    }))
                } else {
                    e.into()
                }
            })?;

        info!(
            user_id = %user_id,
            transaction_id = %row.id,
            payment_id = %quote.payment_id,
            pay_currency = %quote.pay_currency,
            "deposit transaction created"
        );

        Ok(DepositReceipt {
            transaction_id: row.id,
            payment_id: quote.payment_id,
            pay_address: quote.pay_address,
            pay_amount: quote.pay_amount,
            pay_currency: quote.pay_currency,
            payment_status: quote.payment_status,
            expires_at: quote.expires_at,
            amount_eur: amount,
            net_amount,
            fee_amount,
        })
    }

    /// Provider currency list filtered to the platform allow-list.
    pub async fn supported_currencies(&self) -> AppResult<Vec<String>> {
        let available = self
            .gateway
            .available_currencies()
            .await
            .map_err(AppError::from)?;

        Ok(SUPPORTED_PAY_CURRENCIES
            .iter()
            .filter(|c| available.iter().any(|a| a == *c))
            .map(|c| c.to_string())
            .collect())
    }
}

fn validate_amount(amount_eur: f64) -> AppResult<BigDecimal> {
    let amount = BigDecimal::try_from(amount_eur)
        .map_err(|_| {
            AppError::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
                amount: amount_eur.to_string(),
                reason: "amount must be a finite number".to_string(),
            }))
        })?
        .with_scale_round(2, RoundingMode::HalfUp);

    if amount < BigDecimal::from(MIN_DEPOSIT_EUR) || amount > BigDecimal::from(MAX_DEPOSIT_EUR) {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::OutOfRange {
                field: "amount_eur".to_string(),
                min: Some(MIN_DEPOSIT_EUR.to_string()),
                max: Some(MAX_DEPOSIT_EUR.to_string()),
            },
        )));
    }

    Ok(amount)
}

fn validate_currency(pay_currency: &str) -> AppResult<String> {
    let currency = pay_currency.trim().to_lowercase();
    if currency.is_empty() {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::MissingField {
                field: "pay_currency".to_string(),
            },
        )));
    }

    if !SUPPORTED_PAY_CURRENCIES.contains(&currency.as_str()) {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::InvalidCurrency {
                currency,
                reason: "currency is not supported for deposits".to_string(),
            },
        )));
    }

    Ok(currency)
}

/// Map known provider error codes to user-facing validation errors; anything
/// else surfaces the provider's own message.
fn translate_provider_error(err: PaymentError, amount: &BigDecimal, currency: &str) -> AppError {
    let too_small = err.provider_code() == Some("AMOUNT_MINIMAL_ERROR")
        || err.to_string().to_lowercase().contains("too small");

    if too_small {
        return AppError::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            amount: amount.to_string(),
            reason: format!("amount is below the provider minimum for {}", currency),
        }));
    }

    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn fee_is_two_percent_rounded_to_cents() {
        let gross = BigDecimal::from_str("100.00").unwrap();
        let (fee, net) = fee_split(&gross, PaymentType::Deposit);

        assert_eq!(fee, BigDecimal::from_str("2.00").unwrap());
        assert_eq!(net, BigDecimal::from_str("98.00").unwrap());
        assert_eq!(&net + &fee, gross);
    }

    #[test]
    fn fee_rounding_keeps_split_exact() {
        // 33.33 * 0.02 = 0.6666 -> 0.67
        let gross = BigDecimal::from_str("33.33").unwrap();
        let (fee, net) = fee_split(&gross, PaymentType::Deposit);

        assert_eq!(fee, BigDecimal::from_str("0.67").unwrap());
        assert_eq!(&net + &fee, gross);
    }

    #[test]
    fn rental_deposits_carry_no_fee() {
        let gross = BigDecimal::from_str("250.00").unwrap();
        let (fee, net) = fee_split(&gross, PaymentType::Rental);

        assert_eq!(fee, BigDecimal::from_str("0.00").unwrap());
        assert_eq!(net, gross);
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        assert!(validate_amount(10.0).is_ok());
        assert!(validate_amount(10_000.0).is_ok());
        assert!(validate_amount(9.99).is_err());
        assert!(validate_amount(10_000.01).is_err());
    }

    #[test]
    fn non_finite_amount_rejected() {
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn currency_allow_list_enforced() {
        assert_eq!(validate_currency("BTC").expect("btc"), "btc");
        assert_eq!(validate_currency(" usdttrc20 ").expect("usdt"), "usdttrc20");
        assert!(validate_currency("").is_err());
        assert!(validate_currency("doge").is_err());
    }

    #[test]
    fn payment_type_defaults_to_deposit() {
        assert_eq!(PaymentType::parse(None).expect("none"), PaymentType::Deposit);
        assert_eq!(
            PaymentType::parse(Some("rental")).expect("rental"),
            PaymentType::Rental
        );
        assert!(PaymentType::parse(Some("lease")).is_err());
    }

    #[test]
    fn amount_minimal_error_is_translated() {
        let err = PaymentError::ProviderError {
            provider: "nowpayments".to_string(),
            message: "Amount is too small".to_string(),
            provider_code: Some("AMOUNT_MINIMAL_ERROR".to_string()),
            retryable: false,
        };
        let amount = BigDecimal::from_str("10.00").unwrap();
        let app = translate_provider_error(err, &amount, "btc");

        assert_eq!(app.status_code(), 400);
        assert!(app.user_message().contains("below the provider minimum"));
    }

    #[test]
    fn unknown_provider_error_keeps_message() {
        let err = PaymentError::ProviderError {
            provider: "nowpayments".to_string(),
            message: "Internal provider hiccup".to_string(),
            provider_code: Some("SOMETHING_ELSE".to_string()),
            retryable: false,
        };
        let amount = BigDecimal::from_str("10.00").unwrap();
        let app = translate_provider_error(err, &amount, "btc");

        assert_eq!(app.status_code(), 400);
        assert!(app.user_message().contains("Internal provider hiccup"));
    }
}
