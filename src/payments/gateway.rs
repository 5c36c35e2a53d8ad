use crate::payments::error::PaymentResult;
use crate::payments::types::{
    CreatePaymentRequest, MinAmountQuote, PaymentQuote, ProviderPaymentState,
};
use async_trait::async_trait;

/// Seam between the services and the payment provider HTTP API.
///
/// Services depend on this trait, never on the concrete client, so tests can
/// substitute a fake without network access.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Currencies the provider can currently accept payments in
    async fn available_currencies(&self) -> PaymentResult<Vec<String>>;

    /// Minimum payable amount for a pay currency, settled in EUR
    async fn min_amount(&self, pay_currency: &str) -> PaymentResult<MinAmountQuote>;

    /// Create a payment intent and obtain a deposit address quote
    async fn create_payment(&self, request: CreatePaymentRequest) -> PaymentResult<PaymentQuote>;

    /// Current provider-side status of a payment
    async fn payment_status(&self, payment_id: &str) -> PaymentResult<ProviderPaymentState>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    struct MockGateway;

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn available_currencies(&self) -> PaymentResult<Vec<String>> {
            Ok(vec!["btc".to_string(), "eth".to_string()])
        }

        async fn min_amount(&self, pay_currency: &str) -> PaymentResult<MinAmountQuote> {
            Ok(MinAmountQuote {
                currency_from: pay_currency.to_string(),
                min_amount: BigDecimal::from_str("0.0001").unwrap(),
                fiat_equivalent: Some(BigDecimal::from_str("8.50").unwrap()),
            })
        }

        async fn create_payment(
            &self,
            request: CreatePaymentRequest,
        ) -> PaymentResult<PaymentQuote> {
            Ok(PaymentQuote {
                payment_id: "mock_payment".to_string(),
                payment_status: "waiting".to_string(),
                pay_address: "bc1qmock".to_string(),
                pay_amount: BigDecimal::from_str("0.00105").unwrap(),
                pay_currency: request.pay_currency,
                network: Some("btc".to_string()),
                expires_at: None,
            })
        }

        async fn payment_status(&self, payment_id: &str) -> PaymentResult<ProviderPaymentState> {
            Ok(ProviderPaymentState {
                payment_id: payment_id.to_string(),
                payment_status: "confirming".to_string(),
                pay_address: Some("bc1qmock".to_string()),
                pay_amount: Some(0.00105),
                actually_paid: Some(0.00105),
                payin_hash: None,
                confirmations: Some(2),
            })
        }
    }

    #[tokio::test]
    async fn trait_can_be_implemented_by_mock_gateway() {
        let gateway: Box<dyn PaymentGateway> = Box::new(MockGateway);

        let quote = gateway
            .create_payment(CreatePaymentRequest {
                price_amount: BigDecimal::from_str("100.00").unwrap(),
                price_currency: "eur".to_string(),
                pay_currency: "btc".to_string(),
                order_id: "user_1700000000".to_string(),
                order_description: "Account deposit".to_string(),
                ipn_callback_url: "https://example.com/nowpayments-webhook".to_string(),
            })
            .await
            .expect("payment creation should succeed");
        assert_eq!(quote.payment_status, "waiting");

        let state = gateway
            .payment_status("mock_payment")
            .await
            .expect("status lookup should succeed");
        assert_eq!(state.confirmations, Some(2));
    }
}
