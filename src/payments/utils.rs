use crate::payments::error::{PaymentError, PaymentResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self {
            client,
            timeout,
            max_retries,
        })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&JsonValue>,
        headers: &[(&str, &str)],
    ) -> PaymentResult<T> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self.client.request(method.clone(), url);
            request = request.timeout(self.timeout);

            for (k, v) in headers {
                request = request.header(*k, *v);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("provider request failed: {}", e),
                });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            PaymentError::ProviderError {
                                provider: "nowpayments".to_string(),
                                message: format!("invalid provider JSON response: {}", e),
                                provider_code: None,
                                retryable: false,
                            }
                        });
                    }

                    if status.as_u16() == 429 {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                            continue;
                        }
                        return Err(PaymentError::RateLimitError {
                            message: "provider rate limit exceeded".to_string(),
                            retry_after_seconds: None,
                        });
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "provider server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    return Err(provider_error_from_body(status.as_u16(), &text));
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(PaymentError::NetworkError {
            message: "provider request failed".to_string(),
        }))
    }
}

/// Build a ProviderError from an error response body, keeping the provider's
/// own error code and message when the body carries them.
fn provider_error_from_body(status: u16, body: &str) -> PaymentError {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let provider_code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    PaymentError::ProviderError {
        provider: "nowpayments".to_string(),
        message,
        provider_code: provider_code.or(Some(status.to_string())),
        retryable: status >= 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_keeps_upstream_code_and_message() {
        let body = r#"{"status":false,"statusCode":400,"code":"AMOUNT_MINIMAL_ERROR","message":"Amount is too small"}"#;
        let err = provider_error_from_body(400, body);

        match err {
            PaymentError::ProviderError {
                provider_code,
                message,
                retryable,
                ..
            } => {
                assert_eq!(provider_code.as_deref(), Some("AMOUNT_MINIMAL_ERROR"));
                assert_eq!(message, "Amount is too small");
                assert!(!retryable);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn provider_error_falls_back_to_http_status() {
        let err = provider_error_from_body(502, "bad gateway");
        match err {
            PaymentError::ProviderError {
                provider_code,
                retryable,
                ..
            } => {
                assert_eq!(provider_code.as_deref(), Some("502"));
                assert!(retryable);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
