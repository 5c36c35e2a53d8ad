use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimitError {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    #[error("Webhook verification failed: {message}")]
    WebhookVerificationError { message: String },

    #[error("Provider error: provider={provider}, message={message}")]
    ProviderError {
        provider: String,
        message: String,
        provider_code: Option<String>,
        retryable: bool,
    },
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ValidationError { .. } => false,
            PaymentError::NetworkError { .. } => true,
            PaymentError::RateLimitError { .. } => true,
            PaymentError::WebhookVerificationError { .. } => false,
            PaymentError::ProviderError { retryable, .. } => *retryable,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::ValidationError { .. } => 400,
            PaymentError::NetworkError { .. } => 503,
            PaymentError::RateLimitError { .. } => 429,
            PaymentError::WebhookVerificationError { .. } => 401,
            // Provider failures are relayed to the caller for user retry
            PaymentError::ProviderError { .. } => 400,
        }
    }

    /// Provider error code, when the upstream response carried one
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            PaymentError::ProviderError { provider_code, .. } => provider_code.as_deref(),
            _ => None,
        }
    }
}

impl From<PaymentError> for crate::error::AppError {
    fn from(err: PaymentError) -> Self {
        use crate::error::{AppError, AppErrorKind, AuthError, ExternalError};

        let kind = match &err {
            PaymentError::WebhookVerificationError { .. } => {
                AppErrorKind::Auth(AuthError::InvalidSignature)
            }
            PaymentError::NetworkError { message } => {
                AppErrorKind::External(ExternalError::PaymentProvider {
                    provider: "nowpayments".to_string(),
                    message: format!("Payment provider is unreachable: {}", message),
                    is_retryable: true,
                })
            }
            _ => AppErrorKind::External(ExternalError::PaymentProvider {
                provider: "nowpayments".to_string(),
                message: err.to_string(),
                is_retryable: err.is_retryable(),
            }),
        };

        AppError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_http_status_mapping_is_correct() {
        assert_eq!(
            PaymentError::ValidationError {
                message: "bad".to_string(),
                field: None
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            PaymentError::WebhookVerificationError {
                message: "mismatch".to_string()
            }
            .http_status_code(),
            401
        );
        assert_eq!(
            PaymentError::ProviderError {
                provider: "nowpayments".to_string(),
                message: "rejected".to_string(),
                provider_code: None,
                retryable: false
            }
            .http_status_code(),
            400
        );
    }

    #[test]
    fn retryable_flags_are_set() {
        assert!(PaymentError::NetworkError {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(!PaymentError::WebhookVerificationError {
            message: "mismatch".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn signature_failure_converts_to_401() {
        let app: crate::error::AppError = PaymentError::WebhookVerificationError {
            message: "mismatch".to_string(),
        }
        .into();
        assert_eq!(app.status_code(), 401);
    }
}
