//! Unified error handling for the advault payment backend
//!
//! Provides a layered error system with HTTP status mapping, user-facing
//! messages, and structured error codes for client handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling by API clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "TRANSACTION_NOT_FOUND")]
    TransactionNotFound,
    #[serde(rename = "DUPLICATE_TRANSACTION")]
    DuplicateTransaction,
    #[serde(rename = "PROFILE_NOT_FOUND")]
    ProfileNotFound,

    // Authentication / authenticity errors (401)
    #[serde(rename = "AUTH_ERROR")]
    AuthError,
    #[serde(rename = "SIGNATURE_INVALID")]
    SignatureInvalid,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors
    #[serde(rename = "PAYMENT_PROVIDER_ERROR")]
    PaymentProviderError,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// No transaction matches the provider payment id
    TransactionNotFound { payment_id: String },
    /// A transaction with this provider payment id already exists
    DuplicateDeposit { payment_id: String },
    /// The authenticated user has no profile row to credit
    ProfileNotFound { user_id: String },
}

/// Caller authentication and webhook authenticity errors
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No bearer token on a protected endpoint
    MissingToken,
    /// The identity provider rejected the token
    InvalidToken { reason: String },
    /// Webhook arrived without a signature header
    MissingSignature,
    /// Webhook signature did not match the payload
    InvalidSignature,
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

/// External service errors (payment provider)
#[derive(Debug, Clone)]
pub enum ExternalError {
    PaymentProvider {
        provider: String,
        message: String,
        is_retryable: bool,
    },
    Timeout { service: String, timeout_secs: u64 },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Invalid amount (format or value)
    InvalidAmount { amount: String, reason: String },
    /// Field value out of acceptable range
    OutOfRange {
        field: String,
        min: Option<String>,
        max: Option<String>,
    },
    /// Unsupported or empty pay currency
    InvalidCurrency { currency: String, reason: String },
    /// Required field missing
    MissingField { field: String },
    /// Webhook or request body did not match the expected schema
    MalformedPayload { reason: String },
    /// Amount is below the provider minimum for the chosen currency
    BelowProviderMinimum { currency: String, floor_eur: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Auth(AuthError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { .. } => 404,
                DomainError::DuplicateDeposit { .. } => 409,
                DomainError::ProfileNotFound { .. } => 404,
            },
            AppErrorKind::Auth(_) => 401,
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                // Provider failures surface to the UI for user retry, not as
                // gateway errors: the message carries the translated reason.
                ExternalError::PaymentProvider { .. } => 400,
                ExternalError::Timeout { .. } => 504,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
                DomainError::DuplicateDeposit { .. } => ErrorCode::DuplicateTransaction,
                DomainError::ProfileNotFound { .. } => ErrorCode::ProfileNotFound,
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken { .. } => ErrorCode::AuthError,
                AuthError::MissingSignature | AuthError::InvalidSignature => {
                    ErrorCode::SignatureInvalid
                }
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => ErrorCode::PaymentProviderError,
                ExternalError::Timeout { .. } => ErrorCode::ExternalServiceTimeout,
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-facing error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { payment_id } => {
                    format!("No transaction found for payment '{}'", payment_id)
                }
                DomainError::DuplicateDeposit { payment_id } => {
                    format!("A transaction for payment '{}' already exists", payment_id)
                }
                DomainError::ProfileNotFound { user_id } => {
                    format!("No account profile found for user '{}'", user_id)
                }
            },
            AppErrorKind::Auth(err) => match err {
                AuthError::MissingToken => "Authorization token is required".to_string(),
                AuthError::InvalidToken { reason } => {
                    format!("Invalid authorization token: {}", reason)
                }
                AuthError::MissingSignature => "Webhook signature is required".to_string(),
                AuthError::InvalidSignature => "Invalid webhook signature".to_string(),
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { message, .. } => message.clone(),
                ExternalError::Timeout {
                    service,
                    timeout_secs,
                } => {
                    format!(
                        "{} request timed out after {} seconds. Please try again",
                        service, timeout_secs
                    )
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::OutOfRange { field, min, max } => match (min, max) {
                    (Some(min), Some(max)) => {
                        format!("Field '{}' must be between {} and {}", field, min, max)
                    }
                    (Some(min), None) => format!("Field '{}' must be at least {}", field, min),
                    (None, Some(max)) => format!("Field '{}' must be at most {}", field, max),
                    (None, None) => format!("Field '{}' is out of acceptable range", field),
                },
                ValidationError::InvalidCurrency { currency, reason } => {
                    format!("Invalid currency '{}': {}", currency, reason)
                }
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::MalformedPayload { reason } => {
                    format!("Malformed payload: {}", reason)
                }
                ValidationError::BelowProviderMinimum { currency, floor_eur } => {
                    format!("Minimum deposit for {} is {} EUR", currency, floor_eur)
                }
            },
        }
    }

    /// Check if error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Auth(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { is_retryable, .. } => *is_retryable,
                ExternalError::Timeout { .. } => true,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// Conversions from specific error types:
// From<DatabaseError> lives in database/error.rs and From<PaymentError> in
// payments/error.rs to avoid circular dependencies.

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_not_found_maps_to_404() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::TransactionNotFound {
            payment_id: "5077125051".to_string(),
        }));

        assert_eq!(error.status_code(), 404);
        assert_eq!(error.error_code(), ErrorCode::TransactionNotFound);
        assert!(error.user_message().contains("5077125051"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn signature_errors_map_to_401() {
        let missing = AppError::new(AppErrorKind::Auth(AuthError::MissingSignature));
        assert_eq!(missing.status_code(), 401);
        assert_eq!(missing.error_code(), ErrorCode::SignatureInvalid);

        let invalid = AppError::new(AppErrorKind::Auth(AuthError::InvalidSignature));
        assert_eq!(invalid.status_code(), 401);
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn provider_errors_surface_as_400_with_message() {
        let error = AppError::new(AppErrorKind::External(ExternalError::PaymentProvider {
            provider: "nowpayments".to_string(),
            message: "Amount is below the provider minimum".to_string(),
            is_retryable: false,
        }));

        assert_eq!(error.status_code(), 400);
        assert_eq!(error.error_code(), ErrorCode::PaymentProviderError);
        assert!(error.user_message().contains("below the provider minimum"));
    }

    #[test]
    fn out_of_range_message_names_bounds() {
        let error = AppError::new(AppErrorKind::Validation(ValidationError::OutOfRange {
            field: "amount_eur".to_string(),
            min: Some("10".to_string()),
            max: Some("10000".to_string()),
        }));

        assert_eq!(error.status_code(), 400);
        assert!(error.user_message().contains("between 10 and 10000"));
    }

    #[test]
    fn database_errors_map_to_500() {
        let error = AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: "connection reset".to_string(),
            is_retryable: true,
        }));

        assert_eq!(error.status_code(), 500);
        assert!(error.is_retryable());
    }
}
