use crate::error::{AppError, AppErrorKind, InfrastructureError};
use std::fmt;

/// Database error with a classified kind
#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
}

#[derive(Debug, Clone)]
pub enum DatabaseErrorKind {
    /// Unique constraint violated (e.g. duplicate provider payment id)
    UniqueViolation { constraint: Option<String> },
    /// Row expected but not found
    NotFound,
    /// Connection-level failure, worth retrying
    Connection { message: String },
    /// Query or pool timeout
    Timeout,
    /// Anything sqlx reported that we do not classify further
    Unknown { message: String },
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self { kind }
    }

    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound,
            sqlx::Error::PoolTimedOut => DatabaseErrorKind::Timeout,
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed => DatabaseErrorKind::Connection {
                message: err.to_string(),
            },
            sqlx::Error::Database(db_err) => {
                // 23505 = unique_violation
                if db_err.code().as_deref() == Some("23505") {
                    DatabaseErrorKind::UniqueViolation {
                        constraint: db_err.constraint().map(|c| c.to_string()),
                    }
                } else {
                    DatabaseErrorKind::Unknown {
                        message: db_err.to_string(),
                    }
                }
            }
            _ => DatabaseErrorKind::Unknown {
                message: err.to_string(),
            },
        };

        Self { kind }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::Connection { .. } | DatabaseErrorKind::Timeout
        )
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::UniqueViolation { .. })
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DatabaseErrorKind::UniqueViolation { constraint } => match constraint {
                Some(c) => write!(f, "unique constraint '{}' violated", c),
                None => write!(f, "unique constraint violated"),
            },
            DatabaseErrorKind::NotFound => write!(f, "row not found"),
            DatabaseErrorKind::Connection { message } => {
                write!(f, "database connection error: {}", message)
            }
            DatabaseErrorKind::Timeout => write!(f, "database operation timed out"),
            DatabaseErrorKind::Unknown { message } => write!(f, "database error: {}", message),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_classified() {
        let err = DatabaseError::from_sqlx(sqlx::Error::RowNotFound);
        assert!(matches!(err.kind, DatabaseErrorKind::NotFound));
        assert!(!err.is_retryable());
    }

    #[test]
    fn pool_timeout_is_retryable() {
        let err = DatabaseError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }

    #[test]
    fn converts_to_500_app_error() {
        let err = DatabaseError::new(DatabaseErrorKind::Unknown {
            message: "boom".to_string(),
        });
        let app: AppError = err.into();
        assert_eq!(app.status_code(), 500);
    }
}
