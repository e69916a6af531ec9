use crate::domain::template::{Locale, MessageType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Template not found: {message_type} ({locale})")]
    TemplateNotFound {
        message_type: MessageType,
        locale: Locale,
    },
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),
    #[error("No SMS voucher found for company {0}")]
    VoucherNotFound(u64),
    #[error("No SMS provider credit pool found")]
    ProviderPoolMissing,
    #[error("Failed to send SMS for campaign {campaign}: {reason}")]
    DeliveryFailed { campaign: String, reason: String },
    #[error("Failed to check SMS balance: {0}")]
    BalanceCheck(String),
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("Dispatch pool is shut down")]
    PoolClosed,
    #[error("Credit ledger is unavailable")]
    LedgerUnavailable,
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Errors caused by the request itself or by missing seed data.
    /// Retrying them without changing the input cannot succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            DispatchError::InvalidInput(_)
                | DispatchError::TemplateNotFound { .. }
                | DispatchError::InvalidTransition(_)
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for DispatchError {
    fn from(err: rocksdb::Error) -> Self {
        DispatchError::InternalError(Box::new(err))
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
