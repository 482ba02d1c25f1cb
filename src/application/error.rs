use thiserror::Error;

use crate::domain::LedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("Maintenance item not tracked on {plate}: {code}")]
    ItemNotFound { plate: String, code: String },

    #[error("Service event not found: {0}")]
    ServiceEventNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Map a domain ledger error to the application taxonomy.
    pub(crate) fn from_ledger(err: LedgerError, plate: &str) -> Self {
        match err {
            LedgerError::ItemNotFound(code) => AppError::ItemNotFound {
                plate: plate.to_string(),
                code,
            },
            LedgerError::ServiceEventNotFound(id) => {
                AppError::ServiceEventNotFound(id.to_string())
            }
        }
    }
}
