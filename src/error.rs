//! Error taxonomy for the endpoint layer.
//!
//! Store and command code works in `anyhow::Result`; endpoints convert into
//! [`ServiceError`] so every failure maps onto exactly one response status.

use serde_json::{json, Value};
use thiserror::Error;

use crate::report::{RangeError, UnknownReportType};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No caller identity, or the identity is not a known user
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Caller is known but their role does not allow the operation
    #[error("Permission denied: {0}")]
    AuthorizationDenied(String),

    /// Malformed payload or query parameter
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    UnknownReportType(#[from] UnknownReportType),

    /// Store or transport fault; details stay in the logs
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::AuthenticationRequired => 401,
            ServiceError::AuthorizationDenied(_) => 403,
            ServiceError::Validation(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::UnknownReportType(_) => 400,
            ServiceError::Internal(_) => 500,
        }
    }

    pub fn to_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl From<RangeError> for ServiceError {
    fn from(e: RangeError) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Validation(e.to_string())
    }
}
