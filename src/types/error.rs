use crate::types::{Currency, PaymentMethod};
use crate::utils::numeric::NumericError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid amount: {0}")]
    InvalidAmount(#[source] NumericError),
    #[error("If provided, gasLimit must be a non-negative integer")]
    InvalidGasLimit,
    #[error("If provided, gasPrice must be a non-negative integer")]
    InvalidGasPrice,
    #[error("If a recipient is provided it must be of type string")]
    InvalidRecipient,
    #[error("If provided, fee must be a non-negative integer")]
    InvalidFee,
    #[error("If provided, feePerByte must be a non-negative integer")]
    InvalidFeePerByte,
    #[error("If provided, extraData must be of type string")]
    InvalidExtraData,
    #[error("If provided, validityDuration must be a non-negative integer")]
    InvalidValidityDuration,
    #[error("malformed protocolSpecific fields: {0}")]
    MalformedProtocolSpecific(#[source] serde_json::Error),
    #[error("fee or total exceeds 256 bits")]
    FeeOverflow,
    #[error("expected {expected_currency}/{expected_method} options, got {currency}/{method}")]
    VariantMismatch {
        expected_currency: Currency,
        expected_method: PaymentMethod,
        currency: Currency,
        method: PaymentMethod,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum FiatFeeError {
    #[error("amount and fiatAmount must be provided")]
    MissingAmount,
    #[error("fiat amount {0} is not a finite non-negative number")]
    InvalidFiatAmount(f64),
    #[error("fiat fee computation exceeds 256 bits")]
    FiatFeeOverflow,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("can't delete database at {}, there is still an open connection", path.display())]
    StorageBlocked { path: PathBuf },

    #[error("unable to create the directory for the database at {}: {source}", provided_path.display())]
    DatabasePathUnableToCreateParentDirectory {
        provided_path: PathBuf,
        source: io::Error,
    },

    #[error("failed to perform sqlx migration: {source}")]
    MigrationError {
        #[source]
        #[from]
        source: sqlx::migrate::MigrateError,
    },

    #[error("failed to connect to the underlying connection pool: {source}")]
    DatabaseConnectionError {
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to run the SQL query: {source}")]
    QueryError {
        #[source]
        #[from]
        source: sqlx::Error,
    },

    #[error("stored permission for {origin} is malformed: {source}")]
    MalformedPermission {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to remove database file {}: {source}", path.display())]
    DatabaseRemovalError { path: PathBuf, source: io::Error },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    FiatFee(#[from] FiatFeeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no permission stored for {0}")]
    PermissionNotFound(String),
}

impl From<&ApiError> for StatusCode {
    fn from(error: &ApiError) -> Self {
        match error {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::FiatFee(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::StorageBlocked { .. }) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PermissionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
