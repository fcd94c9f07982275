use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fulfillment_engine::{
    api::errors::{AggregationError, IngestError, RegistryError},
    traits::{TrackingStoreError, WebhookAuditError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Requests from this peer are not allowed.")]
    ForbiddenPeer,
    #[error("One of the providers could not answer. {0}")]
    ProviderUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::ForbiddenPeer => StatusCode::FORBIDDEN,
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<AggregationError> for ServerError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::StatusUnavailable { .. } => Self::ProviderUnavailable(e.to_string()),
            AggregationError::ListingFailed(_) => Self::ProviderUnavailable(e.to_string()),
            AggregationError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<RegistryError> for ServerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotConfigured(_) => Self::NoRecordFound(e.to_string()),
            RegistryError::MalformedConfig(_, _) => Self::BackendError(e.to_string()),
            RegistryError::ConfigError(_) | RegistryError::AuditError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<IngestError> for ServerError {
    fn from(e: IngestError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<WebhookAuditError> for ServerError {
    fn from(e: WebhookAuditError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<TrackingStoreError> for ServerError {
    fn from(e: TrackingStoreError) -> Self {
        Self::BackendError(e.to_string())
    }
}
