use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl ShopifyApiError {
    /// The HTTP status code of the failed query, if the provider responded at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ShopifyApiError::QueryError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ShopifyApiError::Timeout(_))
    }
}
