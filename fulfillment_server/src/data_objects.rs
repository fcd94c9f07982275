use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Optional credential overrides for an administrative Shopify webhook action. When absent, the
/// server's configured storefront credentials are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopifyCredentials {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Optional credential overrides for an administrative Lulu webhook action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LuluCredentials {
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Query parameters for the webhook log browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQueryParams {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Result of probing one ingestion endpoint over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointProbe {
    pub success: bool,
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointTestReport {
    pub success: bool,
    pub shopify: EndpointProbe,
    pub lulu: EndpointProbe,
}
