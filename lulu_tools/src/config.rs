use log::*;
use sfg_common::Secret;

const DEFAULT_API_BASE: &str = "https://api.lulu.com";
const DEFAULT_TOKEN_URL: &str = "https://api.lulu.com/auth/realms/glasstree/protocol/openid-connect/token";

#[derive(Debug, Clone)]
pub struct LuluConfig {
    pub api_base: String,
    pub token_url: String,
    pub client_key: Secret<String>,
    pub client_secret: Secret<String>,
    /// Email attached to print jobs submitted through this client.
    pub contact_email: String,
}

impl Default for LuluConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_key: Secret::default(),
            client_secret: Secret::default(),
            contact_email: String::default(),
        }
    }
}

impl LuluConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("SFG_LULU_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let token_url = std::env::var("SFG_LULU_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string());
        let client_key = Secret::new(std::env::var("SFG_LULU_CLIENT_KEY").unwrap_or_else(|_| {
            warn!("SFG_LULU_CLIENT_KEY not set, using (probably useless) default");
            String::default()
        }));
        let client_secret = Secret::new(std::env::var("SFG_LULU_CLIENT_SECRET").unwrap_or_else(|_| {
            warn!("SFG_LULU_CLIENT_SECRET not set, using (probably useless) default");
            String::default()
        }));
        let contact_email = std::env::var("SFG_LULU_CONTACT_EMAIL").unwrap_or_else(|_| {
            warn!("SFG_LULU_CONTACT_EMAIL not set, print job submissions will use a placeholder address");
            "orders@example.com".to_string()
        });
        Self { api_base, token_url, client_key, client_secret, contact_email }
    }

    /// Build a config from an explicit API key, e.g. the override supplied with an administrative
    /// webhook-registration request.
    pub fn with_api_key(client_key: Secret<String>, client_secret: Secret<String>) -> Self {
        let defaults = Self::new_from_env_or_default();
        Self { client_key, client_secret, ..defaults }
    }
}
