use std::{env, net::IpAddr};

use chrono::Duration;
use log::*;
use lulu_tools::LuluConfig as LuluApiConfig;
use sfg_common::{helpers::parse_boolean_flag, Secret};
use shopify_tools::ShopifyConfig as ShopifyApiConfig;

const DEFAULT_SFG_HOST: &str = "127.0.0.1";
const DEFAULT_SFG_PORT: u16 = 8360;
const DEFAULT_TRACKING_MAX_AGE_MINUTES: i64 = 30;
const DEFAULT_REFRESH_SWEEP_SECONDS: u64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public URL providers use to reach this server; webhook subscriptions are registered
    /// against it and the endpoint self-test probes it.
    pub public_base_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// How old a cached tracking record may get before reads trigger a live refresh.
    pub tracking_max_age: Duration,
    /// How often the background worker sweeps stored records for staleness.
    pub refresh_sweep_interval: std::time::Duration,
    /// Shopify storefront configuration
    pub shopify_config: ShopifyConfig,
    /// Lulu print API configuration
    pub lulu_config: LuluIntegrationConfig,
}

#[derive(Clone, Debug, Default)]
pub struct ShopifyConfig {
    pub api: ShopifyApiConfig,
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, requests against the Shopify webhook endpoint will be checked against a
    /// whitelist of peer IP addresses. To explicitly disable the whitelist, set the environment
    /// variable to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

#[derive(Clone, Debug, Default)]
pub struct LuluIntegrationConfig {
    pub api: LuluApiConfig,
    /// Shared secret Lulu presents as a bearer token on webhook deliveries.
    pub webhook_secret: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFG_HOST.to_string(),
            port: DEFAULT_SFG_PORT,
            database_url: String::default(),
            public_base_url: String::default(),
            use_x_forwarded_for: false,
            tracking_max_age: Duration::minutes(DEFAULT_TRACKING_MAX_AGE_MINUTES),
            refresh_sweep_interval: std::time::Duration::from_secs(DEFAULT_REFRESH_SWEEP_SECONDS),
            shopify_config: ShopifyConfig::default(),
            lulu_config: LuluIntegrationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFG_HOST").ok().unwrap_or_else(|| DEFAULT_SFG_HOST.into());
        let port = env::var("SFG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SFG_PORT. {e} Using the default, {DEFAULT_SFG_PORT}, instead."
                    );
                    DEFAULT_SFG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SFG_PORT);
        let database_url = env::var("SFG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SFG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let public_base_url = env::var("SFG_PUBLIC_BASE_URL").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ SFG_PUBLIC_BASE_URL is not set. Webhook registration and the endpoint self-test will not work \
                 until it is."
            );
            format!("http://{host}:{port}")
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SFG_USE_X_FORWARDED_FOR").ok(), false);
        let tracking_max_age = env::var("SFG_TRACKING_MAX_AGE_MINUTES")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SFG_TRACKING_MAX_AGE_MINUTES. {e}"))
                    .ok()
            })
            .map(Duration::minutes)
            .unwrap_or_else(|| Duration::minutes(DEFAULT_TRACKING_MAX_AGE_MINUTES));
        let refresh_sweep_interval = env::var("SFG_REFRESH_SWEEP_SECONDS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SFG_REFRESH_SWEEP_SECONDS. {e}"))
                    .ok()
            })
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| std::time::Duration::from_secs(DEFAULT_REFRESH_SWEEP_SECONDS));
        let shopify_config = ShopifyConfig::from_env_or_defaults();
        let lulu_config = LuluIntegrationConfig::from_env_or_defaults();
        Self {
            host,
            port,
            database_url,
            public_base_url,
            use_x_forwarded_for,
            tracking_max_age,
            refresh_sweep_interval,
            shopify_config,
            lulu_config,
        }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let api = ShopifyApiConfig::new_from_env_or_default();
        let hmac_secret = env::var("SFG_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SFG_SHOPIFY_HMAC_SECRET is not set. Please set it to the HMAC signing key for your Shopify app."
            );
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = parse_boolean_flag(env::var("SFG_SHOPIFY_HMAC_CHECKS").ok(), true);
        let whitelist = env::var("SFG_SHOPIFY_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ Shopify IP whitelist is disabled. If this is not what you want, set \
                     SFG_SHOPIFY_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|e| {
                            warn!("🪛️ Ignoring invalid IP address ({s}) in SFG_SHOPIFY_IP_WHITELIST: {e}");
                        })
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Shopify IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming Shopify webhook deliveries."
                );
            },
            None => {
                info!("🪛️ No Shopify IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Shopify IP whitelist: {addrs}");
            },
        }
        Self { api, hmac_secret, hmac_checks, whitelist }
    }
}

impl LuluIntegrationConfig {
    pub fn from_env_or_defaults() -> Self {
        let api = LuluApiConfig::new_from_env_or_default();
        let webhook_secret = env::var("SFG_LULU_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SFG_LULU_WEBHOOK_SECRET is not set. Incoming Lulu webhook deliveries cannot be authenticated \
                 without it."
            );
            String::default()
        });
        Self { api, webhook_secret: Secret::new(webhook_secret) }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the
/// system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub public_base_url: String,
    pub tracking_max_age: Duration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { public_base_url: config.public_base_url.clone(), tracking_max_age: config.tracking_max_age }
    }
}
