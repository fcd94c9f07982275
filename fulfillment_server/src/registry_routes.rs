//----------------------------------------------   Webhook administration  ----------------------------------------------------

use std::time::Duration;

use actix_web::{get, web, HttpResponse};
use fulfillment_engine::{api::registry_api::RegistryApi, traits::RegistryStore};
use log::*;
use lulu_tools::{LuluApi, LuluConfig};
use sfg_common::Secret;
use shopify_tools::{ShopifyApi, ShopifyConfig as ShopifyApiConfig};

use crate::{
    config::ServerOptions,
    data_objects::{EndpointProbe, EndpointTestReport, LuluCredentials, ShopifyCredentials},
    errors::ServerError,
    integrations::{lulu::LuluPrint, shopify::ShopifyCommerce},
    metrics::WebhookMetrics,
    route,
};

route!(webhook_status => Get "/webhooks/status" impl RegistryStore);
pub async fn webhook_status<B>(
    api: web::Data<RegistryApi<B>>,
    metrics: web::Data<WebhookMetrics>,
) -> Result<HttpResponse, ServerError>
where
    B: RegistryStore,
{
    trace!("🪝️ GET webhook status");
    let report = api.status().await?;
    let body = serde_json::json!({
        "shopify": report.shopify,
        "lulu": report.lulu,
        "rejected_requests": metrics.rejections(),
    });
    Ok(HttpResponse::Ok().json(body))
}

route!(register_shopify_webhooks => Post "/webhooks/shopify/register" impl RegistryStore);
/// Register the full Shopify topic set. The request body may carry credential overrides for a
/// different storefront; otherwise the configured storefront is used.
pub async fn register_shopify_webhooks<B>(
    body: Option<web::Json<ShopifyCredentials>>,
    api: web::Data<RegistryApi<B>>,
    commerce: web::Data<ShopifyCommerce>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: RegistryStore,
{
    let address = format!("{}/webhook/shopify", options.public_base_url);
    let creds = body.map(|b| b.into_inner()).unwrap_or_default();
    let report = match shopify_override(&creds)? {
        Some(client) => api.register_shopify(&client, &address).await?,
        None => api.register_shopify(commerce.get_ref(), &address).await?,
    };
    Ok(HttpResponse::Ok().json(report))
}

route!(unregister_shopify_webhooks => Post "/webhooks/shopify/unregister" impl RegistryStore);
pub async fn unregister_shopify_webhooks<B>(
    body: Option<web::Json<ShopifyCredentials>>,
    api: web::Data<RegistryApi<B>>,
    commerce: web::Data<ShopifyCommerce>,
) -> Result<HttpResponse, ServerError>
where
    B: RegistryStore,
{
    let creds = body.map(|b| b.into_inner()).unwrap_or_default();
    let report = match shopify_override(&creds)? {
        Some(client) => api.unregister_shopify(&client).await?,
        None => api.unregister_shopify(commerce.get_ref()).await?,
    };
    Ok(HttpResponse::Ok().json(report))
}

route!(register_lulu_webhooks => Post "/webhooks/lulu/register" impl RegistryStore);
pub async fn register_lulu_webhooks<B>(
    body: Option<web::Json<LuluCredentials>>,
    api: web::Data<RegistryApi<B>>,
    print: web::Data<LuluPrint>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: RegistryStore,
{
    let url = format!("{}/webhook/lulu", options.public_base_url);
    let creds = body.map(|b| b.into_inner()).unwrap_or_default();
    let report = match lulu_override(&creds)? {
        Some(client) => api.register_lulu(&client, &url).await?,
        None => api.register_lulu(print.get_ref(), &url).await?,
    };
    Ok(HttpResponse::Ok().json(report))
}

route!(unregister_lulu_webhooks => Post "/webhooks/lulu/unregister" impl RegistryStore);
pub async fn unregister_lulu_webhooks<B>(
    body: Option<web::Json<LuluCredentials>>,
    api: web::Data<RegistryApi<B>>,
    print: web::Data<LuluPrint>,
) -> Result<HttpResponse, ServerError>
where
    B: RegistryStore,
{
    let creds = body.map(|b| b.into_inner()).unwrap_or_default();
    let report = match lulu_override(&creds)? {
        Some(client) => api.unregister_lulu(&client).await?,
        None => api.unregister_lulu(print.get_ref()).await?,
    };
    Ok(HttpResponse::Ok().json(report))
}

fn shopify_override(creds: &ShopifyCredentials) -> Result<Option<ShopifyCommerce>, ServerError> {
    match (&creds.domain, &creds.access_token) {
        (Some(domain), Some(token)) => {
            debug!("🪝️ Using supplied credential overrides for {domain}");
            let config = ShopifyApiConfig::with_credentials(domain, Secret::new(token.clone()));
            let client = ShopifyApi::new(config).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
            Ok(Some(ShopifyCommerce::new(client)))
        },
        (None, None) => Ok(None),
        _ => Err(ServerError::InvalidRequestBody(
            "Both domain and access_token must be supplied to override credentials".to_string(),
        )),
    }
}

fn lulu_override(creds: &LuluCredentials) -> Result<Option<LuluPrint>, ServerError> {
    match (&creds.client_key, &creds.client_secret) {
        (Some(key), Some(secret)) => {
            debug!("🪝️ Using supplied Lulu credential overrides");
            let config = LuluConfig::with_api_key(Secret::new(key.clone()), Secret::new(secret.clone()));
            let client = LuluApi::new(config).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
            Ok(Some(LuluPrint::new(client)))
        },
        (None, None) => Ok(None),
        _ => Err(ServerError::InvalidRequestBody(
            "Both client_key and client_secret must be supplied to override credentials".to_string(),
        )),
    }
}

/// Probe the public ingestion endpoints over HTTP, end to end, the same way the providers reach
/// them.
#[get("/webhooks/test")]
pub async fn test_webhook_endpoints(options: web::Data<ServerOptions>) -> Result<HttpResponse, ServerError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ServerError::Unspecified(e.to_string()))?;
    let shopify = probe(&client, &format!("{}/webhook/shopify/health", options.public_base_url)).await;
    let lulu = probe(&client, &format!("{}/webhook/lulu/health", options.public_base_url)).await;
    let report = EndpointTestReport { success: shopify.success && lulu.success, shopify, lulu };
    Ok(HttpResponse::Ok().json(report))
}

async fn probe(client: &reqwest::Client, url: &str) -> EndpointProbe {
    debug!("🪝️ Probing {url}");
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            EndpointProbe {
                success: status.is_success(),
                status: status.as_u16(),
                message: if status.is_success() { "Endpoint healthy" } else { "Endpoint unhealthy" }.to_string(),
            }
        },
        Err(e) => EndpointProbe { success: false, status: 0, message: format!("Connection failed: {e}") },
    }
}
