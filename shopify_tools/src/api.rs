use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::ShopifyConfig,
    data_objects::{NewWebhook, ShopifyOrder, Webhook},
    ShopifyApiError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.admin_access_token.reveal().as_str())
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        headers.insert("X-Shopify-Access-Token", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, ShopifyApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ShopifyApiError::Timeout(e.to_string())
            } else {
                ShopifyApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://{}/admin/api/{}{path}", self.config.shop, self.config.api_version)
    }

    pub async fn get_order(&self, order_id: u64) -> Result<ShopifyOrder, ShopifyApiError> {
        #[derive(Deserialize)]
        struct OrderResponse {
            order: ShopifyOrder,
        }
        let path = format!("/orders/{order_id}.json");
        debug!("Fetching order #{order_id}");
        let result = self.rest_query::<OrderResponse, ()>(Method::GET, &path, &[], None).await?;
        info!("Fetched order #{order_id}");
        Ok(result.order)
    }

    /// Fetch a page of orders. `status` takes the Shopify values ("open", "closed", "cancelled", "any").
    pub async fn fetch_orders(&self, limit: u32, status: Option<&str>) -> Result<Vec<ShopifyOrder>, ShopifyApiError> {
        #[derive(Deserialize)]
        struct OrdersResponse {
            orders: Vec<ShopifyOrder>,
        }
        let limit = limit.to_string();
        let mut params = vec![("limit", limit.as_str())];
        if let Some(status) = status {
            params.push(("status", status));
        }
        debug!("Fetching orders (limit {limit})");
        let result = self.rest_query::<OrdersResponse, ()>(Method::GET, "/orders.json", &params, None).await?;
        info!("Fetched {} orders", result.orders.len());
        Ok(result.orders)
    }

    pub async fn fetch_webhooks(&self) -> Result<Vec<Webhook>, ShopifyApiError> {
        #[derive(Deserialize)]
        struct WebhookResponse {
            webhooks: Vec<Webhook>,
        }
        debug!("Fetching webhooks");
        let result = self.rest_query::<WebhookResponse, ()>(Method::GET, "/webhooks.json", &[], None).await?;
        info!("Fetched webhooks");
        Ok(result.webhooks)
    }

    pub async fn install_webhook(&self, address: &str, topic: &str) -> Result<Webhook, ShopifyApiError> {
        #[derive(Serialize)]
        struct WebhookInput {
            webhook: NewWebhook,
        }
        #[derive(Deserialize)]
        struct WebhookResponse {
            webhook: Webhook,
        }
        let webhook = NewWebhook { topic: topic.to_string(), address: address.to_string(), format: "json".to_string() };
        let input = WebhookInput { webhook };
        debug!("Installing webhook: {}", serde_json::to_string(&input).unwrap_or_default());
        let result =
            self.rest_query::<WebhookResponse, WebhookInput>(Method::POST, "/webhooks.json", &[], Some(input)).await?;
        info!("Installed webhook: {:?}", result.webhook.id);
        Ok(result.webhook)
    }

    pub async fn remove_webhook(&self, id: i64) -> Result<(), ShopifyApiError> {
        let path = format!("/webhooks/{id}.json");
        debug!("Removing webhook {id}");
        let url = self.url(&path);
        let response = self.client.delete(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ShopifyApiError::Timeout(e.to_string())
            } else {
                ShopifyApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            info!("Removed webhook {id}");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }
}
