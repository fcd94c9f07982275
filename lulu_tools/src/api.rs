use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use log::*;
use reqwest::{header::HeaderValue, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::LuluConfig,
    data_objects::{
        LuluAddress,
        LuluWebhook,
        NewLuluWebhook,
        NewPrintJob,
        PrintJob,
        PrintJobCost,
        PrintJobList,
        PrintJobStatus,
        ShipmentTracking,
    },
    LuluApiError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Refresh the OAuth token this long before the provider's stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Authenticated client for the print provider's REST API.
///
/// Authentication uses the OAuth client-credentials flow. The bearer token is fetched lazily and
/// cached until shortly before expiry, so steady-state calls cost a single round trip.
#[derive(Clone)]
pub struct LuluApi {
    config: LuluConfig,
    client: Arc<Client>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl LuluApi {
    pub fn new(config: LuluConfig) -> Result<Self, LuluApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LuluApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(Mutex::new(None)) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().ok()?;
        guard.as_ref().filter(|t| t.expires_at > Instant::now()).map(|t| t.token.clone())
    }

    async fn access_token(&self) -> Result<String, LuluApiError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            expires_in: Option<u64>,
        }
        trace!("Requesting new access token");
        let credentials =
            base64::encode(format!("{}:{}", self.config.client_key.reveal(), self.config.client_secret.reveal()));
        let response = self
            .client
            .post(&self.config.token_url)
            .header("Authorization", format!("Basic {credentials}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LuluApiError::Timeout(e.to_string())
                } else {
                    LuluApiError::Authentication(e.to_string())
                }
            })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LuluApiError::Authentication(format!("token endpoint returned {status}: {message}")));
        }
        let body = response.json::<TokenResponse>().await.map_err(|e| LuluApiError::JsonError(e.to_string()))?;
        let ttl = Duration::from_secs(body.expires_in.unwrap_or(300));
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_MARGIN);
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(CachedToken { token: body.access_token.clone(), expires_at });
        }
        debug!("Obtained new access token (ttl {}s)", ttl.as_secs());
        Ok(body.access_token)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, LuluApiError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| LuluApiError::RestRequestError(e.to_string()))?;
        let mut req = self.client.request(method, url).header("Authorization", auth);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LuluApiError::Timeout(e.to_string())
            } else {
                LuluApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| LuluApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| LuluApiError::RestResponseError(e.to_string()))?;
            Err(LuluApiError::QueryError { status, message })
        }
    }

    /// Issue a DELETE. Distinct from [`Self::rest_query`] because successful deletes come back with
    /// an empty body that must not be fed to the JSON decoder.
    async fn rest_delete(&self, path: &str) -> Result<(), LuluApiError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        trace!("Sending DELETE: {url}");
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| LuluApiError::RestRequestError(e.to_string()))?;
        let response = self.client.delete(url).header("Authorization", auth).send().await.map_err(|e| {
            if e.is_timeout() {
                LuluApiError::Timeout(e.to_string())
            } else {
                LuluApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| LuluApiError::RestResponseError(e.to_string()))?;
            Err(LuluApiError::QueryError { status, message })
        }
    }

    pub async fn print_job(&self, id: u64) -> Result<PrintJob, LuluApiError> {
        let path = format!("/print-jobs/{id}/");
        debug!("Fetching print job {id}");
        let job = self.rest_query::<PrintJob, ()>(Method::GET, &path, &[], None).await?;
        info!("Fetched print job {id}");
        Ok(job)
    }

    pub async fn print_job_status(&self, id: u64) -> Result<PrintJobStatus, LuluApiError> {
        let path = format!("/print-jobs/{id}/status/");
        debug!("Fetching status for print job {id}");
        self.rest_query::<PrintJobStatus, ()>(Method::GET, &path, &[], None).await
    }

    pub async fn print_job_tracking(&self, id: u64) -> Result<ShipmentTracking, LuluApiError> {
        let path = format!("/print-jobs/{id}/tracking/");
        debug!("Fetching tracking for print job {id}");
        self.rest_query::<ShipmentTracking, ()>(Method::GET, &path, &[], None).await
    }

    pub async fn print_jobs(
        &self,
        page: u32,
        page_size: u32,
        status: Option<&str>,
    ) -> Result<PrintJobList, LuluApiError> {
        let page = page.to_string();
        let page_size = page_size.to_string();
        let mut params = vec![("page", page.as_str()), ("page_size", page_size.as_str())];
        if let Some(status) = status {
            params.push(("status", status));
        }
        debug!("Fetching print jobs page {page} (size {page_size})");
        let list = self.rest_query::<PrintJobList, ()>(Method::GET, "/print-jobs/", &params, None).await?;
        info!("Fetched {} of {} print jobs", list.results.len(), list.count);
        Ok(list)
    }

    pub async fn create_print_job(&self, mut job: NewPrintJob) -> Result<PrintJob, LuluApiError> {
        if job.contact_email.is_empty() {
            job.contact_email = self.config.contact_email.clone();
        }
        debug!("Creating print job for order {}", job.external_id);
        let created = self.rest_query::<PrintJob, NewPrintJob>(Method::POST, "/print-jobs/", &[], Some(job)).await?;
        info!("Created print job {}", created.id);
        Ok(created)
    }

    pub async fn calculate_cost(
        &self,
        line_items: Vec<serde_json::Value>,
        shipping_address: &LuluAddress,
        shipping_level: &str,
    ) -> Result<PrintJobCost, LuluApiError> {
        let body = serde_json::json!({
            "line_items": line_items,
            "shipping_address": shipping_address,
            "shipping_option": shipping_level,
        });
        debug!("Calculating print job cost");
        self.rest_query::<PrintJobCost, serde_json::Value>(Method::POST, "/print-job-cost-calculations/", &[], Some(body))
            .await
    }

    /// Fetches the account associated with the configured credentials. Useful as a credential check.
    pub async fn account(&self) -> Result<serde_json::Value, LuluApiError> {
        debug!("Fetching account info");
        self.rest_query::<serde_json::Value, ()>(Method::GET, "/account/", &[], None).await
    }

    pub async fn install_webhook(&self, url: &str, topics: &[&str]) -> Result<LuluWebhook, LuluApiError> {
        let input = NewLuluWebhook { url: url.to_string(), topics: topics.iter().map(|s| s.to_string()).collect() };
        debug!("Installing webhook: {}", serde_json::to_string(&input).unwrap_or_default());
        let webhook = self.rest_query::<LuluWebhook, NewLuluWebhook>(Method::POST, "/webhooks/", &[], Some(input)).await?;
        info!("Installed webhook {}", webhook.id);
        Ok(webhook)
    }

    pub async fn remove_webhook(&self, id: &str) -> Result<(), LuluApiError> {
        let path = format!("/webhooks/{id}/");
        debug!("Removing webhook {id}");
        self.rest_delete(&path).await?;
        info!("Removed webhook {id}");
        Ok(())
    }
}
