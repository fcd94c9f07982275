use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    errors::RegistryError,
    health_api::{analyze, HealthSnapshot},
};
use crate::{
    db_types::{WebhookConfig, WebhookSource},
    traits::{CommerceProvider, LogQueryFilter, PrintProvider, RegistryStore},
};

/// The commerce topics this gateway subscribes to.
pub const SHOPIFY_WEBHOOK_TOPICS: [&str; 5] =
    ["orders/create", "orders/updated", "orders/paid", "orders/cancelled", "orders/fulfilled"];

/// The print-provider events this gateway subscribes to.
pub const LULU_WEBHOOK_TOPICS: [&str; 1] = ["print_job.status_changed"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRegistration {
    pub topic: String,
    pub success: bool,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Registration is not all-or-nothing: a store with 4/5 topics registered is a valid, reportable
/// state, and the per-topic outcomes are persisted alongside the successes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub service: WebhookSource,
    pub success: bool,
    pub message: String,
    pub results: Vec<TopicRegistration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRemoval {
    pub subscription_id: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregisterReport {
    pub service: WebhookSource,
    pub success: bool,
    pub message: String,
    pub results: Vec<SubscriptionRemoval>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderWebhookStatus {
    pub configured: bool,
    pub config: Option<WebhookConfig>,
    pub health: HealthSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookStatusReport {
    pub shopify: ProviderWebhookStatus,
    pub lulu: ProviderWebhookStatus,
}

/// `RegistryApi` manages webhook subscriptions with both providers and the local bookkeeping
/// about them. Provider clients are passed per call rather than held, because administrative
/// actions may carry one-off credential overrides.
pub struct RegistryApi<B> {
    db: B,
}

impl<B> Debug for RegistryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegistryApi")
    }
}

impl<B> Clone for RegistryApi<B>
where B: Clone
{
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> RegistryApi<B>
where B: RegistryStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Subscribe to every commerce topic, one create call per topic, collecting per-topic
    /// outcomes. The summary — partial failures included — is persisted as the provider's
    /// webhook config.
    pub async fn register_shopify<C: CommerceProvider>(
        &self,
        commerce: &C,
        address: &str,
    ) -> Result<RegistrationReport, RegistryError> {
        info!("🪝️ Registering {} Shopify webhook topics", SHOPIFY_WEBHOOK_TOPICS.len());
        let mut results = Vec::with_capacity(SHOPIFY_WEBHOOK_TOPICS.len());
        for topic in SHOPIFY_WEBHOOK_TOPICS {
            match commerce.install_webhook(address, topic).await {
                Ok(sub) => {
                    debug!("🪝️ Registered webhook for {topic}: {}", sub.id);
                    results.push(TopicRegistration {
                        topic: topic.to_string(),
                        success: true,
                        subscription_id: Some(sub.id),
                        error: None,
                    });
                },
                Err(e) => {
                    warn!("🪝️ Failed to register webhook for {topic}. {e}");
                    results.push(TopicRegistration {
                        topic: topic.to_string(),
                        success: false,
                        subscription_id: None,
                        error: Some(e.to_string()),
                    });
                },
            }
        }
        let config = json!({
            "address": address,
            "webhooks": &results,
            "registered_at": Utc::now(),
        });
        self.db.upsert_webhook_config(WebhookSource::Shopify, config).await?;
        let successful = results.iter().filter(|r| r.success).count();
        let message = format!("Registered {successful}/{} Shopify webhook topics", SHOPIFY_WEBHOOK_TOPICS.len());
        info!("🪝️ {message}");
        Ok(RegistrationReport {
            service: WebhookSource::Shopify,
            success: successful == SHOPIFY_WEBHOOK_TOPICS.len(),
            message,
            results,
        })
    }

    /// Subscribe to the print provider's status-change event. The config is persisted only on
    /// success, since a failed single-subscription registration leaves nothing to audit or
    /// remove later.
    pub async fn register_lulu<P: PrintProvider>(
        &self,
        print: &P,
        url: &str,
    ) -> Result<RegistrationReport, RegistryError> {
        info!("🪝️ Registering Lulu webhook");
        match print.install_webhook(url, &LULU_WEBHOOK_TOPICS).await {
            Ok(sub) => {
                let config = json!({
                    "webhook_id": &sub.id,
                    "url": url,
                    "topics": LULU_WEBHOOK_TOPICS,
                    "registered_at": Utc::now(),
                });
                self.db.upsert_webhook_config(WebhookSource::Lulu, config).await?;
                info!("🪝️ Registered Lulu webhook {}", sub.id);
                Ok(RegistrationReport {
                    service: WebhookSource::Lulu,
                    success: true,
                    message: "Lulu webhook registered successfully".to_string(),
                    results: vec![TopicRegistration {
                        topic: LULU_WEBHOOK_TOPICS[0].to_string(),
                        success: true,
                        subscription_id: Some(sub.id),
                        error: None,
                    }],
                })
            },
            Err(e) => {
                warn!("🪝️ Failed to register Lulu webhook. {e}");
                Ok(RegistrationReport {
                    service: WebhookSource::Lulu,
                    success: false,
                    message: format!("Failed to register Lulu webhook: {e}"),
                    results: vec![TopicRegistration {
                        topic: LULU_WEBHOOK_TOPICS[0].to_string(),
                        success: false,
                        subscription_id: None,
                        error: Some(e.to_string()),
                    }],
                })
            },
        }
    }

    /// Remove every subscription recorded in the stored config, reporting per-item outcomes, then
    /// delete the local config regardless — a remote subscription that 404s on delete is
    /// equivalent to already-deleted, and local bookkeeping must not get stuck on it.
    pub async fn unregister_shopify<C: CommerceProvider>(
        &self,
        commerce: &C,
    ) -> Result<UnregisterReport, RegistryError> {
        let config = self
            .db
            .fetch_webhook_config(WebhookSource::Shopify)
            .await?
            .ok_or(RegistryError::NotConfigured(WebhookSource::Shopify))?;
        let webhooks: Vec<TopicRegistration> = serde_json::from_value(config.config["webhooks"].clone())
            .map_err(|e| RegistryError::MalformedConfig(WebhookSource::Shopify, e.to_string()))?;
        let mut results = Vec::new();
        for webhook in webhooks.into_iter().filter(|w| w.success) {
            let Some(id) = webhook.subscription_id else { continue };
            match commerce.remove_webhook(&id).await {
                Ok(()) => results.push(SubscriptionRemoval {
                    subscription_id: id,
                    topic: Some(webhook.topic),
                    success: true,
                    message: "Unregistered".to_string(),
                }),
                Err(e) => {
                    warn!("🪝️ Failed to remove Shopify webhook {id}. {e}");
                    results.push(SubscriptionRemoval {
                        subscription_id: id,
                        topic: Some(webhook.topic),
                        success: false,
                        message: e.to_string(),
                    });
                },
            }
        }
        self.db.delete_webhook_config(WebhookSource::Shopify).await?;
        let successful = results.iter().filter(|r| r.success).count();
        let message = format!("Unregistered {successful}/{} Shopify webhooks", results.len());
        info!("🪝️ {message}");
        Ok(UnregisterReport {
            service: WebhookSource::Shopify,
            success: successful == results.len(),
            message,
            results,
        })
    }

    pub async fn unregister_lulu<P: PrintProvider>(&self, print: &P) -> Result<UnregisterReport, RegistryError> {
        let config = self
            .db
            .fetch_webhook_config(WebhookSource::Lulu)
            .await?
            .ok_or(RegistryError::NotConfigured(WebhookSource::Lulu))?;
        let webhook_id = config.config["webhook_id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                RegistryError::MalformedConfig(WebhookSource::Lulu, "no webhook_id in stored config".to_string())
            })?;
        let result = match print.remove_webhook(&webhook_id).await {
            Ok(()) => SubscriptionRemoval {
                subscription_id: webhook_id,
                topic: Some(LULU_WEBHOOK_TOPICS[0].to_string()),
                success: true,
                message: "Unregistered".to_string(),
            },
            Err(e) => {
                warn!("🪝️ Failed to remove Lulu webhook {webhook_id}. {e}");
                SubscriptionRemoval {
                    subscription_id: webhook_id,
                    topic: Some(LULU_WEBHOOK_TOPICS[0].to_string()),
                    success: false,
                    message: e.to_string(),
                }
            },
        };
        self.db.delete_webhook_config(WebhookSource::Lulu).await?;
        let success = result.success;
        let message = if success {
            "Lulu webhook unregistered successfully".to_string()
        } else {
            format!("Lulu webhook removal reported a failure: {}", result.message)
        };
        info!("🪝️ {message}");
        Ok(UnregisterReport { service: WebhookSource::Lulu, success, message, results: vec![result] })
    }

    /// Per-provider registration state plus the health derived from the audit log.
    pub async fn status(&self) -> Result<WebhookStatusReport, RegistryError> {
        let shopify = self.provider_status(WebhookSource::Shopify).await?;
        let lulu = self.provider_status(WebhookSource::Lulu).await?;
        Ok(WebhookStatusReport { shopify, lulu })
    }

    async fn provider_status(&self, source: WebhookSource) -> Result<ProviderWebhookStatus, RegistryError> {
        let config = self.db.fetch_webhook_config(source).await?;
        let logs = self.db.fetch_logs(LogQueryFilter::for_source(source).with_limit(100)).await?;
        let health = analyze(&logs);
        Ok(ProviderWebhookStatus { configured: config.is_some(), config, health })
    }
}
