use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{WebhookConfig, WebhookSource},
    traits::WebhookConfigError,
};

#[derive(Debug, FromRow)]
struct ConfigRow {
    service: WebhookSource,
    config: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConfigRow {
    fn try_into_config(self) -> Result<WebhookConfig, WebhookConfigError> {
        let config = serde_json::from_str(&self.config).map_err(|e| WebhookConfigError::Encoding(e.to_string()))?;
        Ok(WebhookConfig { service: self.service, config, created_at: self.created_at, updated_at: self.updated_at })
    }
}

pub async fn upsert_config(
    service: WebhookSource,
    config: &serde_json::Value,
    conn: &mut SqliteConnection,
) -> Result<WebhookConfig, WebhookConfigError> {
    let encoded = serde_json::to_string(config).map_err(|e| WebhookConfigError::Encoding(e.to_string()))?;
    let row: ConfigRow = sqlx::query_as(
        r#"
            INSERT INTO webhook_configs (service, config, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (service) DO UPDATE SET
                config = excluded.config,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(service)
    .bind(encoded)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Webhook config for {service} saved");
    row.try_into_config()
}

pub async fn fetch_config(
    service: WebhookSource,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookConfig>, WebhookConfigError> {
    let row: Option<ConfigRow> = sqlx::query_as("SELECT * FROM webhook_configs WHERE service = $1")
        .bind(service)
        .fetch_optional(conn)
        .await?;
    row.map(ConfigRow::try_into_config).transpose()
}

pub async fn delete_config(service: WebhookSource, conn: &mut SqliteConnection) -> Result<bool, WebhookConfigError> {
    let result = sqlx::query("DELETE FROM webhook_configs WHERE service = $1").bind(service).execute(conn).await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        debug!("🗃️ Webhook config for {service} deleted");
    }
    Ok(deleted)
}
