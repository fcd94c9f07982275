use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewWebhookLogEntry, WebhookLogEntry},
    traits::{InsertLogResult, LogQueryFilter, WebhookAuditError},
};

const DEFAULT_FETCH_LIMIT: u32 = 100;

/// Compare-and-insert on `(source, idempotency_key)`. The unique index makes the race between two
/// concurrent deliveries of the same event a database-level conflict rather than a
/// read-then-write hazard: exactly one insert lands, the other observes the existing row.
pub async fn idempotent_insert(
    entry: NewWebhookLogEntry,
    conn: &mut SqliteConnection,
) -> Result<InsertLogResult, WebhookAuditError> {
    let inserted: Option<WebhookLogEntry> = sqlx::query_as(
        r#"
            INSERT INTO webhook_logs (source, event_type, reference_id, idempotency_key, status, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source, idempotency_key) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(entry.source)
    .bind(&entry.event_type)
    .bind(&entry.reference_id)
    .bind(&entry.idempotency_key)
    .bind(entry.status)
    .bind(&entry.error_message)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(row) => Ok(InsertLogResult::Inserted(row)),
        None => {
            let key = entry.idempotency_key.as_deref().unwrap_or_default();
            let existing: WebhookLogEntry =
                sqlx::query_as("SELECT * FROM webhook_logs WHERE source = $1 AND idempotency_key = $2")
                    .bind(entry.source)
                    .bind(key)
                    .fetch_one(conn)
                    .await?;
            Ok(InsertLogResult::Duplicate(existing))
        },
    }
}

/// Fetch audit entries, most recent first.
pub async fn fetch_logs(
    filter: LogQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<WebhookLogEntry>, WebhookAuditError> {
    let mut builder = QueryBuilder::new("SELECT * FROM webhook_logs ");
    let mut has_where = false;
    if let Some(source) = filter.source {
        builder.push("WHERE source = ");
        builder.push_bind(source);
        has_where = true;
    }
    if let Some(status) = filter.status {
        builder.push(if has_where { " AND status = " } else { "WHERE status = " });
        builder.push_bind(status);
    }
    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(filter.limit.unwrap_or(DEFAULT_FETCH_LIMIT) as i64);
    let logs = builder.build_query_as::<WebhookLogEntry>().fetch_all(conn).await?;
    Ok(logs)
}
