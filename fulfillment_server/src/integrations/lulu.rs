use fulfillment_engine::{
    api::ingest_api::{IncomingEvent, RefreshTarget},
    db_types::{OrderLineItem, ShippingAddress, WebhookSource},
    traits::{
        PrintJobDetails,
        PrintJobPage,
        PrintJobState,
        PrintProvider,
        ProviderError,
        ShipmentTracking,
        SubscriptionInfo,
    },
};
use lulu_tools::{data_objects::LuluAddress, LuluApi, LuluApiError, LuluWebhookEvent, PrintJob};

use super::parse_provider_date;

/// [`PrintProvider`] implementation backed by the Lulu print API.
#[derive(Clone)]
pub struct LuluPrint {
    api: LuluApi,
}

impl LuluPrint {
    pub fn new(api: LuluApi) -> Self {
        Self { api }
    }
}

fn to_provider_error(e: LuluApiError) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(WebhookSource::Lulu, e.to_string())
    } else {
        ProviderError::new(WebhookSource::Lulu, e.status_code(), e.to_string())
    }
}

fn parse_job_id(print_job_id: &str) -> Result<u64, ProviderError> {
    print_job_id.parse::<u64>().map_err(|_| {
        ProviderError::new(WebhookSource::Lulu, None, format!("invalid print job id: {print_job_id}"))
    })
}

fn address_from_lulu(address: &LuluAddress) -> ShippingAddress {
    ShippingAddress {
        name: address.name.clone(),
        street1: address.street1.clone(),
        street2: address.street2.clone(),
        city: address.city.clone(),
        state_code: address.state_code.clone().unwrap_or_default(),
        postcode: address.postcode.clone(),
        country_code: address.country_code.clone(),
    }
}

pub fn details_from_print_job(job: &PrintJob) -> PrintJobDetails {
    let line_items = job
        .line_items
        .iter()
        .map(|li| OrderLineItem { title: li.title.clone(), quantity: li.quantity.unwrap_or(1) })
        .collect::<Vec<_>>();
    PrintJobDetails {
        print_job_id: job.id.to_string(),
        external_order_id: job.external_id.clone(),
        raw_status: job.status.name.clone(),
        title: job.line_items.first().map(|li| li.title.clone()),
        line_items,
        shipping_address: job.shipping_address.as_ref().map(address_from_lulu),
        created_at: job.date_created.as_deref().and_then(parse_provider_date),
    }
}

/// Build the engine-facing event for one webhook delivery. The idempotency key combines the job
/// id, topic and the payload's modification stamp (falling back to the status-change stamp), so
/// redeliveries collapse while subsequent status changes do not.
pub fn incoming_event_from_lulu(event: &LuluWebhookEvent) -> IncomingEvent {
    let reference_id = event.data.id.to_string();
    let stamp = event
        .data
        .date_modified
        .clone()
        .or_else(|| event.data.status.changed_at.clone())
        .unwrap_or_else(|| event.data.status.name.clone());
    let idempotency_key = format!("{reference_id}:{}:{stamp}", event.topic);
    let refresh =
        (event.topic == "print_job.status_changed").then(|| RefreshTarget::PrintJob(reference_id.clone()));
    IncomingEvent {
        source: WebhookSource::Lulu,
        event_type: event.topic.clone(),
        reference_id,
        idempotency_key,
        refresh,
    }
}

impl PrintProvider for LuluPrint {
    async fn print_job(&self, print_job_id: &str) -> Result<PrintJobDetails, ProviderError> {
        let id = parse_job_id(print_job_id)?;
        let job = self.api.print_job(id).await.map_err(to_provider_error)?;
        Ok(details_from_print_job(&job))
    }

    async fn print_job_status(&self, print_job_id: &str) -> Result<PrintJobState, ProviderError> {
        let id = parse_job_id(print_job_id)?;
        let status = self.api.print_job_status(id).await.map_err(to_provider_error)?;
        Ok(PrintJobState {
            raw_status: status.name,
            message: status.message,
            changed_at: status.changed_at.as_deref().and_then(parse_provider_date),
        })
    }

    async fn print_job_tracking(&self, print_job_id: &str) -> Result<ShipmentTracking, ProviderError> {
        let id = parse_job_id(print_job_id)?;
        let tracking = self.api.print_job_tracking(id).await.map_err(to_provider_error)?;
        Ok(ShipmentTracking {
            tracking_number: tracking.tracking_id,
            carrier: tracking.carrier_name,
            tracking_urls: tracking.tracking_urls,
            estimated_delivery: tracking.estimated_delivery_date.as_deref().and_then(parse_provider_date),
        })
    }

    async fn list_print_jobs(
        &self,
        page: u32,
        page_size: u32,
        status: Option<&str>,
    ) -> Result<PrintJobPage, ProviderError> {
        let list = self.api.print_jobs(page, page_size, status).await.map_err(to_provider_error)?;
        Ok(PrintJobPage {
            total: list.count,
            page,
            page_size,
            job_ids: list.results.iter().map(|job| job.id.to_string()).collect(),
        })
    }

    async fn install_webhook(&self, url: &str, topics: &[&'static str]) -> Result<SubscriptionInfo, ProviderError> {
        let webhook = self.api.install_webhook(url, topics).await.map_err(to_provider_error)?;
        Ok(SubscriptionInfo { id: webhook.id, topic: webhook.topics.join(","), address: webhook.url })
    }

    async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError> {
        self.api.remove_webhook(subscription_id).await.map_err(to_provider_error)
    }
}

#[cfg(test)]
mod test {
    use lulu_tools::{
        data_objects::{PrintJobStatusPayload, PrintLineItem},
        LuluWebhookEvent,
        PrintJob,
        PrintJobStatus,
    };

    use super::{details_from_print_job, incoming_event_from_lulu};
    use fulfillment_engine::api::ingest_api::RefreshTarget;

    #[test]
    fn details_carry_the_external_order_reference() {
        let job = PrintJob {
            id: 81000,
            external_id: Some("450789469".to_string()),
            status: PrintJobStatus { name: "IN_PRODUCTION".to_string(), message: None, changed_at: None },
            line_items: vec![PrintLineItem {
                id: 1,
                title: "The Dragon Who Lost Her Roar".to_string(),
                quantity: Some(1),
                ..Default::default()
            }],
            shipping_address: None,
            estimated_shipping_dates: None,
            date_created: Some("2024-05-01T09:00:00Z".to_string()),
            date_modified: None,
        };
        let details = details_from_print_job(&job);
        assert_eq!(details.print_job_id, "81000");
        assert_eq!(details.external_order_id.as_deref(), Some("450789469"));
        assert_eq!(details.raw_status, "IN_PRODUCTION");
        assert_eq!(details.title.as_deref(), Some("The Dragon Who Lost Her Roar"));
    }

    #[test]
    fn status_change_events_request_a_refresh() {
        let event = LuluWebhookEvent {
            topic: "print_job.status_changed".to_string(),
            data: PrintJobStatusPayload {
                id: 81000,
                external_id: None,
                status: PrintJobStatus { name: "SHIPPED".to_string(), message: None, changed_at: None },
                tracking_id: Some("1Z999".to_string()),
                carrier_name: Some("UPS".to_string()),
                estimated_delivery_date: None,
                date_modified: Some("2024-05-03T15:00:00Z".to_string()),
            },
        };
        let incoming = incoming_event_from_lulu(&event);
        assert_eq!(incoming.reference_id, "81000");
        assert_eq!(incoming.idempotency_key, "81000:print_job.status_changed:2024-05-03T15:00:00Z");
        assert_eq!(incoming.refresh, Some(RefreshTarget::PrintJob("81000".to_string())));
    }
}
