use fulfillment_engine::{api::ingest_api::RefreshTarget, SqliteDatabase, TrackingApi};
use log::*;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::integrations::{lulu::LuluPrint, shopify::ShopifyCommerce};

/// The tracking aggregator as wired in production.
pub type GatewayTrackingApi = TrackingApi<SqliteDatabase, LuluPrint, ShopifyCommerce>;

/// Handle the webhook handlers use to queue refreshes for the background worker. Sending is
/// fire-and-forget: ingestion already succeeded by the time a refresh is requested, and a lost
/// request is corrected by the next sweep.
#[derive(Clone)]
pub struct RefreshSender {
    tx: mpsc::Sender<RefreshTarget>,
}

impl RefreshSender {
    pub fn new(tx: mpsc::Sender<RefreshTarget>) -> Self {
        Self { tx }
    }

    pub async fn request(&self, target: RefreshTarget) {
        if let Err(e) = self.tx.send(target).await {
            warn!("🕰️ Refresh worker is not running; dropping refresh request. {e}");
        }
    }
}

/// Starts the refresh worker. Do not await the returned JoinHandle, as it runs until every
/// [`RefreshSender`] is dropped (or the handle is aborted). Requests queued behind a dropped
/// waiter still complete and persist: cancellation means "stop waiting", never "abort the
/// mutation".
pub fn start_refresh_worker(
    api: GatewayTrackingApi,
    mut requests: mpsc::Receiver<RefreshTarget>,
    sweep_interval: std::time::Duration,
    max_age: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(sweep_interval);
        info!("🕰️ Tracking refresh worker started");
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(RefreshTarget::PrintJob(id)) => {
                        debug!("🕰️ Webhook-triggered refresh for print job {id}");
                        if let Err(e) = api.refresh_order_tracking(&id).await {
                            warn!("🕰️ Refresh of print job {id} failed. {e}");
                        }
                    },
                    Some(RefreshTarget::CommerceOrder(id)) => {
                        debug!("🕰️ Webhook-triggered refresh for commerce order {id}");
                        if let Err(e) = api.refresh_by_order_id(&id).await {
                            warn!("🕰️ Refresh of commerce order {id} failed. {e}");
                        }
                    },
                    None => {
                        info!("🕰️ All refresh senders dropped; worker shutting down");
                        break;
                    },
                },
                _ = timer.tick() => {
                    match api.refresh_stale(max_age).await {
                        Ok(0) => trace!("🕰️ Stale sweep found nothing to refresh"),
                        Ok(n) => info!("🕰️ Stale sweep refreshed {n} tracking records"),
                        Err(e) => error!("🕰️ Stale sweep failed. {e}"),
                    }
                },
            }
        }
    })
}
