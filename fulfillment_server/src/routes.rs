//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat
//! and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current
//! thread will cause the current worker to stop processing new requests. For this reason, any
//! long, non-cpu-bound operation (e.g. I/O, database operations, etc.) must be expressed as
//! futures or asynchronous functions, so that workers keep serving other requests while the
//! operation completes.
use actix_web::{get, web, HttpResponse, Responder};
use fulfillment_engine::{
    api::{
        ingest_api::IngestApi,
        tracking_api::TrackingApi,
        tracking_objects::TrackingQueryOptions,
    },
    traits::{CommerceProvider, LogQueryFilter, PrintProvider, TrackingStore, WebhookAudit},
};
use log::*;

use crate::{config::ServerOptions, data_objects::LogQueryParams, errors::ServerError};

// Actix-web cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Tracking  ----------------------------------------------------
route!(get_tracking => Get "/tracking/{print_job_id}" impl TrackingStore, PrintProvider, CommerceProvider);
/// Read-through tracking lookup. Serves the stored record when it is fresher than the configured
/// maximum age, and re-aggregates from the providers otherwise.
pub async fn get_tracking<B, P, C>(
    path: web::Path<String>,
    api: web::Data<TrackingApi<B, P, C>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: TrackingStore,
    P: PrintProvider,
    C: CommerceProvider,
{
    let print_job_id = path.into_inner();
    debug!("📦️ GET tracking for {print_job_id}");
    let record = api.tracking(&print_job_id, options.tracking_max_age).await?;
    Ok(HttpResponse::Ok().json(record))
}

route!(refresh_tracking => Post "/tracking/{print_job_id}/refresh" impl TrackingStore, PrintProvider, CommerceProvider);
/// Forced live refresh, the explicit-correction path: unlike background recomputes, this one may
/// regress a terminal status if the providers really say so.
pub async fn refresh_tracking<B, P, C>(
    path: web::Path<String>,
    api: web::Data<TrackingApi<B, P, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: TrackingStore,
    P: PrintProvider,
    C: CommerceProvider,
{
    let print_job_id = path.into_inner();
    debug!("📦️ POST refresh for {print_job_id}");
    let record = api.force_refresh(&print_job_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

route!(list_tracking => Get "/tracking" impl TrackingStore, PrintProvider, CommerceProvider);
/// The records already in the store, without touching the providers. Pair with the refresh
/// endpoints when the dashboard flags a record as stale.
pub async fn list_tracking<B, P, C>(
    query: web::Query<TrackingQueryOptions>,
    api: web::Data<TrackingApi<B, P, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: TrackingStore,
    P: PrintProvider,
    C: CommerceProvider,
{
    let options = query.into_inner();
    trace!("📦️ GET stored tracking records page {}", options.page);
    let batch = api.stored_records(&options).await?;
    Ok(HttpResponse::Ok().json(batch))
}

route!(orders_with_tracking => Get "/orders" impl TrackingStore, PrintProvider, CommerceProvider);
pub async fn orders_with_tracking<B, P, C>(
    query: web::Query<TrackingQueryOptions>,
    api: web::Data<TrackingApi<B, P, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: TrackingStore,
    P: PrintProvider,
    C: CommerceProvider,
{
    let options = query.into_inner();
    debug!("📦️ GET orders page {} (size {})", options.page, options.size);
    let batch = api.all_orders_with_tracking(options).await?;
    Ok(HttpResponse::Ok().json(batch))
}

route!(order_statistics => Get "/orders/statistics" impl TrackingStore, PrintProvider, CommerceProvider);
pub async fn order_statistics<B, P, C>(api: web::Data<TrackingApi<B, P, C>>) -> Result<HttpResponse, ServerError>
where
    B: TrackingStore,
    P: PrintProvider,
    C: CommerceProvider,
{
    trace!("📦️ GET order statistics");
    let stats = api.statistics().await?;
    Ok(HttpResponse::Ok().json(stats))
}

//----------------------------------------------   Audit log  ----------------------------------------------------
route!(webhook_logs => Get "/webhooks/logs" impl WebhookAudit);
pub async fn webhook_logs<B>(
    query: web::Query<LogQueryParams>,
    api: web::Data<IngestApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: WebhookAudit,
{
    let params = query.into_inner();
    let mut filter = LogQueryFilter { limit: params.limit, ..Default::default() };
    if let Some(source) = &params.source {
        filter.source =
            Some(source.parse().map_err(|_| ServerError::InvalidRequestPath(format!("unknown source: {source}")))?);
    }
    if let Some(status) = &params.status {
        filter.status =
            Some(status.parse().map_err(|_| ServerError::InvalidRequestPath(format!("unknown status: {status}")))?);
    }
    let logs = api.logs(filter).await?;
    Ok(HttpResponse::Ok().json(logs))
}
