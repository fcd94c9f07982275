use std::{net::IpAddr, str::FromStr, time::Duration};

use actix_web::{
    dev::{Server, Service},
    guard,
    http::{KeepAlive, Method},
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use fulfillment_engine::{
    api::{ingest_api::IngestApi, registry_api::RegistryApi},
    db_types::WebhookSource,
    SqliteDatabase,
    TrackingApi,
};
use futures::{future::ok, FutureExt};
use log::{info, warn};
use lulu_tools::LuluApi;
use shopify_tools::ShopifyApi;
use tokio::sync::mpsc;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{lulu::LuluPrint, shopify::ShopifyCommerce},
    metrics::WebhookMetrics,
    middleware::{HmacMiddlewareFactory, SharedSecretMiddlewareFactory},
    refresh_worker::{start_refresh_worker, RefreshSender},
    registry_routes::{
        test_webhook_endpoints,
        RegisterLuluWebhooksRoute,
        RegisterShopifyWebhooksRoute,
        UnregisterLuluWebhooksRoute,
        UnregisterShopifyWebhooksRoute,
        WebhookStatusRoute,
    },
    routes::{
        health,
        GetTrackingRoute,
        ListTrackingRoute,
        OrderStatisticsRoute,
        OrdersWithTrackingRoute,
        RefreshTrackingRoute,
        WebhookLogsRoute,
    },
    webhook_routes::{lulu_webhook, lulu_webhook_health, shopify_webhook, shopify_webhook_health},
};

/// Size of the queue between the webhook handlers and the refresh worker. Deliveries beyond this
/// backlog wait in the handler rather than piling up unboundedly.
const REFRESH_QUEUE_DEPTH: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let shopify_api =
        ShopifyApi::new(config.shopify_config.api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let lulu_api =
        LuluApi::new(config.lulu_config.api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let commerce = ShopifyCommerce::new(shopify_api);
    let print = LuluPrint::new(lulu_api);
    let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_QUEUE_DEPTH);
    let worker = start_refresh_worker(
        TrackingApi::new(db.clone(), print.clone(), commerce.clone()),
        refresh_rx,
        config.refresh_sweep_interval,
        config.tracking_max_age,
    );
    let srv = create_server_instance(config, db, print, commerce, RefreshSender::new(refresh_tx))?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    worker.abort();
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    print: LuluPrint,
    commerce: ShopifyCommerce,
    refresh: RefreshSender,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let metrics = WebhookMetrics::default();
    let srv = HttpServer::new(move || {
        let tracking_api = TrackingApi::new(db.clone(), print.clone(), commerce.clone());
        let ingest_api = IngestApi::new(db.clone());
        let registry_api = RegistryApi::new(db.clone());
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfg::access_log"))
            .app_data(web::Data::new(tracking_api))
            .app_data(web::Data::new(ingest_api))
            .app_data(web::Data::new(registry_api))
            .app_data(web::Data::new(commerce.clone()))
            .app_data(web::Data::new(print.clone()))
            .app_data(web::Data::new(refresh.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .app_data(web::Data::new(options));
        // The dashboard query surface
        let api_scope = web::scope("/api")
            .service(ListTrackingRoute::<SqliteDatabase, LuluPrint, ShopifyCommerce>::new())
            .service(GetTrackingRoute::<SqliteDatabase, LuluPrint, ShopifyCommerce>::new())
            .service(RefreshTrackingRoute::<SqliteDatabase, LuluPrint, ShopifyCommerce>::new())
            .service(OrdersWithTrackingRoute::<SqliteDatabase, LuluPrint, ShopifyCommerce>::new())
            .service(OrderStatisticsRoute::<SqliteDatabase, LuluPrint, ShopifyCommerce>::new())
            .service(WebhookLogsRoute::<SqliteDatabase>::new())
            .service(WebhookStatusRoute::<SqliteDatabase>::new())
            .service(RegisterShopifyWebhooksRoute::<SqliteDatabase>::new())
            .service(UnregisterShopifyWebhooksRoute::<SqliteDatabase>::new())
            .service(RegisterLuluWebhooksRoute::<SqliteDatabase>::new())
            .service(UnregisterLuluWebhooksRoute::<SqliteDatabase>::new())
            .service(test_webhook_endpoints);
        // Provider-facing ingestion endpoints. The health sub-paths sit outside the
        // authentication middleware so the endpoint self-test can reach them.
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let shopify_whitelist = config.shopify_config.whitelist.clone();
        let whitelist_rejections = metrics.rejection_counter(WebhookSource::Shopify);
        let shopify_scope = web::scope("/webhook/shopify")
            .wrap_fn(move |req, srv| {
                // Peer filtering applies to deliveries only; probes pass through. When no
                // whitelist is configured, HMAC validation alone authenticates the delivery.
                let whitelist = match (&shopify_whitelist, req.method()) {
                    (Some(w), &Method::POST) => w.clone(),
                    _ => return srv.call(req).boxed_local(),
                };
                let peer_ip: Option<IpAddr> = req
                    .headers()
                    .get("X-Forwarded-For")
                    .and_then(|v| use_x_forwarded_for.then(|| v.to_str().ok()).flatten())
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| IpAddr::from_str(s.trim()).ok())
                    .or_else(|| req.peer_addr().map(|a| a.ip()));
                let whitelisted = match peer_ip {
                    Some(ip) => {
                        info!("🛍️️ Webhook delivery from {ip}");
                        whitelist.contains(&ip)
                    },
                    None => {
                        warn!("🛍️️ No peer IP address found on webhook delivery, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req).boxed_local()
                } else {
                    whitelist_rejections.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    ok(req.error_response(ServerError::ForbiddenPeer)).boxed_local()
                }
            })
            .service(
                web::resource("")
                    .guard(guard::Post())
                    .wrap(HmacMiddlewareFactory::new(
                        "X-Shopify-Hmac-Sha256",
                        config.shopify_config.hmac_secret.clone(),
                        config.shopify_config.hmac_checks,
                        metrics.rejection_counter(WebhookSource::Shopify),
                    ))
                    .route(web::post().to(shopify_webhook::<SqliteDatabase>)),
            )
            .service(shopify_webhook_health);
        let lulu_scope = web::scope("/webhook/lulu")
            .service(
                web::resource("")
                    .guard(guard::Post())
                    .wrap(SharedSecretMiddlewareFactory::new(
                        config.lulu_config.webhook_secret.clone(),
                        true,
                        metrics.rejection_counter(WebhookSource::Lulu),
                    ))
                    .route(web::post().to(lulu_webhook::<SqliteDatabase>)),
            )
            .service(lulu_webhook_health);
        app.service(health).service(api_scope).service(shopify_scope).service(lulu_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
