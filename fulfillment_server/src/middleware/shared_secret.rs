//! Bearer shared-secret middleware.
//!
//! Lulu authenticates its webhook deliveries with a pre-shared secret presented as a bearer
//! token. This middleware rejects deliveries whose `Authorization` header does not carry it.
//! Like the HMAC middleware, rejections bypass the audit log and only bump the rejection counter.

use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use sfg_common::Secret;

pub struct SharedSecretMiddlewareFactory {
    key: Secret<String>,
    enabled: bool,
    rejections: Arc<AtomicU64>,
}

impl SharedSecretMiddlewareFactory {
    pub fn new(key: Secret<String>, enabled: bool, rejections: Arc<AtomicU64>) -> Self {
        SharedSecretMiddlewareFactory { key, enabled, rejections }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SharedSecretMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SharedSecretMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SharedSecretMiddlewareService {
            key: self.key.clone(),
            enabled: self.enabled,
            rejections: Arc::clone(&self.rejections),
            service: Rc::new(service),
        }))
    }
}

pub struct SharedSecretMiddlewareService<S> {
    key: Secret<String>,
    enabled: bool,
    rejections: Arc<AtomicU64>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SharedSecretMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = format!("Bearer {}", self.key.reveal());
        let enabled = self.enabled;
        let rejections = Arc::clone(&self.rejections);
        Box::pin(async move {
            trace!("🔐️ Checking shared secret for request");
            if !enabled {
                trace!("🔐️ Shared-secret checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let presented = req.headers().get("Authorization").and_then(|v| v.to_str().ok());
            match presented {
                Some(header) if header == expected => {
                    trace!("🔐️ Shared secret check for request ✅️");
                    service.call(req).await
                },
                Some(_) => {
                    warn!("🔐️ Invalid shared secret in request. Denying access.");
                    rejections.fetch_add(1, Ordering::Relaxed);
                    Err(ErrorUnauthorized("Invalid authorization."))
                },
                None => {
                    warn!("🔐️ No authorization header in request. Denying access.");
                    rejections.fetch_add(1, Ordering::Relaxed);
                    Err(ErrorUnauthorized("No authorization header."))
                },
            }
        })
    }
}
