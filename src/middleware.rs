//! Request logging middleware for HTTP request/response tracking.
//!
//! Every request gets a UUID and one structured line on completion with
//! method, path, status and duration. Status decides the level; requests over
//! [`SLOW_REQUEST_MS`] get an extra warning, which matters here because a
//! detection can walk many provider candidates.

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use futures::future::{Ready, ok};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use uuid::Uuid;

/// Threshold for the slow-request warning.
pub const SLOW_REQUEST_MS: u128 = 2000;

#[derive(Clone, Default)]
pub struct RequestLoggingMiddleware;

impl RequestLoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLoggingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggingService { service })
    }
}

pub struct RequestLoggingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();

        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        let content_length = req
            .headers()
            .get("content-length")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        tracing::debug!(
            request.id = %request_id,
            request.method = %method,
            request.path = %path,
            request.remote_addr = %remote_addr,
            request.content_length = content_length,
            "request received"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let duration_ms = start_time.elapsed().as_millis();
            let status_code = response.status().as_u16();

            match status_code {
                500..=599 => tracing::error!(
                    request.id = %request_id,
                    request.method = %method,
                    request.path = %path,
                    response.status = status_code,
                    response.duration_ms = duration_ms as u64,
                    "request failed"
                ),
                400..=499 => tracing::warn!(
                    request.id = %request_id,
                    request.method = %method,
                    request.path = %path,
                    response.status = status_code,
                    response.duration_ms = duration_ms as u64,
                    "request rejected"
                ),
                _ => tracing::info!(
                    request.id = %request_id,
                    request.method = %method,
                    request.path = %path,
                    response.status = status_code,
                    response.duration_ms = duration_ms as u64,
                    "request completed"
                ),
            }

            if duration_ms > SLOW_REQUEST_MS {
                tracing::warn!(
                    request.id = %request_id,
                    request.path = %path,
                    response.duration_ms = duration_ms as u64,
                    threshold_ms = SLOW_REQUEST_MS as u64,
                    "slow request"
                );
            }

            Ok(response)
        })
    }
}
