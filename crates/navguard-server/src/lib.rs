#![warn(missing_docs)]

//! # navguard-server
//!
//! HTTP front end for the navguard sanitizer.
//!
//! Exposes a single operation:
//! - `POST /sanitize` with `{"code": "<javascript>"}` returns
//!   `{"code": "<sanitized javascript>"}`
//!
//! Malformed bodies and non-string `code` fields are rejected here with
//! `400` before the sanitizer runs. Every other route is `404`, except
//! `GET /metrics` when metrics exposure is enabled.

pub mod audit;
pub mod error;
pub mod metrics;

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::HttpBody;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, StatusCode};
use navguard_sanitizer::Sanitizer;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEntryBuilder, AuditLogger, TracingAuditLogger};
pub use crate::error::{RequestError, ServerError};
use crate::metrics::SanitizerMetrics;

/// Default listen address; matches the port the service has always used.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request body of `POST /sanitize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeRequest {
    /// JavaScript source to sanitize.
    pub code: String,
}

/// Response body of `POST /sanitize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeResponse {
    /// Sanitized JavaScript, or the fail-safe value.
    pub code: String,
}

/// Limits and switches for the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Serve `GET /metrics`.
    pub expose_metrics: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            expose_metrics: false,
        }
    }
}

/// Request handler shared by every connection.
#[derive(Clone)]
pub struct SanitizeService {
    sanitizer: Arc<Sanitizer>,
    config: ServiceConfig,
    metrics: Arc<SanitizerMetrics>,
    audit_logger: Arc<dyn AuditLogger>,
}

impl SanitizeService {
    /// Create a service that audits through `tracing`.
    pub fn new(sanitizer: Sanitizer, config: ServiceConfig) -> Self {
        Self {
            sanitizer: Arc::new(sanitizer),
            config,
            metrics: Arc::new(SanitizerMetrics::new()),
            audit_logger: Arc::new(TracingAuditLogger),
        }
    }

    /// Replace the audit backend.
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = logger;
        self
    }

    /// Metrics recorded by this service.
    pub fn metrics(&self) -> &Arc<SanitizerMetrics> {
        &self.metrics
    }

    /// Route and answer one request. Never fails; errors become responses.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match (&method, path.as_str()) {
            (&Method::POST, "/sanitize") => match self.sanitize_request(req).await {
                Ok(code) => json_response(StatusCode::OK, &SanitizeResponse { code }),
                Err(err) => {
                    let label = if err.status().is_server_error() {
                        "error"
                    } else {
                        "bad_request"
                    };
                    self.metrics.record_request(label);
                    tracing::debug!(error = %err, code = err.code(), "sanitize request rejected");
                    json_response(err.status(), &err.to_json())
                }
            },
            (&Method::GET, "/metrics") if self.config.expose_metrics => self.metrics_response(),
            _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
        };

        tracing::debug!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            "request handled"
        );
        response
    }

    async fn sanitize_request(&self, req: Request<Body>) -> Result<String, RequestError> {
        let body = read_body(req.into_body(), self.config.max_body_bytes).await?;
        // Two steps so malformed JSON and a missing or non-string `code`
        // get different messages.
        let json: serde_json::Value =
            serde_json::from_slice(&body).map_err(|_| RequestError::InvalidJson)?;
        let SanitizeRequest { code } =
            serde_json::from_value(json).map_err(|_| RequestError::CodeNotString)?;

        let audit = AuditEntryBuilder::new(&code);
        let sanitizer = Arc::clone(&self.sanitizer);
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || sanitizer.sanitize(&code))
            .await
            .map_err(|e| {
                tracing::error!(request_id = %audit.request_id(), error = %e, "sanitizer task failed");
                RequestError::Internal
            })?;

        self.metrics.record_sanitize(
            result.outcome.label(),
            result.outcome.removed(),
            start.elapsed().as_secs_f64(),
        );
        self.audit_logger.log(&audit.finish(&result)).await;

        Ok(result.code)
    }

    fn metrics_response(&self) -> Response<Body> {
        match self.metrics.encode() {
            Ok(text) => {
                let mut response = Response::new(Body::from(text));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
                );
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode metrics");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    /// Bind `addr` and return the bound address plus the future that serves
    /// connections until `shutdown` resolves.
    pub fn bind<F>(
        self,
        addr: SocketAddr,
        shutdown: F,
    ) -> Result<(SocketAddr, impl Future<Output = Result<(), ServerError>>), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let service = self;
        let make_svc = make_service_fn(move |_conn: &AddrStream| {
            let service = service.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let service = service.clone();
                    async move { Ok::<_, Infallible>(service.handle(req).await) }
                }))
            }
        });

        let server = hyper::Server::try_bind(&addr)?.serve(make_svc);
        let local_addr = server.local_addr();
        tracing::info!(addr = %local_addr, "navguard listening");

        let serving = async move {
            server.with_graceful_shutdown(shutdown).await?;
            tracing::info!("navguard stopped");
            Ok(())
        };
        Ok((local_addr, serving))
    }
}

/// Read the body, failing as soon as it grows past `max` bytes.
async fn read_body(mut body: Body, max: usize) -> Result<Vec<u8>, RequestError> {
    if body.size_hint().lower() > max as u64 {
        return Err(RequestError::BodyTooLarge { max });
    }
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > max {
            return Err(RequestError::BodyTooLarge { max });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(text));
    *response.status_mut() = status;
    response
}
