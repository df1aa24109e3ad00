//! Prometheus metrics HTTP server.
//!
//! Serves the exposition endpoint plus a health check. Every request the
//! server handles, including scrapes, goes through request
//! instrumentation.

use crate::metrics::MetricsCollector;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Content type of the OpenMetrics text produced by prometheus-client.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Prometheus metrics HTTP server.
pub struct MetricsServer {
    /// Bound listener.
    listener: TcpListener,
    /// Path for metrics endpoint.
    path: String,
    /// Metrics collector.
    collector: MetricsCollector,
}

impl MetricsServer {
    /// Bind the metrics server to an address.
    pub async fn bind(
        address: SocketAddr,
        path: String,
        collector: MetricsCollector,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            path,
            collector,
        })
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the metrics server until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let address = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(address = %address, path = %self.path, "metrics server started");

        let path = Arc::new(self.path);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, remote)) => {
                            let collector = self.collector.clone();
                            let path = Arc::clone(&path);

                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let collector = collector.clone();
                                    let path = Arc::clone(&path);
                                    async move {
                                        handle_request(req, &collector, &path, remote).await
                                    }
                                });

                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!(error = %e, "metrics connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept metrics connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    info!("metrics server shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle an incoming request with instrumentation around routing.
async fn handle_request<B>(
    req: Request<B>,
    collector: &MetricsCollector,
    metrics_path: &str,
    remote: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let guard = collector.begin_request(req.method().as_str(), req.uri().path(), remote);
    let response = route(req.method(), req.uri().path(), collector, metrics_path);
    guard.finish();
    Ok(response)
}

fn route(
    method: &Method,
    path: &str,
    collector: &MetricsCollector,
    metrics_path: &str,
) -> Response<Full<Bytes>> {
    // Only handle GET requests
    if method != Method::GET {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n".into());
    }

    if path == metrics_path {
        match collector.encode() {
            Ok(buffer) => {
                let mut response = text_response(StatusCode::OK, buffer.into());
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(OPENMETRICS_CONTENT_TYPE),
                );
                response
            }
            Err(e) => {
                error!(error = %e, "failed to encode metrics");
                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to encode metrics\n".into(),
                )
            }
        }
    } else if path == "/health" || path == "/healthz" {
        text_response(StatusCode::OK, "OK\n".into())
    } else if path == "/" {
        let body = format!(
            "rustplate metrics server\n\nEndpoints:\n  {metrics_path} - Prometheus metrics\n  /health - Health check\n"
        );
        text_response(StatusCode::OK, body.into())
    } else {
        text_response(StatusCode::NOT_FOUND, "Not found\n".into())
    }
}

fn text_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
