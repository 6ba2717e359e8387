//! Logging and metrics middleware wrapping every served RPC.
//!
//! `tonic`'s synchronous `Interceptor` trait only sees the request, not the
//! response it produced, so both concerns are implemented as a `tower::Layer`
//! sitting in front of the generated service, following the same
//! `Service<Request<Body>>` shape `tonic`'s own transport uses.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{Request, Response};
use tonic::body::Body as BoxBody;
use tower::{Layer, Service};
use tracing::{error, info};

#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryLayer;

impl<S> Layer<S> for TelemetryLayer {
    type Service = TelemetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TelemetryService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryService<S> {
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for TelemetryService<S>
where
    S: Service<Request<ReqBody>, Response = Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.uri().path().to_string();
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            info!(method = %method, "request received");
            let timer = crate::metrics::RequestTimer::start(&method);

            let result = inner.call(req).await;

            match &result {
                Ok(response) => {
                    let grpc_status = response
                        .headers()
                        .get("grpc-status")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("0");
                    if grpc_status == "0" {
                        info!(method = %method, "request completed");
                        timer.success();
                    } else {
                        error!(method = %method, grpc_status, "request failed");
                        timer.failure(grpc_status);
                    }
                }
                Err(err) => {
                    error!(method = %method, error = %err, "request transport error");
                    timer.failure("transport_error");
                }
            }
            result
        })
    }
}
