use crate::di::Container;
use crate::error::Result;
use crate::exception::{ExceptionFilter, PendingFailure};
use axum::{http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer rendering reported failures with an [`ExceptionFilter`]
///
/// Handlers return `Err(Failure)`; the failure travels in the response
/// extensions and is replaced here by the filter's response. Responses
/// without a failure pass through untouched.
#[derive(Clone)]
pub struct ExceptionLayer {
    filter: Arc<dyn ExceptionFilter>,
}

impl ExceptionLayer {
    pub fn new(filter: Arc<dyn ExceptionFilter>) -> Self {
        Self { filter }
    }

    /// Use the filter registered as `dyn ExceptionFilter`
    pub fn from_container(container: &Container) -> Result<Self> {
        Ok(Self::new(container.resolve_trait::<dyn ExceptionFilter>()?))
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = ExceptionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionMiddleware {
            inner,
            filter: Arc::clone(&self.filter),
        }
    }
}

#[derive(Clone)]
pub struct ExceptionMiddleware<S> {
    inner: S,
    filter: Arc<dyn ExceptionFilter>,
}

impl<S, B> Service<Request<B>> for ExceptionMiddleware<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let filter = Arc::clone(&self.filter);
        // The clone is not ready; keep it and call the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let method = request.method().clone();
        let uri = request.uri().clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            let Some(PendingFailure(failure)) = response.extensions_mut().remove::<PendingFailure>()
            else {
                return Ok(response);
            };

            let span = tracing::error_span!("exception", %method, %uri);
            Ok(span.in_scope(|| filter.catch(&failure)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{Failure, GlobalExceptionHandler};
    use crate::{StarterError, traced};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;
    use tower::ServiceExt;

    #[derive(Debug, Error, crate::Exception)]
    #[response_status(NOT_FOUND)]
    #[error("order {0} not found")]
    struct OrderNotFound(u64);

    async fn find_order() -> std::result::Result<String, Failure> {
        Err(traced!(OrderNotFound(7)).into())
    }

    async fn broken() -> std::result::Result<String, Failure> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn healthy() -> &'static str {
        "ok"
    }

    fn app(filter: Arc<dyn ExceptionFilter>) -> Router {
        Router::new()
            .route("/orders", get(find_order))
            .route("/broken", get(broken))
            .route("/health", get(healthy))
            .layer(ExceptionLayer::new(filter))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_failure_rendered_by_global_handler() {
        let (status, body) = call(app(Arc::new(GlobalExceptionHandler::default())), "/orders").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["message"], "order 7 not found");
        assert!(json["classPath"].as_str().unwrap().contains("find_order"));
        assert_eq!(json["originalMessage"], Value::Null);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unexpected_error_is_internal_server_error() {
        let (status, body) = call(app(Arc::new(GlobalExceptionHandler::default())), "/broken").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal Server Error");
        assert_eq!(json["message"], "connection refused");
        assert_eq!(json["classPath"], "Unknown");
    }

    #[tokio::test]
    async fn test_successful_response_passes_through() {
        let (status, body) = call(app(Arc::new(GlobalExceptionHandler::default())), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[derive(Default)]
    struct CountingFilter {
        caught: AtomicUsize,
    }

    impl ExceptionFilter for CountingFilter {
        fn catch(&self, _failure: &Failure) -> Response {
            self.caught.fetch_add(1, Ordering::SeqCst);
            (StatusCode::IM_A_TEAPOT, "custom").into_response()
        }
    }

    #[tokio::test]
    async fn test_custom_filter_is_used() {
        let filter = Arc::new(CountingFilter::default());
        let (status, body) = call(app(filter.clone()), "/orders").await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body, b"custom");
        assert_eq!(filter.caught.load(Ordering::SeqCst), 1);

        call(app(filter.clone()), "/health").await;
        assert_eq!(filter.caught.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_container_requires_filter() {
        let result = ExceptionLayer::from_container(&Container::new());
        assert!(matches!(result, Err(StarterError::DependencyNotFound { .. })));
    }
}
