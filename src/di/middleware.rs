use super::provider::{ServiceProvider, ServiceScope};
use crate::error::AuthError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// Extension type holding the service scope of the current request
#[derive(Clone, Debug)]
pub struct RequestServices(pub Arc<ServiceScope>);

impl Deref for RequestServices {
    type Target = ServiceScope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Open one service scope per request
///
/// Everything further down the chain that resolves from `RequestServices`
/// shares the scope; it is dropped once the response has been produced and
/// the last clone is released.
pub async fn services_middleware(
    State(provider): State<ServiceProvider>,
    mut request: Request,
    next: Next,
) -> Response {
    let scope = Arc::new(provider.create_scope());
    trace!(
        scope_id = %scope.id(),
        path = %request.uri().path(),
        "Attached request service scope"
    );

    request.extensions_mut().insert(RequestServices(scope));
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestServices
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestServices>()
            .cloned()
            .ok_or(AuthError::ScopeMissing)
    }
}

/// Extractor resolving `T` from the request's service scope
#[derive(Debug)]
pub struct Inject<T>(pub Arc<T>);

impl<T> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for Inject<T>
where
    S: Send + Sync,
    T: Send + Sync + 'static,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let services = parts
            .extensions
            .get::<RequestServices>()
            .ok_or(AuthError::ScopeMissing)?;
        services.resolve::<T>().map(Inject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::ServiceCollection;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    struct Greeter {
        greeting: &'static str,
    }

    async fn greet(Inject(greeter): Inject<Greeter>) -> &'static str {
        greeter.greeting
    }

    #[tokio::test]
    async fn test_inject_resolves_from_request_scope() {
        let mut services = ServiceCollection::new();
        services.add_scoped(|_| Ok(Greeter { greeting: "hello" }));
        let provider = services.build();

        let app = Router::new()
            .route("/", get(greet))
            .layer(middleware::from_fn_with_state(provider, services_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_inject_without_scope_is_server_error() {
        let app = Router::new().route("/", get(greet));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_inject_unregistered_service_is_server_error() {
        let provider = ServiceCollection::new().build();
        let app = Router::new()
            .route("/", get(greet))
            .layer(middleware::from_fn_with_state(provider, services_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
