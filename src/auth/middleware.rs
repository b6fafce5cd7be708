use super::{AuthenticateResult, AuthenticationService, Principal};
use crate::error::AuthError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, warn};

/// Extension type holding the authentication result for the current request
#[derive(Clone, Debug)]
pub struct AuthExtension {
    pub result: AuthenticateResult,
}

/// Authenticate every request with the default scheme
///
/// The result is stored in request extensions; the principal is stored too
/// when authentication succeeded. Requests are never rejected here.
pub async fn authentication_middleware(
    State(service): State<AuthenticationService>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let result = if service.default_scheme().is_some() {
        service.authenticate(&parts, None).await
    } else {
        AuthenticateResult::no_result()
    };

    let mut request = Request::from_parts(parts, body);
    if let Some(principal) = result.principal() {
        request.extensions_mut().insert(principal.clone());
    }
    request.extensions_mut().insert(AuthExtension { result });

    next.run(request).await
}

/// Reject requests that did not authenticate successfully
pub async fn require_authentication(request: Request, next: Next) -> Response {
    let result = request
        .extensions()
        .get::<AuthExtension>()
        .map(|ext| ext.result.clone());

    match result {
        Some(result) if result.succeeded() => next.run(request).await,
        Some(result) => {
            debug!(
                path = %request.uri().path(),
                outcome = %result.outcome(),
                "Rejecting unauthenticated request"
            );
            rejection_response(&result)
        }
        None => {
            warn!(
                path = %request.uri().path(),
                "require_authentication ran without authentication_middleware"
            );
            AuthError::Unauthenticated.into_response()
        }
    }
}

/// 401 for failed or ignored results; lookup errors keep their own status
fn rejection_response(result: &AuthenticateResult) -> Response {
    let (status, message) = match result.failure() {
        Some(AuthError::Failed(message)) => (StatusCode::UNAUTHORIZED, message.clone()),
        Some(err) => (err.status_code(), err.to_string()),
        None => (
            StatusCode::UNAUTHORIZED,
            AuthError::Unauthenticated.to_string(),
        ),
    };

    let body = Json(json!({
        "error": message,
        "status": status.as_u16(),
    }));

    (status, body).into_response()
}

/// Extractor for the authenticated principal; rejects with 401 otherwise
#[derive(Clone, Debug)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Extractor exposing whatever result authentication produced
#[derive(Clone, Debug)]
pub struct MaybeAuthenticated(pub AuthenticateResult);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let result = parts
            .extensions
            .get::<AuthExtension>()
            .map(|ext| ext.result.clone())
            .unwrap_or_else(AuthenticateResult::no_result);
        Ok(MaybeAuthenticated(result))
    }
}
