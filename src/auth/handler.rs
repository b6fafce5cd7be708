use super::result::AuthenticateResult;
use crate::di::RequestServices;
use async_trait::async_trait;
use axum::http::{request::Parts, Extensions, HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;

/// What a handler gets to look at while authenticating a request
#[derive(Clone, Copy)]
pub struct AuthenticationContext<'a> {
    scheme: &'a str,
    parts: &'a Parts,
}

impl<'a> AuthenticationContext<'a> {
    pub fn new(scheme: &'a str, parts: &'a Parts) -> Self {
        Self { scheme, parts }
    }

    /// Name of the scheme being run
    pub fn scheme(&self) -> &'a str {
        self.scheme
    }

    pub fn headers(&self) -> &'a HeaderMap {
        &self.parts.headers
    }

    pub fn method(&self) -> &'a Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &'a Uri {
        &self.parts.uri
    }

    pub fn extensions(&self) -> &'a Extensions {
        &self.parts.extensions
    }

    /// Service scope of the request, when a services layer runs before authentication
    pub fn services(&self) -> Option<&'a RequestServices> {
        self.parts.extensions.get::<RequestServices>()
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Produces an `AuthenticateResult` for one scheme
///
/// Implementations decide what their scheme means; a handler that finds
/// nothing it recognizes should return `AuthenticateResult::no_result()`
/// rather than a failure.
#[async_trait]
pub trait AuthenticationHandler: Send + Sync {
    async fn authenticate(&self, ctx: &AuthenticationContext<'_>) -> AuthenticateResult;
}

#[async_trait]
impl<H> AuthenticationHandler for Arc<H>
where
    H: AuthenticationHandler + ?Sized,
{
    async fn authenticate(&self, ctx: &AuthenticationContext<'_>) -> AuthenticateResult {
        (**self).authenticate(ctx).await
    }
}

/// A named handler registration
#[derive(Clone)]
pub struct AuthenticationScheme {
    pub name: String,
    pub display_name: Option<String>,
    pub handler: Arc<dyn AuthenticationHandler>,
}

impl AuthenticationScheme {
    pub fn new(name: impl Into<String>, handler: impl AuthenticationHandler + 'static) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

impl fmt::Debug for AuthenticationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationScheme")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}
