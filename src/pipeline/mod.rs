use crate::auth::middleware::{authentication_middleware, require_authentication};
use crate::auth::AuthenticationService;
use crate::config::ServerConfig;
use crate::di::{services_middleware, ServiceProvider};
use crate::error::{AuthError, Result};
use crate::metrics::metrics_middleware;
use crate::observability::{request_id_middleware, request_span};
use axum::{middleware, Router};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Composes the standard middleware chain around a router
///
/// From the outside in: trace, timeout, request id, metrics, request
/// services, authentication, then the optional authentication requirement.
/// Authentication runs inside the services layer, so handlers can resolve
/// scoped services through `AuthenticationContext::services`.
pub struct PipelineBuilder {
    services: ServiceProvider,
    authentication: Option<AuthenticationService>,
    require_authenticated: bool,
    record_metrics: bool,
    timeout: Option<Duration>,
}

impl PipelineBuilder {
    pub fn new(services: ServiceProvider) -> Self {
        Self {
            services,
            authentication: None,
            require_authenticated: false,
            record_metrics: true,
            timeout: None,
        }
    }

    pub fn authentication(mut self, service: AuthenticationService) -> Self {
        self.authentication = Some(service);
        self
    }

    /// Reject requests that do not authenticate successfully
    pub fn require_authenticated(mut self, required: bool) -> Self {
        self.require_authenticated = required;
        self
    }

    pub fn record_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self, routes: Router) -> Router {
        let mut app = routes;

        // Layers added last run first.
        if self.require_authenticated {
            app = app.layer(middleware::from_fn(require_authentication));
        }
        if let Some(auth) = self.authentication {
            app = app.layer(middleware::from_fn_with_state(
                auth,
                authentication_middleware,
            ));
        }
        app = app.layer(middleware::from_fn_with_state(
            self.services,
            services_middleware,
        ));
        if self.record_metrics {
            app = app.layer(middleware::from_fn(metrics_middleware));
        }
        app = app.layer(middleware::from_fn(request_id_middleware));
        if let Some(timeout) = self.timeout {
            app = app.layer(TimeoutLayer::new(timeout));
        }

        app.layer(TraceLayer::new_for_http().make_span_with(request_span))
    }
}

/// Bind and serve an application
pub async fn serve(config: &ServerConfig, app: Router) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AuthError::Io)?;

    info!(address = %addr, "Server ready to accept connections");

    axum::serve(listener, app)
        .await
        .map_err(|e| AuthError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
