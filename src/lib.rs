pub mod auth;
pub mod config;
pub mod di;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod pipeline;

use crate::auth::{
    middleware::MaybeAuthenticated, AuthenticationService, AuthenticationServiceBuilder,
    ForwardedUserHandler,
};
use crate::config::AppConfig;
use crate::di::{RequestServices, ServiceCollection};
use crate::error::Result;
use crate::metrics::{metrics_handler, MetricsService};
use crate::observability::RequestId;
use crate::pipeline::PipelineBuilder;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Scheme name of the built-in forwarded-identity handler
pub const FORWARDED_SCHEME: &str = "Forwarded";

/// Build the authentication service described by the configuration
///
/// The forwarded-identity handler backs the `Forwarded` scheme; any other
/// configured scheme needs a handler supplied by the embedding application.
pub fn build_authentication(config: &AppConfig) -> Result<AuthenticationService> {
    let mut builder = AuthenticationServiceBuilder::from_config(&config.authentication);
    let declared = config
        .authentication
        .schemes
        .iter()
        .any(|s| s.enabled && s.name == FORWARDED_SCHEME);
    if declared {
        builder = builder.handler(FORWARDED_SCHEME, ForwardedUserHandler::default());
    }
    builder.build()
}

async fn whoami(
    MaybeAuthenticated(result): MaybeAuthenticated,
    services: RequestServices,
    request_id: RequestId,
) -> Json<Value> {
    Json(json!({
        "outcome": result.outcome().as_str(),
        "principal": result.principal(),
        "failure": result.failure().map(|e| e.to_string()),
        "scope_id": services.id().to_string(),
        "request_id": request_id.as_str(),
    }))
}

/// Initialize the server with the demonstration routes
pub async fn init_server(config: AppConfig) -> Result<()> {
    config.validate()?;

    info!("Starting authpipe");

    let authentication = build_authentication(&config)?;
    info!(
        schemes = ?authentication.scheme_names(),
        default = ?authentication.default_scheme(),
        "Authentication configured"
    );

    let metrics = MetricsService::new()?;
    let provider = ServiceCollection::new().build();

    let app = Router::new().route("/whoami", get(whoami));
    let app = PipelineBuilder::new(provider)
        .authentication(authentication)
        .require_authenticated(config.authentication.require_authenticated)
        .timeout(Duration::from_secs(config.server.timeout_secs))
        .build(app)
        .merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(metrics),
        );

    pipeline::serve(&config.server, app).await
}
