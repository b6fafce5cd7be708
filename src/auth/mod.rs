pub mod forwarded;
pub mod handler;
pub mod middleware;
pub mod principal;
pub mod result;
pub mod ticket;

pub use forwarded::ForwardedUserHandler;
pub use handler::{AuthenticationContext, AuthenticationHandler, AuthenticationScheme};
pub use principal::{Claim, Identity, Principal};
pub use result::{AuthenticateResult, Outcome};
pub use ticket::{AuthenticationProperties, AuthenticationTicket};

use crate::config::AuthenticationConfig;
use crate::error::{AuthError, Result};
use axum::http::request::Parts;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Authentication service that dispatches requests to registered schemes
#[derive(Clone)]
pub struct AuthenticationService {
    schemes: Arc<HashMap<String, AuthenticationScheme>>,
    default_scheme: Option<String>,
}

impl AuthenticationService {
    pub fn builder() -> AuthenticationServiceBuilder {
        AuthenticationServiceBuilder::default()
    }

    /// Run a scheme against the request head
    ///
    /// `scheme` falls back to the default scheme. Lookup problems are
    /// reported as failure results so callers always get a result back.
    pub async fn authenticate(&self, parts: &Parts, scheme: Option<&str>) -> AuthenticateResult {
        let name = match scheme.or(self.default_scheme.as_deref()) {
            Some(name) => name,
            None => {
                warn!("Authentication requested without a scheme and no default is configured");
                return AuthenticateResult::fail(AuthError::NoDefaultScheme);
            }
        };

        let registered = match self.schemes.get(name) {
            Some(s) => s,
            None => {
                warn!(scheme = %name, "Authentication scheme not registered");
                let result = AuthenticateResult::fail(AuthError::SchemeNotFound(name.to_string()));
                record_attempt(name, &result);
                return result;
            }
        };

        let ctx = AuthenticationContext::new(&registered.name, parts);
        let result = registered.handler.authenticate(&ctx).await;

        match result.failure() {
            Some(err) => debug!(scheme = %name, error = %err, "Authentication failed"),
            None => debug!(scheme = %name, outcome = %result.outcome(), "Authentication finished"),
        }
        record_attempt(name, &result);

        result
    }

    /// Try several schemes in order; the first success wins
    ///
    /// When nothing succeeds, every failure is folded into one message;
    /// if every scheme ignored the request the combined result is ignored too.
    pub async fn authenticate_any(&self, parts: &Parts, schemes: &[&str]) -> AuthenticateResult {
        let mut errors = Vec::new();

        for scheme in schemes {
            let result = self.authenticate(parts, Some(*scheme)).await;
            if result.succeeded() {
                return result;
            }
            if let Some(err) = result.failure() {
                errors.push(format!("{}: {}", scheme, err));
            }
        }

        if errors.is_empty() {
            AuthenticateResult::no_result()
        } else {
            AuthenticateResult::fail_message(errors.join("; "))
        }
    }

    pub fn default_scheme(&self) -> Option<&str> {
        self.default_scheme.as_deref()
    }

    pub fn scheme(&self, name: &str) -> Option<&AuthenticationScheme> {
        self.schemes.get(name)
    }

    pub fn scheme_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check if any scheme is registered
    pub fn is_available(&self) -> bool {
        !self.schemes.is_empty()
    }
}

fn record_attempt(scheme: &str, result: &AuthenticateResult) {
    counter!(
        "authpipe_auth_attempts_total",
        "scheme" => scheme.to_string(),
        "outcome" => result.outcome().as_str()
    )
    .increment(1);
}

/// Builder for `AuthenticationService`
#[derive(Default)]
pub struct AuthenticationServiceBuilder {
    schemes: Vec<AuthenticationScheme>,
    default_scheme: Option<String>,
    display_names: HashMap<String, String>,
    required: Vec<String>,
}

impl AuthenticationServiceBuilder {
    /// Seed the builder from configuration
    ///
    /// Every enabled scheme listed in the configuration must later receive a
    /// handler, otherwise `build` fails.
    pub fn from_config(config: &AuthenticationConfig) -> Self {
        let mut builder = Self {
            default_scheme: config.default_scheme.clone(),
            ..Self::default()
        };

        for scheme in config.schemes.iter().filter(|s| s.enabled) {
            if let Some(display) = &scheme.display_name {
                builder
                    .display_names
                    .insert(scheme.name.clone(), display.clone());
            }
            builder.required.push(scheme.name.clone());
        }

        builder
    }

    pub fn add_scheme(mut self, scheme: AuthenticationScheme) -> Self {
        self.schemes.push(scheme);
        self
    }

    pub fn handler(
        self,
        name: impl Into<String>,
        handler: impl AuthenticationHandler + 'static,
    ) -> Self {
        self.add_scheme(AuthenticationScheme::new(name, handler))
    }

    pub fn default_scheme(mut self, name: impl Into<String>) -> Self {
        self.default_scheme = Some(name.into());
        self
    }

    pub fn build(self) -> Result<AuthenticationService> {
        let mut schemes = HashMap::with_capacity(self.schemes.len());

        for mut scheme in self.schemes {
            if scheme.name.is_empty() {
                return Err(AuthError::Config(
                    "Authentication scheme name cannot be empty".to_string(),
                ));
            }
            if scheme.display_name.is_none() {
                scheme.display_name = self.display_names.get(&scheme.name).cloned();
            }
            if schemes.contains_key(&scheme.name) {
                return Err(AuthError::Config(format!(
                    "Authentication scheme registered twice: {}",
                    scheme.name
                )));
            }
            schemes.insert(scheme.name.clone(), scheme);
        }

        for name in &self.required {
            if !schemes.contains_key(name) {
                return Err(AuthError::Config(format!(
                    "No handler registered for configured scheme: {}",
                    name
                )));
            }
        }

        if let Some(default) = &self.default_scheme {
            if !schemes.contains_key(default) {
                return Err(AuthError::Config(format!(
                    "Default scheme is not registered: {}",
                    default
                )));
            }
        }

        Ok(AuthenticationService {
            schemes: Arc::new(schemes),
            default_scheme: self.default_scheme,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemeConfig;
    use async_trait::async_trait;
    use axum::http::Request;

    /// Trusts an `X-User` header; stands in for a real scheme
    struct HeaderUser;

    #[async_trait]
    impl AuthenticationHandler for HeaderUser {
        async fn authenticate(&self, ctx: &AuthenticationContext<'_>) -> AuthenticateResult {
            match ctx.header("x-user") {
                Some("") => AuthenticateResult::fail_message("empty user"),
                Some(user) => {
                    let identity =
                        Identity::new(ctx.scheme()).with_claim(principal::NAME_CLAIM, user);
                    AuthenticateResult::success(AuthenticationTicket::new(
                        Principal::new(identity),
                        ctx.scheme(),
                    ))
                }
                None => AuthenticateResult::no_result(),
            }
        }
    }

    struct AlwaysFail(&'static str);

    #[async_trait]
    impl AuthenticationHandler for AlwaysFail {
        async fn authenticate(&self, _ctx: &AuthenticationContext<'_>) -> AuthenticateResult {
            AuthenticateResult::fail_message(self.0)
        }
    }

    fn parts(user: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(user) = user {
            builder = builder.header("X-User", user);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_default_scheme_dispatch() {
        let service = AuthenticationService::builder()
            .handler("Header", HeaderUser)
            .default_scheme("Header")
            .build()
            .unwrap();

        let result = service.authenticate(&parts(Some("carol")), None).await;
        assert!(result.succeeded());
        let ticket = result.ticket().unwrap();
        assert_eq!(ticket.authentication_scheme, "Header");
        assert_eq!(ticket.principal.name(), Some("carol"));

        assert!(service.authenticate(&parts(None), None).await.none());
        assert!(service
            .authenticate(&parts(Some("")), None)
            .await
            .is_failure());
    }

    #[tokio::test]
    async fn test_unknown_and_missing_scheme() {
        let service = AuthenticationService::builder()
            .handler("Header", HeaderUser)
            .build()
            .unwrap();

        let result = service.authenticate(&parts(None), None).await;
        assert!(matches!(result.failure(), Some(AuthError::NoDefaultScheme)));

        let result = service.authenticate(&parts(None), Some("Cookie")).await;
        assert!(matches!(
            result.failure(),
            Some(AuthError::SchemeNotFound(name)) if name == "Cookie"
        ));
    }

    #[tokio::test]
    async fn test_authenticate_any() {
        let service = AuthenticationService::builder()
            .handler("Broken", AlwaysFail("upstream down"))
            .handler("Header", HeaderUser)
            .build()
            .unwrap();

        let result = service
            .authenticate_any(&parts(Some("dave")), &["Broken", "Header"])
            .await;
        assert!(result.succeeded());

        let result = service
            .authenticate_any(&parts(None), &["Broken", "Header"])
            .await;
        assert_eq!(
            result.failure().map(|e| e.to_string()),
            Some("Broken: upstream down".to_string())
        );

        let result = service.authenticate_any(&parts(None), &["Header"]).await;
        assert!(result.none());
    }

    #[test]
    fn test_attempts_counted_by_scheme_and_outcome() {
        let service = AuthenticationService::builder()
            .handler("Header", HeaderUser)
            .default_scheme("Header")
            .build()
            .unwrap();
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            futures::executor::block_on(async {
                service.authenticate(&parts(Some("erin")), None).await;
                service.authenticate(&parts(None), Some("Missing")).await;
            })
        });

        let rendered = handle.render();
        let counted = |scheme: &str, outcome: &str| {
            rendered.lines().any(|l| {
                l.starts_with("authpipe_auth_attempts_total")
                    && l.contains(&format!("scheme=\"{}\"", scheme))
                    && l.contains(&format!("outcome=\"{}\"", outcome))
                    && l.ends_with(" 1")
            })
        };
        assert!(counted("Header", "success"));
        assert!(counted("Missing", "failure"));
        assert!(!counted("Header", "failure"));
    }

    #[test]
    fn test_builder_rejects_bad_registrations() {
        let duplicate = AuthenticationService::builder()
            .handler("Header", HeaderUser)
            .handler("Header", HeaderUser)
            .build();
        assert!(matches!(duplicate, Err(AuthError::Config(_))));

        let unknown_default = AuthenticationService::builder()
            .handler("Header", HeaderUser)
            .default_scheme("Cookie")
            .build();
        assert!(unknown_default.is_err());

        let empty = AuthenticationService::builder().build().unwrap();
        assert!(!empty.is_available());
    }

    #[test]
    fn test_builder_from_config() {
        let config = AuthenticationConfig {
            default_scheme: Some("Header".to_string()),
            require_authenticated: false,
            schemes: vec![
                SchemeConfig {
                    name: "Header".to_string(),
                    display_name: Some("Trusted header".to_string()),
                    enabled: true,
                },
                SchemeConfig {
                    name: "Legacy".to_string(),
                    display_name: None,
                    enabled: false,
                },
            ],
        };

        let service = AuthenticationServiceBuilder::from_config(&config)
            .handler("Header", HeaderUser)
            .build()
            .unwrap();
        assert_eq!(service.default_scheme(), Some("Header"));
        assert_eq!(service.scheme_names(), vec!["Header"]);
        assert_eq!(
            service.scheme("Header").and_then(|s| s.display_name.as_deref()),
            Some("Trusted header")
        );

        let missing = AuthenticationServiceBuilder::from_config(&config).build();
        assert!(missing.is_err());
    }
}
