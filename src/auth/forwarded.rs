use super::principal::{Claim, Identity, Principal, NAME_CLAIM, ROLE_CLAIM};
use super::{AuthenticateResult, AuthenticationContext, AuthenticationHandler, AuthenticationTicket};
use async_trait::async_trait;

pub const DEFAULT_USER_HEADER: &str = "x-forwarded-user";
pub const DEFAULT_ROLES_HEADER: &str = "x-forwarded-roles";

/// Builds a principal from identity headers set by a trusted upstream proxy
///
/// Nothing is verified here: the proxy in front of the application is
/// expected to have authenticated the caller and to strip these headers from
/// client input. A request without the user header is ignored.
#[derive(Debug, Clone)]
pub struct ForwardedUserHandler {
    user_header: String,
    roles_header: String,
}

impl Default for ForwardedUserHandler {
    fn default() -> Self {
        Self::new(DEFAULT_USER_HEADER, DEFAULT_ROLES_HEADER)
    }
}

impl ForwardedUserHandler {
    pub fn new(user_header: impl Into<String>, roles_header: impl Into<String>) -> Self {
        Self {
            user_header: user_header.into(),
            roles_header: roles_header.into(),
        }
    }
}

#[async_trait]
impl AuthenticationHandler for ForwardedUserHandler {
    async fn authenticate(&self, ctx: &AuthenticationContext<'_>) -> AuthenticateResult {
        let user = match ctx.header(&self.user_header) {
            Some(user) => user.trim(),
            None => return AuthenticateResult::no_result(),
        };

        if user.is_empty() {
            return AuthenticateResult::fail_message(format!(
                "Header {} is present but empty",
                self.user_header
            ));
        }

        let mut identity = Identity::new(ctx.scheme());
        identity.add_claim(Claim::new(NAME_CLAIM, user).with_issuer(ctx.scheme()));

        if let Some(roles) = ctx.header(&self.roles_header) {
            for role in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                identity.add_claim(Claim::new(ROLE_CLAIM, role).with_issuer(ctx.scheme()));
            }
        }

        AuthenticateResult::success(AuthenticationTicket::new(
            Principal::new(identity),
            ctx.scheme(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{request::Parts, Request};

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_user_and_roles_become_claims() {
        let parts = parts(&[
            ("X-Forwarded-User", "ivy"),
            ("X-Forwarded-Roles", "admin, editor,,"),
        ]);
        let ctx = AuthenticationContext::new("Forwarded", &parts);

        let result = ForwardedUserHandler::default().authenticate(&ctx).await;
        let principal = result.principal().unwrap();
        assert_eq!(principal.name(), Some("ivy"));
        assert!(principal.is_in_role("admin"));
        assert!(principal.is_in_role("editor"));
        assert_eq!(principal.identity().unwrap().claims.len(), 3);
        assert_eq!(result.ticket().unwrap().authentication_scheme, "Forwarded");
    }

    #[tokio::test]
    async fn test_missing_header_is_ignored() {
        let parts = parts(&[]);
        let ctx = AuthenticationContext::new("Forwarded", &parts);
        assert!(ForwardedUserHandler::default().authenticate(&ctx).await.none());
    }

    #[tokio::test]
    async fn test_empty_header_fails() {
        let parts = parts(&[("X-Remote-User", "  ")]);
        let ctx = AuthenticationContext::new("Forwarded", &parts);
        let handler = ForwardedUserHandler::new("x-remote-user", "x-remote-roles");

        let result = handler.authenticate(&ctx).await;
        assert!(result.is_failure());
        assert_eq!(
            result.failure().unwrap().to_string(),
            "Header x-remote-user is present but empty"
        );
    }
}
