use super::principal::Principal;
use super::ticket::{AuthenticationProperties, AuthenticationTicket};
use crate::error::AuthError;
use std::fmt;
use std::sync::Arc;

/// Which of the three outcomes an `AuthenticateResult` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
    NoResult,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::NoResult => "no_result",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum State {
    Success(AuthenticationTicket),
    Failure {
        error: Arc<AuthError>,
        properties: Option<AuthenticationProperties>,
    },
    NoResult,
}

/// Outcome of an authentication attempt
///
/// Holds exactly one of a ticket, a failure, or nothing at all (the scheme
/// did not apply to the request). Only the named constructors build one.
#[derive(Debug, Clone)]
pub struct AuthenticateResult {
    state: State,
}

impl AuthenticateResult {
    /// Authentication succeeded with the given ticket
    pub fn success(ticket: AuthenticationTicket) -> Self {
        Self {
            state: State::Success(ticket),
        }
    }

    /// Authentication failed with the given error
    pub fn fail(error: impl Into<AuthError>) -> Self {
        Self::failure_state(error.into(), None)
    }

    /// Authentication failed; the message is wrapped in a generic error
    pub fn fail_message(message: impl Into<String>) -> Self {
        Self::fail(AuthError::Failed(message.into()))
    }

    pub fn fail_with_properties(
        error: impl Into<AuthError>,
        properties: AuthenticationProperties,
    ) -> Self {
        Self::failure_state(error.into(), Some(properties))
    }

    pub fn fail_message_with_properties(
        message: impl Into<String>,
        properties: AuthenticationProperties,
    ) -> Self {
        Self::fail_with_properties(AuthError::Failed(message.into()), properties)
    }

    /// The scheme produced no result for this request
    pub fn no_result() -> Self {
        Self {
            state: State::NoResult,
        }
    }

    fn failure_state(error: AuthError, properties: Option<AuthenticationProperties>) -> Self {
        Self {
            state: State::Failure {
                error: Arc::new(error),
                properties,
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.state, State::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.state, State::Failure { .. })
    }

    /// Whether the scheme ignored the request
    pub fn none(&self) -> bool {
        matches!(self.state, State::NoResult)
    }

    pub fn outcome(&self) -> Outcome {
        match self.state {
            State::Success(_) => Outcome::Success,
            State::Failure { .. } => Outcome::Failure,
            State::NoResult => Outcome::NoResult,
        }
    }

    pub fn ticket(&self) -> Option<&AuthenticationTicket> {
        match &self.state {
            State::Success(ticket) => Some(ticket),
            _ => None,
        }
    }

    pub fn into_ticket(self) -> Option<AuthenticationTicket> {
        match self.state {
            State::Success(ticket) => Some(ticket),
            _ => None,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.ticket().map(|t| &t.principal)
    }

    /// Ticket properties on success, attached properties on failure
    pub fn properties(&self) -> Option<&AuthenticationProperties> {
        match &self.state {
            State::Success(ticket) => Some(&ticket.properties),
            State::Failure { properties, .. } => properties.as_ref(),
            State::NoResult => None,
        }
    }

    pub fn failure(&self) -> Option<&AuthError> {
        match &self.state {
            State::Failure { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Shared handle to the failure, for callers that need to keep it
    pub fn failure_arc(&self) -> Option<Arc<AuthError>> {
        match &self.state {
            State::Failure { error, .. } => Some(error.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::principal::{Identity, NAME_CLAIM};

    fn ticket() -> AuthenticationTicket {
        let principal = Principal::new(Identity::new("Test").with_claim(NAME_CLAIM, "bob"));
        AuthenticationTicket::new(principal, "Test")
    }

    #[test]
    fn test_success_carries_ticket() {
        let result = AuthenticateResult::success(ticket());

        assert!(result.succeeded());
        assert!(!result.is_failure());
        assert!(!result.none());
        assert_eq!(result.outcome(), Outcome::Success);
        assert!(result.ticket().is_some());
        assert_eq!(result.principal().and_then(|p| p.name()), Some("bob"));
        assert!(result.properties().is_some());
        assert!(result.failure().is_none());
    }

    #[test]
    fn test_fail_message_wraps_generic_error() {
        let result = AuthenticateResult::fail_message("bad signature");

        assert!(!result.succeeded());
        assert!(result.is_failure());
        assert!(!result.none());
        assert!(result.ticket().is_none());
        assert!(result.principal().is_none());
        assert!(result.properties().is_none());

        let failure = result.failure().unwrap();
        assert!(matches!(failure, AuthError::Failed(m) if m == "bad signature"));
        assert_eq!(failure.to_string(), "bad signature");
    }

    #[test]
    fn test_fail_keeps_error_variant() {
        let result = AuthenticateResult::fail(AuthError::SchemeNotFound("Cookie".to_string()));
        assert!(matches!(
            result.failure(),
            Some(AuthError::SchemeNotFound(s)) if s == "Cookie"
        ));
    }

    #[test]
    fn test_fail_with_properties() {
        let mut props = AuthenticationProperties::new();
        props.set_redirect_uri(Some("/login".to_string()));

        let result = AuthenticateResult::fail_message_with_properties("expired", props);
        assert!(result.is_failure());
        assert_eq!(
            result.properties().and_then(|p| p.redirect_uri()),
            Some("/login")
        );
    }

    #[test]
    fn test_no_result() {
        let result = AuthenticateResult::no_result();

        assert!(!result.succeeded());
        assert!(!result.is_failure());
        assert!(result.none());
        assert_eq!(result.outcome().as_str(), "no_result");
        assert!(result.ticket().is_none());
        assert!(result.failure().is_none());
    }

    #[test]
    fn test_clone_shares_failure() {
        let result = AuthenticateResult::fail_message("denied");
        let cloned = result.clone();

        let a = result.failure_arc().unwrap();
        let b = cloned.failure_arc().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
