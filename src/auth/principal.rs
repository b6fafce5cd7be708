use serde::{Deserialize, Serialize};

/// Claim type holding the display name of an identity
pub const NAME_CLAIM: &str = "name";
/// Claim type holding a role granted to an identity
pub const ROLE_CLAIM: &str = "role";

/// A single statement about an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type (e.g. "name", "role", "email")
    pub claim_type: String,
    /// Claim value
    pub value: String,
    /// Authority that issued the claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            issuer: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

/// A set of claims established by one authentication mechanism
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Mechanism that authenticated this identity; `None` for anonymous
    #[serde(default)]
    pub authentication_type: Option<String>,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl Identity {
    /// Create an authenticated identity for the given mechanism
    pub fn new(authentication_type: impl Into<String>) -> Self {
        Self {
            authentication_type: Some(authentication_type.into()),
            claims: Vec::new(),
        }
    }

    /// Create an identity that is not authenticated
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(Claim::new(claim_type, value));
        self
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_type
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    pub fn name(&self) -> Option<&str> {
        self.find_first(NAME_CLAIM).map(|c| c.value.as_str())
    }
}

/// The caller on whose behalf a request runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub identities: Vec<Identity>,
}

impl Principal {
    pub fn new(identity: Identity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    pub fn add_identity(&mut self, identity: Identity) {
        self.identities.push(identity);
    }

    /// Primary identity
    pub fn identity(&self) -> Option<&Identity> {
        self.identities.first()
    }

    /// Whether any identity was authenticated
    pub fn is_authenticated(&self) -> bool {
        self.identities.iter().any(Identity::is_authenticated)
    }

    /// First claim of the given type across all identities
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.identities
            .iter()
            .find_map(|identity| identity.find_first(claim_type))
    }

    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.identities
            .iter()
            .flat_map(|identity| identity.claims.iter())
            .any(|c| c.claim_type == claim_type && c.value == value)
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.has_claim(ROLE_CLAIM, role)
    }

    pub fn name(&self) -> Option<&str> {
        self.identities.iter().find_map(Identity::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity_is_not_authenticated() {
        assert!(!Identity::anonymous().is_authenticated());
        assert!(!Identity {
            authentication_type: Some(String::new()),
            claims: vec![],
        }
        .is_authenticated());
        assert!(!Principal::default().is_authenticated());
    }

    #[test]
    fn test_principal_claim_lookup() {
        let mut principal = Principal::new(
            Identity::new("Header")
                .with_claim(NAME_CLAIM, "alice")
                .with_claim(ROLE_CLAIM, "admin"),
        );
        principal.add_identity(Identity::anonymous().with_claim("email", "alice@example.com"));

        assert!(principal.is_authenticated());
        assert_eq!(principal.name(), Some("alice"));
        assert!(principal.is_in_role("admin"));
        assert!(!principal.is_in_role("auditor"));
        assert_eq!(
            principal.find_first("email").map(|c| c.value.as_str()),
            Some("alice@example.com")
        );
    }
}
