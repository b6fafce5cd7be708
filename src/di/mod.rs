//! Per-request dependency injection.
//!
//! Services are registered on a [`ServiceCollection`] with one of three
//! lifetimes, frozen into a [`ServiceProvider`], and resolved through a
//! [`ServiceScope`]. The [`middleware::services_middleware`] opens one scope
//! per request so every middleware and handler in that request's chain sees
//! the same scoped instances.

pub mod collection;
pub mod middleware;
pub mod provider;

pub use collection::ServiceCollection;
pub use middleware::{services_middleware, Inject, RequestServices};
pub use provider::{ScopeId, ServiceProvider, ServiceScope};

use crate::error::AuthError;
use std::fmt;
use std::str::FromStr;

/// How long a resolved instance lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance for the whole provider
    #[default]
    Singleton,
    /// One instance per scope (per request)
    Scoped,
    /// A new instance on every resolve
    Transient,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "transient" => Ok(Lifetime::Transient),
            _ => Err(AuthError::Config(format!("Unknown service lifetime: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetime_parse() {
        assert_eq!("Scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
        assert_eq!("transient".parse::<Lifetime>().unwrap(), Lifetime::Transient);
        assert!("request".parse::<Lifetime>().is_err());
        assert_eq!(Lifetime::default().to_string(), "singleton");
    }
}
