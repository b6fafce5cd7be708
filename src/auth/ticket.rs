use super::principal::Principal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ISSUED_KEY: &str = ".issued";
const EXPIRES_KEY: &str = ".expires";
const PERSISTENT_KEY: &str = ".persistent";
const REDIRECT_KEY: &str = ".redirect";
const REFRESH_KEY: &str = ".refresh";

/// State values about an authentication session
///
/// Everything lives in a single string bag; the typed accessors read and
/// write well-known dotted keys so the bag serializes as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationProperties {
    #[serde(default)]
    items: HashMap<String, String>,
}

impl AuthenticationProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: HashMap<String, String>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &HashMap<String, String> {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Set or clear (with `None`) a raw item
    pub fn set(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match value {
            Some(v) => {
                self.items.insert(key, v);
            }
            None => {
                self.items.remove(&key);
            }
        }
    }

    pub fn issued_utc(&self) -> Option<DateTime<Utc>> {
        self.get_date(ISSUED_KEY)
    }

    pub fn set_issued_utc(&mut self, value: Option<DateTime<Utc>>) {
        self.set_date(ISSUED_KEY, value);
    }

    pub fn expires_utc(&self) -> Option<DateTime<Utc>> {
        self.get_date(EXPIRES_KEY)
    }

    pub fn set_expires_utc(&mut self, value: Option<DateTime<Utc>>) {
        self.set_date(EXPIRES_KEY, value);
    }

    pub fn is_persistent(&self) -> bool {
        self.items.contains_key(PERSISTENT_KEY)
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.set(PERSISTENT_KEY, persistent.then(String::new));
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.get(REDIRECT_KEY)
    }

    pub fn set_redirect_uri(&mut self, uri: Option<String>) {
        self.set(REDIRECT_KEY, uri);
    }

    /// `None` when the item is missing or unparsable; case is ignored
    pub fn allow_refresh(&self) -> Option<bool> {
        self.get(REFRESH_KEY).and_then(parse_flag)
    }

    pub fn set_allow_refresh(&mut self, allow: Option<bool>) {
        self.set(REFRESH_KEY, allow.map(|a| a.to_string()));
    }

    /// Whether `expires_utc` lies before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_utc().is_some_and(|expires| expires <= now)
    }

    fn get_date(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    fn set_date(&mut self, key: &str, value: Option<DateTime<Utc>>) {
        self.set(key, value.map(|d| d.to_rfc3339()));
    }
}

/// Identity plus session metadata produced by a successful authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationTicket {
    pub principal: Principal,
    pub properties: AuthenticationProperties,
    /// Scheme that issued this ticket
    pub authentication_scheme: String,
}

impl AuthenticationTicket {
    pub fn new(principal: Principal, authentication_scheme: impl Into<String>) -> Self {
        Self::with_properties(
            principal,
            AuthenticationProperties::default(),
            authentication_scheme,
        )
    }

    pub fn with_properties(
        principal: Principal,
        properties: AuthenticationProperties,
        authentication_scheme: impl Into<String>,
    ) -> Self {
        Self {
            principal,
            properties,
            authentication_scheme: authentication_scheme.into(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
