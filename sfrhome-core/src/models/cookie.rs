//! Session cookie type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of leading characters kept when a cookie value is masked.
pub const MASK_PREFIX_LEN: usize = 6;

/// A persisted session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie belongs to.
    pub domain: String,
    /// Path the cookie applies to.
    pub path: String,
    /// Expiration time (None for session cookies).
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    /// Creates a session cookie scoped to `/` on `domain`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: None,
        }
    }

    /// Returns true if the cookie is expired.
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|exp| exp < Utc::now())
    }

    /// Returns the value truncated to a short prefix, for debug dumps.
    pub fn masked_value(&self) -> String {
        let prefix: String = self.value.chars().take(MASK_PREFIX_LEN).collect();
        if prefix.len() < self.value.len() {
            format!("{prefix}...")
        } else {
            prefix
        }
    }
}

/// Parses a `name=value; name2=value2` string into cookies on `domain`.
///
/// Segments without `=` or with an empty name are skipped.
pub fn parse_cookie_header(header: &str, domain: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|segment| {
            let (name, value) = segment.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie::new(name, value.trim(), domain))
        })
        .collect()
}
