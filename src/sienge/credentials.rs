//! Basic-Auth credentials for the Sienge public API.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Username/password pair for the upstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// API username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `Authorization` header value: `Basic base64(username:password)`.
    pub fn authorization_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
