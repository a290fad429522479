//! Provider configuration.
//!
//! The host passes the `provider` block as JSON. Attributes left out (or
//! `null`) fall back to environment variables:
//!
//! | Attribute  | Environment variable  |
//! |------------|-----------------------|
//! | `host`     | `HASHICUPS_HOST`      |
//! | `username` | `HASHICUPS_USERNAME`  |
//! | `password` | `HASHICUPS_PASSWORD`  |

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::client::DEFAULT_HOST;
use crate::schema::Diagnostic;

/// Environment fallback for `host`.
pub const HOST_ENV: &str = "HASHICUPS_HOST";
/// Environment fallback for `username`.
pub const USERNAME_ENV: &str = "HASHICUPS_USERNAME";
/// Environment fallback for `password`.
pub const PASSWORD_ENV: &str = "HASHICUPS_PASSWORD";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Fully resolved provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the HashiCups API.
    pub host: String,
    /// Account used to sign in.
    pub username: String,
    /// Password for `username`.
    pub password: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve settings from the host config, falling back to the process environment.
    pub fn resolve(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolve settings using `lookup` in place of the process environment.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn resolve_with<F>(config: &Value, lookup: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if config.is_null() {
            RawConfig::default()
        } else {
            serde_json::from_value(config.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?
        };

        let pick = |value: Option<String>, env: &str| {
            value.or_else(|| lookup(env)).unwrap_or_default()
        };
        let host = pick(raw.host, HOST_ENV);
        let username = pick(raw.username, USERNAME_ENV);
        let password = pick(raw.password, PASSWORD_ENV);

        let mut diagnostics = Vec::new();
        if host.is_empty() {
            diagnostics.push(
                Diagnostic::error("Unable to find host")
                    .with_detail(format!(
                        "Host cannot be an empty string. Set `host` or {} (for example {}).",
                        HOST_ENV, DEFAULT_HOST
                    ))
                    .with_attribute("host"),
            );
        }
        if username.is_empty() {
            diagnostics.push(
                Diagnostic::error("Unable to find username")
                    .with_detail("Username cannot be an empty string")
                    .with_attribute("username"),
            );
        }
        if password.is_empty() {
            diagnostics.push(
                Diagnostic::error("Unable to find password")
                    .with_detail("Password cannot be an empty string")
                    .with_attribute("password"),
            );
        }

        if diagnostics.is_empty() {
            Ok(Self {
                host,
                username,
                password,
            })
        } else {
            Err(diagnostics)
        }
    }
}
