//! Configuration
//!
//! Loaded from TOML, then overridden from `ACTA_*` environment variables.
//!
//! ```toml
//! api_base_url = "https://api.example.com/prod"
//! skip_auth = false
//! request_timeout_secs = 30
//! session_dir = "/home/pm/.acta"
//! default_format = "pdf"
//!
//! [identity]
//! token_url = "https://auth.example.com/oauth2/token"
//! client_id = "abc123"
//! refresh_token = "..."
//! ```

use crate::error::ConfigError;
use acta_client::{BaseUrl, DocumentFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://q2b9avfwv5.execute-api.us-east-2.amazonaws.com/prod";

/// Environment variable names
pub mod env {
    /// API base URL
    pub const API_BASE_URL: &str = "ACTA_API_BASE_URL";
    /// Skip-auth mode (`true`/`1`/`yes`)
    pub const SKIP_AUTH: &str = "ACTA_SKIP_AUTH";
    /// Session directory
    pub const SESSION_DIR: &str = "ACTA_SESSION_DIR";
    /// Per-request timeout in seconds
    pub const REQUEST_TIMEOUT_SECS: &str = "ACTA_REQUEST_TIMEOUT_SECS";
    /// Static bearer token
    pub const TOKEN: &str = "ACTA_TOKEN";
    /// Project manager e-mail
    pub const PM_EMAIL: &str = "ACTA_PM_EMAIL";
}

/// OAuth refresh-token identity settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Token endpoint
    pub token_url: String,
    /// OAuth client id
    pub client_id: String,
    /// Long-lived refresh token
    pub refresh_token: String,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Acta configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActaConfig {
    /// API base URL
    pub api_base_url: String,
    /// Use the synthetic skip-auth identity
    pub skip_auth: bool,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Directory holding the persisted session; memory only when unset
    pub session_dir: Option<PathBuf>,
    /// Fixed bearer token, used when no identity endpoint is configured
    #[serde(skip_serializing)]
    pub static_token: Option<String>,
    /// OAuth refresh-token identity
    pub identity: Option<IdentityConfig>,
    /// Project manager e-mail used to list projects
    pub pm_email: Option<String>,
    /// Format used when none is requested
    pub default_format: DocumentFormat,
}

impl fmt::Debug for ActaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActaConfig")
            .field("api_base_url", &self.api_base_url)
            .field("skip_auth", &self.skip_auth)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("session_dir", &self.session_dir)
            .field("static_token", &self.static_token.as_ref().map(|_| "<redacted>"))
            .field("identity", &self.identity)
            .field("pm_email", &self.pm_email)
            .field("default_format", &self.default_format)
            .finish()
    }
}

impl Default for ActaConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            skip_auth: false,
            request_timeout_secs: 30,
            session_dir: None,
            static_token: None,
            identity: None,
            pm_email: None,
            default_format: DocumentFormat::Pdf,
        }
    }
}

impl ActaConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` for malformed TOML or unknown value types.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Read` or `ConfigError::Parse`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for unparsable values.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(std::env::vars())
    }

    /// Apply overrides from `ACTA_*` key/value pairs
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for unparsable values.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value: String = value.into();
            match key.as_ref() {
                env::API_BASE_URL => self.api_base_url = value,
                env::SKIP_AUTH => self.skip_auth = parse_flag(env::SKIP_AUTH, &value)?,
                env::SESSION_DIR => self.session_dir = Some(PathBuf::from(value)),
                env::REQUEST_TIMEOUT_SECS => {
                    self.request_timeout_secs = value.trim().parse().map_err(|_| {
                        ConfigError::invalid("request_timeout_secs", format!("'{value}' is not a number"))
                    })?;
                }
                env::TOKEN => self.static_token = Some(value),
                env::PM_EMAIL => self.pm_email = Some(value),
                _ => {}
            }
        }
        Ok(self)
    }

    /// Check field values
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        BaseUrl::parse(&self.api_base_url)
            .map_err(|e| ConfigError::invalid("api_base_url", e.to_string()))?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }

        if let Some(identity) = &self.identity {
            if identity.token_url.trim().is_empty() {
                return Err(ConfigError::invalid("identity.token_url", "must not be empty"));
            }
            if identity.client_id.trim().is_empty() {
                return Err(ConfigError::invalid("identity.client_id", "must not be empty"));
            }
            if identity.refresh_token.trim().is_empty() {
                return Err(ConfigError::invalid("identity.refresh_token", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Validated base URL
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the URL is unusable.
    pub fn base_url(&self) -> Result<BaseUrl, ConfigError> {
        BaseUrl::parse(&self.api_base_url)
            .map_err(|e| ConfigError::invalid("api_base_url", e.to_string()))
    }

    /// Per-request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// With API base URL
    #[inline]
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// With skip-auth mode
    #[inline]
    #[must_use]
    pub fn with_skip_auth(mut self, skip_auth: bool) -> Self {
        self.skip_auth = skip_auth;
        self
    }

    /// With session directory
    #[inline]
    #[must_use]
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// With static token
    #[inline]
    #[must_use]
    pub fn with_static_token(mut self, token: impl Into<String>) -> Self {
        self.static_token = Some(token.into());
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// With OAuth refresh-token identity
    #[inline]
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = Some(identity);
        self
    }
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::invalid(field, format!("'{other}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = ActaConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.skip_auth);
    }

    #[test]
    fn parses_toml_with_identity() {
        let config = ActaConfig::from_toml_str(
            r#"
            api_base_url = "https://api.example.com/prod"
            skip_auth = true
            default_format = "docx"

            [identity]
            token_url = "https://auth.example.com/oauth2/token"
            client_id = "client"
            refresh_token = "refresh"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com/prod");
        assert!(config.skip_auth);
        assert_eq!(config.default_format, DocumentFormat::Docx);
        assert_eq!(config.identity.as_ref().unwrap().client_id, "client");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn env_overrides_win() {
        let config = ActaConfig::new()
            .with_overrides([
                (env::API_BASE_URL, "http://localhost:3000"),
                (env::SKIP_AUTH, "yes"),
                (env::REQUEST_TIMEOUT_SECS, "5"),
                (env::TOKEN, "tok"),
                ("UNRELATED", "ignored"),
            ])
            .unwrap();

        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert!(config.skip_auth);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.static_token.as_deref(), Some("tok"));
    }

    #[test]
    fn bad_env_values_are_rejected() {
        assert!(ActaConfig::new()
            .with_overrides([(env::SKIP_AUTH, "maybe")])
            .is_err());
        assert!(ActaConfig::new()
            .with_overrides([(env::REQUEST_TIMEOUT_SECS, "soon")])
            .is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ActaConfig::new().with_api_base_url("not a url").validate().is_err());
        assert!(ActaConfig::new().with_request_timeout_secs(0).validate().is_err());

        let mut config = ActaConfig::new();
        config.identity = Some(IdentityConfig {
            token_url: "https://auth.example.com/oauth2/token".to_string(),
            client_id: String::new(),
            refresh_token: "r".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = ActaConfig::new().with_static_token("super-secret");
        config.identity = Some(IdentityConfig {
            token_url: "https://auth.example.com".to_string(),
            client_id: "client".to_string(),
            refresh_token: "refresh-secret".to_string(),
        });
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("refresh-secret"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acta.toml");
        std::fs::write(&path, "skip_auth = true\n").unwrap();

        let config = ActaConfig::load(&path).unwrap();
        assert!(config.skip_auth);
        assert!(matches!(
            ActaConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
