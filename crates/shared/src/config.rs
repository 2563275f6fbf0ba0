//! Application configuration management.

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Longest accepted credential or state token lifetime (one year).
pub const MAX_TOKEN_EXPIRY_SECS: u64 = 366 * 24 * 60 * 60;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// External identity provider configuration.
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL. `memory://` selects the in-memory store.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing credentials and OAuth state tokens.
    pub secret: String,
    /// Session credential lifetime in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// OAuth state token lifetime in seconds.
    #[serde(default = "default_state_token_expiry")]
    pub state_token_expiry_secs: u64,
}

impl JwtSettings {
    fn validate(&self) -> AppResult<()> {
        for (key, secs) in [
            ("access_token_expiry_secs", self.access_token_expiry_secs),
            ("state_token_expiry_secs", self.state_token_expiry_secs),
        ] {
            if secs == 0 || secs > MAX_TOKEN_EXPIRY_SECS {
                return Err(AppError::InvalidConfig(format!(
                    "jwt.{key} must be between 1 and {MAX_TOKEN_EXPIRY_SECS}"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[hidden]")
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("state_token_expiry_secs", &self.state_token_expiry_secs)
            .finish()
    }
}

fn default_access_token_expiry() -> u64 {
    43_200 // 12 hours
}

fn default_state_token_expiry() -> u64 {
    600 // 10 minutes
}

/// External identity provider (OAuth2 authorization-code) configuration.
///
/// Endpoints default to Google's; the provider counts as configured only when
/// both client id and secret are set.
#[derive(Clone, Deserialize)]
pub struct OAuthConfig {
    /// OAuth client id.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Callback URL registered with the provider.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Provider authorization endpoint.
    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,
    /// Provider token endpoint.
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Provider userinfo endpoint.
    #[serde(default = "default_userinfo_endpoint")]
    pub userinfo_endpoint: String,
    /// Timeout for server-to-server calls.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl OAuthConfig {
    /// Returns true when client credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            authorization_endpoint: default_authorization_endpoint(),
            token_endpoint: default_token_endpoint(),
            userinfo_endpoint: default_userinfo_endpoint(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[hidden]")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("userinfo_endpoint", &self.userinfo_endpoint)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

fn default_redirect_uri() -> String {
    "http://localhost:8888/auth/external/callback".to_string()
}

fn default_authorization_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_endpoint() -> String {
    "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "nestegg=debug,tower_http=debug".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `NESTEGG__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if configuration cannot be loaded, and
    /// `AppError::InvalidConfig` for token lifetimes outside
    /// `1..=MAX_TOKEN_EXPIRY_SECS`.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("NESTEGG")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.jwt.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment_with_defaults() {
        temp_env::with_vars(
            [
                ("NESTEGG__DATABASE__URL", Some("memory://")),
                ("NESTEGG__JWT__SECRET", Some("env-secret")),
                ("NESTEGG__SERVER__PORT", None::<&str>),
                ("NESTEGG__OAUTH__CLIENT_ID", None),
                ("NESTEGG__OAUTH__CLIENT_SECRET", None),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "memory://");
                assert_eq!(config.jwt.secret, "env-secret");
                assert_eq!(config.jwt.access_token_expiry_secs, 43_200);
                assert_eq!(config.jwt.state_token_expiry_secs, 600);
                assert_eq!(config.server.port, 8888);
                assert!(!config.oauth.is_configured());
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_load_fails_without_secret() {
        temp_env::with_vars(
            [
                ("NESTEGG__DATABASE__URL", Some("memory://")),
                ("NESTEGG__JWT__SECRET", None::<&str>),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_load_rejects_out_of_range_expiry() {
        for expiry in ["0", "9223372036854775807"] {
            temp_env::with_vars(
                [
                    ("NESTEGG__DATABASE__URL", Some("memory://")),
                    ("NESTEGG__JWT__SECRET", Some("env-secret")),
                    ("NESTEGG__JWT__ACCESS_TOKEN_EXPIRY_SECS", Some(expiry)),
                ],
                || {
                    let err = AppConfig::load().unwrap_err();
                    assert!(matches!(err, AppError::InvalidConfig(_)), "{expiry}: {err}");
                },
            );
        }
    }

    #[test]
    fn test_jwt_settings_debug_hides_secret() {
        let jwt = JwtSettings {
            secret: "signing-secret".into(),
            access_token_expiry_secs: 60,
            state_token_expiry_secs: 60,
        };
        let rendered = format!("{jwt:?}");
        assert!(!rendered.contains("signing-secret"));
        assert!(rendered.contains("[hidden]"));
    }

    #[test]
    fn test_oauth_configured_needs_id_and_secret() {
        let mut oauth = OAuthConfig {
            client_id: "client".into(),
            ..OAuthConfig::default()
        };
        assert!(!oauth.is_configured());

        oauth.client_secret = "secret".into();
        assert!(oauth.is_configured());
    }

    #[test]
    fn test_oauth_debug_hides_secret() {
        let oauth = OAuthConfig {
            client_secret: "super-secret".into(),
            ..OAuthConfig::default()
        };
        let rendered = format!("{oauth:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[hidden]"));
    }
}
