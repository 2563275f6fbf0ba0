//! HTTP client for an OAuth2 authorization-code identity provider.

use std::time::Duration;

use async_trait::async_trait;
use nestegg_core::auth::{IdentityProvider, OAuthError, ProviderProfile};
use nestegg_shared::OAuthConfig;
use reqwest::{Client, Url};
use serde::Deserialize;

const SCOPE: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Identity provider reached over HTTPS.
///
/// Never logs the client secret, the authorization code or any token.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    config: OAuthConfig,
}

impl HttpIdentityProvider {
    /// Builds a provider client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` when client credentials are missing, and
    /// `ExchangeFailed` if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        if !config.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| OAuthError::ExchangeFailed(format!("HTTP client error: {e}")))?;

        Ok(Self { client, config })
    }
}

impl std::fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        Url::parse_with_params(
            &self.config.authorization_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
            ],
        )
        .map(String::from)
        .map_err(|_| OAuthError::NotConfigured)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::ExchangeFailed(format!(
                "token endpoint returned {status}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(e.without_url().to_string()))?
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::ExchangeFailed("no access token received".to_string()))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError> {
        let response = self
            .client
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::ProfileFetchFailed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::ProfileFetchFailed(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        response
            .json::<ProviderProfile>()
            .await
            .map_err(|e| OAuthError::ProfileFetchFailed(e.without_url().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".into(),
            client_secret: "shh".into(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn test_unconfigured_provider_is_rejected() {
        let err = HttpIdentityProvider::new(OAuthConfig::default()).unwrap_err();
        assert!(matches!(err, OAuthError::NotConfigured));
    }

    #[test]
    fn test_authorization_url_carries_all_parameters() {
        let provider = HttpIdentityProvider::new(configured()).unwrap();
        let url = Url::parse(&provider.authorization_url("st&ate").unwrap()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "http://localhost:8888/auth/external/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["state"], "st&ate");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["include_granted_scopes"], "true");
        assert!(!params.contains_key("client_secret"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let provider = HttpIdentityProvider::new(configured()).unwrap();
        assert!(!format!("{provider:?}").contains("shh"));
    }
}
