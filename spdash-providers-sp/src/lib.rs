use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spdash_core::{
    ApiResponse, AuthError, CiviResult, ClientConfig, DashboardApi, OAuthProvider, OAuthToken,
    ProfileInfo,
};
use url::Url;

/// Scopes requested when the caller passes none.
pub const DEFAULT_SCOPES: &[&str] = &["sp", "civicrm"];

/// The SP identity provider, a Drupal OAuth2 server that also proxies the CiviCRM API.
pub struct SpProvider {
    config: ClientConfig,
    http_client: reqwest::Client,
    authorization_url: Url,
    token_url: Url,
    me_url: Url,
    civiapi_url: Url,
}

impl SpProvider {
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        Ok(Self {
            authorization_url: config.endpoint_url("authorize")?,
            token_url: config.endpoint_url("token")?,
            me_url: config.endpoint_url("api/me.json")?,
            civiapi_url: config.endpoint_url("api/civiapi.json")?,
            http_client: reqwest::Client::new(),
            config,
        })
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bearer-authenticated GET returning the status code and the leniently decoded body.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        token: &OAuthToken,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, AuthError> {
        let response = self
            .http_client
            .get(url.clone())
            .query(query)
            .header("Authorization", token.bearer_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|_| AuthError::Network)?;

        let code = response.status().as_u16();
        let body = response.text().await.map_err(|_| AuthError::Network)?;
        tracing::debug!(%url, code, "fetched api resource");

        Ok(ApiResponse::from_body(code, &body))
    }
}

/// Reads a token from the token endpoint's body.
///
/// Only a non-empty string `access_token` is required. The optional metadata is taken when it
/// has a usable shape and dropped otherwise.
fn parse_token_response(body: &str) -> Option<OAuthToken> {
    let value: Value = serde_json::from_str(body).ok()?;
    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?
        .to_string();

    let text = |key: &str| -> Option<String> {
        match value.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };
    let expires_in = match value.get("expires_in") {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    Some(OAuthToken {
        access_token,
        token_type: text("token_type").unwrap_or_else(|| "Bearer".to_string()),
        expires_in,
        refresh_token: text("refresh_token"),
        scope: text("scope"),
    })
}

#[async_trait]
impl OAuthProvider for SpProvider {
    fn provider_id(&self) -> &str {
        "sp"
    }

    fn get_authorization_url(&self, state: &str, scopes: &[&str]) -> String {
        let scopes = if scopes.is_empty() {
            DEFAULT_SCOPES
        } else {
            scopes
        };

        let mut url = self.authorization_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.credentials.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AuthError> {
        let credentials = &self.config.credentials;
        let response = self
            .http_client
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|_| AuthError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(|_| AuthError::Network)?;

        match parse_token_response(&body) {
            Some(token) => Ok(token),
            None => {
                tracing::warn!(status = status.as_u16(), "token endpoint returned no access token");
                Err(AuthError::TokenExchangeFailed(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body
                )))
            }
        }
    }
}

#[async_trait]
impl DashboardApi for SpProvider {
    async fn fetch_profile(
        &self,
        token: &OAuthToken,
    ) -> Result<ApiResponse<ProfileInfo>, AuthError> {
        self.fetch(token, &self.me_url, &[]).await
    }

    async fn list_contacts(
        &self,
        token: &OAuthToken,
        limit: u32,
    ) -> Result<ApiResponse<CiviResult>, AuthError> {
        let query = [
            ("key", self.config.civicrm_sitekey.clone()),
            ("entity", "Contact".to_string()),
            ("action", "get".to_string()),
            ("options[limit]", limit.to_string()),
        ];
        self.fetch(token, &self.civiapi_url, &query).await
    }
}
