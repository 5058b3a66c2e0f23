use url::Url;

use crate::AuthError;

/// Environment variable holding the OAuth client id.
pub const ENV_CLIENT_ID: &str = "SPDASH_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "SPDASH_CLIENT_SECRET";
/// Environment variable holding the provider base URL.
pub const ENV_ENDPOINT: &str = "SPDASH_ENDPOINT";
/// Environment variable holding the registered redirect URI.
pub const ENV_REDIRECT_URL: &str = "SPDASH_REDIRECT_URL";
/// Environment variable holding the CiviCRM site key.
pub const ENV_CIVICRM_SITEKEY: &str = "SPDASH_CIVICRM_SITEKEY";

/// The confidential client's credentials.
#[derive(Clone)]
pub struct ClientCredentials {
    /// The client ID assigned by the provider.
    pub client_id: String,
    /// The client secret assigned by the provider.
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Everything the demo needs to know about its identity provider.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Client ID and secret.
    pub credentials: ClientCredentials,
    /// Base URL of the provider, always ending in `/`.
    pub endpoint: Url,
    /// The redirect URI registered with the provider.
    pub redirect_url: String,
    /// Site key passed to the CiviCRM proxy as `key`.
    pub civicrm_sitekey: String,
}

impl ClientConfig {
    /// Creates a configuration, normalising `endpoint` to end in `/`.
    pub fn new(
        credentials: ClientCredentials,
        endpoint: &str,
        redirect_url: impl Into<String>,
        civicrm_sitekey: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let endpoint = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| AuthError::Config(format!("Invalid {ENV_ENDPOINT}: {e}")))?;

        Ok(Self {
            credentials,
            endpoint,
            redirect_url: redirect_url.into(),
            civicrm_sitekey: civicrm_sitekey.into(),
        })
    }

    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AuthError::Config(format!("{key} must be set")))
        };

        let credentials = ClientCredentials {
            client_id: require(ENV_CLIENT_ID)?,
            client_secret: require(ENV_CLIENT_SECRET)?,
        };

        Self::new(
            credentials,
            &require(ENV_ENDPOINT)?,
            require(ENV_REDIRECT_URL)?,
            require(ENV_CIVICRM_SITEKEY)?,
        )
    }

    /// Resolves a path relative to the provider base URL.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, AuthError> {
        self.endpoint
            .join(path)
            .map_err(|e| AuthError::Provider(format!("Invalid endpoint path {path}: {e}")))
    }
}
