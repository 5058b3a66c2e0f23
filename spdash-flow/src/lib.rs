//! # SP-dashboard Flow
//!
//! `spdash-flow` orchestrates the two halves of the OAuth2 Authorization Code grant:
//! sending the user agent to the provider, and exchanging the code it comes back with.
//!
//! ## Key Components
//!
//! - **[`OAuth2Flow`]**: Builds the redirect URL and finalizes the callback.
//! - **[`LOGIN_STATE`]**: The static `state` value sent with every authorization request.

#![warn(missing_docs)]

use spdash_core::{AuthError, OAuthProvider, OAuthToken};

/// The `state` parameter sent to the provider.
///
/// It is a fixed string rather than a per-request nonce, so it offers no CSRF protection.
pub const LOGIN_STATE: &str = "login";

/// Orchestrates the standard OAuth2 Authorization Code flow.
pub struct OAuth2Flow<P: OAuthProvider> {
    provider: P,
    scopes: Vec<String>,
}

impl<P: OAuthProvider> OAuth2Flow<P> {
    /// Create a new `OAuth2Flow` with the given provider and its default scopes.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            scopes: Vec::new(),
        }
    }

    /// Set the scopes for the OAuth2 flow.
    pub fn with_scopes(mut self, scopes: Vec<impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(|s| s.into()).collect();
        self
    }

    /// The provider this flow talks to.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Generates the redirect URL and the state it carries.
    pub fn initiate_login(&self) -> (String, String) {
        let scopes: Vec<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        let url = self.provider.get_authorization_url(LOGIN_STATE, &scopes);
        tracing::debug!(provider = self.provider.provider_id(), %url, "redirecting to authorize endpoint");
        (url, LOGIN_STATE.to_string())
    }

    /// Completes the flow by exchanging the code.
    ///
    /// A missing code fails before any request is made. A `state` differing from
    /// [`LOGIN_STATE`] is logged but not rejected.
    pub async fn finalize_login(
        &self,
        code: Option<&str>,
        received_state: Option<&str>,
    ) -> Result<OAuthToken, AuthError> {
        let Some(code) = code.filter(|c| !c.is_empty()) else {
            tracing::warn!("callback without authorization code");
            return Err(AuthError::MissingAuthorizationCode);
        };

        if received_state != Some(LOGIN_STATE) {
            tracing::warn!(
                expected = LOGIN_STATE,
                received = ?received_state,
                "callback state does not match, continuing without validation"
            );
        }

        let token = self.provider.exchange_code(code).await?;
        tracing::info!(
            provider = self.provider.provider_id(),
            scope = ?token.scope,
            "exchanged authorization code for access token"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        exchanges: AtomicUsize,
    }

    #[async_trait]
    impl OAuthProvider for CountingProvider {
        fn provider_id(&self) -> &str {
            "counting"
        }

        fn get_authorization_url(&self, state: &str, scopes: &[&str]) -> String {
            format!("https://idp.test/authorize?state={}&scope={}", state, scopes.join("+"))
        }

        async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AuthError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if code == "bad" {
                return Err(AuthError::TokenExchangeFailed("HTTP 400: {}".into()));
            }
            Ok(OAuthToken {
                access_token: format!("token-for-{code}"),
                token_type: "Bearer".into(),
                expires_in: None,
                refresh_token: None,
                scope: None,
            })
        }
    }

    #[test]
    fn initiate_login_uses_static_state_and_scopes() {
        let flow = OAuth2Flow::new(CountingProvider::default()).with_scopes(vec!["sp", "civicrm"]);
        let (url, state) = flow.initiate_login();
        assert_eq!(state, "login");
        assert_eq!(url, "https://idp.test/authorize?state=login&scope=sp+civicrm");
    }

    #[tokio::test]
    async fn missing_code_never_reaches_the_provider() {
        let flow = OAuth2Flow::new(CountingProvider::default());

        for code in [None, Some("")] {
            let err = flow.finalize_login(code, Some(LOGIN_STATE)).await.unwrap_err();
            assert!(matches!(err, AuthError::MissingAuthorizationCode));
        }
        assert_eq!(flow.provider().exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exchanges_exactly_once() {
        let flow = OAuth2Flow::new(CountingProvider::default());
        let token = flow.finalize_login(Some("abc"), Some(LOGIN_STATE)).await.unwrap();
        assert_eq!(token.access_token, "token-for-abc");
        assert_eq!(flow.provider().exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mismatched_state_is_not_rejected() {
        let flow = OAuth2Flow::new(CountingProvider::default());
        assert!(flow.finalize_login(Some("abc"), Some("forged")).await.is_ok());
        assert!(flow.finalize_login(Some("abc"), None).await.is_ok());
    }

    #[tokio::test]
    async fn exchange_failure_propagates() {
        let flow = OAuth2Flow::new(CountingProvider::default());
        let err = flow.finalize_login(Some("bad"), Some(LOGIN_STATE)).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed(_)));
    }
}
