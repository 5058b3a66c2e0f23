//! # SP-dashboard Core
//!
//! `spdash-core` holds the types shared by every crate of the SP-dashboard demo client:
//! the OAuth2 token, the typed API responses, the error taxonomy and the client configuration.
//!
//! ## Key Components
//!
//! - **[`OAuthProvider`]**: The authorization-code half of an identity provider.
//! - **[`DashboardApi`]**: The bearer-authenticated APIs the demo calls once it holds a token.
//! - **[`ClientConfig`]**: Explicit configuration passed into a provider.
//! - **[`AuthError`]**: Every way a demo request can fail.

#![warn(missing_docs)]

use async_trait::async_trait;

/// Typed responses of the profile and CRM APIs.
pub mod api;
/// Client configuration loaded from the environment.
pub mod config;
/// Error types.
pub mod error;
/// OAuth2 token types.
pub mod state;

pub use api::{ApiResponse, CiviResult, Contact, ProfileInfo, Role};
pub use config::{ClientConfig, ClientCredentials};
pub use error::AuthError;
pub use state::OAuthToken;

/// Trait for an OAuth2 provider supporting the authorization-code grant.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Get the provider identifier.
    fn provider_id(&self) -> &str;

    /// Build the URL the user agent is redirected to (RFC 6749 §4.1.1).
    fn get_authorization_url(&self, state: &str, scopes: &[&str]) -> String;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AuthError>;
}

/// The resource APIs reachable with an access token from [`OAuthProvider::exchange_code`].
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetch the profile of the user the token belongs to.
    async fn fetch_profile(&self, token: &OAuthToken)
        -> Result<ApiResponse<ProfileInfo>, AuthError>;

    /// List the first `limit` CRM contacts the token grants access to.
    async fn list_contacts(
        &self,
        token: &OAuthToken,
        limit: u32,
    ) -> Result<ApiResponse<CiviResult>, AuthError>;
}
