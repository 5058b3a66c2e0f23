//! # SP-dashboard OAuth Demo
//!
//! Logs in against the SP identity provider and lists the first CiviCRM contacts the
//! resulting access token can see.
//!
//! Set the following environment variables, or put them in a `.env` file:
//! - `SPDASH_CLIENT_ID`
//! - `SPDASH_CLIENT_SECRET`
//! - `SPDASH_ENDPOINT` (e.g. `https://login.example.org/oauth2/`)
//! - `SPDASH_REDIRECT_URL` (e.g. `http://localhost:3000/?action=callback`)
//! - `SPDASH_CIVICRM_SITEKEY`
//! - `SPDASH_BIND_ADDR` (optional, defaults to `0.0.0.0:3000`)

use spdash_axum::SpDashboardAxumExt;
use spdash_core::ClientConfig;
use spdash_flow::OAuth2Flow;
use spdash_providers_sp::{SpProvider, DEFAULT_SCOPES};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,spdash=debug")),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(endpoint = %config.endpoint, client_id = %config.credentials.client_id, "loaded configuration");

    let provider = SpProvider::new(config)?;
    let app = OAuth2Flow::new(provider)
        .with_scopes(DEFAULT_SCOPES.to_vec())
        .axum_router();

    let bind_addr =
        std::env::var("SPDASH_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("SP-dashboard demo listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
