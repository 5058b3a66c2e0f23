use axum::extract::FromRef;
use spdash_core::{DashboardApi, OAuthProvider};
use spdash_flow::OAuth2Flow;
use std::sync::Arc;

pub mod helpers;
pub mod render;

pub use helpers::*;

/// Number of CRM contacts listed on the callback page.
pub const CONTACT_LIMIT: u32 = 20;

pub struct DashboardState<P: OAuthProvider> {
    pub flow: Arc<OAuth2Flow<P>>,
}

impl<P: OAuthProvider> Clone for DashboardState<P> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
        }
    }
}

impl<P: OAuthProvider> From<OAuth2Flow<P>> for DashboardState<P> {
    fn from(flow: OAuth2Flow<P>) -> Self {
        Self {
            flow: Arc::new(flow),
        }
    }
}

impl<P: OAuthProvider> FromRef<DashboardState<P>> for Arc<OAuth2Flow<P>> {
    fn from_ref(state: &DashboardState<P>) -> Self {
        state.flow.clone()
    }
}

pub trait SpDashboardAxumExt {
    /// Router serving the redirect and callback paths on `/`.
    fn axum_router(self) -> axum::Router;
}

impl<P> SpDashboardAxumExt for OAuth2Flow<P>
where
    P: OAuthProvider + DashboardApi + 'static,
{
    fn axum_router(self) -> axum::Router {
        use axum::routing::get;
        axum::Router::new()
            .route("/", get(helpers::axum_dashboard_handler::<P>))
            .with_state(DashboardState::from(self))
    }
}
