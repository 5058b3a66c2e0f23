use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use spdash_core::{AuthError, DashboardApi, OAuthProvider};
use spdash_flow::OAuth2Flow;
use std::sync::Arc;

use crate::{render, CONTACT_LIMIT};

#[derive(Debug, Default)]
pub struct DashboardParams {
    pub action: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
}

impl DashboardParams {
    /// Builds the params from raw query pairs. A repeated key keeps its last value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "action" => params.action = Some(value),
                "code" => params.code = Some(value),
                "state" => params.state = Some(value),
                _ => {}
            }
        }
        params
    }

    /// Only `action=callback` selects the callback path; anything else starts a new login.
    pub fn is_callback(&self) -> bool {
        self.action.as_deref() == Some("callback")
    }
}

#[derive(Debug)]
pub struct SpDashboardAxumError(pub AuthError);

impl From<AuthError> for SpDashboardAxumError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for SpDashboardAxumError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AuthError::MissingAuthorizationCode => StatusCode::BAD_REQUEST,
            AuthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenExchangeFailed(_)
            | AuthError::UpstreamApi { .. }
            | AuthError::Network
            | AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Html(render::escape(&self.0.to_string()))).into_response()
    }
}

/// Redirect with `302 Found`, the status an authorization redirect is expected to use.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Helper to initiate the OAuth2 login flow.
pub fn initiate_oauth_login<P: OAuthProvider>(flow: &OAuth2Flow<P>) -> Response {
    let (url, _state) = flow.initiate_login();
    found(&url)
}

/// Helper to handle the OAuth2 callback: exchange the code, call both APIs and render the page.
pub async fn handle_oauth_callback<P>(
    flow: &OAuth2Flow<P>,
    params: &DashboardParams,
    again_href: &str,
) -> Result<Response, SpDashboardAxumError>
where
    P: OAuthProvider + DashboardApi,
{
    let token = flow
        .finalize_login(params.code.as_deref(), params.state.as_deref())
        .await?;

    let api = flow.provider();
    let profile = api.fetch_profile(&token).await?;
    if profile.result.is_none() {
        tracing::warn!(code = profile.code, "profile response could not be decoded");
    }
    let contacts = api.list_contacts(&token, CONTACT_LIMIT).await?;

    let page = render::render_dashboard(
        profile.result.as_ref(),
        contacts.into_contacts(),
        CONTACT_LIMIT,
        again_href,
    );
    Ok(Html(page).into_response())
}

pub async fn axum_dashboard_handler<P>(
    State(flow): State<Arc<OAuth2Flow<P>>>,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, SpDashboardAxumError>
where
    P: OAuthProvider + DashboardApi + 'static,
{
    let params = DashboardParams::from_pairs(pairs);
    if !params.is_callback() {
        return Ok(initiate_oauth_login(&flow));
    }
    handle_oauth_callback(&flow, &params, uri.path()).await
}
