//! Session cookie lifetime endpoints.
//!
//! Both endpoints re-issue the caller's current cookie with new attributes.
//! The token inside the cookie is never re-signed, so its own `exp` still
//! bounds the session.

use axum::{
    Extension, Form,
    extract::rejection::FormRejection,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};

use crate::auth::{
    CookieDirective, CredentialSource, SessionCookieManager, error::status_body, extract_credential,
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetAuthCookieMaxAge {
    pub max_age_seconds: u64,
}

fn current_token(headers: &HeaderMap, cookies: &SessionCookieManager) -> Option<String> {
    let source = CredentialSource::Cookie(cookies.policy().cookie_name.clone());
    extract_credential(headers, &source)
}

fn with_cookie(directive: &CookieDirective, body: &'static str) -> Response {
    match directive.to_header_value() {
        Ok(value) => (StatusCode::OK, [(SET_COOKIE, value)], body).into_response(),
        Err(err) => {
            error!("failed to render Set-Cookie header: {err}");
            status_body(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Give the session cookie an explicit lifetime.
#[instrument(skip_all)]
pub async fn set_auth_cookie_max_age(
    Extension(cookies): Extension<Arc<SessionCookieManager>>,
    headers: HeaderMap,
    form: Result<Form<SetAuthCookieMaxAge>, FormRejection>,
) -> Response {
    let Form(request) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!("invalid cookie max-age request: {rejection}");
            return status_body(StatusCode::BAD_REQUEST);
        }
    };

    let token = current_token(&headers, &cookies);

    match cookies.extend(token.as_deref(), request.max_age_seconds) {
        Ok(directive) => with_cookie(&directive, ""),
        Err(err) => err.into_response(),
    }
}

/// Turn the session cookie back into a browser-session cookie.
#[instrument(skip_all)]
pub async fn remove_cookie_expiration(
    Extension(cookies): Extension<Arc<SessionCookieManager>>,
    headers: HeaderMap,
) -> Response {
    let token = current_token(&headers, &cookies);

    match cookies.clear_expiration_attributes(token.as_deref()) {
        Ok(directive) => with_cookie(&directive, "Re-issued the auth cookie"),
        Err(err) => err.into_response(),
    }
}
