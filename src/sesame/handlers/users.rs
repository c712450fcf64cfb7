use axum::{
    Extension,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{instrument, warn};

use super::valid_email;
use crate::auth::{Admission, IdentityClaim, error::status_body};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    email: String,
    scheme: &'static str,
    expires_at: u64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    email: String,
    is_admin: bool,
    requested_by: String,
}

/// Identity of the caller. A token may only read its own profile.
#[instrument(skip(claim))]
pub async fn user_info(
    Path(email): Path<String>,
    Extension(claim): Extension<IdentityClaim>,
) -> Response {
    if !valid_email(&email) {
        return status_body(StatusCode::BAD_REQUEST);
    }

    if claim.subject() != email {
        warn!(subject = claim.subject(), "profile of another user requested");
        return status_body(StatusCode::FORBIDDEN);
    }

    Json(UserInfo {
        email,
        scheme: claim.scheme().as_str(),
        expires_at: claim.expires_at(),
    })
    .into_response()
}

/// Admin flag of `email`. Only reachable by admins.
#[instrument(skip(claim, admission))]
pub async fn admin_permission(
    Path(email): Path<String>,
    Extension(claim): Extension<IdentityClaim>,
    Extension(admission): Extension<Admission>,
) -> Response {
    if !valid_email(&email) {
        return status_body(StatusCode::BAD_REQUEST);
    }

    match admission.resolve_admin(&email).await {
        Ok(is_admin) => Json(Permission {
            email,
            is_admin,
            requested_by: claim.subject().to_string(),
        })
        .into_response(),
        Err(err) => {
            warn!(reason = err.reason(), "admin flag lookup failed: {err}");
            err.into_response()
        }
    }
}
