use axum::{
    Extension,
    extract::Query,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::auth::IdentityClaim;

#[derive(Deserialize, Debug)]
pub struct CsrfParams {
    param: String,
}

#[derive(Serialize, Debug)]
pub struct CsrfEcho {
    param: String,
    subject: String,
}

/// Echo `param` back to the verified caller.
#[instrument(skip(claim, params))]
pub async fn post_csrf(
    Query(params): Query<CsrfParams>,
    Extension(claim): Extension<IdentityClaim>,
) -> impl IntoResponse {
    debug!(subject = claim.subject(), "csrf echo");

    Json(CsrfEcho {
        param: params.param,
        subject: claim.subject().to_string(),
    })
}
