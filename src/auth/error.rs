//! Admission error taxonomy.
//!
//! Credential failures all collapse to the same 401 response so callers cannot
//! tell which check rejected them. The detailed variant is only visible in logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("credential missing")]
    CredentialMissing,

    #[error("credential malformed: {0}")]
    CredentialMalformed(String),

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("permission lookup failed: {0}")]
    PermissionLookupFailed(String),

    #[error("insufficient privilege")]
    InsufficientPrivilege,

    #[error("key material load failed: {0}")]
    KeyMaterialLoadFailed(String),
}

impl AdmissionError {
    /// Short, credential-free label used as the `reason` field in logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "credential_missing",
            Self::CredentialMalformed(_) => "credential_malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::TokenExpired => "token_expired",
            Self::PermissionLookupFailed(_) => "permission_lookup_failed",
            Self::InsufficientPrivilege => "insufficient_privilege",
            Self::KeyMaterialLoadFailed(_) => "key_material_load_failed",
        }
    }

    /// True for failures caused by the presented credential itself.
    #[must_use]
    pub const fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::CredentialMissing
                | Self::CredentialMalformed(_)
                | Self::SignatureInvalid
                | Self::TokenExpired
        )
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::CredentialMissing
            | Self::CredentialMalformed(_)
            | Self::SignatureInvalid
            | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::PermissionLookupFailed(_) | Self::InsufficientPrivilege => StatusCode::FORBIDDEN,
            Self::KeyMaterialLoadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body shared by every rejection, without the internal reason.
pub(crate) fn status_body(status: StatusCode) -> Response {
    let body = Json(json!({
        "statusCode": status.as_u16(),
        "message": status.canonical_reason().unwrap_or("Error"),
    }));
    (status, body).into_response()
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        status_body(self.status())
    }
}
