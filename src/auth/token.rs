//! Bearer token validation for the asymmetric and symmetric schemes.
//!
//! A token is accepted only when every check passes: structure, signature
//! under the key selected by the scheme, and an expiry strictly in the future.
//! The first failing check is reported; nothing is partially trusted.

use jsonwebtoken::{Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{
    error::AdmissionError,
    keys::{KeyMaterial, Scheme},
};

/// Signed token payload as issued by the login flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, an email-like identifier.
    #[serde(alias = "sub")]
    pub user: String,
    /// Expiry as unix seconds.
    pub exp: u64,
}

impl Claims {
    #[must_use]
    pub fn new(user: impl Into<String>, exp: u64) -> Self {
        Self {
            user: user.into(),
            exp,
        }
    }
}

/// Verified identity, only ever built from a validated token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityClaim {
    subject: String,
    scheme: Scheme,
    expires_at: u64,
}

impl IdentityClaim {
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub const fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

#[derive(Clone, Debug)]
pub struct TokenValidator {
    keys: Arc<KeyMaterial>,
}

impl TokenValidator {
    #[must_use]
    pub const fn new(keys: Arc<KeyMaterial>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    /// Validate `token` under `scheme` against the current wall-clock time.
    ///
    /// # Errors
    /// Returns a credential-class [`AdmissionError`] on any failure.
    pub fn validate(&self, token: &str, scheme: Scheme) -> Result<IdentityClaim, AdmissionError> {
        self.validate_at(token, scheme, jsonwebtoken::get_current_timestamp())
    }

    /// Validate `token` under `scheme` as of `now` (unix seconds).
    ///
    /// # Errors
    /// Returns a credential-class [`AdmissionError`] on any failure.
    #[instrument(skip(self, token))]
    pub fn validate_at(
        &self,
        token: &str,
        scheme: Scheme,
        now: u64,
    ) -> Result<IdentityClaim, AdmissionError> {
        let result = self.check(token, scheme, now);

        match &result {
            Ok(claim) => debug!(subject = claim.subject(), "token accepted"),
            Err(err) => warn!(reason = err.reason(), "token rejected: {err}"),
        }

        result
    }

    fn check(&self, token: &str, scheme: Scheme, now: u64) -> Result<IdentityClaim, AdmissionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AdmissionError::CredentialMissing);
        }

        // Expiry is checked below against `now`, with no leeway.
        let mut validation = Validation::new(scheme.algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, self.keys.decoding_key(scheme), &validation)
            .map_err(|err| classify(&err))?;
        let claims = data.claims;

        if claims.exp <= now {
            return Err(AdmissionError::TokenExpired);
        }

        let subject = claims.user.trim();
        if subject.is_empty() {
            return Err(AdmissionError::CredentialMalformed(
                "empty subject claim".to_string(),
            ));
        }

        Ok(IdentityClaim {
            subject: subject.to_string(),
            scheme,
            expires_at: claims.exp,
        })
    }
}

fn classify(err: &jsonwebtoken::errors::Error) -> AdmissionError {
    match err.kind() {
        // A token signed under the other scheme carries the other algorithm.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AdmissionError::SignatureInvalid,
        ErrorKind::ExpiredSignature => AdmissionError::TokenExpired,
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AdmissionError::CredentialMalformed(format!("key rejected token: {err}"))
        }
        _ => AdmissionError::CredentialMalformed(err.to_string()),
    }
}
