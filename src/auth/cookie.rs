//! Session cookie attribute management.
//!
//! Flow Overview:
//! - `extend` re-issues the current token with an explicit max-age and
//!   cross-site-capable attributes (bounded cookie).
//! - `clear_expiration_attributes` re-issues the current token with max-age,
//!   same-site and secure stripped, so the browser keeps it for the session only
//!   (unbounded cookie).
//!
//! Security boundaries: both operations validate the *current* token
//! themselves and refuse to produce a directive when it is not valid. The
//! token value is copied as-is; its claims and expiry are never touched.
//!
//! Dropping same-site on `clear_expiration_attributes`, and issuing
//! `SameSite=None` on `extend`, weakens cross-site request protection on
//! purpose: clients embedding the service cross-site depend on it. The
//! same-site value used by `extend` is configurable through `CookiePolicy`.

use axum::http::{HeaderValue, header::InvalidHeaderValue};
use std::{fmt, str::FromStr, time::Duration};
use tracing::{info, instrument, warn};

use super::{
    error::AdmissionError,
    keys::Scheme,
    policy::DEFAULT_AUTH_COOKIE,
    token::TokenValidator,
};

/// A cookie attribute that is either explicitly set or explicitly unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attr<T> {
    Unset,
    Set(T),
}

impl<T> Attr<T> {
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

impl SameSite {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            other => Err(format!("invalid same-site policy: {other}")),
        }
    }
}

/// A fully specified `Set-Cookie` instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieDirective {
    name: String,
    value: String,
    max_age: Attr<Duration>,
    same_site: Attr<SameSite>,
    secure: Attr<bool>,
    http_only: Attr<bool>,
    domain: Attr<String>,
    path: Attr<String>,
}

impl CookieDirective {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn max_age(&self) -> Attr<Duration> {
        self.max_age
    }

    #[must_use]
    pub const fn same_site(&self) -> Attr<SameSite> {
        self.same_site
    }

    #[must_use]
    pub const fn secure(&self) -> Attr<bool> {
        self.secure
    }

    #[must_use]
    pub const fn http_only(&self) -> Attr<bool> {
        self.http_only
    }

    #[must_use]
    pub const fn domain(&self) -> &Attr<String> {
        &self.domain
    }

    #[must_use]
    pub const fn path(&self) -> &Attr<String> {
        &self.path
    }

    /// Render as a `Set-Cookie` header value.
    ///
    /// # Errors
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for CookieDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        // Max-Age is in seconds on the wire.
        if let Attr::Set(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }
        // An empty domain means host-only, which is expressed by omission.
        if let Attr::Set(domain) = &self.domain {
            if !domain.is_empty() {
                write!(f, "; Domain={domain}")?;
            }
        }
        if let Attr::Set(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if self.http_only == Attr::Set(true) {
            f.write_str("; HttpOnly")?;
        }
        if self.secure == Attr::Set(true) {
            f.write_str("; Secure")?;
        }
        if let Attr::Set(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CookiePolicy {
    pub cookie_name: String,
    /// Scheme the current cookie token is validated under.
    pub scheme: Scheme,
    /// Same-site value issued by `extend`.
    pub extend_same_site: SameSite,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_AUTH_COOKIE.to_string(),
            scheme: Scheme::Asymmetric,
            extend_same_site: SameSite::None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionCookieManager {
    validator: TokenValidator,
    policy: CookiePolicy,
}

impl SessionCookieManager {
    #[must_use]
    pub const fn new(validator: TokenValidator, policy: CookiePolicy) -> Self {
        Self { validator, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    /// Re-issue the current token with an explicit lifetime of `seconds`.
    ///
    /// The caller owns the bound: no upper limit is applied.
    ///
    /// # Errors
    /// Returns a credential-class error if the current token is not valid.
    #[instrument(skip(self, current_token))]
    pub fn extend(
        &self,
        current_token: Option<&str>,
        seconds: u64,
    ) -> Result<CookieDirective, AdmissionError> {
        let token = self.verify_current(current_token)?;

        info!("extending session cookie lifetime");

        Ok(CookieDirective {
            name: self.policy.cookie_name.clone(),
            value: token,
            max_age: Attr::Set(Duration::from_secs(seconds)),
            same_site: Attr::Set(self.policy.extend_same_site),
            secure: Attr::Set(true),
            http_only: Attr::Set(true),
            domain: Attr::Set(String::new()),
            path: Attr::Set("/".to_string()),
        })
    }

    /// Re-issue the current token as a browser-session cookie.
    ///
    /// # Errors
    /// Returns a credential-class error if the current token is not valid.
    #[instrument(skip(self, current_token))]
    pub fn clear_expiration_attributes(
        &self,
        current_token: Option<&str>,
    ) -> Result<CookieDirective, AdmissionError> {
        let token = self.verify_current(current_token)?;

        info!("clearing session cookie expiration attributes");

        Ok(CookieDirective {
            name: self.policy.cookie_name.clone(),
            value: token,
            max_age: Attr::Unset,
            same_site: Attr::Unset,
            secure: Attr::Unset,
            http_only: Attr::Set(true),
            domain: Attr::Set(String::new()),
            path: Attr::Set("/".to_string()),
        })
    }

    fn verify_current(&self, current_token: Option<&str>) -> Result<String, AdmissionError> {
        let token = current_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AdmissionError::CredentialMissing)
            .inspect_err(|err| warn!(reason = err.reason(), "cookie update refused"))?;

        self.validator.validate(token, self.policy.scheme)?;

        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{keys::fixtures, token::Claims};
    use std::sync::Arc;

    fn manager() -> SessionCookieManager {
        let validator = TokenValidator::new(Arc::new(fixtures::key_material()));
        SessionCookieManager::new(validator, CookiePolicy::default())
    }

    fn token(manager: &SessionCookieManager, scheme: Scheme, ttl: i64) -> String {
        let exp = jsonwebtoken::get_current_timestamp().saturating_add_signed(ttl);
        manager
            .validator
            .keys()
            .sign(&Claims::new("a@example.com", exp), scheme)
            .unwrap_or_else(|err| panic!("signing failed: {err}"))
    }

    #[test]
    fn extend_sets_bounded_cross_site_attributes() {
        let manager = manager();
        let current = token(&manager, Scheme::Asymmetric, 600);

        let directive = manager.extend(Some(&current), 300).unwrap();

        assert_eq!(directive.name(), "authorization");
        assert_eq!(directive.value(), current);
        assert_eq!(directive.max_age(), Attr::Set(Duration::from_millis(300_000)));
        assert_eq!(directive.same_site(), Attr::Set(SameSite::None));
        assert_eq!(directive.secure(), Attr::Set(true));
        assert_eq!(directive.http_only(), Attr::Set(true));
        assert_eq!(directive.domain(), &Attr::Set(String::new()));
        assert_eq!(directive.path(), &Attr::Set("/".to_string()));
        assert_eq!(
            directive.to_string(),
            format!("authorization={current}; Max-Age=300; Path=/; HttpOnly; Secure; SameSite=None")
        );
    }

    #[test]
    fn extend_keeps_token_valid() {
        let manager = manager();
        let current = token(&manager, Scheme::Asymmetric, 600);

        let directive = manager.extend(Some(&current), 3600).unwrap();

        assert!(
            manager
                .validator
                .validate(directive.value(), Scheme::Asymmetric)
                .is_ok()
        );
    }

    #[test]
    fn extend_applies_no_upper_bound() {
        let manager = manager();
        let current = token(&manager, Scheme::Asymmetric, 600);

        let directive = manager.extend(Some(&current), u64::MAX).unwrap();
        assert_eq!(directive.max_age(), Attr::Set(Duration::from_secs(u64::MAX)));
        assert!(
            directive
                .to_string()
                .contains(&format!("; Max-Age={}; ", u64::MAX))
        );

        let directive = manager.extend(Some(&current), 0).unwrap();
        assert_eq!(directive.max_age(), Attr::Set(Duration::ZERO));
    }

    #[test]
    fn clear_strips_max_age_same_site_and_secure() {
        let manager = manager();
        let current = token(&manager, Scheme::Asymmetric, 600);

        let directive = manager.clear_expiration_attributes(Some(&current)).unwrap();

        assert_eq!(directive.max_age(), Attr::Unset);
        assert_eq!(directive.same_site(), Attr::Unset);
        assert_eq!(directive.secure(), Attr::Unset);
        assert_eq!(directive.http_only(), Attr::Set(true));
        assert_eq!(directive.value(), current);
        assert_eq!(
            directive.to_string(),
            format!("authorization={current}; Path=/; HttpOnly")
        );
    }

    #[test]
    fn expired_or_missing_token_produces_no_directive() {
        let manager = manager();
        let expired = token(&manager, Scheme::Asymmetric, -5);

        assert_eq!(
            manager.extend(Some(&expired), 300),
            Err(AdmissionError::TokenExpired)
        );
        assert_eq!(
            manager.clear_expiration_attributes(Some(&expired)),
            Err(AdmissionError::TokenExpired)
        );
        assert_eq!(manager.extend(None, 300), Err(AdmissionError::CredentialMissing));
        assert_eq!(
            manager.clear_expiration_attributes(Some("")),
            Err(AdmissionError::CredentialMissing)
        );
    }

    #[test]
    fn symmetric_cookie_token_is_refused() {
        let manager = manager();
        let current = token(&manager, Scheme::Symmetric, 600);

        assert_eq!(
            manager.extend(Some(&current), 300),
            Err(AdmissionError::SignatureInvalid)
        );
    }

    #[test]
    fn extend_same_site_follows_policy() {
        let validator = TokenValidator::new(Arc::new(fixtures::key_material()));
        let manager = SessionCookieManager::new(
            validator,
            CookiePolicy {
                extend_same_site: SameSite::Lax,
                ..CookiePolicy::default()
            },
        );
        let current = token(&manager, Scheme::Asymmetric, 600);

        let directive = manager.extend(Some(&current), 60).unwrap();
        assert_eq!(directive.same_site(), Attr::Set(SameSite::Lax));
    }

    #[test]
    fn renders_non_empty_domain() {
        let directive = CookieDirective {
            name: "authorization".to_string(),
            value: "v".to_string(),
            max_age: Attr::Unset,
            same_site: Attr::Set(SameSite::Strict),
            secure: Attr::Set(false),
            http_only: Attr::Unset,
            domain: Attr::Set("example.com".to_string()),
            path: Attr::Unset,
        };
        assert_eq!(
            directive.to_string(),
            "authorization=v; Domain=example.com; SameSite=Strict"
        );
    }

    #[test]
    fn same_site_parses_case_insensitively() {
        assert_eq!("NONE".parse::<SameSite>(), Ok(SameSite::None));
        assert_eq!("lax".parse::<SameSite>(), Ok(SameSite::Lax));
        assert_eq!("Strict".parse::<SameSite>(), Ok(SameSite::Strict));
        assert!("sometimes".parse::<SameSite>().is_err());
    }
}
