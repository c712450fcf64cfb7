//! Admission guard chain.
//!
//! Flow Overview:
//! 1) Look up the matched route in the policy table (unknown routes fail closed).
//! 2) Extract the credential from the source the route declares.
//! 3) Validate it under the route's scheme.
//! 4) For admin routes only, ask the permission resolver, bounded by a timeout.
//!
//! Verdicts are terminal: missing or invalid credentials yield 401, a valid
//! credential without admin rights (or a failed lookup) yields 403. On Allow the
//! `IdentityClaim` is attached to the request extensions.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

use super::{
    error::{AdmissionError, status_body},
    permission::PermissionResolver,
    policy::{Access, CredentialSource, RoutePolicy, RoutePolicyTable},
    token::{IdentityClaim, TokenValidator},
};

pub const DEFAULT_PERMISSION_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allow(IdentityClaim),
    Unauthorized(AdmissionError),
    Forbidden(AdmissionError),
}

impl Verdict {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Allow(_) => StatusCode::OK,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

#[derive(Clone)]
pub struct Admission {
    validator: TokenValidator,
    resolver: Arc<dyn PermissionResolver>,
    table: Arc<RoutePolicyTable>,
    permission_timeout: Duration,
}

impl fmt::Debug for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admission")
            .field("table", &self.table)
            .field("permission_timeout", &self.permission_timeout)
            .finish_non_exhaustive()
    }
}

impl Admission {
    #[must_use]
    pub fn new(
        validator: TokenValidator,
        resolver: Arc<dyn PermissionResolver>,
        table: RoutePolicyTable,
    ) -> Self {
        Self {
            validator,
            resolver,
            table: Arc::new(table),
            permission_timeout: DEFAULT_PERMISSION_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_permission_timeout(mut self, permission_timeout: Duration) -> Self {
        self.permission_timeout = permission_timeout;
        self
    }

    #[must_use]
    pub fn table(&self) -> &RoutePolicyTable {
        &self.table
    }

    /// Run the guard chain for one request against `policy`.
    #[instrument(skip(self, policy, headers), fields(scheme = %policy.scheme, require_admin = policy.require_admin))]
    pub async fn evaluate(&self, route: &str, policy: &RoutePolicy, headers: &HeaderMap) -> Verdict {
        let Some(token) = extract_credential(headers, &policy.source) else {
            let err = AdmissionError::CredentialMissing;
            warn!(reason = err.reason(), "admission rejected");
            return Verdict::Unauthorized(err);
        };

        let claim = match self.validator.validate(&token, policy.scheme) {
            Ok(claim) => claim,
            Err(err) => {
                warn!(reason = err.reason(), "admission rejected");
                return Verdict::Unauthorized(err);
            }
        };

        if !policy.require_admin {
            debug!(subject = claim.subject(), "admission granted");
            return Verdict::Allow(claim);
        }

        match self.resolve_admin(claim.subject()).await {
            Ok(true) => {
                debug!(subject = claim.subject(), "admin admission granted");
                Verdict::Allow(claim)
            }
            Ok(false) => {
                let err = AdmissionError::InsufficientPrivilege;
                warn!(subject = claim.subject(), reason = err.reason(), "admission forbidden");
                Verdict::Forbidden(err)
            }
            Err(err) => {
                error!(subject = claim.subject(), reason = err.reason(), "admission forbidden: {err}");
                Verdict::Forbidden(err)
            }
        }
    }

    /// Ask the resolver whether `subject` is an admin, bounded by the
    /// permission timeout.
    ///
    /// # Errors
    /// Returns `PermissionLookupFailed` if the resolver fails or times out.
    pub async fn resolve_admin(&self, subject: &str) -> Result<bool, AdmissionError> {
        match timeout(self.permission_timeout, self.resolver.is_admin(subject)).await {
            Ok(Ok(is_admin)) => Ok(is_admin),
            Ok(Err(err)) => Err(AdmissionError::PermissionLookupFailed(format!("{err:#}"))),
            Err(_) => Err(AdmissionError::PermissionLookupFailed(format!(
                "timed out after {}ms",
                self.permission_timeout.as_millis()
            ))),
        }
    }
}

/// Axum middleware enforcing the policy table. Apply with `route_layer` so the
/// matched route is known.
pub async fn admit(State(admission): State<Admission>, mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let Some(route) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
    else {
        error!(%method, "admission middleware used without a matched route");
        return status_body(StatusCode::UNAUTHORIZED);
    };

    let policy = match admission.table().lookup(&method, &route) {
        Some(Access::Public) => return next.run(request).await,
        Some(Access::Protected(policy)) => policy,
        None => {
            error!(%method, route = %route, "no admission policy for route");
            return status_body(StatusCode::UNAUTHORIZED);
        }
    };

    let verdict = admission.evaluate(&route, policy, request.headers()).await;

    match verdict {
        Verdict::Allow(claim) => {
            request.extensions_mut().insert(claim);
            next.run(request).await
        }
        Verdict::Unauthorized(err) | Verdict::Forbidden(err) => err.into_response(),
    }
}

/// Read the credential from the declared source only.
#[must_use]
pub fn extract_credential(headers: &HeaderMap, source: &CredentialSource) -> Option<String> {
    match source {
        CredentialSource::BearerHeader => extract_bearer_token(headers),
        CredentialSource::Cookie(name) => extract_cookie(headers, name),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name {
                let val = val.trim();
                return if val.is_empty() {
                    None
                } else {
                    Some(val.to_string())
                };
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        keys::{Scheme, fixtures},
        permission::mock::{Answer, MockResolver},
        policy::DEFAULT_AUTH_COOKIE,
        token::Claims,
    };
    use axum::http::HeaderValue;

    const SUBJECT: &str = "a@example.com";
    const ROUTE: &str = "/test";

    fn admission(resolver: Arc<MockResolver>) -> Admission {
        let validator = TokenValidator::new(Arc::new(fixtures::key_material()));
        Admission::new(validator, resolver, RoutePolicyTable::new())
            .with_permission_timeout(Duration::from_millis(50))
    }

    fn token(admission: &Admission, scheme: Scheme, ttl: i64) -> String {
        let exp = jsonwebtoken::get_current_timestamp().saturating_add_signed(ttl);
        admission
            .validator
            .keys()
            .sign(&Claims::new(SUBJECT, exp), scheme)
            .unwrap_or_else(|err| panic!("signing failed: {err}"))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn admin_policy() -> RoutePolicy {
        RoutePolicy::admin(CredentialSource::BearerHeader, Scheme::Asymmetric)
    }

    #[tokio::test]
    async fn missing_credential_is_unauthorized_without_resolver_call() {
        let resolver = Arc::new(MockResolver::new(Answer::Admin));
        let admission = admission(resolver.clone());

        let verdict = admission
            .evaluate(ROUTE, &admin_policy(), &HeaderMap::new())
            .await;

        assert_eq!(verdict, Verdict::Unauthorized(AdmissionError::CredentialMissing));
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_credential_is_unauthorized_without_resolver_call() {
        let resolver = Arc::new(MockResolver::new(Answer::Admin));
        let admission = admission(resolver.clone());
        let expired = token(&admission, Scheme::Asymmetric, -30);

        let verdict = admission
            .evaluate(ROUTE, &admin_policy(), &bearer(&expired))
            .await;

        assert_eq!(verdict, Verdict::Unauthorized(AdmissionError::TokenExpired));
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn non_admin_route_never_consults_resolver() {
        let resolver = Arc::new(MockResolver::new(Answer::NotAdmin));
        let admission = admission(resolver.clone());
        let policy = RoutePolicy::authenticated(CredentialSource::BearerHeader, Scheme::Symmetric);
        let valid = token(&admission, Scheme::Symmetric, 600);

        let verdict = admission.evaluate(ROUTE, &policy, &bearer(&valid)).await;

        let Verdict::Allow(claim) = verdict else {
            panic!("expected allow, got {verdict:?}");
        };
        assert_eq!(claim.subject(), SUBJECT);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn admin_route_allows_admin() {
        let resolver = Arc::new(MockResolver::new(Answer::Admin));
        let admission = admission(resolver.clone());
        let valid = token(&admission, Scheme::Asymmetric, 600);

        let verdict = admission.evaluate(ROUTE, &admin_policy(), &bearer(&valid)).await;

        assert!(matches!(verdict, Verdict::Allow(ref claim) if claim.subject() == SUBJECT));
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn admin_route_forbids_non_admin() {
        let resolver = Arc::new(MockResolver::new(Answer::NotAdmin));
        let admission = admission(resolver.clone());
        let valid = token(&admission, Scheme::Asymmetric, 600);

        let verdict = admission.evaluate(ROUTE, &admin_policy(), &bearer(&valid)).await;

        assert_eq!(verdict, Verdict::Forbidden(AdmissionError::InsufficientPrivilege));
        assert_eq!(verdict.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn resolver_failure_and_timeout_degrade_to_forbidden() {
        for answer in [Answer::Fail, Answer::Hang] {
            let resolver = Arc::new(MockResolver::new(answer));
            let admission = admission(resolver.clone());
            let valid = token(&admission, Scheme::Asymmetric, 600);

            let verdict = admission.evaluate(ROUTE, &admin_policy(), &bearer(&valid)).await;

            assert!(
                matches!(verdict, Verdict::Forbidden(AdmissionError::PermissionLookupFailed(_))),
                "{answer:?}: {verdict:?}"
            );
            assert_eq!(resolver.calls(), 1);
        }
    }

    #[tokio::test]
    async fn cookie_route_ignores_bearer_header() {
        let resolver = Arc::new(MockResolver::new(Answer::Admin));
        let admission = admission(resolver);
        let policy = RoutePolicy::authenticated(
            CredentialSource::Cookie(DEFAULT_AUTH_COOKIE.to_string()),
            Scheme::Asymmetric,
        );
        let valid = token(&admission, Scheme::Asymmetric, 600);

        let verdict = admission.evaluate(ROUTE, &policy, &bearer(&valid)).await;
        assert_eq!(verdict, Verdict::Unauthorized(AdmissionError::CredentialMissing));

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {DEFAULT_AUTH_COOKIE}={valid}")).unwrap(),
        );
        let verdict = admission.evaluate(ROUTE, &policy, &headers).await;
        assert!(matches!(verdict, Verdict::Allow(_)));
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(
            extract_credential(&bearer("abc"), &CredentialSource::BearerHeader),
            Some("abc".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_credential(&headers, &CredentialSource::BearerHeader), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_credential(&headers, &CredentialSource::BearerHeader), None);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        for value in ["BEARER abc", "bEaReR abc", "bearer  abc "] {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            assert_eq!(
                extract_credential(&headers, &CredentialSource::BearerHeader),
                Some("abc".to_string()),
                "{value}"
            );
        }

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearerabc"));
        assert_eq!(extract_credential(&headers, &CredentialSource::BearerHeader), None);
    }

    #[test]
    fn extracts_named_cookie_across_headers() {
        let source = CredentialSource::Cookie("authorization".to_string());
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; b=2"));
        headers.append(COOKIE, HeaderValue::from_static("authorization=tok.en.sig"));
        assert_eq!(
            extract_credential(&headers, &source),
            Some("tok.en.sig".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("authorization="));
        assert_eq!(extract_credential(&headers, &source), None);
    }
}
