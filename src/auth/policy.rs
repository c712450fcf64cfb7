//! Static route policy table.
//!
//! Every route served by the router has exactly one entry here, keyed by
//! method and route pattern. The router registers its paths from the same
//! constants, so a route cannot exist without a policy decision.

use axum::http::Method;
use std::collections::HashMap;

use super::keys::Scheme;

/// Default name of the cookie carrying the session token.
pub const DEFAULT_AUTH_COOKIE: &str = "authorization";

pub mod routes {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const USER_INFO: &str = "/api/users/one/{email}/info";
    pub const ADMIN_PERMISSION: &str = "/api/users/one/{email}/adminpermission";
    pub const CSRF_POST: &str = "/api/csrf/postCsrf";
    pub const SET_AUTH_COOKIE_MAX_AGE: &str = "/api/authUtils/setAuthCookieMaxAge";
    pub const REMOVE_COOKIE_EXPIRATION: &str = "/api/authUtils/removeCookieExpiration";
}

/// Where a route expects its credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// Named cookie.
    Cookie(String),
    /// `Authorization: Bearer <token>` header.
    BearerHeader,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePolicy {
    pub source: CredentialSource,
    pub scheme: Scheme,
    pub require_admin: bool,
}

impl RoutePolicy {
    #[must_use]
    pub const fn authenticated(source: CredentialSource, scheme: Scheme) -> Self {
        Self {
            source,
            scheme,
            require_admin: false,
        }
    }

    #[must_use]
    pub const fn admin(source: CredentialSource, scheme: Scheme) -> Self {
        Self {
            source,
            scheme,
            require_admin: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(RoutePolicy),
}

#[derive(Clone, Debug, Default)]
pub struct RoutePolicyTable {
    entries: HashMap<(Method, String), Access>,
}

impl RoutePolicyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The table for every route this service exposes.
    #[must_use]
    pub fn standard(auth_cookie: &str) -> Self {
        let cookie = || CredentialSource::Cookie(auth_cookie.to_string());

        Self::new()
            .with(Method::GET, routes::ROOT, Access::Public)
            .with(Method::GET, routes::HEALTH, Access::Public)
            .with(Method::OPTIONS, routes::HEALTH, Access::Public)
            .with(
                Method::GET,
                routes::USER_INFO,
                Access::Protected(RoutePolicy::authenticated(
                    CredentialSource::BearerHeader,
                    Scheme::Asymmetric,
                )),
            )
            .with(
                Method::GET,
                routes::ADMIN_PERMISSION,
                Access::Protected(RoutePolicy::admin(
                    CredentialSource::BearerHeader,
                    Scheme::Asymmetric,
                )),
            )
            .with(
                Method::POST,
                routes::CSRF_POST,
                Access::Protected(RoutePolicy::authenticated(
                    CredentialSource::BearerHeader,
                    Scheme::Symmetric,
                )),
            )
            .with(
                Method::POST,
                routes::SET_AUTH_COOKIE_MAX_AGE,
                Access::Protected(RoutePolicy::authenticated(cookie(), Scheme::Asymmetric)),
            )
            .with(
                Method::GET,
                routes::REMOVE_COOKIE_EXPIRATION,
                Access::Protected(RoutePolicy::authenticated(cookie(), Scheme::Asymmetric)),
            )
    }

    #[must_use]
    pub fn with(mut self, method: Method, route: &str, access: Access) -> Self {
        self.entries.insert((method, route.to_string()), access);
        self
    }

    /// Look up the policy for a matched route. `HEAD` falls back to `GET`.
    #[must_use]
    pub fn lookup(&self, method: &Method, route: &str) -> Option<&Access> {
        self.entries
            .get(&(method.clone(), route.to_string()))
            .or_else(|| {
                if *method == Method::HEAD {
                    self.entries.get(&(Method::GET, route.to_string()))
                } else {
                    None
                }
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Method, &str, &Access)> {
        self.entries
            .iter()
            .map(|((method, route), access)| (method, route.as_str(), access))
    }
}
