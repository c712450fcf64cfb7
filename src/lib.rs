//! # Sesame
//!
//! `sesame` is an admission gateway: it decides, per route, whether an incoming
//! request carries a valid bearer token or session cookie, and whether the
//! caller holds admin rights where a route demands them.
//!
//! ## Token schemes
//!
//! Tokens are JWTs signed under one of two schemes. `RS256` (RSA key pair) backs
//! the session cookie and the profile/admin routes; `HS256` (shared secret) is
//! kept for a narrow legacy surface. The scheme is a property of the route, and
//! a token signed under the other scheme is rejected.
//!
//! ## Admission
//!
//! Each route is declared once in the route policy table with its credential
//! source, scheme and admin requirement. Requests for routes missing from the
//! table are rejected. Admin rights are read from the user store on every
//! request and are never cached.
//!
//! ## Session cookie
//!
//! Two endpoints let an authenticated browser change the lifetime attributes of
//! its own session cookie. The token is never re-signed.

pub mod auth;
pub mod cli;
pub mod sesame;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
