use axum::{
    http::{HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Json},
};
use serde::Serialize;

use crate::GIT_COMMIT_HASH;

#[derive(Serialize, Debug)]
pub struct Health {
    commit: &'static str,
    name: &'static str,
    version: &'static str,
}

// axum handler for health; OPTIONS answers with headers only
pub async fn health(method: Method) -> impl IntoResponse {
    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        GIT_COMMIT_HASH.get(0..7).unwrap_or("")
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )) {
        headers.insert("X-App", value);
    }

    if method == Method::OPTIONS {
        return headers.into_response();
    }

    let health = Health {
        commit: GIT_COMMIT_HASH,
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    };

    (headers, Json(health)).into_response()
}
