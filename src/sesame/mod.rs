//! HTTP surface: router assembly and server start-up.

use crate::auth::{
    Admission, CookiePolicy, KeyMaterial, PermissionResolver, PgPermissionResolver,
    RoutePolicyTable, SessionCookieManager, TokenValidator, admit, policy::routes,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;

pub mod handlers;

use handlers::{auth_utils, csrf, health, root, users};

const REQUEST_ID: &str = "x-request-id";

/// Build the router. Every route is registered from [`routes`] and admitted
/// through the policy table held by `admission`.
#[must_use]
pub fn router(admission: Admission, cookies: Arc<SessionCookieManager>) -> Router {
    Router::new()
        .route(routes::ROOT, get(root::root))
        .route(routes::HEALTH, get(health::health).options(health::health))
        .route(routes::USER_INFO, get(users::user_info))
        .route(routes::ADMIN_PERMISSION, get(users::admin_permission))
        .route(routes::CSRF_POST, post(csrf::post_csrf))
        .route(
            routes::SET_AUTH_COOKIE_MAX_AGE,
            post(auth_utils::set_auth_cookie_max_age),
        )
        .route(
            routes::REMOVE_COOKIE_EXPIRATION,
            get(auth_utils::remove_cookie_expiration),
        )
        .route_layer(middleware::from_fn_with_state(admission.clone(), admit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(admission))
                .layer(Extension(cookies)),
        )
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable or the listener cannot bind
pub async fn new(
    port: u16,
    dsn: &str,
    keys: KeyMaterial,
    cookie_policy: CookiePolicy,
    permission_timeout: Duration,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let validator = TokenValidator::new(Arc::new(keys));
    let resolver: Arc<dyn PermissionResolver> = Arc::new(PgPermissionResolver::new(pool));
    let table = RoutePolicyTable::standard(&cookie_policy.cookie_name);

    let admission = Admission::new(validator.clone(), resolver, table)
        .with_permission_timeout(permission_timeout);
    let cookies = Arc::new(SessionCookieManager::new(validator, cookie_policy));

    let app = router(admission, cookies);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
