#![allow(dead_code)]

// Shared helpers for integration tests.
//
// Cookies are parsed and re-encoded with `tower_cookies::Cookie` so that values containing the
// `|` field separator travel exactly as a browser would send them.
use axum::{Router, body::Body, http::StatusCode, routing::get};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::{HeaderMap, Request, Response, header};
use http_body_util::BodyExt as _;
use tower::ServiceExt as _;
use tower_cookies::Cookie;
use tower_scs::{DEFAULT_SERVICE_NAME, Keyring, ScsConfig, ScsLayer, ScsSession};

pub const STATE: &str = "user=alice;role=reader";

pub fn keyring(transformation_id: &str, seed: u8) -> Keyring {
    Keyring::new()
        .with_transformation(transformation_id, [seed; 32], &[seed.wrapping_add(1); 20])
        .expect("transformation is valid")
        .with_service(DEFAULT_SERVICE_NAME, transformation_id)
        .expect("service maps to transformation")
}

pub fn routes() -> Router {
    Router::new()
        .route("/", get(|_: ScsSession| async move { "Hello, world!" }))
        .route(
            "/set",
            get(|session: ScsSession| async move {
                session.set(STATE);
            }),
        )
        .route(
            "/get",
            get(|session: ScsSession| async move {
                session.get().unwrap_or_else(|| "none".to_string())
            }),
        )
        .route(
            "/clear",
            get(|session: ScsSession| async move {
                session.clear();
            }),
        )
        .route(
            "/issued_at",
            get(|session: ScsSession| async move {
                session
                    .issued_at()
                    .map(|at| at.unix_timestamp().to_string())
                    .unwrap_or_else(|| "none".to_string())
            }),
        )
        .route(
            "/big",
            get(|session: ScsSession| async move {
                session.set("x".repeat(8192));
            }),
        )
        .route(
            "/fail",
            get(|session: ScsSession| async move {
                session.set(STATE);
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        )
}

pub fn app(keyring: Keyring, config: ScsConfig) -> Router {
    routes().layer(ScsLayer::new(keyring).with_config(config))
}

pub async fn body_string(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn send(app: &Router, uri: &str, cookie: Option<&Cookie<'_>>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie_header_value(cookie));
    }
    let req = builder
        .body(Body::empty())
        .expect("request builds successfully");
    app.clone()
        .oneshot(req)
        .await
        .expect("service call succeeds")
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    get_session_cookie_from_headers(res.headers())
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    cookie.encoded().to_string()
}

/// The base64url-decoded field `index` of a serialized token.
pub fn token_field(value: &str, index: usize) -> Vec<u8> {
    let field = value
        .split('|')
        .nth(index)
        .expect("token has the requested field");
    URL_SAFE_NO_PAD
        .decode(field)
        .expect("token field is base64url")
}
