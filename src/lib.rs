//! Secure Cookie Session (SCS) for `tower`.
//!
//! Session state lives entirely in the client's cookie: it is optionally deflated, encrypted,
//! and authenticated into a compact token, so the server keeps no session storage.
//!
//! The pieces:
//! - [`ScsCodec`] turns a state string into a [`Token`] and back. Decoding verifies the
//!   authentication tag before it decrypts anything, then enforces the maximum session age.
//! - [`CryptoService`] is the seam for the cryptographic primitives. With the `keyring` feature
//!   (default) [`Keyring`] provides AES-256-GCM encryption and HMAC-SHA256 tags with support for
//!   key rotation.
//! - [`ScsLayer`] is a `tower` layer that reads the cookie, exposes the state as an
//!   [`ScsSession`] request extension (and axum extractor with the `axum` feature), and writes
//!   the cookie back when the state changes.
//!
//! # Security
//! Anyone holding the crypto service's keys can mint sessions. There is no server-side
//! revocation: a token stays valid until it ages past the configured maximum age or its
//! transformation is removed from the crypto service.

mod codec;
pub mod compress;
mod config;
mod crypto;
mod error;
mod layer;
mod session;

#[cfg(feature = "keyring")]
mod keyring;

pub use tower_cookies::cookie::SameSite;

pub use crate::codec::{ScsCodec, Token};
pub use crate::config::{
    CodecSettings, DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_SECS, DEFAULT_SERVICE_NAME, ScsConfig,
};
pub use crate::crypto::CryptoService;
pub use crate::error::{CryptoError, Result, ScsError};
pub use crate::layer::{ScsLayer, ScsManager};
pub use crate::session::ScsSession;

#[cfg(feature = "keyring")]
pub use crate::keyring::{KEY_SIZE, Keyring, NONCE_SIZE};

#[cfg(all(test, feature = "keyring"))]
mod tests {
    use std::convert::Infallible;

    use axum::body::Body;
    use http::{Request, Response, header};
    use tower::{ServiceBuilder, ServiceExt as _};

    use crate::{Keyring, ScsConfig, ScsLayer, ScsSession};

    async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let session = req
            .extensions()
            .get::<ScsSession>()
            .cloned()
            .expect("request includes ScsSession extension");

        session.set("user=42");

        Ok(Response::new(Body::empty()))
    }

    async fn noop_handler(_: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    fn make_layer(config: ScsConfig) -> ScsLayer<Keyring> {
        ScsLayer::new(Keyring::generate(crate::DEFAULT_SERVICE_NAME)).with_config(config)
    }

    #[tokio::test]
    async fn basic_service_test() {
        let svc = ServiceBuilder::new()
            .layer(make_layer(ScsConfig::default()))
            .service_fn(handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .expect("response includes set-cookie header")
            .to_str()
            .expect("set-cookie header is valid utf-8");
        assert!(set_cookie.starts_with("SCS="));
    }

    #[tokio::test]
    async fn no_set_cookie_test() {
        let svc = ServiceBuilder::new()
            .layer(make_layer(ScsConfig::default()))
            .service_fn(noop_handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn codec_is_shared_with_layer() {
        let layer = make_layer(ScsConfig::default().with_name("sid"));
        let token = layer.codec().encode("cart=1").expect("encode succeeds");
        let decoded = layer
            .codec()
            .decode(&token.serialize())
            .expect("decode succeeds");
        assert_eq!(decoded.data(), "cart=1");
    }
}
