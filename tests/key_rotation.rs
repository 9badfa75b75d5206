#![cfg(all(feature = "keyring", feature = "axum"))]

// Tests for transformation ids: rotating the active key keeps in-flight sessions readable until
// the old transformation is retired.
mod common;

use tower_scs::{DEFAULT_SERVICE_NAME, Keyring, ScsConfig};

use common::{STATE, app, body_string, get_session_cookie, send, token_field};

fn rotated() -> Keyring {
    common::keyring("k1", 1)
        .with_transformation("k2", [9u8; 32], b"second mac key")
        .expect("transformation k2 is valid")
        .with_service(DEFAULT_SERVICE_NAME, "k2")
        .expect("service maps to k2")
}

#[tokio::test]
async fn old_tokens_survive_rotation() {
    let before = app(common::keyring("k1", 1), ScsConfig::default());
    let after = app(rotated(), ScsConfig::default());

    let res = send(&before, "/set", None).await;
    let old_cookie = get_session_cookie(&res);
    assert_eq!(token_field(old_cookie.value(), 2), b"k1");

    let res = send(&after, "/get", Some(&old_cookie)).await;
    assert_eq!(body_string(res.into_body()).await, STATE);
}

#[tokio::test]
async fn new_tokens_use_active_transformation() {
    let after = app(rotated(), ScsConfig::default());

    let res = send(&after, "/set", None).await;
    let new_cookie = get_session_cookie(&res);

    assert_eq!(token_field(new_cookie.value(), 2), b"k2");
}

#[tokio::test]
async fn retired_transformation_is_rejected() {
    let before = app(common::keyring("k1", 1), ScsConfig::default());
    let retired = app(
        rotated().without_transformation("k1"),
        ScsConfig::default(),
    );

    let res = send(&before, "/set", None).await;
    let old_cookie = get_session_cookie(&res);

    let res = send(&retired, "/get", Some(&old_cookie)).await;
    assert_eq!(body_string(res.into_body()).await, "none");
}

#[tokio::test]
async fn hex_configured_keys_roundtrip() {
    let keyring = Keyring::new()
        .with_hex_transformation(
            "hex-1",
            "3031323334353637383961626364656630313233343536373839616263646566",
            "3031323334353637383930313233343536373839",
        )
        .expect("hex keys parse")
        .with_service(DEFAULT_SERVICE_NAME, "hex-1")
        .expect("service maps to hex-1");
    let app = app(keyring, ScsConfig::default());

    let res = send(&app, "/set", None).await;
    let session_cookie = get_session_cookie(&res);
    let res = send(&app, "/get", Some(&session_cookie)).await;

    assert_eq!(body_string(res.into_body()).await, STATE);
}
