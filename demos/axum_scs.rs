use std::net::SocketAddr;

use axum::{Router, routing::get};
use time::Duration;
use tower_scs::{DEFAULT_SERVICE_NAME, Keyring, SameSite, ScsConfig, ScsLayer, ScsSession};

async fn index(session: ScsSession) -> String {
    let n: usize = session
        .get()
        .and_then(|state| state.strip_prefix("n=")?.parse().ok())
        .unwrap_or(0);
    session.set(format!("n={}", n + 1));
    format!("n={n}")
}

async fn logout(session: ScsSession) -> &'static str {
    session.clear();
    "bye"
}

#[tokio::main]
async fn main() {
    let keyring = Keyring::generate(DEFAULT_SERVICE_NAME);
    let session_config = ScsConfig::default()
        // Default: "SCS"
        .with_name("SCS")
        // Default: true
        .with_http_only(true)
        // Default: SameSite::Lax
        .with_same_site(SameSite::Lax)
        // Default: false (set to true when served over HTTPS)
        .with_secure(false)
        // Default: "/"
        .with_path("/")
        // Default: None
        .without_domain()
        // Default: false
        .with_compression(true)
        // Default: 1 hour
        .with_max_age(Duration::minutes(30))
        // Default: false
        .with_persistent(true)
        // Default: false
        .with_always_save(false)
        // Default: 4096
        .with_max_cookie_bytes(4096)
        // Default: true
        .with_clear_on_decode_error(true);
    let session_layer = ScsLayer::new(keyring).with_config(session_config);

    let app = Router::new()
        .route("/", get(index))
        .route("/logout", get(logout))
        .layer(session_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
