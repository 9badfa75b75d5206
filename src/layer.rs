use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response, StatusCode};
use tower_cookies::{Cookie, CookieManager, Cookies};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    codec::ScsCodec, config::ScsConfig, crypto::CryptoService, error::ScsError,
    session::ScsSession,
};

/// Layer that decodes the SCS cookie into an [`ScsSession`] and writes it back after the inner
/// service responds.
#[derive(Debug)]
pub struct ScsLayer<K> {
    config: ScsConfig,
    codec: Arc<ScsCodec<Arc<K>>>,
}

impl<K> Clone for ScsLayer<K> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<K: CryptoService> ScsLayer<K> {
    pub fn new(crypto: K) -> Self {
        let config = ScsConfig::default();
        let codec = ScsCodec::new(Arc::new(crypto), config.codec_settings());
        Self {
            config,
            codec: Arc::new(codec),
        }
    }

    #[must_use]
    pub fn with_config(self, config: ScsConfig) -> Self {
        let codec = ScsCodec::new(self.codec.crypto().clone(), config.codec_settings());
        Self {
            config,
            codec: Arc::new(codec),
        }
    }

    /// The codec this layer encodes and decodes cookies with.
    pub fn codec(&self) -> &ScsCodec<Arc<K>> {
        &self.codec
    }
}

#[derive(Debug)]
pub struct ScsManager<S, K> {
    inner: S,
    config: ScsConfig,
    codec: Arc<ScsCodec<Arc<K>>>,
}

impl<S: Clone, K> Clone for ScsManager<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<S, K> Layer<S> for ScsLayer<K> {
    type Service = CookieManager<ScsManager<S, K>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(ScsManager {
            inner,
            config: self.config.clone(),
            codec: self.codec.clone(),
        })
    }
}

fn internal_error<B: Default>() -> Response<B> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

impl<ReqBody, ResBody, S, K> Service<Request<ReqBody>> for ScsManager<S, K>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    K: CryptoService + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let config = self.config.clone();
        let codec = self.codec.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(cookies) = req.extensions().get::<Cookies>().cloned() else {
                return Ok(internal_error());
            };

            let inbound = cookies.get(&config.name).map(Cookie::into_owned);
            let mut cookie_removed = false;

            let token = match inbound.as_ref() {
                Some(cookie) => match codec.decode(cookie.value()) {
                    Ok(token) => Some(token),
                    Err(err) if err.is_no_session() => {
                        match err {
                            ScsError::Authentication => tracing::warn!(
                                cookie = %config.name,
                                "session cookie failed authentication"
                            ),
                            ScsError::Expired { .. } => {
                                tracing::debug!(err = %err, "session cookie expired")
                            }
                            _ => tracing::warn!(err = %err, "session cookie is malformed"),
                        }
                        if config.clear_on_decode_error {
                            cookies.remove(config.removal_cookie());
                            cookie_removed = true;
                        }
                        None
                    }
                    Err(err) => {
                        tracing::error!(err = %err, "session cookie could not be decoded");
                        return Ok(internal_error());
                    }
                },
                None => None,
            };

            let session = match token {
                Some(token) => {
                    let issued_at = token.issued_at();
                    ScsSession::new(Some(token.into_data()), Some(issued_at))
                }
                None => ScsSession::default(),
            };
            req.extensions_mut().insert(session.clone());

            let res = inner.call(req).await?;

            let Some(state) = session.get() else {
                if inbound.is_some()
                    && !cookie_removed
                    && (session.is_modified() || session.clear_requested())
                {
                    cookies.remove(config.removal_cookie());
                }
                return Ok(res);
            };

            if !(session.is_modified() || config.always_save) || res.status().is_server_error() {
                return Ok(res);
            }

            let value = match codec.encode(&state) {
                Ok(token) => token.serialize(),
                Err(err) => {
                    tracing::error!(err = %err, "session state could not be encoded");
                    return Ok(internal_error());
                }
            };
            if value.len() > config.max_cookie_bytes {
                tracing::error!(
                    len = value.len(),
                    max = config.max_cookie_bytes,
                    "session cookie exceeds max_cookie_bytes"
                );
                return Ok(internal_error());
            }

            tracing::debug!(cookie = %config.name, len = value.len(), "session cookie written");
            cookies.add(config.build_cookie(value));

            Ok(res)
        })
    }
}
