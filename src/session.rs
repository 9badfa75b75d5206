use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

#[derive(Debug, Default)]
struct Inner {
    state: Option<String>,
    issued_at: Option<OffsetDateTime>,
    modified: bool,
    cleared: bool,
}

/// Per-request handle on the session state carried by the SCS cookie.
///
/// [`ScsLayer`](crate::ScsLayer) inserts one into the request extensions. Clones share state, so
/// changes made by a handler are visible to the layer when it writes the response cookie.
#[derive(Debug, Clone, Default)]
pub struct ScsSession {
    inner: Arc<Mutex<Inner>>,
}

impl ScsSession {
    pub(crate) fn new(state: Option<String>, issued_at: Option<OffsetDateTime>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                issued_at,
                modified: false,
                cleared: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current session state, if any.
    pub fn get(&self) -> Option<String> {
        self.lock().state.clone()
    }

    /// Replace the session state.
    pub fn set(&self, state: impl Into<String>) {
        let mut inner = self.lock();
        inner.state = Some(state.into());
        inner.modified = true;
    }

    /// Drop the session state; the cookie is removed on the way out.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.cleared = true;
        if inner.state.take().is_some() {
            inner.modified = true;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().state.is_none()
    }

    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    /// Whether the handler called [`clear`](Self::clear), even on an empty session.
    pub(crate) fn clear_requested(&self) -> bool {
        self.lock().cleared
    }

    /// When the inbound token was issued. `None` for new sessions.
    pub fn issued_at(&self) -> Option<OffsetDateTime> {
        self.lock().issued_at
    }
}

#[cfg(feature = "axum")]
mod extract {
    use axum_core::extract::FromRequestParts;
    use http::{StatusCode, request::Parts};

    use super::ScsSession;

    impl<S> FromRequestParts<S> for ScsSession
    where
        S: Send + Sync,
    {
        type Rejection = (StatusCode, &'static str);

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            parts.extensions.get::<ScsSession>().cloned().ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't extract SCS session. Is `ScsLayer` enabled?",
            ))
        }
    }
}
