use std::borrow::Cow;

use serde::Deserialize;
use time::Duration;
use tower_cookies::Cookie;

use crate::SameSite;

pub const DEFAULT_COOKIE_NAME: &str = "SCS";
pub const DEFAULT_SERVICE_NAME: &str = "tower_scs.Service";
pub const DEFAULT_MAX_AGE_SECS: i64 = 3600;

/// Settings the token codec itself depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSettings {
    /// Deflate the state before encrypting it.
    pub compress: bool,
    /// Tokens older than this are rejected as expired.
    pub max_age: Duration,
    /// Logical name handed to [`CryptoService::transformation_id`](crate::CryptoService).
    pub service_name: Cow<'static, str>,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            compress: false,
            max_age: Duration::seconds(DEFAULT_MAX_AGE_SECS),
            service_name: DEFAULT_SERVICE_NAME.into(),
        }
    }
}

/// Cookie and codec configuration for [`ScsLayer`](crate::ScsLayer).
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// let config: tower_scs::ScsConfig =
///     serde_json::from_str(r#"{ "name": "sid", "compress": true }"#).unwrap();
/// ```
///
/// `same_site` is not read from documents; use [`ScsConfig::with_same_site`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScsConfig {
    pub(crate) name: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) path: Cow<'static, str>,
    pub(crate) secure: bool,
    pub(crate) http_only: bool,
    #[serde(skip, default = "default_same_site")]
    pub(crate) same_site: SameSite,
    pub(crate) compress: bool,
    pub(crate) max_age_secs: i64,
    pub(crate) service_name: Cow<'static, str>,
    pub(crate) persistent: bool,
    pub(crate) always_save: bool,
    pub(crate) max_cookie_bytes: usize,
    pub(crate) clear_on_decode_error: bool,
}

fn default_same_site() -> SameSite {
    SameSite::Lax
}

impl Default for ScsConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            domain: None,
            path: "/".into(),
            secure: false,
            http_only: true,
            same_site: default_same_site(),
            compress: false,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            service_name: DEFAULT_SERVICE_NAME.into(),
            persistent: false,
            always_save: false,
            max_cookie_bytes: 4096,
            clear_on_decode_error: true,
        }
    }
}

impl ScsConfig {
    #[must_use]
    pub fn with_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Maximum token age. Sub-second precision is dropped.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = max_age.whole_seconds();
        self
    }

    #[must_use]
    pub fn with_service_name<S: Into<Cow<'static, str>>>(mut self, service_name: S) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Emit `Max-Age` on the cookie so it outlives the browser session.
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Re-issue the cookie on every response that carries session state, sliding its issue time.
    #[must_use]
    pub fn with_always_save(mut self, always_save: bool) -> Self {
        self.always_save = always_save;
        self
    }

    #[must_use]
    pub fn with_max_cookie_bytes(mut self, max_cookie_bytes: usize) -> Self {
        self.max_cookie_bytes = max_cookie_bytes;
        self
    }

    #[must_use]
    pub fn with_clear_on_decode_error(mut self, clear_on_decode_error: bool) -> Self {
        self.clear_on_decode_error = clear_on_decode_error;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec_settings(&self) -> CodecSettings {
        CodecSettings {
            compress: self.compress,
            max_age: Duration::seconds(self.max_age_secs),
            service_name: self.service_name.clone(),
        }
    }

    pub(crate) fn build_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), value))
            .http_only(self.http_only)
            .same_site(self.same_site)
            .secure(self.secure)
            .path(self.path.clone());

        if self.persistent {
            cookie_builder = cookie_builder.max_age(Duration::seconds(self.max_age_secs));
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }

    pub(crate) fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), "");
        cookie.set_path(self.path.clone());
        if let Some(domain) = self.domain.clone() {
            cookie.set_domain(domain);
        }
        cookie
    }
}
