//! The SCS token codec.
//!
//! A serialized token is five base64url (unpadded) fields joined by `|`:
//!
//! ```text
//! encrypted_data | issued_at | transformation_id | iv | auth_tag
//! ```
//!
//! `issued_at` is the decimal unix timestamp in seconds, base64url-encoded like the other
//! fields. The authentication tag covers the first four fields *in their encoded form*, joined
//! with the same separator. Splitting on `|` is unambiguous because the base64url alphabet does
//! not contain it.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use time::OffsetDateTime;

use crate::{
    compress,
    config::CodecSettings,
    crypto::CryptoService,
    error::{Result, ScsError},
};

const FIELD_SEPARATOR: char = '|';
const FIELD_COUNT: usize = 5;
/// Upper bound on inflated session state.
const MAX_INFLATED_BYTES: usize = 64 * 1024;

/// A decoded or freshly encoded session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    data: String,
    encrypted_data: Vec<u8>,
    issued_at: OffsetDateTime,
    transformation_id: String,
    iv: Vec<u8>,
    auth_tag: Vec<u8>,
}

impl Token {
    /// The application session state.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn into_data(self) -> String {
        self.data
    }

    pub fn encrypted_data(&self) -> &[u8] {
        &self.encrypted_data
    }

    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    pub fn transformation_id(&self) -> &str {
        &self.transformation_id
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn auth_tag(&self) -> &[u8] {
        &self.auth_tag
    }

    /// The cookie value for this token.
    pub fn serialize(&self) -> String {
        let signing = self.signing_string();
        let tag = URL_SAFE_NO_PAD.encode(&self.auth_tag);

        let mut out = String::with_capacity(signing.len() + 1 + tag.len());
        out.push_str(&signing);
        out.push(FIELD_SEPARATOR);
        out.push_str(&tag);
        out
    }

    fn signing_string(&self) -> String {
        signing_string(
            &URL_SAFE_NO_PAD.encode(&self.encrypted_data),
            &encode_issued_at(self.issued_at),
            &URL_SAFE_NO_PAD.encode(&self.transformation_id),
            &URL_SAFE_NO_PAD.encode(&self.iv),
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

// Session state may hold credentials, so only its size is shown.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("data_len", &self.data.len())
            .field("issued_at", &self.issued_at)
            .field("transformation_id", &self.transformation_id)
            .field("iv", &URL_SAFE_NO_PAD.encode(&self.iv))
            .field("auth_tag", &URL_SAFE_NO_PAD.encode(&self.auth_tag))
            .finish_non_exhaustive()
    }
}

fn signing_string(
    encrypted_data: &str,
    issued_at: &str,
    transformation_id: &str,
    iv: &str,
) -> String {
    let mut out = String::with_capacity(
        encrypted_data.len() + issued_at.len() + transformation_id.len() + iv.len() + 3,
    );
    for (i, field) in [encrypted_data, issued_at, transformation_id, iv]
        .into_iter()
        .enumerate()
    {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        out.push_str(field);
    }
    out
}

fn encode_issued_at(issued_at: OffsetDateTime) -> String {
    URL_SAFE_NO_PAD.encode(issued_at.unix_timestamp().to_string())
}

fn decode_issued_at(field: &str) -> Result<OffsetDateTime> {
    let bytes = URL_SAFE_NO_PAD
        .decode(field)
        .map_err(|err| ScsError::codec(format!("issued-at field: {err}")))?;
    let secs = std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ScsError::codec("issued-at field is not a decimal timestamp"))?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|err| ScsError::codec(format!("issued-at field: {err}")))
}

fn truncate_to_second(at: OffsetDateTime) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.unix_timestamp())
        .map_err(|err| ScsError::codec(err.to_string()))
}

/// Encodes session state into tokens and verifies tokens back into state.
///
/// The codec holds no mutable state. It is as thread-safe as its [`CryptoService`].
#[derive(Debug, Clone)]
pub struct ScsCodec<K> {
    crypto: K,
    settings: CodecSettings,
}

impl<K: CryptoService> ScsCodec<K> {
    pub fn new(crypto: K, settings: CodecSettings) -> Self {
        Self { crypto, settings }
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    pub fn crypto(&self) -> &K {
        &self.crypto
    }

    /// Encrypt and sign `state`, issued now.
    pub fn encode(&self, state: &str) -> Result<Token> {
        self.encode_at(state, OffsetDateTime::now_utc())
    }

    /// Encrypt and sign `state` with an explicit issue time.
    pub fn encode_at(&self, state: &str, issued_at: OffsetDateTime) -> Result<Token> {
        let transformation_id = self
            .crypto
            .transformation_id(&self.settings.service_name)?;
        let iv = self.crypto.generate_iv(&transformation_id)?;

        let plaintext = if self.settings.compress {
            compress::deflate(state.as_bytes())
                .map_err(|err| ScsError::codec(format!("compression failed: {err}")))?
        } else {
            state.as_bytes().to_vec()
        };
        let encrypted_data = self.crypto.encrypt(&transformation_id, &iv, &plaintext)?;

        let mut token = Token {
            data: state.to_owned(),
            encrypted_data,
            issued_at: truncate_to_second(issued_at)?,
            transformation_id,
            iv,
            auth_tag: Vec::new(),
        };
        token.auth_tag = self
            .crypto
            .create_auth_tag(&token.transformation_id, token.signing_string().as_bytes())?;

        Ok(token)
    }

    /// Verify, check expiry of, and decrypt a serialized token.
    pub fn decode(&self, value: &str) -> Result<Token> {
        self.decode_at(value, OffsetDateTime::now_utc())
    }

    /// [`decode`](Self::decode) against an explicit clock.
    ///
    /// Nothing but the transformation id and tag is interpreted before the tag verifies.
    pub fn decode_at(&self, value: &str, now: OffsetDateTime) -> Result<Token> {
        let parts: Vec<&str> = value.split(FIELD_SEPARATOR).collect();
        let &[enc_b64, issued_b64, tid_b64, iv_b64, tag_b64] = parts.as_slice() else {
            return Err(ScsError::Malformed { parts: parts.len() });
        };
        debug_assert_eq!(parts.len(), FIELD_COUNT);

        // A tid or tag we cannot even decode can never verify.
        let transformation_id = URL_SAFE_NO_PAD
            .decode(tid_b64)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(ScsError::Authentication)?;
        let auth_tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| ScsError::Authentication)?;

        let signing = signing_string(enc_b64, issued_b64, tid_b64, iv_b64);
        if !self
            .crypto
            .verify_auth_tag(&transformation_id, &auth_tag, signing.as_bytes())
        {
            return Err(ScsError::Authentication);
        }

        let issued_at = decode_issued_at(issued_b64)?;
        let max_age = self.settings.max_age.whole_seconds();
        if issued_at.unix_timestamp().saturating_add(max_age) < now.unix_timestamp() {
            return Err(ScsError::Expired { issued_at, now });
        }

        let iv = URL_SAFE_NO_PAD
            .decode(iv_b64)
            .map_err(|err| ScsError::codec(format!("iv field: {err}")))?;
        let encrypted_data = URL_SAFE_NO_PAD
            .decode(enc_b64)
            .map_err(|err| ScsError::codec(format!("data field: {err}")))?;

        let plaintext = self
            .crypto
            .decrypt(&transformation_id, &iv, &encrypted_data)?;
        let plaintext = if self.settings.compress {
            compress::inflate(&plaintext, MAX_INFLATED_BYTES)
                .map_err(|err| ScsError::codec(format!("decompression failed: {err}")))?
        } else {
            plaintext
        };
        let data = String::from_utf8(plaintext)
            .map_err(|err| ScsError::codec(format!("session state is not utf-8: {err}")))?;

        Ok(Token {
            data,
            encrypted_data,
            issued_at,
            transformation_id,
            iv,
            auth_tag,
        })
    }
}
