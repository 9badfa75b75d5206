//! AES-256-GCM / HMAC-SHA256 implementation of [`CryptoService`].

use std::{collections::HashMap, fmt, sync::Arc};

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, consts::U12, rand_core::RngCore},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{crypto::CryptoService, error::CryptoError};

type HmacSha256 = Hmac<Sha256>;

/// AES-256 key length in bytes.
pub const KEY_SIZE: usize = 32;
/// AES-GCM nonce length in bytes; this is the IV carried in every token.
pub const NONCE_SIZE: usize = 12;

#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyEntry {
    encryption_key: [u8; KEY_SIZE],
    mac_key: Vec<u8>,
}

/// In-memory set of transformations plus the service → transformation mapping.
///
/// ```
/// use tower_scs::Keyring;
///
/// let keyring = Keyring::new()
///     .with_transformation("k1", [7u8; 32], b"mac key one")?
///     .with_service("tower_scs.Service", "k1")?;
/// # Ok::<(), tower_scs::CryptoError>(())
/// ```
///
/// To rotate, add a new transformation and point the service at it. Tokens issued under the
/// previous id keep decoding for as long as that id stays provisioned.
#[derive(Clone, Default)]
pub struct Keyring {
    entries: HashMap<String, Arc<KeyEntry>>,
    services: HashMap<String, String>,
}

impl Keyring {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A keyring with one randomly keyed transformation serving `service_name`.
    ///
    /// Sessions issued with a generated keyring do not survive a process restart.
    #[must_use]
    pub fn generate(service_name: &str) -> Self {
        let mut encryption_key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut encryption_key);
        let mut mac_key = vec![0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut mac_key);
        let mut suffix = [0u8; 4];
        OsRng.fill_bytes(&mut suffix);

        let tid = format!("gen-{}", hex::encode(suffix));
        let entry = KeyEntry {
            encryption_key,
            mac_key,
        };

        let mut keyring = Self::new();
        keyring.entries.insert(tid.clone(), Arc::new(entry));
        keyring.services.insert(service_name.to_owned(), tid);
        keyring
    }

    pub fn with_transformation(
        mut self,
        transformation_id: impl Into<String>,
        encryption_key: [u8; KEY_SIZE],
        mac_key: &[u8],
    ) -> Result<Self, CryptoError> {
        let transformation_id = transformation_id.into();
        if transformation_id.is_empty() {
            return Err(CryptoError::InvalidKey(
                "transformation id must not be empty".into(),
            ));
        }
        if mac_key.is_empty() {
            return Err(CryptoError::InvalidKey(format!(
                "mac key for `{transformation_id}` must not be empty"
            )));
        }

        let entry = KeyEntry {
            encryption_key,
            mac_key: mac_key.to_vec(),
        };
        self.entries.insert(transformation_id, Arc::new(entry));
        Ok(self)
    }

    /// Like [`with_transformation`](Self::with_transformation) with hex-encoded keys.
    pub fn with_hex_transformation(
        self,
        transformation_id: impl Into<String>,
        encryption_key_hex: &str,
        mac_key_hex: &str,
    ) -> Result<Self, CryptoError> {
        let mut raw = hex::decode(encryption_key_hex)
            .map_err(|err| CryptoError::InvalidKey(format!("encryption key: {err}")))?;
        let encryption_key: [u8; KEY_SIZE] = raw.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "encryption key must be {KEY_SIZE} bytes, got {}",
                raw.len()
            ))
        })?;
        raw.zeroize();

        let mut mac_key = hex::decode(mac_key_hex)
            .map_err(|err| CryptoError::InvalidKey(format!("mac key: {err}")))?;
        let result = self.with_transformation(transformation_id, encryption_key, &mac_key);
        mac_key.zeroize();
        result
    }

    /// Route `service_name` to an already provisioned transformation.
    pub fn with_service(
        mut self,
        service_name: impl Into<String>,
        transformation_id: impl Into<String>,
    ) -> Result<Self, CryptoError> {
        let transformation_id = transformation_id.into();
        if !self.entries.contains_key(&transformation_id) {
            return Err(CryptoError::UnknownTransformation(transformation_id));
        }
        self.services.insert(service_name.into(), transformation_id);
        Ok(self)
    }

    /// Drop a transformation. Tokens issued under it stop authenticating.
    #[must_use]
    pub fn without_transformation(mut self, transformation_id: &str) -> Self {
        self.entries.remove(transformation_id);
        self.services.retain(|_, tid| tid.as_str() != transformation_id);
        self
    }

    fn entry(&self, transformation_id: &str) -> Result<&KeyEntry, CryptoError> {
        self.entries
            .get(transformation_id)
            .map(Arc::as_ref)
            .ok_or_else(|| CryptoError::UnknownTransformation(transformation_id.to_owned()))
    }

    fn mac(entry: &KeyEntry) -> Result<HmacSha256, CryptoError> {
        <HmacSha256 as Mac>::new_from_slice(&entry.mac_key)
            .map_err(|err| CryptoError::InvalidKey(err.to_string()))
    }

    fn cipher(entry: &KeyEntry) -> Aes256Gcm {
        Aes256Gcm::new((&entry.encryption_key).into())
    }

    fn nonce(iv: &[u8]) -> Option<&Nonce<U12>> {
        (iv.len() == NONCE_SIZE).then(|| Nonce::from_slice(iv))
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut transformations: Vec<_> = self.entries.keys().collect();
        transformations.sort();
        f.debug_struct("Keyring")
            .field("transformations", &transformations)
            .field("services", &self.services)
            .finish()
    }
}

impl CryptoService for Keyring {
    fn transformation_id(&self, service_name: &str) -> Result<String, CryptoError> {
        self.services
            .get(service_name)
            .cloned()
            .ok_or_else(|| CryptoError::UnknownService(service_name.to_owned()))
    }

    fn generate_iv(&self, transformation_id: &str) -> Result<Vec<u8>, CryptoError> {
        self.entry(transformation_id)?;
        let mut iv = vec![0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut iv);
        Ok(iv)
    }

    fn encrypt(
        &self,
        transformation_id: &str,
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let entry = self.entry(transformation_id)?;
        let nonce = Self::nonce(iv).ok_or_else(|| {
            CryptoError::Encryption(format!("iv must be {NONCE_SIZE} bytes, got {}", iv.len()))
        })?;

        Self::cipher(entry)
            .encrypt(nonce, plaintext)
            .map_err(|err| CryptoError::Encryption(err.to_string()))
    }

    fn decrypt(
        &self,
        transformation_id: &str,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let entry = self.entry(transformation_id)?;
        let nonce = Self::nonce(iv).ok_or_else(|| {
            CryptoError::Decryption(format!("iv must be {NONCE_SIZE} bytes, got {}", iv.len()))
        })?;

        Self::cipher(entry)
            .decrypt(nonce, ciphertext)
            .map_err(|err| CryptoError::Decryption(err.to_string()))
    }

    fn create_auth_tag(
        &self,
        transformation_id: &str,
        signing_bytes: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut mac = Self::mac(self.entry(transformation_id)?)?;
        mac.update(signing_bytes);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify_auth_tag(&self, transformation_id: &str, tag: &[u8], signing_bytes: &[u8]) -> bool {
        let Ok(entry) = self.entry(transformation_id) else {
            return false;
        };
        let Ok(mut mac) = Self::mac(entry) else {
            return false;
        };
        mac.update(signing_bytes);
        mac.verify_slice(tag).is_ok()
    }
}
