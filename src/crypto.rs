use std::sync::Arc;

use crate::error::CryptoError;

/// Cryptographic primitives consumed by the token codec.
///
/// A *transformation id* names one key/algorithm configuration. Tokens carry the id they were
/// produced under, so an implementation that keeps older ids provisioned can rotate keys without
/// invalidating sessions already handed out.
///
/// Implementations must be safe to call concurrently.
pub trait CryptoService: Send + Sync {
    /// Resolve the transformation currently used for `service_name`.
    fn transformation_id(&self, service_name: &str) -> Result<String, CryptoError>;

    /// Fresh initialization vector for `transformation_id`.
    fn generate_iv(&self, transformation_id: &str) -> Result<Vec<u8>, CryptoError>;

    fn encrypt(
        &self,
        transformation_id: &str,
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(
        &self,
        transformation_id: &str,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    fn create_auth_tag(
        &self,
        transformation_id: &str,
        signing_bytes: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Returns `false` for a mismatching tag and for an id that is not provisioned.
    fn verify_auth_tag(&self, transformation_id: &str, tag: &[u8], signing_bytes: &[u8]) -> bool;
}

macro_rules! forward_crypto_service {
    ($($ty:ty),+) => {
        $(
            impl<K: CryptoService + ?Sized> CryptoService for $ty {
                fn transformation_id(&self, service_name: &str) -> Result<String, CryptoError> {
                    (**self).transformation_id(service_name)
                }

                fn generate_iv(&self, transformation_id: &str) -> Result<Vec<u8>, CryptoError> {
                    (**self).generate_iv(transformation_id)
                }

                fn encrypt(
                    &self,
                    transformation_id: &str,
                    iv: &[u8],
                    plaintext: &[u8],
                ) -> Result<Vec<u8>, CryptoError> {
                    (**self).encrypt(transformation_id, iv, plaintext)
                }

                fn decrypt(
                    &self,
                    transformation_id: &str,
                    iv: &[u8],
                    ciphertext: &[u8],
                ) -> Result<Vec<u8>, CryptoError> {
                    (**self).decrypt(transformation_id, iv, ciphertext)
                }

                fn create_auth_tag(
                    &self,
                    transformation_id: &str,
                    signing_bytes: &[u8],
                ) -> Result<Vec<u8>, CryptoError> {
                    (**self).create_auth_tag(transformation_id, signing_bytes)
                }

                fn verify_auth_tag(
                    &self,
                    transformation_id: &str,
                    tag: &[u8],
                    signing_bytes: &[u8],
                ) -> bool {
                    (**self).verify_auth_tag(transformation_id, tag, signing_bytes)
                }
            }
        )+
    };
}

forward_crypto_service!(&K, Arc<K>, Box<K>);
