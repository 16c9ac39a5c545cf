//! Encryption of notification-channel secure settings at rest.

use crate::core::SecretsCodec;
use crate::error::BusError;
use aes_siv::siv::Aes256Siv;
use aes_siv::aead::KeyInit;
use std::collections::BTreeMap;
use std::fmt;

const KEY_DERIVATION_CONTEXT: &str = "alertbus 2024-05 notification secure settings";
const NONCE_LEN: usize = 16;

/// Secure settings as stored: every value encrypted by a [`SecretsCodec`].
///
/// Plaintext only exists transiently, in the map returned by
/// [`EncryptedSettings::decrypt`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncryptedSettings(BTreeMap<String, Vec<u8>>);

impl EncryptedSettings {
    /// Encrypts every value of `plain`.
    pub fn encrypt(
        plain: &BTreeMap<String, String>,
        codec: &dyn SecretsCodec,
    ) -> Result<Self, BusError> {
        let mut values = BTreeMap::new();
        for (key, value) in plain {
            values.insert(key.clone(), codec.encrypt(value.as_bytes())?);
        }
        Ok(Self(values))
    }

    /// Decrypts every value into a plaintext mapping.
    pub fn decrypt(&self, codec: &dyn SecretsCodec) -> Result<BTreeMap<String, String>, BusError> {
        let mut plain = BTreeMap::new();
        for (key, ciphertext) in &self.0 {
            let bytes = codec.decrypt(ciphertext)?;
            let value = String::from_utf8(bytes).map_err(|e| {
                BusError::upstream(format!("secure setting '{}' is not valid UTF-8", key))
                    .with_source(e)
            })?;
            plain.insert(key.clone(), value);
        }
        Ok(plain)
    }

    /// Which keys are set, without their values. This is all that ever leaves
    /// the core.
    pub fn secure_fields(&self) -> BTreeMap<String, bool> {
        self.0.keys().map(|k| (k.clone(), true)).collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// AES-SIV codec keyed from a configured secret.
///
/// Each value is encrypted with a fresh random nonce passed as associated
/// data; the stored form is `nonce || ciphertext`.
pub struct SivSecretsCodec {
    key: [u8; 64],
}

impl fmt::Debug for SivSecretsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SivSecretsCodec").finish_non_exhaustive()
    }
}

impl SivSecretsCodec {
    /// Derives the 512-bit AES-SIV key from `secret_key`.
    pub fn new(secret_key: &str) -> Self {
        let mut key = [0u8; 64];
        blake3::Hasher::new_derive_key(KEY_DERIVATION_CONTEXT)
            .update(secret_key.as_bytes())
            .finalize_xof()
            .fill(&mut key);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Siv, BusError> {
        Aes256Siv::new_from_slice(&self.key)
            .map_err(|_| BusError::upstream("invalid secure settings key length"))
    }
}

impl SecretsCodec for SivSecretsCodec {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BusError> {
        let nonce: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher()?
            .encrypt([&nonce[..]], plaintext)
            .map_err(|_| BusError::upstream("failed to encrypt secure setting"))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&ciphertext);
        Ok(stored)
    }

    fn decrypt(&self, stored: &[u8]) -> Result<Vec<u8>, BusError> {
        if stored.len() < NONCE_LEN {
            return Err(BusError::upstream("secure setting ciphertext is truncated"));
        }
        let (nonce, ciphertext) = stored.split_at(NONCE_LEN);
        self.cipher()?
            .decrypt([nonce], ciphertext)
            .map_err(|_| BusError::upstream("failed to decrypt secure setting"))
    }
}
