// src/storage/encrypted/cipher.rs
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use sha3::{Digest, Sha3_256};

use crate::storage::{Result, StorageError};

const NONCE_LEN: usize = 12;

pub struct StorageCipher {
    cipher: Aes256Gcm,
}

impl StorageCipher {
    pub fn new(key: &[u8]) -> Self {
        let hash = Sha3_256::digest(key);
        let cipher_key = Key::<Aes256Gcm>::from_slice(hash.as_slice());
        let cipher = Aes256Gcm::new(cipher_key);

        Self { cipher }
    }

    /// Output layout: nonce (12 bytes) followed by the ciphertext.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self.cipher
            .encrypt(&nonce, data)
            .map_err(|e| StorageError::EncryptionError(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(nonce.as_slice());
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < NONCE_LEN {
            return Err(StorageError::DecryptionError(
                "Invalid encrypted data length".to_string()
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| StorageError::DecryptionError(e.to_string()))
    }
}
