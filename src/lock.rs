//! Optional password gate in front of the journal.
//!
//! Credentials live in their own store namespace: a random salt and an
//! Argon2id hash of the password, both base64 encoded, plus an enabled flag.
//! The password itself is never stored.

use crate::store::{KeyValueStore, WriteBatch};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Store keys in the lock namespace
pub mod keys {
    pub const LOCK_ENABLED: &str = "lock_enabled";
    pub const LOCK_SALT: &str = "lock_salt";
    pub const LOCK_HASH: &str = "lock_hash";
}

pub const SALT_LEN: usize = 16;
pub const HASH_LEN: usize = 32;

/// Error types for lock operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LockError {
    /// Secret did not match the stored hash
    #[error("Incorrect password")]
    IncorrectPassword,
    /// Blank passwords cannot be set
    #[error("Password must not be empty")]
    EmptyPassword,
    /// Argon2 rejected the parameters or input
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    /// Credentials could not be written
    #[error("Failed to store credentials: {0}")]
    StoreError(String),
}

/// Gate consulted before the journal is loaded
pub trait LockGate: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn verify(&self, secret: &str) -> bool;
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockParams {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for LockParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl LockParams {
    /// Cheapest parameters Argon2 accepts, for tests
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Lock gate backed by a key-value store namespace
pub struct PasswordLock {
    store: Arc<dyn KeyValueStore>,
    params: LockParams,
}

impl PasswordLock {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_params(store, LockParams::default())
    }

    pub fn with_params(store: Arc<dyn KeyValueStore>, params: LockParams) -> Self {
        Self { store, params }
    }

    /// Set (or replace) the password and enable the gate
    pub fn set_password(&self, secret: &str) -> Result<(), LockError> {
        if secret.is_empty() {
            return Err(LockError::EmptyPassword);
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = derive_hash(secret.as_bytes(), &salt, &self.params)?;

        let batch = WriteBatch::new()
            .put(keys::LOCK_SALT, STANDARD.encode(salt))
            .put(keys::LOCK_HASH, STANDARD.encode(hash.as_slice()))
            .put(keys::LOCK_ENABLED, "true");
        self.store
            .apply(batch)
            .map_err(|e| LockError::StoreError(e.to_string()))?;

        crate::info!("Password lock enabled");
        Ok(())
    }

    /// Disable the gate and forget the stored credentials
    pub fn clear(&self) -> Result<(), LockError> {
        let batch = WriteBatch::new()
            .remove(keys::LOCK_SALT)
            .remove(keys::LOCK_HASH)
            .put(keys::LOCK_ENABLED, "false");
        self.store
            .apply(batch)
            .map_err(|e| LockError::StoreError(e.to_string()))?;

        crate::info!("Password lock cleared");
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                crate::warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }

    fn read_bytes(&self, key: &str) -> Option<Vec<u8>> {
        let encoded = self.read(key)?;
        STANDARD
            .decode(encoded)
            .map_err(|e| crate::warn!("Stored {} is not valid base64: {}", key, e))
            .ok()
    }
}

impl LockGate for PasswordLock {
    fn is_enabled(&self) -> bool {
        self.read(keys::LOCK_ENABLED).as_deref() == Some("true")
    }

    fn verify(&self, secret: &str) -> bool {
        let (Some(salt), Some(expected)) =
            (self.read_bytes(keys::LOCK_SALT), self.read_bytes(keys::LOCK_HASH))
        else {
            return false;
        };

        match derive_hash(secret.as_bytes(), &salt, &self.params) {
            Ok(actual) => constant_time_eq(actual.as_slice(), &expected),
            Err(e) => {
                crate::warn!("Password verification failed: {}", e);
                false
            }
        }
    }
}

fn derive_hash(
    secret: &[u8],
    salt: &[u8],
    params: &LockParams,
) -> Result<Zeroizing<[u8; HASH_LEN]>, LockError> {
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(HASH_LEN),
    )
    .map_err(|e| LockError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut hash = Zeroizing::new([0u8; HASH_LEN]);
    argon2
        .hash_password_into(secret, salt, hash.as_mut_slice())
        .map_err(|e| LockError::KeyDerivation(e.to_string()))?;
    Ok(hash)
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
