//! Random key, salt and IV material with zeroize-on-drop handling.

use std::fmt;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use streamcrypt_common::{Error, Result};

/// Default salt length for password-based derivation (16 bytes).
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// Symmetric key bytes of any algorithm-specific length.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key: Vec<u8>,
}

impl SecretKey {
    /// Generate a random key of `len` bytes.
    ///
    /// # Errors
    /// - `InvalidInput` if `len` is zero
    pub fn generate(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidInput("Key length must be greater than zero".to_string()));
        }
        Ok(Self { key: random_bytes(len) })
    }

    pub fn from_bytes(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED; {} bytes])", self.key.len())
    }
}

/// Salt for password-based key derivation.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    /// Generate a random salt of the default length.
    pub fn generate() -> Self {
        Self::generate_with_len(DEFAULT_SALT_LENGTH)
    }

    pub fn generate_with_len(len: usize) -> Self {
        Self { bytes: random_bytes(len) }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({} bytes)", self.bytes.len())
    }
}

/// Fill a fresh buffer from the thread-local CSPRNG.
///
/// Use for IVs and nonces; callers choose the length the mode requires.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
