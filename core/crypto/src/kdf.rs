//! Password-based key derivation: Argon2 and PBKDF2.
//!
//! Both functions are pure: the same password, salt and parameters always
//! give the same bytes. Derived material is returned in a zeroizing buffer.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use streamcrypt_common::{Error, Result};

/// Argon2 flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argon2Variant {
    Argon2d,
    Argon2i,
    Argon2id,
}

impl FromStr for Argon2Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "argon2d" | "d" => Ok(Argon2Variant::Argon2d),
            "argon2i" | "i" => Ok(Argon2Variant::Argon2i),
            "argon2id" | "id" => Ok(Argon2Variant::Argon2id),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Argon2 algorithm version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argon2Version {
    /// 0x10
    V0x10,
    /// 0x13
    V0x13,
}

/// Parameters for Argon2 derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Params {
    pub variant: Argon2Variant,
    pub version: Argon2Version,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
    /// Memory cost as a power of two in KiB (16 = 64 MiB).
    pub memory_exponent: u32,
    /// Output length in bytes.
    pub output_len: usize,
}

impl Argon2Params {
    /// Parameters suitable for interactive use.
    ///
    /// Targets roughly half a second to a second on desktop hardware.
    pub fn interactive() -> Self {
        Self {
            variant: Argon2Variant::Argon2id,
            version: Argon2Version::V0x13,
            iterations: 3,
            parallelism: 4,
            memory_exponent: 16, // 64 MiB
            output_len: 32,
        }
    }

    /// Higher cost for long-term secrets; may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            iterations: 4,
            memory_exponent: 18, // 256 MiB
            ..Self::interactive()
        }
    }

    /// Lower memory for constrained devices.
    pub fn moderate() -> Self {
        Self {
            parallelism: 2,
            memory_exponent: 15, // 32 MiB
            ..Self::interactive()
        }
    }

    pub fn with_output_len(mut self, len: usize) -> Self {
        self.output_len = len;
        self
    }

    /// Memory cost in KiB.
    ///
    /// # Errors
    /// - `InvalidInput` if the exponent overflows a 32-bit KiB count
    pub fn memory_kib(&self) -> Result<u32> {
        1u32.checked_shl(self.memory_exponent)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Argon2 memory exponent {} is too large",
                    self.memory_exponent
                ))
            })
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Derive key material with Argon2.
///
/// # Preconditions
/// - `salt` is at least 8 bytes
///
/// # Postconditions
/// - Returns exactly `params.output_len` bytes
/// - The result is deterministic given the same inputs
///
/// # Errors
/// - `InvalidInput` if the parameters or salt are outside Argon2's limits
///
/// # Security
/// - The password is not stored or logged
pub fn derive_argon2(password: &[u8], salt: &[u8], params: &Argon2Params) -> Result<Zeroizing<Vec<u8>>> {
    let argon2_params = Params::new(
        params.memory_kib()?,
        params.iterations,
        params.parallelism,
        Some(params.output_len),
    )
    .map_err(|e| Error::InvalidInput(format!("Invalid Argon2 parameters: {}", e)))?;

    let algorithm = match params.variant {
        Argon2Variant::Argon2d => Algorithm::Argon2d,
        Argon2Variant::Argon2i => Algorithm::Argon2i,
        Argon2Variant::Argon2id => Algorithm::Argon2id,
    };
    let version = match params.version {
        Argon2Version::V0x10 => Version::V0x10,
        Argon2Version::V0x13 => Version::V0x13,
    };

    debug!(
        variant = ?params.variant,
        memory_kib = argon2_params.m_cost(),
        iterations = params.iterations,
        output_len = params.output_len,
        "Deriving key with Argon2"
    );

    let mut out = Zeroizing::new(vec![0u8; params.output_len]);
    Argon2::new(algorithm, version, argon2_params)
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| Error::InvalidInput(format!("Argon2 derivation failed: {}", e)))?;

    Ok(out)
}

/// PRF used inside PBKDF2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pbkdf2Prf {
    HmacSha1,
    HmacSha256,
    HmacSha512,
}

impl fmt::Display for Pbkdf2Prf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pbkdf2Prf::HmacSha1 => write!(f, "HMAC-SHA1"),
            Pbkdf2Prf::HmacSha256 => write!(f, "HMAC-SHA256"),
            Pbkdf2Prf::HmacSha512 => write!(f, "HMAC-SHA512"),
        }
    }
}

impl FromStr for Pbkdf2Prf {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match wanted.trim_start_matches("hmac") {
            "sha1" => Ok(Pbkdf2Prf::HmacSha1),
            "sha256" => Ok(Pbkdf2Prf::HmacSha256),
            "sha512" => Ok(Pbkdf2Prf::HmacSha512),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Parameters for PBKDF2 derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    pub prf: Pbkdf2Prf,
    pub iterations: u32,
    pub output_len: usize,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            prf: Pbkdf2Prf::HmacSha256,
            iterations: 600_000,
            output_len: 32,
        }
    }
}

/// Derive key material with PBKDF2.
///
/// # Errors
/// - `InvalidInput` if `iterations` or `output_len` is zero
pub fn derive_pbkdf2(password: &[u8], salt: &[u8], params: &Pbkdf2Params) -> Result<Zeroizing<Vec<u8>>> {
    if params.iterations == 0 {
        return Err(Error::InvalidInput("PBKDF2 iterations must be at least 1".to_string()));
    }
    if params.output_len == 0 {
        return Err(Error::InvalidInput("PBKDF2 output length must be at least 1".to_string()));
    }

    debug!(prf = %params.prf, iterations = params.iterations, output_len = params.output_len, "Deriving key with PBKDF2");

    let mut out = Zeroizing::new(vec![0u8; params.output_len]);
    match params.prf {
        Pbkdf2Prf::HmacSha1 => pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password, salt, params.iterations, &mut out),
        Pbkdf2Prf::HmacSha256 => pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, params.iterations, &mut out),
        Pbkdf2Prf::HmacSha512 => pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, salt, params.iterations, &mut out),
    }
    Ok(out)
}

/// Verify that a password re-derives the expected key.
///
/// The comparison is constant-time.
pub fn verify_password(password: &[u8], salt: &[u8], params: &Argon2Params, expected: &[u8]) -> Result<bool> {
    let derived = derive_argon2(password, salt, params)?;
    Ok(bool::from(derived.as_slice().ct_eq(expected)))
}
