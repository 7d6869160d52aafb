//! ML-KEM key encapsulation.
//!
//! Decapsulation follows implicit rejection: a ciphertext produced for a
//! different key decapsulates to an unrelated secret, never to an error.

use std::fmt;
use std::str::FromStr;

use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use tracing::debug;
use zeroize::Zeroizing;

use super::{backend_error, length_error, normalize};
use streamcrypt_common::{Error, Result, SensitiveBytes};

/// Length of every ML-KEM shared secret.
pub const SHARED_SECRET_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KemVariant {
    MlKem512,
    MlKem768,
    MlKem1024,
}

macro_rules! with_kem {
    ($variant:expr, $m:ident => $body:block) => {
        match $variant {
            KemVariant::MlKem512 => {
                use fips203::ml_kem_512 as $m;
                $body
            }
            KemVariant::MlKem768 => {
                use fips203::ml_kem_768 as $m;
                $body
            }
            KemVariant::MlKem1024 => {
                use fips203::ml_kem_1024 as $m;
                $body
            }
        }
    };
}

impl KemVariant {
    pub const ALL: [KemVariant; 3] = [KemVariant::MlKem512, KemVariant::MlKem768, KemVariant::MlKem1024];

    pub fn name(&self) -> &'static str {
        match self {
            KemVariant::MlKem512 => "ML-KEM-512",
            KemVariant::MlKem768 => "ML-KEM-768",
            KemVariant::MlKem1024 => "ML-KEM-1024",
        }
    }

    pub fn public_key_size(&self) -> usize {
        with_kem!(self, m => { m::EK_LEN })
    }

    pub fn private_key_size(&self) -> usize {
        with_kem!(self, m => { m::DK_LEN })
    }

    pub fn ciphertext_size(&self) -> usize {
        with_kem!(self, m => { m::CT_LEN })
    }
}

impl fmt::Display for KemVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KemVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "MLKEM512" | "KYBER512" => Ok(KemVariant::MlKem512),
            "MLKEM768" | "KYBER768" => Ok(KemVariant::MlKem768),
            "MLKEM1024" | "KYBER1024" => Ok(KemVariant::MlKem1024),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Encapsulation (public) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KemPublicKey {
    variant: KemVariant,
    bytes: Vec<u8>,
}

impl KemPublicKey {
    /// Wrap an encoded encapsulation key.
    ///
    /// # Errors
    /// - `InvalidInput` if the length does not match `variant`
    pub fn from_bytes(variant: KemVariant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != variant.public_key_size() {
            return Err(length_error("Public key", variant, variant.public_key_size(), bytes.len()));
        }
        Ok(Self { variant, bytes: bytes.to_vec() })
    }

    pub fn variant(&self) -> KemVariant {
        self.variant
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Decapsulation (private) key.
#[derive(Clone)]
pub struct KemPrivateKey {
    variant: KemVariant,
    bytes: Zeroizing<Vec<u8>>,
}

impl KemPrivateKey {
    /// Wrap an encoded decapsulation key.
    ///
    /// # Errors
    /// - `InvalidInput` if the length does not match `variant`
    pub fn from_bytes(variant: KemVariant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != variant.private_key_size() {
            return Err(length_error("Private key", variant, variant.private_key_size(), bytes.len()));
        }
        Ok(Self {
            variant,
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn variant(&self) -> KemVariant {
        self.variant
    }

    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for KemPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KemPrivateKey({}, [REDACTED])", self.variant)
    }
}

/// Result of [`encapsulate`].
#[derive(Debug, Clone)]
pub struct Encapsulation {
    pub ciphertext: Vec<u8>,
    pub shared_secret: SensitiveBytes,
}

/// Generate a key pair for `variant`.
pub fn generate_kem_keypair(variant: KemVariant) -> Result<(KemPublicKey, KemPrivateKey)> {
    debug!(variant = %variant, "Generating KEM key pair");
    with_kem!(variant, m => {
        let (ek, dk) = m::KG::try_keygen().map_err(|e| backend_error("Key generation", e))?;
        Ok((
            KemPublicKey { variant, bytes: ek.into_bytes().to_vec() },
            KemPrivateKey { variant, bytes: Zeroizing::new(dk.into_bytes().to_vec()) },
        ))
    })
}

/// Produce a fresh shared secret and its ciphertext for `public_key`.
///
/// # Errors
/// - `KeyFormat` if the key bytes are not a valid encapsulation key
pub fn encapsulate(public_key: &KemPublicKey) -> Result<Encapsulation> {
    let variant = public_key.variant;
    with_kem!(variant, m => {
        let bytes: [u8; m::EK_LEN] = public_key
            .bytes
            .as_slice()
            .try_into()
            .map_err(|_| length_error("Public key", variant, m::EK_LEN, public_key.bytes.len()))?;
        let ek = m::EncapsKey::try_from_bytes(bytes)
            .map_err(|e| Error::KeyFormat(format!("Invalid {} public key: {}", variant, e)))?;
        let (secret, ciphertext) = ek.try_encaps().map_err(|e| backend_error("Encapsulation", e))?;
        Ok(Encapsulation {
            ciphertext: ciphertext.into_bytes().to_vec(),
            shared_secret: SensitiveBytes::new(secret.into_bytes().to_vec()),
        })
    })
}

/// Recover the shared secret from `ciphertext`.
///
/// A well-formed ciphertext made for a different key yields a different
/// secret without error.
///
/// # Errors
/// - `InvalidInput` if `ciphertext` has the wrong length for the key's variant
/// - `KeyFormat` if the private key bytes are invalid
pub fn decapsulate(ciphertext: &[u8], private_key: &KemPrivateKey) -> Result<SensitiveBytes> {
    let variant = private_key.variant;
    with_kem!(variant, m => {
        let ct: [u8; m::CT_LEN] = ciphertext
            .try_into()
            .map_err(|_| length_error("Ciphertext", variant, m::CT_LEN, ciphertext.len()))?;
        let ct = m::CipherText::try_from_bytes(ct)
            .map_err(|e| Error::InvalidInput(format!("Invalid {} ciphertext: {}", variant, e)))?;

        let mut bytes = Zeroizing::new([0u8; m::DK_LEN]);
        if private_key.bytes.len() != m::DK_LEN {
            return Err(length_error("Private key", variant, m::DK_LEN, private_key.bytes.len()));
        }
        bytes.copy_from_slice(&private_key.bytes);
        let dk = m::DecapsKey::try_from_bytes(*bytes)
            .map_err(|e| Error::KeyFormat(format!("Invalid {} private key: {}", variant, e)))?;

        let secret = dk.try_decaps(&ct).map_err(|e| backend_error("Decapsulation", e))?;
        Ok(SensitiveBytes::new(secret.into_bytes().to_vec()))
    })
}
