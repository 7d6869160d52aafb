//! ML-DSA signatures.

use std::fmt;
use std::str::FromStr;

use fips204::traits::{KeyGen, SerDes, Signer, Verifier};
use tracing::debug;
use zeroize::Zeroizing;

use super::{backend_error, length_error, normalize};
use streamcrypt_common::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVariant {
    MlDsa44,
    MlDsa65,
    MlDsa87,
}

macro_rules! with_dsa {
    ($variant:expr, $m:ident => $body:block) => {
        match $variant {
            SignatureVariant::MlDsa44 => {
                use fips204::ml_dsa_44 as $m;
                $body
            }
            SignatureVariant::MlDsa65 => {
                use fips204::ml_dsa_65 as $m;
                $body
            }
            SignatureVariant::MlDsa87 => {
                use fips204::ml_dsa_87 as $m;
                $body
            }
        }
    };
}

impl SignatureVariant {
    pub const ALL: [SignatureVariant; 3] = [
        SignatureVariant::MlDsa44,
        SignatureVariant::MlDsa65,
        SignatureVariant::MlDsa87,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignatureVariant::MlDsa44 => "ML-DSA-44",
            SignatureVariant::MlDsa65 => "ML-DSA-65",
            SignatureVariant::MlDsa87 => "ML-DSA-87",
        }
    }

    pub fn public_key_size(&self) -> usize {
        with_dsa!(self, m => { m::PK_LEN })
    }

    pub fn private_key_size(&self) -> usize {
        with_dsa!(self, m => { m::SK_LEN })
    }

    pub fn signature_size(&self) -> usize {
        with_dsa!(self, m => { m::SIG_LEN })
    }
}

impl fmt::Display for SignatureVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "MLDSA44" | "DILITHIUM2" => Ok(SignatureVariant::MlDsa44),
            "MLDSA65" | "DILITHIUM3" => Ok(SignatureVariant::MlDsa65),
            "MLDSA87" | "DILITHIUM5" => Ok(SignatureVariant::MlDsa87),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPublicKey {
    variant: SignatureVariant,
    bytes: Vec<u8>,
}

impl SigningPublicKey {
    /// # Errors
    /// - `InvalidInput` if the length does not match `variant`
    pub fn from_bytes(variant: SignatureVariant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != variant.public_key_size() {
            return Err(length_error("Public key", variant, variant.public_key_size(), bytes.len()));
        }
        Ok(Self { variant, bytes: bytes.to_vec() })
    }

    pub fn variant(&self) -> SignatureVariant {
        self.variant
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Clone)]
pub struct SigningPrivateKey {
    variant: SignatureVariant,
    bytes: Zeroizing<Vec<u8>>,
}

impl SigningPrivateKey {
    /// # Errors
    /// - `InvalidInput` if the length does not match `variant`
    pub fn from_bytes(variant: SignatureVariant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != variant.private_key_size() {
            return Err(length_error("Private key", variant, variant.private_key_size(), bytes.len()));
        }
        Ok(Self {
            variant,
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn variant(&self) -> SignatureVariant {
        self.variant
    }

    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningPrivateKey({}, [REDACTED])", self.variant)
    }
}

pub fn generate_signing_keypair(variant: SignatureVariant) -> Result<(SigningPublicKey, SigningPrivateKey)> {
    debug!(variant = %variant, "Generating signing key pair");
    with_dsa!(variant, m => {
        let (pk, sk) = m::KG::try_keygen().map_err(|e| backend_error("Key generation", e))?;
        Ok((
            SigningPublicKey { variant, bytes: pk.into_bytes().to_vec() },
            SigningPrivateKey { variant, bytes: Zeroizing::new(sk.into_bytes().to_vec()) },
        ))
    })
}

/// Sign `message` with an empty context string.
///
/// # Errors
/// - `KeyFormat` if the private key bytes are invalid
/// - `Crypto` if signing fails
pub fn sign(message: &[u8], private_key: &SigningPrivateKey) -> Result<Vec<u8>> {
    let variant = private_key.variant;
    with_dsa!(variant, m => {
        let mut bytes = Zeroizing::new([0u8; m::SK_LEN]);
        if private_key.bytes.len() != m::SK_LEN {
            return Err(length_error("Private key", variant, m::SK_LEN, private_key.bytes.len()));
        }
        bytes.copy_from_slice(&private_key.bytes);
        let sk = m::PrivateKey::try_from_bytes(*bytes)
            .map_err(|e| Error::KeyFormat(format!("Invalid {} private key: {}", variant, e)))?;
        let signature = sk.try_sign(message, &[]).map_err(|e| backend_error("Signing", e))?;
        Ok(signature.to_vec())
    })
}

/// Check `signature` over `message`.
///
/// Malformed keys or signatures verify as `false`.
pub fn verify(message: &[u8], signature: &[u8], public_key: &SigningPublicKey) -> bool {
    with_dsa!(public_key.variant, m => {
        let Ok(signature) = <[u8; m::SIG_LEN]>::try_from(signature) else {
            return false;
        };
        let Ok(bytes) = <[u8; m::PK_LEN]>::try_from(public_key.bytes.as_slice()) else {
            return false;
        };
        match m::PublicKey::try_from_bytes(bytes) {
            Ok(pk) => pk.verify(message, &signature, &[]),
            Err(_) => false,
        }
    })
}
