//! RSA encryption and signatures.
//!
//! Encryption uses OAEP and signing uses PSS. Both take the hash as a
//! parameter; PSS signs the message digest under that hash with a salt of
//! the digest length. Keys persist through the [`keystore`](crate::keystore)
//! as SPKI and PKCS#8 like any other asymmetric key.

use std::fmt;
use std::str::FromStr;

use ::rsa::traits::PublicKeyParts;
use ::rsa::{Oaep, Pss};
use rand::rngs::OsRng;
use sha2::Digest;
use tracing::debug;
use zeroize::Zeroizing;

pub use ::rsa::{RsaPrivateKey, RsaPublicKey};

use streamcrypt_common::{Error, Result};

pub const DEFAULT_RSA_BITS: usize = 3072;
pub const MIN_RSA_BITS: usize = 1024;
/// Largest modulus the backend accepts when loading a public key.
pub const MAX_RSA_BITS: usize = 4096;

/// Hash used by OAEP (label hash and MGF1) and by PSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RsaHash {
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

macro_rules! with_hash {
    ($hash:expr, $d:ident => $body:block) => {
        match $hash {
            RsaHash::Sha1 => {
                type $d = sha1::Sha1;
                $body
            }
            RsaHash::Sha256 => {
                type $d = sha2::Sha256;
                $body
            }
            RsaHash::Sha384 => {
                type $d = sha2::Sha384;
                $body
            }
            RsaHash::Sha512 => {
                type $d = sha2::Sha512;
                $body
            }
        }
    };
}

impl RsaHash {
    pub const ALL: [RsaHash; 4] = [RsaHash::Sha1, RsaHash::Sha256, RsaHash::Sha384, RsaHash::Sha512];

    pub fn name(&self) -> &'static str {
        match self {
            RsaHash::Sha1 => "SHA-1",
            RsaHash::Sha256 => "SHA-256",
            RsaHash::Sha384 => "SHA-384",
            RsaHash::Sha512 => "SHA-512",
        }
    }

    pub fn output_size(&self) -> usize {
        with_hash!(self, D => { <D as Digest>::output_size() })
    }
}

impl fmt::Display for RsaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RsaHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace(['-', '_'], "").to_ascii_uppercase().as_str() {
            "SHA1" => Ok(RsaHash::Sha1),
            "SHA256" => Ok(RsaHash::Sha256),
            "SHA384" => Ok(RsaHash::Sha384),
            "SHA512" => Ok(RsaHash::Sha512),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

fn rsa_error(operation: &str, err: ::rsa::Error) -> Error {
    match err {
        ::rsa::Error::MessageTooLong => Error::InvalidInput(format!("{} input is too long for the key", operation)),
        ::rsa::Error::Decryption => Error::DecryptionFailed,
        other => Error::Crypto(format!("{} failed: {}", operation, other)),
    }
}

/// Generate a private key with a `bits`-bit modulus and exponent 65537.
///
/// # Errors
/// - `InvalidKeySize` if `bits` is outside `MIN_RSA_BITS..=MAX_RSA_BITS`
pub fn generate_rsa(bits: usize) -> Result<RsaPrivateKey> {
    if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
        return Err(Error::InvalidKeySize {
            algorithm: "RSA".to_string(),
            expected: format!("{}..={} bits", MIN_RSA_BITS, MAX_RSA_BITS),
            actual: bits,
        });
    }
    debug!(bits, "Generating RSA key pair");
    RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| rsa_error("Key generation", e))
}

/// Longest message `key` can encrypt under OAEP with `hash`.
pub fn max_oaep_message_len(key: &RsaPublicKey, hash: RsaHash) -> usize {
    key.size().saturating_sub(2 * hash.output_size() + 2)
}

/// Encrypt `message` under OAEP. Output is randomized and as long as the
/// modulus.
///
/// # Errors
/// - `InvalidInput` if `message` exceeds [`max_oaep_message_len`]
pub fn encrypt_oaep(message: &[u8], key: &RsaPublicKey, hash: RsaHash) -> Result<Vec<u8>> {
    with_hash!(hash, D => {
        key.encrypt(&mut OsRng, Oaep::new::<D>(), message)
            .map_err(|e| rsa_error("OAEP encryption", e))
    })
}

/// Decrypt an OAEP ciphertext.
///
/// # Errors
/// - `DecryptionFailed` for a ciphertext made under another key or hash,
///   or one that was modified
pub fn decrypt_oaep(ciphertext: &[u8], key: &RsaPrivateKey, hash: RsaHash) -> Result<Zeroizing<Vec<u8>>> {
    with_hash!(hash, D => {
        key.decrypt(Oaep::new::<D>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|e| rsa_error("OAEP decryption", e))
    })
}

/// Sign `message` with PSS.
pub fn sign_pss(message: &[u8], key: &RsaPrivateKey, hash: RsaHash) -> Result<Vec<u8>> {
    with_hash!(hash, D => {
        let digest = D::digest(message);
        key.sign_with_rng(&mut OsRng, Pss::new::<D>(), &digest)
            .map_err(|e| rsa_error("PSS signing", e))
    })
}

/// Check a PSS `signature` over `message`.
///
/// Malformed or mismatched signatures verify as `false`.
pub fn verify_pss(message: &[u8], signature: &[u8], key: &RsaPublicKey, hash: RsaHash) -> bool {
    with_hash!(hash, D => {
        let digest = D::digest(message);
        key.verify(Pss::new::<D>(), &digest, signature).is_ok()
    })
}
