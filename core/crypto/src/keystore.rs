//! PEM persistence of asymmetric keys.
//!
//! Public keys are written as SPKI under `PUBLIC KEY`; private keys as
//! PKCS#8 under `PRIVATE KEY`, or as PBES2-encrypted PKCS#8 under
//! `ENCRYPTED PRIVATE KEY` when a password is supplied. Any key type that
//! implements the `pkcs8`/`spki` encoding traits can be stored.

use std::fmt;
use std::io::{Read, Write};

use pkcs8::der::pem::LineEnding;
use pkcs8::der::Document;
use pkcs8::pkcs5::{pbes2, EncryptionScheme};
pub use pkcs8::spki::{DecodePublicKey, EncodePublicKey};
pub use pkcs8::{DecodePrivateKey, EncodePrivateKey};
use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo, SecretDocument};
use rand::RngCore;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::keys::random_bytes;
use streamcrypt_common::{Error, Result};

pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Default PBKDF2 iteration count for protected keys.
pub const DEFAULT_PROTECTION_ITERATIONS: u32 = 100_000;

const PROTECTION_SALT_LEN: usize = 16;

/// Password-based encryption applied to a stored private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionAlgorithm {
    /// PBES2 with PBKDF2-HMAC-SHA256 and AES-128-CBC.
    Pbkdf2Sha256Aes128Cbc,
    /// PBES2 with PBKDF2-HMAC-SHA256 and AES-256-CBC.
    Pbkdf2Sha256Aes256Cbc,
}

impl fmt::Display for ProtectionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionAlgorithm::Pbkdf2Sha256Aes128Cbc => write!(f, "PBES2/PBKDF2-SHA256/AES-128-CBC"),
            ProtectionAlgorithm::Pbkdf2Sha256Aes256Cbc => write!(f, "PBES2/PBKDF2-SHA256/AES-256-CBC"),
        }
    }
}

/// Password protection settings for [`save_private`].
pub struct Protection<'a> {
    password: &'a [u8],
    algorithm: ProtectionAlgorithm,
    iterations: u32,
}

impl<'a> Protection<'a> {
    /// AES-256-CBC with the default iteration count.
    pub fn new(password: &'a [u8]) -> Self {
        Self {
            password,
            algorithm: ProtectionAlgorithm::Pbkdf2Sha256Aes256Cbc,
            iterations: DEFAULT_PROTECTION_ITERATIONS,
        }
    }

    pub fn with_algorithm(mut self, algorithm: ProtectionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

impl fmt::Debug for Protection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protection")
            .field("password", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("iterations", &self.iterations)
            .finish()
    }
}

/// What a PEM container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    PublicKey,
    PrivateKey,
    EncryptedPrivateKey,
}

/// Metadata read from a container without decrypting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContainer {
    pub kind: ContainerKind,
    /// Set for encrypted containers using one of the supported schemes.
    pub protection: Option<ProtectionAlgorithm>,
    /// PBKDF2 iteration count of an encrypted container.
    pub iterations: Option<u32>,
    /// Whether an unencrypted private key record also carries the public key.
    pub includes_public_key: bool,
}

impl KeyContainer {
    /// Identify a PEM container.
    ///
    /// # Errors
    /// - `KeyFormat` if the text is not PEM or the label is unknown
    pub fn inspect(pem: &str) -> Result<Self> {
        let (label, doc) = SecretDocument::from_pem(pem).map_err(key_format)?;
        match label {
            PUBLIC_KEY_LABEL => Ok(Self {
                kind: ContainerKind::PublicKey,
                protection: None,
                iterations: None,
                includes_public_key: true,
            }),
            PRIVATE_KEY_LABEL => {
                let info = PrivateKeyInfo::try_from(doc.as_bytes()).map_err(key_format)?;
                Ok(Self {
                    kind: ContainerKind::PrivateKey,
                    protection: None,
                    iterations: None,
                    includes_public_key: info.public_key.is_some(),
                })
            }
            ENCRYPTED_PRIVATE_KEY_LABEL => {
                let info = EncryptedPrivateKeyInfo::try_from(doc.as_bytes()).map_err(key_format)?;
                let (protection, iterations) = describe_scheme(&info.encryption_algorithm);
                Ok(Self {
                    kind: ContainerKind::EncryptedPrivateKey,
                    protection,
                    iterations,
                    includes_public_key: false,
                })
            }
            other => Err(Error::KeyFormat(format!("Unexpected container label '{}'", other))),
        }
    }
}

/// Write `key` as a `PUBLIC KEY` container.
pub fn save_public<K: EncodePublicKey, W: Write>(key: &K, mut writer: W) -> Result<()> {
    let pem = key.to_public_key_pem(LineEnding::LF).map_err(key_format)?;
    writer.write_all(pem.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read a `PUBLIC KEY` container.
///
/// # Errors
/// - `KeyFormat` if the container is malformed or holds something else
pub fn load_public<K: DecodePublicKey, R: Read>(reader: R) -> Result<K> {
    let text = read_pem(reader)?;
    let (label, doc) = Document::from_pem(&text).map_err(key_format)?;
    if label != PUBLIC_KEY_LABEL {
        return Err(Error::KeyFormat(format!(
            "Expected a {} container, found '{}'",
            PUBLIC_KEY_LABEL, label
        )));
    }
    K::from_public_key_der(doc.as_bytes()).map_err(key_format)
}

/// Write `key` as a private key container, encrypted when `protection` is
/// given.
///
/// # Postconditions
/// - Unprotected output is deterministic for a given key
/// - Protected output uses a fresh random salt and IV
///
/// # Errors
/// - `KeyFormat` if the key cannot be encoded
/// - `Crypto` if encryption fails
pub fn save_private<K: EncodePrivateKey, W: Write>(
    key: &K,
    mut writer: W,
    protection: Option<&Protection<'_>>,
) -> Result<()> {
    let der = key.to_pkcs8_der().map_err(key_format)?;

    let pem = match protection {
        None => der.to_pem(PRIVATE_KEY_LABEL, LineEnding::LF).map_err(key_format)?,
        Some(protection) => {
            let salt = random_bytes(PROTECTION_SALT_LEN);
            let mut iv = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut iv);

            let params = match protection.algorithm {
                ProtectionAlgorithm::Pbkdf2Sha256Aes128Cbc => {
                    pbes2::Parameters::pbkdf2_sha256_aes128cbc(protection.iterations, &salt, &iv)
                }
                ProtectionAlgorithm::Pbkdf2Sha256Aes256Cbc => {
                    pbes2::Parameters::pbkdf2_sha256_aes256cbc(protection.iterations, &salt, &iv)
                }
            }
            .map_err(|e| Error::Crypto(format!("Invalid key protection parameters: {}", e)))?;

            let info = PrivateKeyInfo::try_from(der.as_bytes()).map_err(key_format)?;
            let encrypted = info
                .encrypt_with_params(params, protection.password)
                .map_err(|e| Error::Crypto(format!("Key encryption failed: {}", e)))?;

            debug!(algorithm = %protection.algorithm, iterations = protection.iterations, "Encrypted private key");
            encrypted
                .to_pem(ENCRYPTED_PRIVATE_KEY_LABEL, LineEnding::LF)
                .map_err(key_format)?
        }
    };

    writer.write_all(pem.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read a private key container.
///
/// Both bare private key records and key-pair records (with the public
/// key embedded) load as the private key.
///
/// # Errors
/// - `DecryptionFailed` if the container is encrypted and `password` is
///   missing or wrong
/// - `KeyFormat` if the container is malformed or not a private key
pub fn load_private<K: DecodePrivateKey, R: Read>(reader: R, password: Option<&[u8]>) -> Result<K> {
    let text = read_pem(reader)?;
    let (label, doc) = SecretDocument::from_pem(&text).map_err(key_format)?;

    match label {
        PRIVATE_KEY_LABEL => {
            if password.is_some() {
                debug!("Ignoring password for unencrypted private key");
            }
            K::from_pkcs8_der(doc.as_bytes()).map_err(key_format)
        }
        ENCRYPTED_PRIVATE_KEY_LABEL => {
            let info = EncryptedPrivateKeyInfo::try_from(doc.as_bytes()).map_err(key_format)?;
            let password = password.ok_or(Error::DecryptionFailed)?;
            let decrypted = info.decrypt(password).map_err(|_| {
                warn!("Private key decryption failed");
                Error::DecryptionFailed
            })?;
            K::from_pkcs8_der(decrypted.as_bytes()).map_err(|_| Error::DecryptionFailed)
        }
        other => Err(Error::KeyFormat(format!(
            "Expected a private key container, found '{}'",
            other
        ))),
    }
}

fn read_pem<R: Read>(mut reader: R) -> Result<Zeroizing<String>> {
    let mut raw = Zeroizing::new(Vec::new());
    reader.read_to_end(&mut raw)?;
    let text = std::str::from_utf8(&raw).map_err(|_| Error::KeyFormat("Container is not UTF-8 text".to_string()))?;
    Ok(Zeroizing::new(text.to_string()))
}

fn describe_scheme(scheme: &EncryptionScheme<'_>) -> (Option<ProtectionAlgorithm>, Option<u32>) {
    let EncryptionScheme::Pbes2(params) = scheme else {
        return (None, None);
    };
    let pbes2::Kdf::Pbkdf2(kdf) = &params.kdf else {
        return (None, None);
    };
    let iterations = Some(kdf.iteration_count);
    if !matches!(kdf.prf, pbes2::Pbkdf2Prf::HmacWithSha256) {
        return (None, iterations);
    }
    let protection = match params.encryption {
        pbes2::EncryptionScheme::Aes128Cbc { .. } => Some(ProtectionAlgorithm::Pbkdf2Sha256Aes128Cbc),
        pbes2::EncryptionScheme::Aes256Cbc { .. } => Some(ProtectionAlgorithm::Pbkdf2Sha256Aes256Cbc),
        _ => None,
    };
    (protection, iterations)
}

fn key_format<E: fmt::Display>(err: E) -> Error {
    Error::KeyFormat(err.to_string())
}
