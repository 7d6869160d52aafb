//! Validated cipher parameters.
//!
//! A [`CipherParameters`] value can only be obtained from
//! [`ParameterBuilder::build`], so every transform downstream may assume the
//! key, IV, AAD and tag size already fit the algorithm they were built for.

use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::mode::{ChainingMode, GCM_MIN_TAG_SIZE, GCM_TAG_SIZE};
use crate::padding::PaddingScheme;
use crate::provider::{BlockEngineKind, StreamEngineKind};
use streamcrypt_common::{Error, Result};

/// The algorithm combination a parameter set is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    Block {
        engine: BlockEngineKind,
        mode: ChainingMode,
        padding: PaddingScheme,
    },
    Stream {
        engine: StreamEngineKind,
    },
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherSuite::Block { engine, mode, padding } => {
                write!(f, "{}/{}/{}", engine, mode, padding)
            }
            CipherSuite::Stream { engine } => write!(f, "{}", engine),
        }
    }
}

/// Key, IV/nonce and AEAD settings validated against a [`CipherSuite`].
#[derive(Clone)]
pub struct CipherParameters {
    suite: CipherSuite,
    key: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
    aad: Vec<u8>,
    tag_size: Option<usize>,
}

impl CipherParameters {
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// IV for block modes, nonce for stream ciphers. Empty for ECB.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Additional authenticated data. Empty unless the mode is AEAD.
    pub fn aad(&self) -> &[u8] {
        &self.aad
    }

    /// Tag length in bytes; `Some` only for AEAD modes.
    pub fn tag_size(&self) -> Option<usize> {
        self.tag_size
    }
}

impl fmt::Debug for CipherParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherParameters")
            .field("suite", &self.suite)
            .field("key", &format_args!("[REDACTED; {} bytes]", self.key.len()))
            .field("iv_len", &self.iv.len())
            .field("aad_len", &self.aad.len())
            .field("tag_size", &self.tag_size)
            .finish()
    }
}

/// Builder that checks parameters against the selected algorithm.
///
/// Setters only record values; every check happens in [`build`](Self::build).
pub struct ParameterBuilder {
    suite: CipherSuite,
    key: Option<Zeroizing<Vec<u8>>>,
    iv: Option<Vec<u8>>,
    aad: Option<Vec<u8>>,
    tag_size: Option<usize>,
}

impl ParameterBuilder {
    /// Start parameters for a block cipher in the given mode.
    pub fn for_block(engine: BlockEngineKind, mode: ChainingMode, padding: PaddingScheme) -> Self {
        Self::for_suite(CipherSuite::Block { engine, mode, padding })
    }

    /// Start parameters for a stream cipher.
    pub fn for_stream(engine: StreamEngineKind) -> Self {
        Self::for_suite(CipherSuite::Stream { engine })
    }

    pub fn for_suite(suite: CipherSuite) -> Self {
        Self {
            suite,
            key: None,
            iv: None,
            aad: None,
            tag_size: None,
        }
    }

    pub fn key(mut self, key: &[u8]) -> Self {
        self.key = Some(Zeroizing::new(key.to_vec()));
        self
    }

    pub fn iv(mut self, iv: &[u8]) -> Self {
        self.iv = Some(iv.to_vec());
        self
    }

    /// Alias of [`iv`](Self::iv) for stream ciphers.
    pub fn nonce(self, nonce: &[u8]) -> Self {
        self.iv(nonce)
    }

    pub fn aad(mut self, aad: &[u8]) -> Self {
        self.aad = Some(aad.to_vec());
        self
    }

    pub fn tag_size(mut self, tag_size: usize) -> Self {
        self.tag_size = Some(tag_size);
        self
    }

    /// Validate and produce the parameter set.
    ///
    /// # Errors
    /// - `InvalidKeySize` if the key is missing or has the wrong length
    /// - `InvalidIvSize` if the mode needs an IV and it is missing or out of range
    /// - `InvalidNonceSize` if a stream cipher nonce has the wrong length
    /// - `UnsupportedParameter` for AAD or a tag size on a non-AEAD suite,
    ///   padding on a counter mode, or a tag size outside 12..=16
    pub fn build(self) -> Result<CipherParameters> {
        let key = self.key.unwrap_or_default();

        let (iv, aad, tag_size) = match self.suite {
            CipherSuite::Block { engine, mode, padding } => {
                check_key(engine.name(), engine.key_size(), &key)?;

                if !mode.is_block_aligned() && padding != PaddingScheme::None {
                    return Err(Error::UnsupportedParameter(format!(
                        "{} padding with {} mode",
                        padding, mode
                    )));
                }

                let iv = if mode.uses_iv() {
                    let iv = self.iv.unwrap_or_default();
                    mode.validate_iv(iv.len())?;
                    iv
                } else {
                    if self.iv.is_some() {
                        debug!(mode = %mode, "Ignoring IV");
                    }
                    Vec::new()
                };

                if mode.is_aead() {
                    let tag_size = self.tag_size.unwrap_or(GCM_TAG_SIZE);
                    if !(GCM_MIN_TAG_SIZE..=GCM_TAG_SIZE).contains(&tag_size) {
                        return Err(Error::UnsupportedParameter(format!(
                            "tag size {} (expected {}..={})",
                            tag_size, GCM_MIN_TAG_SIZE, GCM_TAG_SIZE
                        )));
                    }
                    (iv, self.aad.unwrap_or_default(), Some(tag_size))
                } else {
                    reject_aead_settings(mode.name(), self.aad.is_some(), self.tag_size.is_some())?;
                    (iv, Vec::new(), None)
                }
            }
            CipherSuite::Stream { engine } => {
                check_key(engine.name(), engine.key_size(), &key)?;

                let nonce = self.iv.unwrap_or_default();
                if nonce.len() != engine.nonce_size() {
                    return Err(Error::InvalidNonceSize {
                        algorithm: engine.name().to_string(),
                        expected: engine.nonce_size().to_string(),
                        actual: nonce.len(),
                    });
                }
                reject_aead_settings(engine.name(), self.aad.is_some(), self.tag_size.is_some())?;
                (nonce, Vec::new(), None)
            }
        };

        Ok(CipherParameters {
            suite: self.suite,
            key,
            iv,
            aad,
            tag_size,
        })
    }
}

fn check_key(algorithm: &str, expected: usize, key: &[u8]) -> Result<()> {
    if key.len() != expected {
        return Err(Error::InvalidKeySize {
            algorithm: algorithm.to_string(),
            expected: expected.to_string(),
            actual: key.len(),
        });
    }
    Ok(())
}

fn reject_aead_settings(algorithm: &str, has_aad: bool, has_tag_size: bool) -> Result<()> {
    if has_aad {
        return Err(Error::UnsupportedParameter(format!(
            "associated data with non-authenticating {}",
            algorithm
        )));
    }
    if has_tag_size {
        return Err(Error::UnsupportedParameter(format!(
            "tag size with non-authenticating {}",
            algorithm
        )));
    }
    Ok(())
}
