//! Primitive provider: resolves algorithm names to block engines, stream
//! engines and digests.
//!
//! The provider is the only place in the crate that touches the underlying
//! primitive implementations. Everything above it works in terms of the
//! closed engine enums defined here.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use aes::{Aes128, Aes192, Aes256};
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use serde::{Deserialize, Serialize};
use serpent::Serpent;
use sha2::Digest as _;
use tracing::debug;

use streamcrypt_common::{Error, Result};

/// Block size of every registered block engine (128-bit).
pub const BLOCK_SIZE: usize = 16;

/// Key size shared by every stream engine (256-bit).
pub const STREAM_KEY_SIZE: usize = 32;

/// A single 128-bit block.
pub type Block = [u8; BLOCK_SIZE];

/// Named block cipher algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockEngineKind {
    Aes128,
    Aes192,
    Aes256,
    Serpent128,
    Serpent192,
    Serpent256,
}

impl BlockEngineKind {
    /// All built-in block engines.
    pub const ALL: [BlockEngineKind; 6] = [
        BlockEngineKind::Aes128,
        BlockEngineKind::Aes192,
        BlockEngineKind::Aes256,
        BlockEngineKind::Serpent128,
        BlockEngineKind::Serpent192,
        BlockEngineKind::Serpent256,
    ];

    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            BlockEngineKind::Aes128 => "AES-128",
            BlockEngineKind::Aes192 => "AES-192",
            BlockEngineKind::Aes256 => "AES-256",
            BlockEngineKind::Serpent128 => "Serpent-128",
            BlockEngineKind::Serpent192 => "Serpent-192",
            BlockEngineKind::Serpent256 => "Serpent-256",
        }
    }

    /// Required key length in bytes.
    pub fn key_size(&self) -> usize {
        match self {
            BlockEngineKind::Aes128 | BlockEngineKind::Serpent128 => 16,
            BlockEngineKind::Aes192 | BlockEngineKind::Serpent192 => 24,
            BlockEngineKind::Aes256 | BlockEngineKind::Serpent256 => 32,
        }
    }

    /// Block length in bytes.
    pub fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// Pick the variant of a cipher family that matches a key length.
    ///
    /// `family` is `"AES"` or `"Serpent"` (case-insensitive).
    pub fn for_family(family: &str, key_len: usize) -> Result<Self> {
        let candidates: &[BlockEngineKind] = match family.to_ascii_uppercase().as_str() {
            "AES" => &Self::ALL[..3],
            "SERPENT" => &Self::ALL[3..],
            _ => return Err(Error::UnknownAlgorithm(family.to_string())),
        };
        candidates
            .iter()
            .copied()
            .find(|kind| kind.key_size() == key_len)
            .ok_or_else(|| Error::InvalidKeySize {
                algorithm: family.to_string(),
                expected: "16, 24 or 32".to_string(),
                actual: key_len,
            })
    }
}

impl fmt::Display for BlockEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockEngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|kind| normalize(kind.name()) == wanted)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// Named stream cipher algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamEngineKind {
    /// IETF ChaCha20 (RFC 8439), 96-bit nonce.
    ChaCha20,
    /// Original ChaCha20 with a 64-bit nonce.
    ChaCha20Legacy,
    XChaCha20,
    Salsa20,
    XSalsa20,
}

impl StreamEngineKind {
    /// All built-in stream engines.
    pub const ALL: [StreamEngineKind; 5] = [
        StreamEngineKind::ChaCha20,
        StreamEngineKind::ChaCha20Legacy,
        StreamEngineKind::XChaCha20,
        StreamEngineKind::Salsa20,
        StreamEngineKind::XSalsa20,
    ];

    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEngineKind::ChaCha20 => "ChaCha20",
            StreamEngineKind::ChaCha20Legacy => "ChaCha20-Legacy",
            StreamEngineKind::XChaCha20 => "XChaCha20",
            StreamEngineKind::Salsa20 => "Salsa20",
            StreamEngineKind::XSalsa20 => "XSalsa20",
        }
    }

    /// Required key length in bytes.
    pub fn key_size(&self) -> usize {
        STREAM_KEY_SIZE
    }

    /// Required nonce length in bytes.
    pub fn nonce_size(&self) -> usize {
        match self {
            StreamEngineKind::ChaCha20 => 12,
            StreamEngineKind::ChaCha20Legacy | StreamEngineKind::Salsa20 => 8,
            StreamEngineKind::XChaCha20 | StreamEngineKind::XSalsa20 => 24,
        }
    }
}

impl fmt::Display for StreamEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamEngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|kind| normalize(kind.name()) == wanted)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// Named message digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestKind {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake2b512,
    Blake2s256,
}

impl DigestKind {
    /// All built-in digests.
    pub const ALL: [DigestKind; 10] = [
        DigestKind::Sha1,
        DigestKind::Sha224,
        DigestKind::Sha256,
        DigestKind::Sha384,
        DigestKind::Sha512,
        DigestKind::Sha3_256,
        DigestKind::Sha3_384,
        DigestKind::Sha3_512,
        DigestKind::Blake2b512,
        DigestKind::Blake2s256,
    ];

    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            DigestKind::Sha1 => "SHA-1",
            DigestKind::Sha224 => "SHA-224",
            DigestKind::Sha256 => "SHA-256",
            DigestKind::Sha384 => "SHA-384",
            DigestKind::Sha512 => "SHA-512",
            DigestKind::Sha3_256 => "SHA3-256",
            DigestKind::Sha3_384 => "SHA3-384",
            DigestKind::Sha3_512 => "SHA3-512",
            DigestKind::Blake2b512 => "BLAKE2b-512",
            DigestKind::Blake2s256 => "BLAKE2s-256",
        }
    }

    /// Digest length in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            DigestKind::Sha1 => 20,
            DigestKind::Sha224 => 28,
            DigestKind::Sha256 | DigestKind::Sha3_256 | DigestKind::Blake2s256 => 32,
            DigestKind::Sha384 | DigestKind::Sha3_384 => 48,
            DigestKind::Sha512 | DigestKind::Sha3_512 | DigestKind::Blake2b512 => 64,
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|kind| normalize(kind.name()) == wanted)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// Names compare case-insensitively and ignore `-` / `_` separators.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A keyed 128-bit block permutation.
///
/// Key schedules are zeroized on drop by the underlying implementations.
#[derive(Clone)]
pub enum BlockEngine {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
    Serpent(BlockEngineKind, Serpent),
}

impl BlockEngine {
    /// Key a block engine of the given kind.
    pub fn new(kind: BlockEngineKind, key: &[u8]) -> Result<Self> {
        if key.len() != kind.key_size() {
            return Err(Error::InvalidKeySize {
                algorithm: kind.name().to_string(),
                expected: kind.key_size().to_string(),
                actual: key.len(),
            });
        }
        let invalid = |_| Error::Crypto(format!("{} rejected the key", kind.name()));
        let engine = match kind {
            BlockEngineKind::Aes128 => BlockEngine::Aes128(Aes128::new_from_slice(key).map_err(invalid)?),
            BlockEngineKind::Aes192 => BlockEngine::Aes192(Aes192::new_from_slice(key).map_err(invalid)?),
            BlockEngineKind::Aes256 => BlockEngine::Aes256(Aes256::new_from_slice(key).map_err(invalid)?),
            BlockEngineKind::Serpent128
            | BlockEngineKind::Serpent192
            | BlockEngineKind::Serpent256 => {
                BlockEngine::Serpent(kind, Serpent::new_from_slice(key).map_err(invalid)?)
            }
        };
        Ok(engine)
    }

    /// The algorithm this engine was keyed for.
    pub fn kind(&self) -> BlockEngineKind {
        match self {
            BlockEngine::Aes128(_) => BlockEngineKind::Aes128,
            BlockEngine::Aes192(_) => BlockEngineKind::Aes192,
            BlockEngine::Aes256(_) => BlockEngineKind::Aes256,
            BlockEngine::Serpent(kind, _) => *kind,
        }
    }

    /// Encrypt one block in place.
    pub fn encrypt_block(&self, block: &mut Block) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            BlockEngine::Aes128(c) => c.encrypt_block(block),
            BlockEngine::Aes192(c) => c.encrypt_block(block),
            BlockEngine::Aes256(c) => c.encrypt_block(block),
            BlockEngine::Serpent(_, c) => c.encrypt_block(block),
        }
    }

    /// Decrypt one block in place.
    pub fn decrypt_block(&self, block: &mut Block) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            BlockEngine::Aes128(c) => c.decrypt_block(block),
            BlockEngine::Aes192(c) => c.decrypt_block(block),
            BlockEngine::Aes256(c) => c.decrypt_block(block),
            BlockEngine::Serpent(_, c) => c.decrypt_block(block),
        }
    }
}

impl fmt::Debug for BlockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockEngine({})", self.kind())
    }
}

/// A keyed keystream generator.
pub enum StreamEngine {
    ChaCha20(chacha20::ChaCha20),
    ChaCha20Legacy(chacha20::ChaCha20Legacy),
    XChaCha20(chacha20::XChaCha20),
    Salsa20(salsa20::Salsa20),
    XSalsa20(salsa20::XSalsa20),
}

impl StreamEngine {
    /// Key a stream engine of the given kind with its nonce.
    pub fn new(kind: StreamEngineKind, key: &[u8], nonce: &[u8]) -> Result<Self> {
        if key.len() != kind.key_size() {
            return Err(Error::InvalidKeySize {
                algorithm: kind.name().to_string(),
                expected: kind.key_size().to_string(),
                actual: key.len(),
            });
        }
        if nonce.len() != kind.nonce_size() {
            return Err(Error::InvalidNonceSize {
                algorithm: kind.name().to_string(),
                expected: kind.nonce_size().to_string(),
                actual: nonce.len(),
            });
        }
        let invalid = |_| Error::Crypto(format!("{} rejected the key or nonce", kind.name()));
        let engine = match kind {
            StreamEngineKind::ChaCha20 => {
                StreamEngine::ChaCha20(chacha20::ChaCha20::new_from_slices(key, nonce).map_err(invalid)?)
            }
            StreamEngineKind::ChaCha20Legacy => StreamEngine::ChaCha20Legacy(
                chacha20::ChaCha20Legacy::new_from_slices(key, nonce).map_err(invalid)?,
            ),
            StreamEngineKind::XChaCha20 => {
                StreamEngine::XChaCha20(chacha20::XChaCha20::new_from_slices(key, nonce).map_err(invalid)?)
            }
            StreamEngineKind::Salsa20 => {
                StreamEngine::Salsa20(salsa20::Salsa20::new_from_slices(key, nonce).map_err(invalid)?)
            }
            StreamEngineKind::XSalsa20 => {
                StreamEngine::XSalsa20(salsa20::XSalsa20::new_from_slices(key, nonce).map_err(invalid)?)
            }
        };
        Ok(engine)
    }

    /// The algorithm this engine was keyed for.
    pub fn kind(&self) -> StreamEngineKind {
        match self {
            StreamEngine::ChaCha20(_) => StreamEngineKind::ChaCha20,
            StreamEngine::ChaCha20Legacy(_) => StreamEngineKind::ChaCha20Legacy,
            StreamEngine::XChaCha20(_) => StreamEngineKind::XChaCha20,
            StreamEngine::Salsa20(_) => StreamEngineKind::Salsa20,
            StreamEngine::XSalsa20(_) => StreamEngineKind::XSalsa20,
        }
    }

    /// XOR the next `data.len()` keystream bytes into `data`.
    ///
    /// # Errors
    /// - `Crypto` if the keystream for this key and nonce is exhausted
    pub fn apply_keystream(&mut self, data: &mut [u8]) -> Result<()> {
        let result = match self {
            StreamEngine::ChaCha20(c) => c.try_apply_keystream(data),
            StreamEngine::ChaCha20Legacy(c) => c.try_apply_keystream(data),
            StreamEngine::XChaCha20(c) => c.try_apply_keystream(data),
            StreamEngine::Salsa20(c) => c.try_apply_keystream(data),
            StreamEngine::XSalsa20(c) => c.try_apply_keystream(data),
        };
        result.map_err(|_| Error::Crypto(format!("{} keystream exhausted", self.kind())))
    }
}

impl fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamEngine({})", self.kind())
    }
}

/// An incremental message digest.
#[derive(Clone)]
pub enum Digest {
    Sha1(sha1::Sha1),
    Sha224(sha2::Sha224),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Sha3_256(sha3::Sha3_256),
    Sha3_384(sha3::Sha3_384),
    Sha3_512(sha3::Sha3_512),
    Blake2b512(blake2::Blake2b512),
    Blake2s256(blake2::Blake2s256),
}

impl Digest {
    /// Start a fresh digest of the given kind.
    pub fn new(kind: DigestKind) -> Self {
        match kind {
            DigestKind::Sha1 => Digest::Sha1(sha1::Sha1::new()),
            DigestKind::Sha224 => Digest::Sha224(sha2::Sha224::new()),
            DigestKind::Sha256 => Digest::Sha256(sha2::Sha256::new()),
            DigestKind::Sha384 => Digest::Sha384(sha2::Sha384::new()),
            DigestKind::Sha512 => Digest::Sha512(sha2::Sha512::new()),
            DigestKind::Sha3_256 => Digest::Sha3_256(sha3::Sha3_256::new()),
            DigestKind::Sha3_384 => Digest::Sha3_384(sha3::Sha3_384::new()),
            DigestKind::Sha3_512 => Digest::Sha3_512(sha3::Sha3_512::new()),
            DigestKind::Blake2b512 => Digest::Blake2b512(blake2::Blake2b512::new()),
            DigestKind::Blake2s256 => Digest::Blake2s256(blake2::Blake2s256::new()),
        }
    }

    pub fn kind(&self) -> DigestKind {
        match self {
            Digest::Sha1(_) => DigestKind::Sha1,
            Digest::Sha224(_) => DigestKind::Sha224,
            Digest::Sha256(_) => DigestKind::Sha256,
            Digest::Sha384(_) => DigestKind::Sha384,
            Digest::Sha512(_) => DigestKind::Sha512,
            Digest::Sha3_256(_) => DigestKind::Sha3_256,
            Digest::Sha3_384(_) => DigestKind::Sha3_384,
            Digest::Sha3_512(_) => DigestKind::Sha3_512,
            Digest::Blake2b512(_) => DigestKind::Blake2b512,
            Digest::Blake2s256(_) => DigestKind::Blake2s256,
        }
    }

    pub fn output_size(&self) -> usize {
        self.kind().output_size()
    }

    /// Absorb more input.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Digest::Sha1(h) => h.update(data),
            Digest::Sha224(h) => h.update(data),
            Digest::Sha256(h) => h.update(data),
            Digest::Sha384(h) => h.update(data),
            Digest::Sha512(h) => h.update(data),
            Digest::Sha3_256(h) => h.update(data),
            Digest::Sha3_384(h) => h.update(data),
            Digest::Sha3_512(h) => h.update(data),
            Digest::Blake2b512(h) => h.update(data),
            Digest::Blake2s256(h) => h.update(data),
        }
    }

    /// Consume the digest and return its output.
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Digest::Sha1(h) => h.finalize().to_vec(),
            Digest::Sha224(h) => h.finalize().to_vec(),
            Digest::Sha256(h) => h.finalize().to_vec(),
            Digest::Sha384(h) => h.finalize().to_vec(),
            Digest::Sha512(h) => h.finalize().to_vec(),
            Digest::Sha3_256(h) => h.finalize().to_vec(),
            Digest::Sha3_384(h) => h.finalize().to_vec(),
            Digest::Sha3_512(h) => h.finalize().to_vec(),
            Digest::Blake2b512(h) => h.finalize().to_vec(),
            Digest::Blake2s256(h) => h.finalize().to_vec(),
        }
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.kind())
    }
}

/// Factory for keyed block engines.
pub type BlockEngineFactory = Box<dyn Fn(&[u8]) -> Result<BlockEngine> + Send + Sync>;

/// Factory for keyed stream engines, taking key and nonce.
pub type StreamEngineFactory = Box<dyn Fn(&[u8], &[u8]) -> Result<StreamEngine> + Send + Sync>;

/// Factory for digests.
pub type DigestFactory = Box<dyn Fn() -> Digest + Send + Sync>;

/// Registry of primitive factories, keyed by algorithm name.
///
/// Names are matched case-insensitively and without separators, so
/// `"aes-256"`, `"AES256"` and `"Aes_256"` resolve to the same entry.
pub struct PrimitiveProvider {
    block: HashMap<String, BlockEngineFactory>,
    stream: HashMap<String, StreamEngineFactory>,
    digest: HashMap<String, DigestFactory>,
}

impl PrimitiveProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            block: HashMap::new(),
            stream: HashMap::new(),
            digest: HashMap::new(),
        }
    }

    /// Create a provider with every built-in algorithm registered.
    ///
    /// Besides the exact block algorithm names, the family names `AES` and
    /// `Serpent` are registered and select the variant from the key length.
    pub fn with_defaults() -> Self {
        let mut provider = Self::new();

        for kind in BlockEngineKind::ALL {
            provider
                .block
                .insert(normalize(kind.name()), Box::new(move |key| BlockEngine::new(kind, key)));
        }
        for family in ["AES", "Serpent"] {
            provider.block.insert(
                normalize(family),
                Box::new(move |key| BlockEngine::new(BlockEngineKind::for_family(family, key.len())?, key)),
            );
        }
        for kind in StreamEngineKind::ALL {
            provider.stream.insert(
                normalize(kind.name()),
                Box::new(move |key, nonce| StreamEngine::new(kind, key, nonce)),
            );
        }
        for kind in DigestKind::ALL {
            provider
                .digest
                .insert(normalize(kind.name()), Box::new(move || Digest::new(kind)));
        }

        debug!(
            block = provider.block.len(),
            stream = provider.stream.len(),
            digest = provider.digest.len(),
            "Registered built-in primitives"
        );
        provider
    }

    /// Register a block engine factory.
    ///
    /// # Errors
    /// - `InvalidInput` if the name is already registered
    pub fn register_block(&mut self, name: &str, factory: BlockEngineFactory) -> Result<()> {
        insert_unique(&mut self.block, name, factory)
    }

    /// Register a stream engine factory.
    ///
    /// # Errors
    /// - `InvalidInput` if the name is already registered
    pub fn register_stream(&mut self, name: &str, factory: StreamEngineFactory) -> Result<()> {
        insert_unique(&mut self.stream, name, factory)
    }

    /// Register a digest factory.
    ///
    /// # Errors
    /// - `InvalidInput` if the name is already registered
    pub fn register_digest(&mut self, name: &str, factory: DigestFactory) -> Result<()> {
        insert_unique(&mut self.digest, name, factory)
    }

    /// Produce a keyed block engine.
    ///
    /// # Errors
    /// - `UnknownAlgorithm` if the name is not registered
    /// - `InvalidKeySize` if the key length is wrong for the algorithm
    pub fn make_block_engine(&self, name: &str, key: &[u8]) -> Result<BlockEngine> {
        let factory = self
            .block
            .get(&normalize(name))
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))?;
        factory(key)
    }

    /// Produce a keyed stream engine.
    ///
    /// # Errors
    /// - `UnknownAlgorithm` if the name is not registered
    /// - `InvalidKeySize` / `InvalidNonceSize` on size mismatch
    pub fn make_stream_engine(&self, name: &str, key: &[u8], nonce: &[u8]) -> Result<StreamEngine> {
        let factory = self
            .stream
            .get(&normalize(name))
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))?;
        factory(key, nonce)
    }

    /// Produce a fresh digest.
    ///
    /// # Errors
    /// - `UnknownAlgorithm` if the name is not registered
    pub fn make_digest(&self, name: &str) -> Result<Digest> {
        let factory = self
            .digest
            .get(&normalize(name))
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))?;
        Ok(factory())
    }

    /// Check whether any axis has the name registered.
    pub fn has_algorithm(&self, name: &str) -> bool {
        let key = normalize(name);
        self.block.contains_key(&key) || self.stream.contains_key(&key) || self.digest.contains_key(&key)
    }
}

impl Default for PrimitiveProvider {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn insert_unique<F>(table: &mut HashMap<String, F>, name: &str, factory: F) -> Result<()> {
    let key = normalize(name);
    if table.contains_key(&key) {
        return Err(Error::InvalidInput(format!(
            "Algorithm '{}' is already registered",
            name
        )));
    }
    table.insert(key, factory);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}

    #[test]
    fn test_engine_key_schedules_zeroize_on_drop() {
        assert_zeroize_on_drop::<Aes128>();
        assert_zeroize_on_drop::<Aes192>();
        assert_zeroize_on_drop::<Aes256>();
        assert_zeroize_on_drop::<Serpent>();
        assert_zeroize_on_drop::<chacha20::ChaCha20>();
        assert_zeroize_on_drop::<salsa20::Salsa20>();
    }

    #[test]
    fn test_aes256_zero_key_known_block() {
        let provider = PrimitiveProvider::with_defaults();
        let engine = provider.make_block_engine("AES-256", &[0u8; 32]).unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        engine.encrypt_block(&mut block);
        assert_eq!(hex::encode(block), "dc95c078a2408989ad48a21492842087");
        engine.decrypt_block(&mut block);
        assert_eq!(block, [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_aes128_fips197_vector() {
        let key = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let engine = BlockEngine::new(BlockEngineKind::Aes128, &key).unwrap();
        let mut block: Block = hex::decode("00112233445566778899aabbccddeeff")
            .unwrap()
            .try_into()
            .unwrap();
        engine.encrypt_block(&mut block);
        assert_eq!(hex::encode(block), "69c4e0d86a7b0430d8cdb78070b4c55a");
    }

    #[test]
    fn test_family_name_selects_by_key_length() {
        let provider = PrimitiveProvider::with_defaults();
        let engine = provider.make_block_engine("aes", &[1u8; 24]).unwrap();
        assert_eq!(engine.kind(), BlockEngineKind::Aes192);
        let engine = provider.make_block_engine("serpent", &[1u8; 16]).unwrap();
        assert_eq!(engine.kind(), BlockEngineKind::Serpent128);

        let err = provider.make_block_engine("AES", &[1u8; 20]).unwrap_err();
        assert!(matches!(err, Error::InvalidKeySize { actual: 20, .. }));
    }

    #[test]
    fn test_block_key_size_mismatch() {
        let err = BlockEngine::new(BlockEngineKind::Aes256, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::InvalidKeySize { actual: 16, .. }));
    }

    #[test]
    fn test_unknown_algorithm() {
        let provider = PrimitiveProvider::with_defaults();
        assert!(matches!(
            provider.make_block_engine("Twofish", &[0u8; 32]),
            Err(Error::UnknownAlgorithm(_))
        ));
        assert!(matches!(
            provider.make_stream_engine("RC4", &[0u8; 32], &[]),
            Err(Error::UnknownAlgorithm(_))
        ));
        assert!(matches!(provider.make_digest("MD5"), Err(Error::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_stream_nonce_sizes() {
        let provider = PrimitiveProvider::with_defaults();
        for kind in StreamEngineKind::ALL {
            let nonce = vec![0u8; kind.nonce_size()];
            let engine = provider.make_stream_engine(kind.name(), &[7u8; 32], &nonce).unwrap();
            assert_eq!(engine.kind(), kind);

            let err = provider
                .make_stream_engine(kind.name(), &[7u8; 32], &nonce[1..])
                .unwrap_err();
            assert!(matches!(err, Error::InvalidNonceSize { .. }));
        }
    }

    #[test]
    fn test_chacha20_rfc8439_keystream() {
        // RFC 8439 section 2.4.2, counter starts at 0 so skip the first block.
        let key: Vec<u8> = (0u8..32).collect();
        let nonce = hex::decode("000000000000004a00000000").unwrap();
        let mut engine = StreamEngine::new(StreamEngineKind::ChaCha20, &key, &nonce).unwrap();
        let mut skip = [0u8; 64];
        engine.apply_keystream(&mut skip).unwrap();

        let mut data = b"Ladies and Gentlemen of the class of '99".to_vec();
        engine.apply_keystream(&mut data).unwrap();
        assert_eq!(hex::encode(&data[..16]), "6e2e359a2568f98041ba0728dd0d6981");
    }

    #[test]
    fn test_digest_known_answers() {
        let provider = PrimitiveProvider::with_defaults();
        let mut sha = provider.make_digest("sha-256").unwrap();
        sha.update(b"abc");
        assert_eq!(
            hex::encode(sha.finalize()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let mut sha3 = provider.make_digest("SHA3-256").unwrap();
        sha3.update(b"abc");
        assert_eq!(
            hex::encode(sha3.finalize()),
            "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"
        );
    }

    #[test]
    fn test_digest_output_sizes() {
        for kind in DigestKind::ALL {
            let digest = Digest::new(kind);
            assert_eq!(digest.finalize().len(), kind.output_size(), "{}", kind);
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut provider = PrimitiveProvider::with_defaults();
        let err = provider
            .register_digest("sha256", Box::new(|| Digest::new(DigestKind::Sha256)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        provider
            .register_digest("fingerprint", Box::new(|| Digest::new(DigestKind::Blake2s256)))
            .unwrap();
        assert!(provider.has_algorithm("FINGERPRINT"));
        assert_eq!(provider.make_digest("fingerprint").unwrap().kind(), DigestKind::Blake2s256);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("aes256".parse::<BlockEngineKind>().unwrap(), BlockEngineKind::Aes256);
        assert_eq!(
            "chacha20-legacy".parse::<StreamEngineKind>().unwrap(),
            StreamEngineKind::ChaCha20Legacy
        );
        assert_eq!("blake2b_512".parse::<DigestKind>().unwrap(), DigestKind::Blake2b512);
        assert!("des".parse::<BlockEngineKind>().is_err());
    }
}
