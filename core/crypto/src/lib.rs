//! Streaming cryptographic transformations for StreamCrypt.
//!
//! This crate provides:
//! - Block ciphers (AES, Serpent) under ECB, CBC, CTR and GCM with
//!   pluggable padding
//! - Stream ciphers (ChaCha20, XChaCha20, Salsa20, XSalsa20)
//! - Message digests
//! - A chunked pipeline that drives any [`Transform`] from a reader to a
//!   writer with pooled buffers, cancellation and progress reporting
//! - Password-based key derivation using Argon2 and PBKDF2
//! - Ed25519 and RSA keys with PEM persistence, optionally password
//!   protected, plus RSA-OAEP encryption and RSA-PSS signatures
//! - ML-KEM encapsulation and ML-DSA signatures
//!
//! # Security Guarantees
//! - All key material is zeroized on drop
//! - No plaintext or key material is ever logged
//! - Padding and tag checks run in constant time
//! - GCM decryption releases no plaintext before the tag verifies

mod aead;
pub mod asymmetric;
pub mod kdf;
pub mod keys;
pub mod keystore;
pub mod mode;
pub mod padding;
pub mod params;
pub mod pipeline;
pub mod pool;
pub mod pqc;
pub mod provider;
pub mod transform;

pub use kdf::{derive_argon2, derive_pbkdf2, Argon2Params, Pbkdf2Params};
pub use keys::{random_bytes, Salt, SecretKey};
pub use keystore::{load_private, load_public, save_private, save_public, Protection, ProtectionAlgorithm};
pub use mode::ChainingMode;
pub use padding::PaddingScheme;
pub use params::{CipherParameters, CipherSuite, ParameterBuilder};
pub use pipeline::{Pipeline, ProgressCallback};
pub use pool::BufferPool;
pub use provider::{BlockEngineKind, DigestKind, PrimitiveProvider, StreamEngineKind};
pub use transform::{create_transform, BlockCipher, Hasher, StreamCipher, Transform};
