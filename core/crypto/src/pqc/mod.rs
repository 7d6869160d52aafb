//! Post-quantum key encapsulation (ML-KEM) and signatures (ML-DSA).
//!
//! Keys travel as their FIPS 203/204 byte encodings tagged with the
//! parameter set, so callers can store and reload them without touching
//! the underlying crates.

pub mod kem;
pub mod sign;

pub use kem::{
    decapsulate, encapsulate, generate_kem_keypair, Encapsulation, KemPrivateKey, KemPublicKey,
    KemVariant,
};
pub use sign::{
    generate_signing_keypair, sign, verify, SignatureVariant, SigningPrivateKey, SigningPublicKey,
};

use std::fmt;

use streamcrypt_common::Error;

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_uppercase()
}

fn backend_error(operation: &str, err: impl fmt::Display) -> Error {
    Error::Crypto(format!("{} failed: {}", operation, err))
}

fn length_error(what: &str, variant: impl fmt::Display, expected: usize, actual: usize) -> Error {
    Error::InvalidInput(format!(
        "{} for {} must be {} bytes, got {}",
        what, variant, expected, actual
    ))
}
