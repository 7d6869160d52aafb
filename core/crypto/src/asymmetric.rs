//! Ed25519 signing, with RSA encryption and signatures in [`rsa`].
//!
//! These are the key types the [`keystore`](crate::keystore) persists.
//! Verification never errors: any malformed or mismatched signature is
//! simply reported as invalid.

pub mod rsa;

use ed25519_dalek::{Signature, Signer};
use rand::rngs::OsRng;
use tracing::debug;

pub use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH};

use streamcrypt_common::{Error, Result};

/// Generate a fresh Ed25519 key pair from the OS CSPRNG.
pub fn generate_ed25519() -> SigningKey {
    debug!("Generating Ed25519 key pair");
    SigningKey::generate(&mut OsRng)
}

/// Rebuild a signing key from its 32-byte seed.
///
/// # Errors
/// - `InvalidKeySize` if `seed` is not 32 bytes
pub fn signing_key_from_seed(seed: &[u8]) -> Result<SigningKey> {
    let seed: &[u8; SECRET_KEY_LENGTH] = seed.try_into().map_err(|_| Error::InvalidKeySize {
        algorithm: "Ed25519".to_string(),
        expected: SECRET_KEY_LENGTH.to_string(),
        actual: seed.len(),
    })?;
    Ok(SigningKey::from_bytes(seed))
}

/// Sign `message`, returning the 64-byte signature.
pub fn sign(message: &[u8], key: &SigningKey) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}

/// Check `signature` over `message`.
pub fn verify(message: &[u8], signature: &[u8], key: &VerifyingKey) -> bool {
    match Signature::from_slice(signature) {
        Ok(signature) => key.verify_strict(message, &signature).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = generate_ed25519();
        let signature = sign(b"message", &key);
        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        assert!(verify(b"message", &signature, &key.verifying_key()));
        assert!(!verify(b"massage", &signature, &key.verifying_key()));
    }

    #[test]
    fn test_mismatched_key_and_malformed_signature() {
        let key = generate_ed25519();
        let other = generate_ed25519();
        let signature = sign(b"message", &key);
        assert!(!verify(b"message", &signature, &other.verifying_key()));
        assert!(!verify(b"message", &signature[..40], &key.verifying_key()));
        assert!(!verify(b"message", &[], &key.verifying_key()));
    }

    #[test]
    fn test_rfc8032_test_vector_1() {
        let seed = hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60").unwrap();
        let key = signing_key_from_seed(&seed).unwrap();
        assert_eq!(
            hex::encode(key.verifying_key().to_bytes()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        let signature = sign(b"", &key);
        assert_eq!(
            hex::encode(&signature),
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
             5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
        );
    }

    #[test]
    fn test_seed_length_checked() {
        assert!(matches!(
            signing_key_from_seed(&[0u8; 31]),
            Err(Error::InvalidKeySize { actual: 31, .. })
        ));
    }
}
