//! Common error types for StreamCrypt.
//!
//! Failure messages name the operation and the violated constraint, never the
//! secret-dependent detail: padding and tag failures carry no payload at all.

use thiserror::Error;

/// Top-level error type for StreamCrypt operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Key length is outside the size class accepted by the algorithm.
    #[error("Invalid key size for {algorithm}: expected {expected}, got {actual}")]
    InvalidKeySize {
        algorithm: String,
        expected: String,
        actual: usize,
    },

    /// IV length does not match what the chaining mode requires.
    #[error("Invalid IV size for {mode}: expected {expected}, got {actual}")]
    InvalidIvSize {
        mode: String,
        expected: String,
        actual: usize,
    },

    /// Nonce length does not match the stream cipher variant.
    #[error("Invalid nonce size for {algorithm}: expected {expected}, got {actual}")]
    InvalidNonceSize {
        algorithm: String,
        expected: String,
        actual: usize,
    },

    /// Input is not a whole number of blocks and no padding was selected.
    #[error("{operation}: input is not aligned to the {block_size}-byte block size")]
    InvalidBlockAlignment {
        operation: String,
        block_size: usize,
    },

    /// Padding did not validate on decryption.
    #[error("Invalid padding")]
    InvalidPadding,

    /// AEAD tag mismatch; no plaintext was released.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Password-protected key material or an RSA-OAEP ciphertext could not
    /// be decrypted.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// A parameter was supplied that the selected mode does not accept.
    #[error("Unsupported parameter: {0}")]
    UnsupportedParameter(String),

    /// Algorithm name is not registered with the provider.
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Cooperative cancellation was observed.
    #[error("Operation cancelled")]
    Cancelled,

    /// Transform used out of sequence (e.g. finalized twice).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Key container is malformed or of an unexpected kind.
    #[error("Key format error: {0}")]
    KeyFormat(String),

    /// Primitive library failure.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether this failure depends on the processed data and therefore can
    /// only surface at finalization.
    pub fn is_data_dependent(&self) -> bool {
        matches!(
            self,
            Error::InvalidPadding | Error::AuthenticationFailed | Error::DecryptionFailed
        )
    }

    /// Whether the caller can fix this failure by changing parameters.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidKeySize { .. }
                | Error::InvalidIvSize { .. }
                | Error::InvalidNonceSize { .. }
                | Error::UnsupportedParameter(_)
                | Error::UnknownAlgorithm(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_error_has_no_detail() {
        assert_eq!(Error::InvalidPadding.to_string(), "Invalid padding");
        assert_eq!(
            Error::AuthenticationFailed.to_string(),
            "Authentication failed"
        );
    }

    #[test]
    fn test_classification() {
        assert!(Error::InvalidPadding.is_data_dependent());
        assert!(Error::DecryptionFailed.is_data_dependent());
        assert!(!Error::Cancelled.is_data_dependent());

        let err = Error::InvalidKeySize {
            algorithm: "AES-128".to_string(),
            expected: "16".to_string(),
            actual: 5,
        };
        assert!(err.is_validation());
        assert!(err.to_string().contains("AES-128"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
