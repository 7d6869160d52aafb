//! Incremental transforms: the unit of work the pipeline drives.
//!
//! A transform is bound to one message and one direction. It accepts input
//! in arbitrary slices through [`Transform::update`], may hold some of it
//! back, and releases the remainder exactly once in
//! [`Transform::finalize`].

pub mod block;
pub mod digest;
pub mod stream;

pub use block::{BlockCipher, BlockCipherTransform};
pub use digest::{verify_digest, DigestTransform, Hasher};
pub use stream::{StreamCipher, StreamCipherTransform};

use streamcrypt_common::{Direction, Error, Result};

use crate::params::{CipherParameters, CipherSuite};
use crate::provider::PrimitiveProvider;

/// A stateful byte transformation.
///
/// Output of `update` is appended to `output`; implementations never clear
/// it. Feeding the same input split at different points yields identical
/// concatenated output.
pub trait Transform: Send {
    /// Algorithm description for logging.
    fn name(&self) -> String;

    /// Process the next input slice.
    ///
    /// # Errors
    /// - `InvalidState` after `finalize`
    fn update(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Emit any held-back output and close the transform.
    ///
    /// # Errors
    /// - `InvalidState` if already finalized
    /// - Data-dependent failures (`InvalidPadding`, `AuthenticationFailed`,
    ///   `InvalidBlockAlignment`)
    fn finalize(&mut self, output: &mut Vec<u8>) -> Result<()>;

    fn is_finalized(&self) -> bool;
}

/// Build the transform matching a parameter set's suite.
pub fn create_transform(
    provider: &PrimitiveProvider,
    params: &CipherParameters,
    direction: Direction,
) -> Result<Box<dyn Transform>> {
    match params.suite() {
        CipherSuite::Block { .. } => Ok(Box::new(BlockCipherTransform::new(provider, params, direction)?)),
        CipherSuite::Stream { .. } => Ok(Box::new(StreamCipherTransform::new(provider, params, direction)?)),
    }
}

/// Open/finalized flag shared by the transform implementations.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    finalized: bool,
}

impl Lifecycle {
    pub(crate) fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.finalized {
            return Err(Error::InvalidState(format!(
                "{} called after finalize",
                operation
            )));
        }
        Ok(())
    }

    /// Mark finalized; fails if that already happened.
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::InvalidState("finalize called twice".to_string()));
        }
        self.finalized = true;
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.finalized
    }
}
