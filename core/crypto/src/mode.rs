//! Block cipher chaining modes and their IV rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::provider::{Block, BlockEngine, BLOCK_SIZE};
use streamcrypt_common::{Error, Result};

/// Shortest IV accepted by CTR; shorter seeds leave too few counter bits.
pub const CTR_MIN_IV_SIZE: usize = 8;

/// Longest IV accepted by GCM.
pub const GCM_MAX_IV_SIZE: usize = 128;

/// The GCM IV length that maps directly onto the initial counter block.
pub const GCM_STANDARD_IV_SIZE: usize = 12;

/// Default and maximum GCM tag length.
pub const GCM_TAG_SIZE: usize = 16;

/// Shortest GCM tag accepted.
pub const GCM_MIN_TAG_SIZE: usize = 12;

/// Most text one GCM message may carry: 2^32 - 2 blocks, after which the
/// 32-bit counter would return to J0.
pub const GCM_MAX_TEXT_LEN: u64 = ((1u64 << 32) - 2) * BLOCK_SIZE as u64;

/// Chaining mode applied over a block engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainingMode {
    Ecb,
    Cbc,
    Ctr,
    Gcm,
}

impl ChainingMode {
    pub const ALL: [ChainingMode; 4] = [
        ChainingMode::Ecb,
        ChainingMode::Cbc,
        ChainingMode::Ctr,
        ChainingMode::Gcm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChainingMode::Ecb => "ECB",
            ChainingMode::Cbc => "CBC",
            ChainingMode::Ctr => "CTR",
            ChainingMode::Gcm => "GCM",
        }
    }

    /// Whether the mode authenticates (accepts AAD and emits a tag).
    pub fn is_aead(&self) -> bool {
        matches!(self, ChainingMode::Gcm)
    }

    /// Whether input must be completed to whole blocks (by padding or by the
    /// caller). Counter-based modes are length-preserving.
    pub fn is_block_aligned(&self) -> bool {
        matches!(self, ChainingMode::Ecb | ChainingMode::Cbc)
    }

    /// Whether the mode consumes an IV at all.
    pub fn uses_iv(&self) -> bool {
        !matches!(self, ChainingMode::Ecb)
    }

    /// Human-readable IV size rule.
    pub fn iv_rule(&self) -> String {
        match self {
            ChainingMode::Ecb => "none".to_string(),
            ChainingMode::Cbc => BLOCK_SIZE.to_string(),
            ChainingMode::Ctr => format!("{}..={}", CTR_MIN_IV_SIZE, BLOCK_SIZE),
            ChainingMode::Gcm => format!("1..={}", GCM_MAX_IV_SIZE),
        }
    }

    /// Check an IV length against the mode's size class.
    ///
    /// # Errors
    /// - `InvalidIvSize` if the mode needs an IV and `iv_len` is out of range
    pub fn validate_iv(&self, iv_len: usize) -> Result<()> {
        let ok = match self {
            ChainingMode::Ecb => true,
            ChainingMode::Cbc => iv_len == BLOCK_SIZE,
            ChainingMode::Ctr => (CTR_MIN_IV_SIZE..=BLOCK_SIZE).contains(&iv_len),
            ChainingMode::Gcm => (1..=GCM_MAX_IV_SIZE).contains(&iv_len),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidIvSize {
                mode: self.name().to_string(),
                expected: self.iv_rule(),
                actual: iv_len,
            })
        }
    }
}

impl fmt::Display for ChainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChainingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// How the counter block advances between keystream blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CounterIncrement {
    /// The whole block is a 128-bit big-endian integer (CTR).
    Full,
    /// Only the low 32 bits wrap (GCM `inc32`).
    Low32,
}

/// Keystream produced by encrypting successive counter blocks.
///
/// Keeps the unused tail of the current keystream block so that callers
/// may feed arbitrary slice lengths.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct CounterKeystream {
    counter: Block,
    block: Block,
    used: usize,
    #[zeroize(skip)]
    increment: CounterIncrement,
}

impl CounterKeystream {
    pub(crate) fn new(initial: Block, increment: CounterIncrement) -> Self {
        Self {
            counter: initial,
            block: [0u8; BLOCK_SIZE],
            used: BLOCK_SIZE,
            increment,
        }
    }

    /// Seed for CTR: the IV right-padded with zeros to a full block.
    pub(crate) fn from_iv(iv: &[u8]) -> Self {
        let mut initial = [0u8; BLOCK_SIZE];
        initial[..iv.len()].copy_from_slice(iv);
        Self::new(initial, CounterIncrement::Full)
    }

    /// XOR keystream into `data`, advancing the counter as needed.
    pub(crate) fn apply(&mut self, engine: &BlockEngine, data: &mut [u8]) {
        for byte in data.iter_mut() {
            if self.used == BLOCK_SIZE {
                self.block = self.counter;
                engine.encrypt_block(&mut self.block);
                self.advance();
                self.used = 0;
            }
            *byte ^= self.block[self.used];
            self.used += 1;
        }
    }

    pub(crate) fn advance(&mut self) {
        let limit = match self.increment {
            CounterIncrement::Full => 0,
            CounterIncrement::Low32 => BLOCK_SIZE - 4,
        };
        for byte in self.counter[limit..].iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                break;
            }
        }
    }
}
