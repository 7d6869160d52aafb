//! Galois/Counter Mode authentication over a block engine.
//!
//! GCM here is assembled from the raw engine: the counter keystream comes
//! from [`CounterKeystream`] with 32-bit increments and the tag from GHASH
//! over AAD, ciphertext and the bit-length block (NIST SP 800-38D).

use ghash::universal_hash::{KeyInit, UniversalHash};
use ghash::GHash;
use zeroize::Zeroize;

use crate::mode::{CounterIncrement, CounterKeystream, GCM_MAX_TEXT_LEN, GCM_STANDARD_IV_SIZE};
use crate::provider::{Block, BlockEngine, BLOCK_SIZE};
use streamcrypt_common::{Error, Result};

/// Running GCM state for one message.
pub(crate) struct GcmState {
    keystream: CounterKeystream,
    ghash: GHash,
    /// E(K, J0), XORed into the GHASH output to form the tag.
    tag_mask: Block,
    /// Ciphertext bytes not yet forming a whole GHASH block.
    pending: Vec<u8>,
    aad_len: u64,
    text_len: u64,
}

impl GcmState {
    /// Derive H and J0 from the engine and IV and absorb the AAD.
    ///
    /// # Preconditions
    /// - `iv` is non-empty (checked by the parameter builder)
    pub(crate) fn new(engine: &BlockEngine, iv: &[u8], aad: &[u8]) -> Self {
        let mut h = [0u8; BLOCK_SIZE];
        engine.encrypt_block(&mut h);

        let j0 = if iv.len() == GCM_STANDARD_IV_SIZE {
            let mut j0 = [0u8; BLOCK_SIZE];
            j0[..GCM_STANDARD_IV_SIZE].copy_from_slice(iv);
            j0[BLOCK_SIZE - 1] = 1;
            j0
        } else {
            let mut hasher = GHash::new(ghash::Key::from_slice(&h));
            hasher.update_padded(iv);
            hasher.update(&[length_block(0, iv.len() as u64)]);
            to_block(hasher.finalize())
        };

        let mut ghash = GHash::new(ghash::Key::from_slice(&h));
        h.zeroize();
        ghash.update_padded(aad);

        let mut tag_mask = j0;
        engine.encrypt_block(&mut tag_mask);

        let mut keystream = CounterKeystream::new(j0, CounterIncrement::Low32);
        keystream.advance();

        Self {
            keystream,
            ghash,
            tag_mask,
            pending: Vec::with_capacity(BLOCK_SIZE),
            aad_len: aad.len() as u64,
            text_len: 0,
        }
    }

    /// Encrypt in place and absorb the resulting ciphertext.
    ///
    /// # Errors
    /// - `InvalidInput` if the message would exceed `GCM_MAX_TEXT_LEN`;
    ///   `data` is left untouched
    pub(crate) fn encrypt(&mut self, engine: &BlockEngine, data: &mut [u8]) -> Result<()> {
        self.ensure_capacity(data.len())?;
        self.keystream.apply(engine, data);
        self.absorb(data);
        Ok(())
    }

    /// Absorb ciphertext and decrypt it in place.
    ///
    /// # Errors
    /// - `InvalidInput` if the message would exceed `GCM_MAX_TEXT_LEN`;
    ///   `data` is left untouched
    pub(crate) fn decrypt(&mut self, engine: &BlockEngine, data: &mut [u8]) -> Result<()> {
        self.ensure_capacity(data.len())?;
        self.absorb(data);
        self.keystream.apply(engine, data);
        Ok(())
    }

    /// Check that `len` more bytes keep the counter clear of J0.
    pub(crate) fn ensure_capacity(&self, len: usize) -> Result<()> {
        let total = self.text_len.checked_add(len as u64);
        match total {
            Some(total) if total <= GCM_MAX_TEXT_LEN => Ok(()),
            _ => Err(Error::InvalidInput(format!(
                "GCM message exceeds {} bytes",
                GCM_MAX_TEXT_LEN
            ))),
        }
    }

    /// The full 16-byte tag over everything absorbed so far.
    pub(crate) fn tag(&self) -> Block {
        let mut ghash = self.ghash.clone();
        if !self.pending.is_empty() {
            ghash.update_padded(&self.pending);
        }
        ghash.update(&[length_block(self.aad_len, self.text_len)]);

        let mut tag = to_block(ghash.finalize());
        for (t, m) in tag.iter_mut().zip(self.tag_mask.iter()) {
            *t ^= m;
        }
        tag
    }

    fn absorb(&mut self, mut ciphertext: &[u8]) {
        self.text_len += ciphertext.len() as u64;

        if !self.pending.is_empty() {
            let take = (BLOCK_SIZE - self.pending.len()).min(ciphertext.len());
            self.pending.extend_from_slice(&ciphertext[..take]);
            ciphertext = &ciphertext[take..];
            if self.pending.len() < BLOCK_SIZE {
                return;
            }
            self.ghash.update(&[ghash::Block::clone_from_slice(&self.pending)]);
            self.pending.clear();
        }

        let whole = ciphertext.len() - ciphertext.len() % BLOCK_SIZE;
        for block in ciphertext[..whole].chunks_exact(BLOCK_SIZE) {
            self.ghash.update(&[ghash::Block::clone_from_slice(block)]);
        }
        self.pending.extend_from_slice(&ciphertext[whole..]);
    }
}

impl Drop for GcmState {
    fn drop(&mut self) {
        self.tag_mask.zeroize();
        self.pending.zeroize();
    }
}

/// GHASH length block: bit lengths of AAD and text, big-endian.
fn length_block(aad_len: u64, text_len: u64) -> ghash::Block {
    let mut block = [0u8; BLOCK_SIZE];
    block[..8].copy_from_slice(&aad_len.wrapping_mul(8).to_be_bytes());
    block[8..].copy_from_slice(&text_len.wrapping_mul(8).to_be_bytes());
    ghash::Block::clone_from_slice(&block)
}

fn to_block(output: ghash::Block) -> Block {
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&output);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BlockEngineKind;

    fn aes128_zero() -> BlockEngine {
        BlockEngine::new(BlockEngineKind::Aes128, &[0u8; 16]).unwrap()
    }

    #[test]
    fn test_empty_message_tag() {
        // McGrew/Viega GCM test case 1.
        let engine = aes128_zero();
        let state = GcmState::new(&engine, &[0u8; 12], &[]);
        assert_eq!(hex::encode(state.tag()), "58e2fccefa7e3061367f1d57a4e7455a");
    }

    #[test]
    fn test_single_block_vector() {
        // McGrew/Viega GCM test case 2.
        let engine = aes128_zero();
        let mut state = GcmState::new(&engine, &[0u8; 12], &[]);
        let mut data = [0u8; 16];
        state.encrypt(&engine, &mut data).unwrap();
        assert_eq!(hex::encode(data), "0388dace60b6a392f328c2b971b2fe78");
        assert_eq!(hex::encode(state.tag()), "ab6e47d42cec13bdf53a67b21257bddf");
    }

    #[test]
    fn test_split_absorb_matches_whole() {
        let engine = aes128_zero();
        let iv = [5u8; 7];
        let aad = b"header";

        let mut whole = vec![0x42u8; 45];
        let mut one = GcmState::new(&engine, &iv, aad);
        one.encrypt(&engine, &mut whole).unwrap();

        let mut split = vec![0x42u8; 45];
        let mut two = GcmState::new(&engine, &iv, aad);
        for piece in split.chunks_mut(6) {
            two.encrypt(&engine, piece).unwrap();
        }

        assert_eq!(whole, split);
        assert_eq!(one.tag(), two.tag());
    }

    #[test]
    fn test_decrypt_reverses_encrypt() {
        let engine = aes128_zero();
        let mut data = b"attack at dawn, bring snacks".to_vec();
        let mut enc = GcmState::new(&engine, &[1u8; 12], b"aad");
        enc.encrypt(&engine, &mut data).unwrap();
        let tag = enc.tag();

        let mut dec = GcmState::new(&engine, &[1u8; 12], b"aad");
        dec.decrypt(&engine, &mut data).unwrap();
        assert_eq!(data, b"attack at dawn, bring snacks");
        assert_eq!(dec.tag(), tag);

        let other = GcmState::new(&engine, &[1u8; 12], b"aae");
        assert_ne!(other.tag(), GcmState::new(&engine, &[1u8; 12], b"aad").tag());
    }

    #[test]
    fn test_message_length_limit() {
        let engine = aes128_zero();
        let mut state = GcmState::new(&engine, &[9u8; 12], &[]);
        state.text_len = GCM_MAX_TEXT_LEN - 16;

        let mut last = [0u8; 16];
        state.encrypt(&engine, &mut last).unwrap();

        let mut over = [0u8; 1];
        assert!(matches!(state.encrypt(&engine, &mut over), Err(Error::InvalidInput(_))));
        assert_eq!(over, [0u8; 1]);
        assert!(matches!(state.decrypt(&engine, &mut over), Err(Error::InvalidInput(_))));
        assert!(state.ensure_capacity(0).is_ok());
    }

    #[test]
    fn test_limit_stops_before_counter_reaches_j0() {
        // With a 12-byte IV J0 ends in 00000001 and data starts at 00000002.
        // The last permitted block uses counter FFFFFFFF; one more would use
        // 00000000 and the next J0 itself.
        let engine = aes128_zero();
        let iv = [3u8; 12];
        let mut j0 = [0u8; BLOCK_SIZE];
        j0[..12].copy_from_slice(&iv);
        j0[15] = 1;

        let mut last_counter = j0;
        last_counter[12..].copy_from_slice(&[0xFF; 4]);
        let mut expected = [0u8; BLOCK_SIZE];
        let mut keystream = CounterKeystream::new(last_counter, CounterIncrement::Low32);
        keystream.apply(&engine, &mut expected);

        let mut state = GcmState::new(&engine, &iv, &[]);
        state.keystream = CounterKeystream::new(last_counter, CounterIncrement::Low32);
        state.text_len = GCM_MAX_TEXT_LEN - BLOCK_SIZE as u64;

        let mut block = [0u8; BLOCK_SIZE];
        state.encrypt(&engine, &mut block).unwrap();
        assert_eq!(block, expected);
        assert_ne!(block, state.tag_mask);

        let mut next = [0u8; BLOCK_SIZE];
        assert!(state.encrypt(&engine, &mut next).is_err());
        assert_eq!(next, [0u8; BLOCK_SIZE]);
    }
}
