//! Block cipher transform (ECB, CBC, CTR, GCM) and the service that drives
//! it over streams.

use std::io::{Read, Write};
use std::sync::Arc;

use subtle::ConstantTimeEq;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::aead::GcmState;
use crate::mode::{ChainingMode, CounterKeystream, GCM_TAG_SIZE};
use crate::padding::PaddingScheme;
use crate::params::{CipherParameters, CipherSuite, ParameterBuilder};
use crate::pipeline::Pipeline;
use crate::provider::{Block, BlockEngine, BlockEngineKind, PrimitiveProvider, BLOCK_SIZE};
use crate::transform::{Lifecycle, Transform};
use streamcrypt_common::{Direction, Error, Result};

enum ModeState {
    Ecb,
    Cbc {
        chain: Block,
    },
    Ctr(CounterKeystream),
    Gcm {
        state: GcmState,
        tag_size: usize,
        /// Decrypted bytes held until the tag verifies.
        plaintext: Zeroizing<Vec<u8>>,
    },
}

/// One message through a block cipher in one direction.
///
/// ECB and CBC buffer up to one block of input: encryption keeps the
/// unaligned remainder, decryption with padding also keeps the last whole
/// block so it can be unpadded at finalization. CTR is length preserving
/// and emits output immediately. GCM decryption withholds all plaintext
/// until the tag has been checked.
pub struct BlockCipherTransform {
    engine: BlockEngine,
    mode: ChainingMode,
    padding: PaddingScheme,
    direction: Direction,
    state: ModeState,
    /// Unprocessed input: the partial block for ECB/CBC, the candidate tag
    /// for GCM decryption.
    pending: Zeroizing<Vec<u8>>,
    lifecycle: Lifecycle,
}

impl BlockCipherTransform {
    /// Key the engine and set up the mode state.
    ///
    /// # Errors
    /// - `UnsupportedParameter` if `params` were built for a stream cipher
    /// - `UnknownAlgorithm` if the provider lacks the engine
    pub fn new(provider: &PrimitiveProvider, params: &CipherParameters, direction: Direction) -> Result<Self> {
        let CipherSuite::Block { engine, mode, padding } = params.suite() else {
            return Err(Error::UnsupportedParameter(format!(
                "{} parameters for a block cipher",
                params.suite()
            )));
        };
        let engine = provider.make_block_engine(engine.name(), params.key())?;

        let state = match mode {
            ChainingMode::Ecb => ModeState::Ecb,
            ChainingMode::Cbc => {
                let mut chain = [0u8; BLOCK_SIZE];
                chain.copy_from_slice(params.iv());
                ModeState::Cbc { chain }
            }
            ChainingMode::Ctr => ModeState::Ctr(CounterKeystream::from_iv(params.iv())),
            ChainingMode::Gcm => ModeState::Gcm {
                state: GcmState::new(&engine, params.iv(), params.aad()),
                tag_size: params.tag_size().unwrap_or(GCM_TAG_SIZE),
                plaintext: Zeroizing::new(Vec::new()),
            },
        };

        debug!(
            engine = %engine.kind(),
            mode = %mode,
            padding = %padding,
            direction = %direction,
            "Created block cipher transform"
        );

        Ok(Self {
            engine,
            mode,
            padding,
            direction,
            state,
            pending: Zeroizing::new(Vec::with_capacity(2 * BLOCK_SIZE)),
            lifecycle: Lifecycle::default(),
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Bytes of input received but not yet turned into output.
    pub fn buffered_len(&self) -> usize {
        let held = match &self.state {
            ModeState::Gcm { plaintext, .. } => plaintext.len(),
            _ => 0,
        };
        self.pending.len() + held
    }

    fn update_chained(&mut self, input: &[u8], output: &mut Vec<u8>) {
        self.pending.extend_from_slice(input);
        let ready = ready_len(self.pending.len(), self.direction, self.padding);
        if ready == 0 {
            return;
        }
        process_blocks(&self.engine, &mut self.state, self.direction, &self.pending[..ready], output);
        self.pending.drain(..ready);
    }

    fn update_gcm(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let ModeState::Gcm { state, tag_size, plaintext } = &mut self.state else {
            return Ok(());
        };
        match self.direction {
            Direction::Encrypt => {
                state.ensure_capacity(input.len())?;
                let start = output.len();
                output.extend_from_slice(input);
                state.encrypt(&self.engine, &mut output[start..])?;
            }
            Direction::Decrypt => {
                self.pending.extend_from_slice(input);
                if self.pending.len() > *tag_size {
                    let ready = self.pending.len() - *tag_size;
                    state.ensure_capacity(ready)?;
                    let start = plaintext.len();
                    plaintext.extend_from_slice(&self.pending[..ready]);
                    state.decrypt(&self.engine, &mut plaintext[start..])?;
                    self.pending.drain(..ready);
                }
            }
        }
        Ok(())
    }

    fn finalize_chained(&mut self, output: &mut Vec<u8>) -> Result<()> {
        let misaligned = |operation: &str| Error::InvalidBlockAlignment {
            operation: operation.to_string(),
            block_size: BLOCK_SIZE,
        };

        match self.direction {
            Direction::Encrypt => {
                let tail = Zeroizing::new(match self.padding.pad(&self.pending, BLOCK_SIZE) {
                    Ok(tail) => tail,
                    Err(Error::InvalidBlockAlignment { .. }) => return Err(misaligned("encrypt")),
                    Err(e) => return Err(e),
                });
                process_blocks(&self.engine, &mut self.state, Direction::Encrypt, &tail, output);
            }
            Direction::Decrypt if self.padding == PaddingScheme::None => {
                if !self.pending.is_empty() {
                    return Err(misaligned("decrypt"));
                }
            }
            Direction::Decrypt => {
                if self.pending.len() != BLOCK_SIZE {
                    return Err(misaligned("decrypt"));
                }
                let mut last: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(BLOCK_SIZE));
                process_blocks(&self.engine, &mut self.state, Direction::Decrypt, &self.pending, &mut last);
                let data = Zeroizing::new(self.padding.unpad(&last, BLOCK_SIZE)?);
                output.extend_from_slice(&data);
            }
        }

        self.pending.zeroize();
        Ok(())
    }

    fn finalize_gcm(&mut self, output: &mut Vec<u8>) -> Result<()> {
        let ModeState::Gcm { state, tag_size, plaintext } = &mut self.state else {
            return Ok(());
        };
        let tag = Zeroizing::new(state.tag());

        if self.direction == Direction::Encrypt {
            output.extend_from_slice(&tag[..*tag_size]);
            return Ok(());
        }

        let verified = self.pending.len() == *tag_size && bool::from(tag[..*tag_size].ct_eq(&self.pending[..]));
        if !verified {
            plaintext.zeroize();
            warn!(mode = %self.mode, "Authentication tag mismatch");
            return Err(Error::AuthenticationFailed);
        }

        output.extend_from_slice(&plaintext[..]);
        plaintext.zeroize();
        Ok(())
    }
}

impl Transform for BlockCipherTransform {
    fn name(&self) -> String {
        format!("{}/{}/{}", self.engine.kind(), self.mode, self.padding)
    }

    fn update(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_open("update")?;
        match self.mode {
            ChainingMode::Ecb | ChainingMode::Cbc => self.update_chained(input, output),
            ChainingMode::Ctr => {
                if let ModeState::Ctr(keystream) = &mut self.state {
                    let start = output.len();
                    output.extend_from_slice(input);
                    keystream.apply(&self.engine, &mut output[start..]);
                }
            }
            ChainingMode::Gcm => self.update_gcm(input, output)?,
        }
        Ok(())
    }

    fn finalize(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.lifecycle.close()?;
        match self.mode {
            ChainingMode::Ecb | ChainingMode::Cbc => self.finalize_chained(output),
            ChainingMode::Ctr => Ok(()),
            ChainingMode::Gcm => self.finalize_gcm(output),
        }
    }

    fn is_finalized(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

impl Drop for BlockCipherTransform {
    fn drop(&mut self) {
        if let ModeState::Cbc { chain } = &mut self.state {
            chain.zeroize();
        }
    }
}

/// How many buffered bytes can be processed now.
fn ready_len(buffered: usize, direction: Direction, padding: PaddingScheme) -> usize {
    let whole = buffered - buffered % BLOCK_SIZE;
    let hold_last = direction == Direction::Decrypt && padding != PaddingScheme::None && whole == buffered;
    if hold_last {
        whole.saturating_sub(BLOCK_SIZE)
    } else {
        whole
    }
}

/// Run whole blocks through ECB or CBC.
fn process_blocks(engine: &BlockEngine, state: &mut ModeState, direction: Direction, input: &[u8], output: &mut Vec<u8>) {
    let mut chain = match state {
        ModeState::Cbc { chain } => Some(chain),
        _ => None,
    };

    for chunk in input.chunks_exact(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(chunk);

        match direction {
            Direction::Encrypt => {
                if let Some(chain) = chain.as_deref_mut() {
                    xor_block(&mut block, chain);
                }
                engine.encrypt_block(&mut block);
                if let Some(chain) = chain.as_deref_mut() {
                    *chain = block;
                }
            }
            Direction::Decrypt => {
                let ciphertext = block;
                engine.decrypt_block(&mut block);
                if let Some(chain) = chain.as_deref_mut() {
                    xor_block(&mut block, chain);
                    *chain = ciphertext;
                }
            }
        }

        output.extend_from_slice(&block);
        block.zeroize();
    }
}

fn xor_block(block: &mut Block, other: &Block) {
    for (b, o) in block.iter_mut().zip(other.iter()) {
        *b ^= o;
    }
}

/// Block cipher service: a fixed engine, mode and padding that encrypts and
/// decrypts whole streams.
pub struct BlockCipher {
    engine: BlockEngineKind,
    mode: ChainingMode,
    padding: PaddingScheme,
    provider: Arc<PrimitiveProvider>,
    pipeline: Pipeline,
}

impl BlockCipher {
    pub fn new(engine: BlockEngineKind, mode: ChainingMode, padding: PaddingScheme) -> Self {
        Self {
            engine,
            mode,
            padding,
            provider: Arc::new(PrimitiveProvider::with_defaults()),
            pipeline: Pipeline::default(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<PrimitiveProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn suite(&self) -> CipherSuite {
        CipherSuite::Block {
            engine: self.engine,
            mode: self.mode,
            padding: self.padding,
        }
    }

    /// Start a parameter builder bound to this cipher's suite.
    pub fn parameters(&self) -> ParameterBuilder {
        ParameterBuilder::for_suite(self.suite())
    }

    /// Create a transform for manual `update` / `finalize` driving.
    ///
    /// # Errors
    /// - `UnsupportedParameter` if `params` were built for another suite
    pub fn transform(&self, params: &CipherParameters, direction: Direction) -> Result<BlockCipherTransform> {
        if params.suite() != self.suite() {
            return Err(Error::UnsupportedParameter(format!(
                "parameters for {} used with {}",
                params.suite(),
                self.suite()
            )));
        }
        BlockCipherTransform::new(&self.provider, params, direction)
    }

    /// Encrypt everything `reader` yields into `writer`.
    ///
    /// # Postconditions
    /// - Returns the number of plaintext bytes consumed
    ///
    /// # Errors
    /// - `InvalidBlockAlignment` for unaligned input without padding
    /// - `Cancelled`, `Io` from the pipeline
    #[instrument(skip_all, fields(suite = %self.suite()))]
    pub fn encrypt<R: Read, W: Write>(&self, reader: R, writer: W, params: &CipherParameters) -> Result<u64> {
        let mut transform = self.transform(params, Direction::Encrypt)?;
        self.pipeline.run(&mut transform, reader, writer)
    }

    /// Decrypt everything `reader` yields into `writer`.
    ///
    /// # Errors
    /// - `InvalidPadding` if the final block does not unpad
    /// - `AuthenticationFailed` if the GCM tag does not verify; no plaintext
    ///   is written in that case
    /// - `InvalidBlockAlignment` for ciphertext that is not whole blocks
    #[instrument(skip_all, fields(suite = %self.suite()))]
    pub fn decrypt<R: Read, W: Write>(&self, reader: R, writer: W, params: &CipherParameters) -> Result<u64> {
        let mut transform = self.transform(params, Direction::Decrypt)?;
        self.pipeline.run(&mut transform, reader, writer)
    }

    pub async fn encrypt_async<R, W>(&self, reader: R, writer: W, params: &CipherParameters) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut transform = self.transform(params, Direction::Encrypt)?;
        self.pipeline.run_async(&mut transform, reader, writer).await
    }

    pub async fn decrypt_async<R, W>(&self, reader: R, writer: W, params: &CipherParameters) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut transform = self.transform(params, Direction::Decrypt)?;
        self.pipeline.run_async(&mut transform, reader, writer).await
    }

    /// Encrypt an in-memory buffer.
    pub fn encrypt_bytes(&self, plaintext: &[u8], params: &CipherParameters) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(plaintext.len() + BLOCK_SIZE);
        self.encrypt(plaintext, &mut out, params)?;
        Ok(out)
    }

    /// Decrypt an in-memory buffer.
    pub fn decrypt_bytes(&self, ciphertext: &[u8], params: &CipherParameters) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
        self.decrypt(ciphertext, &mut *out, params)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamcrypt_common::EngineConfig;

    fn params(cipher: &BlockCipher, key: &[u8], iv: &[u8]) -> CipherParameters {
        cipher.parameters().key(key).iv(iv).build().unwrap()
    }

    fn drive(t: &mut BlockCipherTransform, input: &[u8], split: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for piece in input.chunks(split.max(1)) {
            t.update(piece, &mut out)?;
        }
        t.finalize(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_cbc_zero_scenario() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes256, ChainingMode::Cbc, PaddingScheme::Pkcs7);
        let p = params(&cipher, &[0u8; 32], &[0u8; 16]);

        let ct = cipher.encrypt_bytes(&[0u8; 16], &p).unwrap();
        assert_eq!(ct.len(), 32);
        assert_eq!(hex::encode(&ct[..16]), "dc95c078a2408989ad48a21492842087");

        let engine = BlockEngine::new(BlockEngineKind::Aes256, &[0u8; 32]).unwrap();
        let mut second = [0u8; BLOCK_SIZE];
        second.copy_from_slice(&ct[..16]);
        xor_block(&mut second, &[0x10; BLOCK_SIZE]);
        engine.encrypt_block(&mut second);
        assert_eq!(&ct[16..], &second);

        assert_eq!(&cipher.decrypt_bytes(&ct, &p).unwrap()[..], &[0u8; 16]);
    }

    #[test]
    fn test_cbc_sp800_38a_vector() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Cbc, PaddingScheme::None);
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let pt = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let ct = cipher.encrypt_bytes(&pt, &params(&cipher, &key, &iv)).unwrap();
        assert_eq!(hex::encode(ct), "7649abac8119b246cee98e9b12e9197d");
    }

    #[test]
    fn test_ctr_sp800_38a_vector_carries_counter() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Ctr, PaddingScheme::None);
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
        let pt = hex::decode("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51").unwrap();
        let ct = cipher.encrypt_bytes(&pt, &params(&cipher, &key, &iv)).unwrap();
        assert_eq!(
            hex::encode(ct),
            "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff"
        );
    }

    #[test]
    fn test_gcm_vectors() {
        // McGrew/Viega GCM test cases 3 and 4.
        let key = hex::decode("feffe9928665731c6d6a8f9467308308").unwrap();
        let iv = hex::decode("cafebabefacedbaddecaf888").unwrap();
        let pt = hex::decode(
            "d9313225f88406e5a55909c5aff5269a86a7a9531534f7da2e4c303d8a318a72\
             1c3c0c95956809532fcf0e2449a6b525b16aedf5aa0de657ba637b391aafd255",
        )
        .unwrap();
        let expected_ct = "42831ec2217774244b7221b784d0d49ce3aa212f2c02a4e035c17e2329aca12e\
                           21d514b25466931c7d8f6a5aac84aa051ba30b396a0aac973d58e091473f5985";

        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Gcm, PaddingScheme::None);
        let out = cipher.encrypt_bytes(&pt, &params(&cipher, &key, &iv)).unwrap();
        assert_eq!(hex::encode(&out[..64]), expected_ct);
        assert_eq!(hex::encode(&out[64..]), "4d5c2af327cd64a62cf35abd2ba6fab4");

        let aad = hex::decode("feedfacedeadbeeffeedfacedeadbeefabaddad2").unwrap();
        let p = cipher.parameters().key(&key).iv(&iv).aad(&aad).build().unwrap();
        let out = cipher.encrypt_bytes(&pt[..60], &p).unwrap();
        assert_eq!(hex::encode(&out[..60]), &expected_ct[..120]);
        assert_eq!(hex::encode(&out[60..]), "5bc94fbc3221a5db94fae95ae7121a47");

        assert_eq!(&cipher.decrypt_bytes(&out, &p).unwrap()[..], &pt[..60]);
    }

    #[test]
    fn test_gcm_tamper_releases_nothing() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes256, ChainingMode::Gcm, PaddingScheme::None);
        let p = cipher.parameters().key(&[7u8; 32]).iv(&[1u8; 12]).aad(b"hdr").build().unwrap();
        let mut ct = cipher.encrypt_bytes(&[0x33u8; 100], &p).unwrap();
        ct[10] ^= 0x01;

        let mut out = Vec::new();
        let err = cipher.decrypt(&ct[..], &mut out, &p).unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed));
        assert!(out.is_empty());
    }

    #[test]
    fn test_gcm_truncated_tag_fails() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Gcm, PaddingScheme::None);
        let p = params(&cipher, &[7u8; 16], &[1u8; 12]);
        let ct = cipher.encrypt_bytes(b"short", &p).unwrap();
        assert!(matches!(cipher.decrypt_bytes(&ct[..8], &p), Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn test_gcm_short_tag_and_long_iv() {
        let cipher = BlockCipher::new(BlockEngineKind::Serpent256, ChainingMode::Gcm, PaddingScheme::None);
        let p = cipher.parameters().key(&[4u8; 32]).iv(&[9u8; 60]).tag_size(12).build().unwrap();
        let ct = cipher.encrypt_bytes(b"message body", &p).unwrap();
        assert_eq!(ct.len(), 12 + 12);
        assert_eq!(&cipher.decrypt_bytes(&ct, &p).unwrap()[..], b"message body");
    }

    #[test]
    fn test_padded_modes_round_trip_across_splits() {
        let data: Vec<u8> = (0..77u8).collect();
        for engine in [BlockEngineKind::Aes192, BlockEngineKind::Serpent128] {
            for mode in [ChainingMode::Ecb, ChainingMode::Cbc] {
                for padding in [PaddingScheme::Pkcs7, PaddingScheme::Iso7816, PaddingScheme::X923] {
                    let cipher = BlockCipher::new(engine, mode, padding);
                    let p = params(&cipher, &vec![5u8; engine.key_size()], &[6u8; 16]);

                    let reference = drive(&mut cipher.transform(&p, Direction::Encrypt).unwrap(), &data, 1000).unwrap();
                    for split in [1, 5, 16, 17, 33] {
                        let ct = drive(&mut cipher.transform(&p, Direction::Encrypt).unwrap(), &data, split).unwrap();
                        assert_eq!(ct, reference);
                        let pt = drive(&mut cipher.transform(&p, Direction::Decrypt).unwrap(), &ct, split).unwrap();
                        assert_eq!(pt, data);
                    }
                }
            }
        }
    }

    #[test]
    fn test_gcm_decrypt_across_splits() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Gcm, PaddingScheme::None);
        let p = params(&cipher, &[2u8; 16], &[3u8; 12]);
        let data = vec![0x5Au8; 50];
        let ct = cipher.encrypt_bytes(&data, &p).unwrap();
        for split in [1, 7, 16, 40, 66] {
            let pt = drive(&mut cipher.transform(&p, Direction::Decrypt).unwrap(), &ct, split).unwrap();
            assert_eq!(pt, data);
        }
    }

    #[test]
    fn test_gcm_withholds_plaintext_until_finalize() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Gcm, PaddingScheme::None);
        let p = params(&cipher, &[2u8; 16], &[3u8; 12]);
        let ct = cipher.encrypt_bytes(&[1u8; 40], &p).unwrap();

        let mut t = cipher.transform(&p, Direction::Decrypt).unwrap();
        let mut out = Vec::new();
        t.update(&ct, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(t.buffered_len(), ct.len());
        t.finalize(&mut out).unwrap();
        assert_eq!(out, vec![1u8; 40]);
    }

    #[test]
    fn test_unaligned_input_without_padding() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Cbc, PaddingScheme::None);
        let p = params(&cipher, &[0u8; 16], &[0u8; 16]);
        let err = cipher.encrypt_bytes(&[0u8; 20], &p).unwrap_err();
        assert!(matches!(err, Error::InvalidBlockAlignment { block_size: 16, .. }));

        let err = cipher.decrypt_bytes(&[0u8; 20], &p).unwrap_err();
        assert!(matches!(err, Error::InvalidBlockAlignment { .. }));

        assert!(cipher.encrypt_bytes(&[], &p).unwrap().is_empty());
    }

    #[test]
    fn test_padded_decrypt_rejects_bad_lengths() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Cbc, PaddingScheme::Pkcs7);
        let p = params(&cipher, &[0u8; 16], &[0u8; 16]);
        assert!(matches!(cipher.decrypt_bytes(&[], &p), Err(Error::InvalidBlockAlignment { .. })));
        assert!(matches!(cipher.decrypt_bytes(&[0u8; 24], &p), Err(Error::InvalidBlockAlignment { .. })));
    }

    #[test]
    fn test_wrong_key_yields_invalid_padding_or_garbage() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Ecb, PaddingScheme::Pkcs7);
        let good = params(&cipher, &[1u8; 16], &[]);
        let ct = cipher.encrypt_bytes(b"sixteen byte msg", &good).unwrap();

        let mut tampered = ct.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xFF;
        match cipher.decrypt_bytes(&tampered, &good) {
            Err(Error::InvalidPadding) => {}
            Ok(pt) => assert_ne!(&pt[..], b"sixteen byte msg"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_finalize_twice_and_update_after_finalize() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Ctr, PaddingScheme::None);
        let p = params(&cipher, &[0u8; 16], &[0u8; 8]);
        let mut t = cipher.transform(&p, Direction::Encrypt).unwrap();
        let mut out = Vec::new();
        t.finalize(&mut out).unwrap();
        assert!(t.is_finalized());
        assert!(matches!(t.finalize(&mut out), Err(Error::InvalidState(_))));
        assert!(matches!(t.update(b"x", &mut out), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_suite_mismatch_rejected() {
        let cbc = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Cbc, PaddingScheme::Pkcs7);
        let ecb = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Ecb, PaddingScheme::Pkcs7);
        let p = params(&ecb, &[0u8; 16], &[]);
        assert!(matches!(cbc.encrypt_bytes(b"x", &p), Err(Error::UnsupportedParameter(_))));
    }

    #[test]
    fn test_small_chunk_pipeline_matches_default() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let cipher = BlockCipher::new(BlockEngineKind::Aes256, ChainingMode::Cbc, PaddingScheme::Pkcs7);
        let p = params(&cipher, &[8u8; 32], &[9u8; 16]);
        let reference = cipher.encrypt_bytes(&data, &p).unwrap();

        let chunked = BlockCipher::new(BlockEngineKind::Aes256, ChainingMode::Cbc, PaddingScheme::Pkcs7)
            .with_pipeline(Pipeline::new(EngineConfig::new(7)).unwrap());
        assert_eq!(chunked.encrypt_bytes(&data, &p).unwrap(), reference);
        assert_eq!(&chunked.decrypt_bytes(&reference, &p).unwrap()[..], &data[..]);
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let cipher = BlockCipher::new(BlockEngineKind::Aes128, ChainingMode::Gcm, PaddingScheme::None);
        let p = params(&cipher, &[3u8; 16], &[4u8; 12]);
        let data = b"async payload".to_vec();

        let mut ct = Vec::new();
        cipher.encrypt_async(&data[..], &mut ct, &p).await.unwrap();
        assert_eq!(ct, cipher.encrypt_bytes(&data, &p).unwrap());

        let mut pt = Vec::new();
        let n = cipher.decrypt_async(&ct[..], &mut pt, &p).await.unwrap();
        assert_eq!(n, ct.len() as u64);
        assert_eq!(pt, data);
    }
}
