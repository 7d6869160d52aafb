//! Stream cipher transform and service.

use std::io::{Read, Write};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::params::{CipherParameters, CipherSuite, ParameterBuilder};
use crate::pipeline::Pipeline;
use crate::provider::{PrimitiveProvider, StreamEngine, StreamEngineKind};
use crate::transform::{Lifecycle, Transform};
use streamcrypt_common::{Direction, Error, Result};

/// XORs a keystream into the data; one output byte per input byte.
///
/// The engine is keyed once, so its keystream position carries across
/// `update` calls regardless of how the input is split.
pub struct StreamCipherTransform {
    engine: StreamEngine,
    direction: Direction,
    lifecycle: Lifecycle,
}

impl StreamCipherTransform {
    /// # Errors
    /// - `UnsupportedParameter` if `params` were built for a block cipher
    pub fn new(provider: &PrimitiveProvider, params: &CipherParameters, direction: Direction) -> Result<Self> {
        let CipherSuite::Stream { engine } = params.suite() else {
            return Err(Error::UnsupportedParameter(format!(
                "{} parameters for a stream cipher",
                params.suite()
            )));
        };
        let engine = provider.make_stream_engine(engine.name(), params.key(), params.iv())?;
        debug!(engine = %engine.kind(), direction = %direction, "Created stream cipher transform");

        Ok(Self {
            engine,
            direction,
            lifecycle: Lifecycle::default(),
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Transform for StreamCipherTransform {
    fn name(&self) -> String {
        self.engine.kind().to_string()
    }

    fn update(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_open("update")?;
        let start = output.len();
        output.extend_from_slice(input);
        self.engine.apply_keystream(&mut output[start..])
    }

    fn finalize(&mut self, _output: &mut Vec<u8>) -> Result<()> {
        self.lifecycle.close()
    }

    fn is_finalized(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

/// Stream cipher service bound to one algorithm.
pub struct StreamCipher {
    engine: StreamEngineKind,
    provider: Arc<PrimitiveProvider>,
    pipeline: Pipeline,
}

impl StreamCipher {
    pub fn new(engine: StreamEngineKind) -> Self {
        Self {
            engine,
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
        CipherSuite::Stream { engine: self.engine }
    }

    pub fn parameters(&self) -> ParameterBuilder {
        ParameterBuilder::for_stream(self.engine)
    }

    /// # Errors
    /// - `UnsupportedParameter` if `params` were built for another suite
    pub fn transform(&self, params: &CipherParameters, direction: Direction) -> Result<StreamCipherTransform> {
        if params.suite() != self.suite() {
            return Err(Error::UnsupportedParameter(format!(
                "parameters for {} used with {}",
                params.suite(),
                self.suite()
            )));
        }
        StreamCipherTransform::new(&self.provider, params, direction)
    }

    #[instrument(skip_all, fields(suite = %self.suite()))]
    pub fn encrypt<R: Read, W: Write>(&self, reader: R, writer: W, params: &CipherParameters) -> Result<u64> {
        let mut transform = self.transform(params, Direction::Encrypt)?;
        self.pipeline.run(&mut transform, reader, writer)
    }

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

    pub fn encrypt_bytes(&self, plaintext: &[u8], params: &CipherParameters) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(plaintext.len());
        self.encrypt(plaintext, &mut out, params)?;
        Ok(out)
    }

    pub fn decrypt_bytes(&self, ciphertext: &[u8], params: &CipherParameters) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
        self.decrypt(ciphertext, &mut *out, params)?;
        Ok(out)
    }
}
