//! Digest transform and hashing service.

use std::io::Read;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use tokio::io::AsyncRead;
use tracing::instrument;

use crate::pipeline::{Pipeline, ProgressCallback};
use crate::provider::{Digest, DigestKind, PrimitiveProvider};
use crate::transform::{Lifecycle, Transform};
use streamcrypt_common::{Error, Result};

/// Absorbs input and emits the digest on finalization only.
pub struct DigestTransform {
    digest: Option<Digest>,
    kind: DigestKind,
    lifecycle: Lifecycle,
}

impl DigestTransform {
    pub fn new(digest: Digest) -> Self {
        Self {
            kind: digest.kind(),
            digest: Some(digest),
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn output_size(&self) -> usize {
        self.kind.output_size()
    }

    /// Finalize and return the digest directly.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.output_size());
        self.finalize(&mut out)?;
        Ok(out)
    }
}

impl Transform for DigestTransform {
    fn name(&self) -> String {
        self.kind.to_string()
    }

    fn update(&mut self, input: &[u8], _output: &mut Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_open("update")?;
        if let Some(digest) = self.digest.as_mut() {
            digest.update(input);
        }
        Ok(())
    }

    fn finalize(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.lifecycle.close()?;
        let digest = self
            .digest
            .take()
            .ok_or_else(|| Error::InvalidState("digest already consumed".to_string()))?;
        output.extend_from_slice(&digest.finalize());
        Ok(())
    }

    fn is_finalized(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

/// Hashing service bound to one digest algorithm.
pub struct Hasher {
    kind: DigestKind,
    provider: Arc<PrimitiveProvider>,
    pipeline: Pipeline,
}

impl Hasher {
    pub fn new(kind: DigestKind) -> Self {
        Self {
            kind,
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

    pub fn kind(&self) -> DigestKind {
        self.kind
    }

    pub fn transform(&self) -> Result<DigestTransform> {
        Ok(DigestTransform::new(self.provider.make_digest(self.kind.name())?))
    }

    /// Hash everything `reader` yields.
    ///
    /// `progress`, if given, replaces the pipeline's callback for this call.
    #[instrument(skip_all, fields(digest = %self.kind))]
    pub fn hash<R: Read>(&self, reader: R, progress: Option<ProgressCallback>) -> Result<Vec<u8>> {
        let mut transform = self.transform()?;
        let mut out = Vec::with_capacity(self.kind.output_size());
        self.pipeline_for(progress).run(&mut transform, reader, &mut out)?;
        Ok(out)
    }

    pub async fn hash_async<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<u8>> {
        let mut transform = self.transform()?;
        let mut out = Vec::with_capacity(self.kind.output_size());
        self.pipeline_for(progress)
            .run_async(&mut transform, reader, &mut out)
            .await?;
        Ok(out)
    }

    pub fn hash_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.hash(data, None)
    }

    fn pipeline_for(&self, progress: Option<ProgressCallback>) -> Pipeline {
        match progress {
            Some(callback) => self.pipeline.clone().with_progress(callback),
            None => self.pipeline.clone(),
        }
    }
}

/// Compare a computed digest with an expected one in constant time.
pub fn verify_digest(expected: &[u8], actual: &[u8]) -> bool {
    bool::from(expected.ct_eq(actual))
}
