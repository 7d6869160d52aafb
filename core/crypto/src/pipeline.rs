//! Chunked driver that moves bytes from a reader through a transform to a
//! writer.
//!
//! Memory stays bounded by the chunk size (plus whatever a transform must
//! hold back, e.g. AEAD plaintext awaiting its tag), so inputs of any size
//! can be processed.

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::pool::BufferPool;
use crate::provider::BLOCK_SIZE;
use crate::transform::Transform;
use streamcrypt_common::{EngineConfig, Error, Result};

/// Receives the running count of input bytes consumed.
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Reusable pipeline settings: chunking, buffer pool, cancellation and
/// progress reporting.
///
/// Clones share one buffer pool and one cancellation token, so a single
/// pipeline can be handed to several concurrent runs.
#[derive(Clone)]
pub struct Pipeline {
    config: EngineConfig,
    pool: Arc<BufferPool>,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    ///
    /// # Errors
    /// - `InvalidInput` if the configuration is out of range
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: BufferPool::new(config.pool_capacity),
            config,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    /// Observe `token`; once cancelled, runs stop before their next read or
    /// write with `Error::Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stream `reader` through `transform` into `writer`.
    ///
    /// # Postconditions
    /// - `transform` has been finalized and `writer` flushed
    /// - Returns the number of input bytes consumed
    ///
    /// # Errors
    /// - `Cancelled` if the token fires between chunks
    /// - `Io` from the reader or writer
    /// - Any error from the transform; data-dependent failures surface at
    ///   finalization, after earlier chunks may already have been written
    #[instrument(skip_all, fields(transform = %transform.name()))]
    pub fn run<T, R, W>(&self, transform: &mut T, mut reader: R, mut writer: W) -> Result<u64>
    where
        T: Transform + ?Sized,
        R: Read,
        W: Write,
    {
        let mut input = self.pool.acquire(self.config.chunk_size);
        let mut output = self.pool.acquire(0);
        output.reserve(self.config.chunk_size + 2 * BLOCK_SIZE);
        let mut progress = ProgressTracker::new(self.progress.clone(), self.config.progress_interval);

        loop {
            self.check_cancelled()?;
            let n = read_some(&mut reader, &mut input)?;
            if n == 0 {
                break;
            }

            output.clear();
            transform.update(&input[..n], &mut output)?;

            self.check_cancelled()?;
            writer.write_all(&output)?;
            trace!(read = n, written = output.len(), "Processed chunk");
            progress.advance(n as u64);
        }

        output.clear();
        transform.finalize(&mut output)?;
        self.check_cancelled()?;
        writer.write_all(&output)?;
        writer.flush()?;

        progress.finish();
        debug!(bytes = progress.total(), "Pipeline run complete");
        Ok(progress.total())
    }

    /// Async counterpart of [`run`](Self::run) over tokio I/O.
    #[instrument(skip_all, fields(transform = %transform.name()))]
    pub async fn run_async<T, R, W>(&self, transform: &mut T, mut reader: R, mut writer: W) -> Result<u64>
    where
        T: Transform + ?Sized,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut input = self.pool.acquire(self.config.chunk_size);
        let mut output = self.pool.acquire(0);
        output.reserve(self.config.chunk_size + 2 * BLOCK_SIZE);
        let mut progress = ProgressTracker::new(self.progress.clone(), self.config.progress_interval);

        loop {
            self.check_cancelled()?;
            let n = reader.read(&mut input[..]).await?;
            if n == 0 {
                break;
            }

            output.clear();
            transform.update(&input[..n], &mut output)?;

            self.check_cancelled()?;
            writer.write_all(&output).await?;
            trace!(read = n, written = output.len(), "Processed chunk");
            progress.advance(n as u64);
        }

        output.clear();
        transform.finalize(&mut output)?;
        self.check_cancelled()?;
        writer.write_all(&output).await?;
        writer.flush().await?;

        progress.finish();
        debug!(bytes = progress.total(), "Async pipeline run complete");
        Ok(progress.total())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!("Pipeline cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            pool: BufferPool::new(config.pool_capacity),
            config,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Read into `buf`, retrying on interruption.
fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Throttles progress callbacks to at most one per `interval` bytes.
struct ProgressTracker {
    callback: Option<ProgressCallback>,
    interval: u64,
    total: u64,
    reported: u64,
}

impl ProgressTracker {
    fn new(callback: Option<ProgressCallback>, interval: u64) -> Self {
        Self {
            callback,
            interval,
            total: 0,
            reported: 0,
        }
    }

    fn advance(&mut self, n: u64) {
        self.total += n;
        if self.total - self.reported >= self.interval {
            self.report();
        }
    }

    fn finish(&mut self) {
        if self.total != self.reported || self.total == 0 {
            self.report();
        }
    }

    fn report(&mut self) {
        if let Some(callback) = &self.callback {
            callback(self.total);
        }
        self.reported = self.total;
    }

    fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Cursor;

    /// Uppercases ASCII and appends a marker on finalize.
    struct Shout {
        finished: bool,
    }

    impl Transform for Shout {
        fn name(&self) -> String {
            "shout".to_string()
        }

        fn update(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
            output.extend(input.iter().map(|b| b.to_ascii_uppercase()));
            Ok(())
        }

        fn finalize(&mut self, output: &mut Vec<u8>) -> Result<()> {
            if self.finished {
                return Err(Error::InvalidState("finalized twice".to_string()));
            }
            self.finished = true;
            output.extend_from_slice(b"!");
            Ok(())
        }

        fn is_finalized(&self) -> bool {
            self.finished
        }
    }

    fn small_pipeline() -> Pipeline {
        Pipeline::new(EngineConfig::new(4).with_progress_interval(4)).unwrap()
    }

    #[test]
    fn test_run_processes_all_chunks() {
        let mut out = Vec::new();
        let n = small_pipeline()
            .run(&mut Shout { finished: false }, Cursor::new(b"hello world"), &mut out)
            .unwrap();
        assert_eq!(n, 11);
        assert_eq!(out, b"HELLO WORLD!");
    }

    #[test]
    fn test_empty_input_still_finalizes() {
        let mut out = Vec::new();
        let mut t = Shout { finished: false };
        let n = small_pipeline().run(&mut t, Cursor::new(Vec::new()), &mut out).unwrap();
        assert_eq!(n, 0);
        assert_eq!(out, b"!");
        assert!(t.is_finalized());
    }

    #[test]
    fn test_progress_is_throttled_and_final() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pipeline = Pipeline::new(EngineConfig::new(3).with_progress_interval(5))
            .unwrap()
            .with_progress(Arc::new(move |n| sink.lock().push(n)));

        pipeline
            .run(&mut Shout { finished: false }, Cursor::new(vec![b'a'; 11]), Vec::new())
            .unwrap();

        assert_eq!(*seen.lock(), vec![6, 11]);
    }

    #[test]
    fn test_cancelled_before_first_read() {
        let token = CancellationToken::new();
        token.cancel();
        let pipeline = small_pipeline().with_cancellation(token);

        let mut t = Shout { finished: false };
        let err = pipeline.run(&mut t, Cursor::new(b"data"), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!t.is_finalized());
    }

    #[test]
    fn test_cancel_midway_stops_before_next_write() {
        struct CancelAfterFirst {
            token: CancellationToken,
        }
        impl Transform for CancelAfterFirst {
            fn name(&self) -> String {
                "cancel".to_string()
            }
            fn update(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
                output.extend_from_slice(input);
                self.token.cancel();
                Ok(())
            }
            fn finalize(&mut self, _output: &mut Vec<u8>) -> Result<()> {
                Ok(())
            }
            fn is_finalized(&self) -> bool {
                false
            }
        }

        let token = CancellationToken::new();
        let pipeline = small_pipeline().with_cancellation(token.clone());
        let mut out = Vec::new();
        let err = pipeline
            .run(&mut CancelAfterFirst { token }, Cursor::new(b"abcdefgh"), &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(out.is_empty());
    }

    #[test]
    fn test_buffers_return_to_pool_on_error() {
        struct Fails;
        impl Transform for Fails {
            fn name(&self) -> String {
                "fails".to_string()
            }
            fn update(&mut self, _input: &[u8], _output: &mut Vec<u8>) -> Result<()> {
                Err(Error::InvalidPadding)
            }
            fn finalize(&mut self, _output: &mut Vec<u8>) -> Result<()> {
                Ok(())
            }
            fn is_finalized(&self) -> bool {
                false
            }
        }

        let pipeline = small_pipeline();
        assert!(pipeline.run(&mut Fails, Cursor::new(b"xyz"), Vec::new()).is_err());
        assert_eq!(pipeline.pool().idle_count(), 2);
    }

    #[test]
    fn test_clones_share_pool_across_threads() {
        let pipeline = Pipeline::new(EngineConfig::new(8).with_pool_capacity(8)).unwrap();

        std::thread::scope(|scope| {
            for i in 0..4u8 {
                let pipeline = pipeline.clone();
                scope.spawn(move || {
                    let data = vec![b'a' + i; 100];
                    let mut out = Vec::new();
                    pipeline
                        .run(&mut Shout { finished: false }, Cursor::new(data), &mut out)
                        .unwrap();
                    assert_eq!(out.len(), 101);
                    assert!(out[..100].iter().all(|b| *b == (b'A' + i)));
                });
            }
        });

        let idle = pipeline.pool().idle_count();
        assert!((2..=8).contains(&idle), "idle buffers: {}", idle);
    }

    #[tokio::test]
    async fn test_run_async_matches_sync() {
        let data = b"the quick brown fox".to_vec();
        let mut sync_out = Vec::new();
        small_pipeline()
            .run(&mut Shout { finished: false }, Cursor::new(data.clone()), &mut sync_out)
            .unwrap();

        let mut async_out = Vec::new();
        let n = small_pipeline()
            .run_async(&mut Shout { finished: false }, &data[..], &mut async_out)
            .await
            .unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(async_out, sync_out);
    }
}
