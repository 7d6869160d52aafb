//! Reusable chunk buffers.
//!
//! Buffers are handed out as [`PooledBuffer`] guards. Dropping a guard wipes
//! the whole allocation and, if the pool has room, keeps it for the next
//! caller, so every exit path of a pipeline run returns its buffers.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use zeroize::Zeroize;

use streamcrypt_common::config::DEFAULT_POOL_CAPACITY;

/// Thread-safe pool of byte buffers.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
}

impl BufferPool {
    /// Create a pool retaining at most `capacity` idle buffers.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        })
    }

    /// Take a buffer of exactly `len` zero bytes.
    pub fn acquire(self: &Arc<Self>, len: usize) -> PooledBuffer {
        let mut buf = self.idle.lock().pop().unwrap_or_default();
        buf.clear();
        buf.resize(len, 0);
        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Maximum number of idle buffers kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, buf: Vec<u8>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// A buffer on loan from a [`BufferPool`].
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        // Wipes the full capacity, not just the initialised length.
        self.buf.zeroize();
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
