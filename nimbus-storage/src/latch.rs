use nimbus_catalog::RowId;
use parking_lot::lock_api::RawRwLock as RawRwLockApi;
use parking_lot::{Mutex, RawRwLock};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    Shared,
    Exclusive,
}

/// Per-row reader-writer latch.
///
/// Built on the raw rwlock so acquisition and release can live in
/// different scopes: under a transaction the release is deferred to
/// commit or rollback rather than the end of the acquiring operation.
pub struct RowLatch {
    lock: RawRwLock,
}

impl RowLatch {
    #[inline]
    pub const fn new() -> Self {
        RowLatch {
            lock: RawRwLock::INIT,
        }
    }

    #[inline]
    fn lock(&self, mode: LatchMode) {
        match mode {
            LatchMode::Shared => self.lock.lock_shared(),
            LatchMode::Exclusive => self.lock.lock_exclusive(),
        }
    }

    /// Caller must hold the latch in the given mode.
    #[inline]
    fn unlock(&self, mode: LatchMode) {
        unsafe {
            match mode {
                LatchMode::Shared => self.lock.unlock_shared(),
                LatchMode::Exclusive => self.lock.unlock_exclusive(),
            }
        }
    }
}

impl Default for RowLatch {
    #[inline]
    fn default() -> Self {
        RowLatch::new()
    }
}

/// Owned hold on a row latch. Dropping it releases the latch, so a
/// hold either lives for one auto-committed operation or sits in a
/// transaction's lock registry until the transaction concludes.
pub struct LatchHold {
    latch: Arc<RowLatch>,
    mode: LatchMode,
}

impl LatchHold {
    /// Blocks until the latch is granted in the requested mode.
    #[inline]
    pub fn acquire(latch: Arc<RowLatch>, mode: LatchMode) -> Self {
        latch.lock(mode);
        LatchHold { latch, mode }
    }

    #[inline]
    pub fn mode(&self) -> LatchMode {
        self.mode
    }

    /// Releases the shared hold and blocks for the exclusive latch on
    /// the same row. The caller must re-read the protected row after
    /// the upgrade since another writer may have slipped in between.
    pub fn upgrade(&mut self) {
        debug_assert!(self.mode == LatchMode::Shared);
        self.latch.unlock(LatchMode::Shared);
        self.latch.lock(LatchMode::Exclusive);
        self.mode = LatchMode::Exclusive;
    }
}

impl Drop for LatchHold {
    #[inline]
    fn drop(&mut self) {
        self.latch.unlock(self.mode);
    }
}

/// Registry of row latches, keyed by primary key.
///
/// Entries are created lazily on first touch of a key and retained
/// after the row is deleted, so a delete can never race a concurrent
/// latch lookup for the same key.
#[derive(Default)]
pub struct LatchTable {
    entries: Mutex<HashMap<RowId, Arc<RowLatch>>>,
}

impl LatchTable {
    #[inline]
    pub fn new() -> Self {
        LatchTable::default()
    }

    pub fn latch(&self, key: RowId) -> Arc<RowLatch> {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(key).or_default())
    }
}
