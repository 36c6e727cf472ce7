use crate::error::{Error, Result};
use crate::latch::{LatchHold, LatchMode};
use crate::table::{Table, TableID};
use indexmap::IndexMap;
use nimbus_catalog::{Row, RowId};
use std::sync::Arc;

/// Compensating operation recorded in the undo log. Each variant
/// carries the captured row value it needs to reverse one mutation.
pub(crate) enum UndoOp {
    /// Undo of create: remove the inserted row from the record map and
    /// every index.
    RemoveRow(Arc<Row>),
    /// Undo of update: put the captured pre-update row back and
    /// reverse-apply every index update.
    RestoreRow(Arc<Row>),
    /// Undo of delete: re-insert the captured row into the record map
    /// and every index.
    ReinsertRow(Arc<Row>),
}

struct UndoEntry {
    table: Arc<Table>,
    op: UndoOp,
}

/// A single transaction: an ordered undo log plus the registry of row
/// latches held under strict two-phase locking.
///
/// All latches acquired by operations running under the transaction
/// are held until commit or rollback, never released early. Dropping
/// a transaction without committing rolls it back, so an abandoned
/// session leaves no partial effect.
pub struct Transaction {
    undo: Vec<UndoEntry>,
    locks: IndexMap<(TableID, RowId), LatchHold>,
}

impl Transaction {
    #[inline]
    fn new() -> Self {
        Transaction {
            undo: Vec::new(),
            locks: IndexMap::new(),
        }
    }

    /// Appends a compensating action to the undo log.
    #[inline]
    pub(crate) fn register_undo(&mut self, table: Arc<Table>, op: UndoOp) {
        self.undo.push(UndoEntry { table, op });
    }

    /// Acquires (or reuses) the latch for one row on behalf of this
    /// transaction, deferring its release to transaction end.
    ///
    /// A latch already held in a sufficient mode is not reacquired;
    /// holding it shared while needing exclusive upgrades in place.
    /// Blocking here with other latches held can deadlock against a
    /// transaction locking the same keys in the opposite order; the
    /// engine has no deadlock detection or timeout.
    pub(crate) fn lock_row(&mut self, table: &Table, key: RowId, mode: LatchMode) {
        let entry = (table.id(), key);
        match self.locks.get_mut(&entry) {
            None => {
                let hold = LatchHold::acquire(table.row_latch(key), mode);
                self.locks.insert(entry, hold);
            }
            Some(hold) => {
                if hold.mode() == LatchMode::Shared && mode == LatchMode::Exclusive {
                    hold.upgrade();
                }
            }
        }
    }

    /// Number of recorded compensating actions.
    #[inline]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    fn commit(mut self) {
        // discard the undo log; Drop then only releases the latches
        self.undo.clear();
    }

    fn rollback(self) {
        // Drop replays the undo log
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        // replay in strict reverse registration order: later operations
        // may sit on top of earlier ones
        while let Some(entry) = self.undo.pop() {
            if let Err(e) = entry.table.apply_undo(&entry.op) {
                log::warn!(
                    "undo action failed during rollback on table '{}': {}",
                    entry.table.name(),
                    e
                );
            }
        }
        // undos first, then every deferred latch release
        self.locks.clear();
    }
}

/// Session-scoped owner of at most one active transaction.
///
/// The engine passes transactions explicitly: every table operation
/// takes `Option<&mut Transaction>` obtained from
/// [`TransactionManager::current`], so there is no hidden thread-local
/// state and the concurrency contract is visible at each call site.
#[derive(Default)]
pub struct TransactionManager {
    current: Option<Transaction>,
}

impl TransactionManager {
    #[inline]
    pub fn new() -> Self {
        TransactionManager::default()
    }

    /// Starts a transaction. Transactions do not nest.
    pub fn begin(&mut self) -> Result<()> {
        if self.current.is_some() {
            return Err(Error::TransactionActive);
        }
        self.current = Some(Transaction::new());
        Ok(())
    }

    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.current.is_some()
    }

    /// The active transaction, to be passed into table operations.
    #[inline]
    pub fn current(&mut self) -> Option<&mut Transaction> {
        self.current.as_mut()
    }

    /// Makes every change permanent: the undo log is discarded and all
    /// deferred latch releases run.
    pub fn commit(&mut self) -> Result<()> {
        match self.current.take() {
            Some(trx) => {
                trx.commit();
                Ok(())
            }
            None => Err(Error::NoActiveTransaction),
        }
    }

    /// Reverses every recorded operation in LIFO order, then releases
    /// all deferred latches. A failing undo action is logged and
    /// skipped so the remaining compensations still run.
    pub fn rollback(&mut self) -> Result<()> {
        match self.current.take() {
            Some(trx) => {
                trx.rollback();
                Ok(())
            }
            None => Err(Error::NoActiveTransaction),
        }
    }
}
