use crate::error::{Error, Result};
use crate::latch::{LatchHold, LatchMode, LatchTable, RowLatch};
use crate::trx::{Transaction, UndoOp};
use indexmap::IndexMap;
use nimbus_catalog::error::Error as CatalogError;
use nimbus_catalog::{Row, RowId, Schema};
use nimbus_datatype::Val;
use nimbus_index::{HashIndex, Index};
use parking_lot::RwLock;
use semistr::SemiStr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static TABLE_ID_GEN: AtomicU32 = AtomicU32::new(0);

/// Process-wide unique table identifier. Transactions key their lock
/// registry by (table, row), so ids must not repeat across tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableID(u32);

impl TableID {
    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Table owns the primary-key-keyed record map, the secondary indexes
/// and the row latch registry.
///
/// Concurrency model: every row operation serializes on the per-row
/// latch for its primary key, so operations on distinct keys proceed
/// in parallel. The structural lock guarding the record and index maps
/// is held only for the brief map mutation inside a row operation;
/// DDL (add/remove index) holds it for its whole duration and thereby
/// acts as a barrier against concurrent row operations.
pub struct Table {
    id: TableID,
    name: SemiStr,
    schema: Arc<Schema>,
    inner: RwLock<TableInner>,
    latches: LatchTable,
}

struct TableInner {
    rows: HashMap<RowId, Arc<Row>>,
    indexes: IndexMap<SemiStr, Box<dyn Index>>,
}

impl Table {
    pub fn new(name: &str, schema: Schema) -> Table {
        Table {
            id: TableID(TABLE_ID_GEN.fetch_add(1, Ordering::Relaxed)),
            name: SemiStr::new(name),
            schema: Arc::new(schema),
            inner: RwLock::new(TableInner {
                rows: HashMap::new(),
                indexes: IndexMap::new(),
            }),
            latches: LatchTable::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> TableID {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub(crate) fn row_latch(&self, key: RowId) -> Arc<RowLatch> {
        self.latches.latch(key)
    }

    /// Point-in-time snapshot of all rows, not a live view.
    pub fn rows(&self) -> Vec<Arc<Row>> {
        let inner = self.inner.read();
        inner.rows.values().cloned().collect()
    }

    pub fn has_index(&self, field: &str) -> bool {
        let inner = self.inner.read();
        inner.indexes.contains_key(field)
    }

    /// Builds a secondary index on `field` by scanning current rows.
    /// DDL is always immediate-commit, never transactional.
    pub fn add_index(&self, field: &str, unique: bool) -> Result<()> {
        let mut inner = self.inner.write();
        if field == self.schema.pk_field().name() {
            return Err(Error::IndexOnPrimaryKey(SemiStr::new(field)));
        }
        if inner.indexes.contains_key(field) {
            return Err(Error::IndexAlreadyExists(SemiStr::new(field)));
        }
        if !self.schema.contains_field(field) {
            return Err(CatalogError::FieldNotExists(SemiStr::new(field)).into());
        }
        let mut index = HashIndex::new(field, unique);
        for row in inner.rows.values() {
            // a duplicate found during the build scan aborts creation
            index.insert(Arc::clone(row))?;
        }
        inner.indexes.insert(SemiStr::new(field), Box::new(index));
        Ok(())
    }

    pub fn remove_index(&self, field: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.indexes.contains_key(field) {
            return Err(Error::IndexNotExists(SemiStr::new(field)));
        }
        if field == self.schema.pk_field().name() {
            return Err(Error::RemovePrimaryKeyIndex);
        }
        inner.indexes.remove(field);
        Ok(())
    }

    /// Inserts a new row.
    ///
    /// With an active transaction the exclusive row latch is retained
    /// until the transaction concludes and a compensating remove is
    /// registered; otherwise the latch is released when this call
    /// returns.
    pub fn create(
        self: &Arc<Self>,
        row: Row,
        mut trx: Option<&mut Transaction>,
    ) -> Result<()> {
        let row = Arc::new(row);
        let key = row.id();
        let _hold = self.acquire_latch(key, LatchMode::Exclusive, trx.as_deref_mut());
        {
            let mut inner = self.inner.write();
            if inner.rows.contains_key(&key) {
                return Err(Error::DuplicateKey(key));
            }
            inner.rows.insert(key, Arc::clone(&row));
            let mut applied = 0;
            let mut failure = None;
            for (_, index) in inner.indexes.iter_mut() {
                match index.insert(Arc::clone(&row)) {
                    Ok(_) => applied += 1,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            if let Some(err) = failure {
                // unwind the partial insert so a failed create leaves
                // no trace in the map or any index
                for (_, index) in inner.indexes.iter_mut().take(applied) {
                    let _ = index.delete(&row);
                }
                inner.rows.remove(&key);
                return Err(err.into());
            }
        }
        if let Some(t) = trx {
            t.register_undo(Arc::clone(self), UndoOp::RemoveRow(row));
        }
        Ok(())
    }

    /// Looks up rows where `field` equals `key`.
    ///
    /// The primary key path is a direct single-row lookup under a
    /// shared row latch. Other fields go through a secondary index
    /// when one exists, else a full scan. Under a transaction every
    /// returned row additionally acquires a deferred shared latch on
    /// its own key, since non-primary lookups bypass the point latch.
    pub fn read(
        &self,
        key: &Val,
        field: &str,
        trx: Option<&mut Transaction>,
    ) -> Result<Vec<Arc<Row>>> {
        let field_def = match self.schema.field(field) {
            Some(f) => f,
            None => return Err(CatalogError::FieldNotExists(SemiStr::new(field)).into()),
        };
        if key.data_type() != field_def.data_type() {
            return Err(CatalogError::TypeMismatch {
                field: SemiStr::new(field),
                expected: field_def.data_type(),
                actual: key.data_type(),
            }
            .into());
        }
        if field_def.is_primary_key() {
            let id = match key {
                Val::Long(id) => *id,
                // unreachable after the type check above
                _ => return Err(Error::RowNotFound(key.clone())),
            };
            return self.read_by_id(id, trx);
        }
        let result: Vec<Arc<Row>> = {
            let inner = self.inner.read();
            match inner.indexes.get(field) {
                Some(index) => index.search(key),
                None => inner
                    .rows
                    .values()
                    .filter(|r| r.get(field) == Some(key))
                    .cloned()
                    .collect(),
            }
        };
        if result.is_empty() {
            return Err(Error::RowNotFound(key.clone()));
        }
        if let Some(t) = trx {
            for row in &result {
                t.lock_row(self, row.id(), LatchMode::Shared);
            }
        }
        Ok(result)
    }

    fn read_by_id(&self, id: RowId, trx: Option<&mut Transaction>) -> Result<Vec<Arc<Row>>> {
        let _hold = self.acquire_latch(id, LatchMode::Shared, trx);
        let inner = self.inner.read();
        match inner.rows.get(&id) {
            Some(row) => Ok(vec![Arc::clone(row)]),
            None => Err(Error::RowNotFound(Val::Long(id))),
        }
    }

    /// Replaces the stored row with `row`, which must carry an existing
    /// primary key (built via the row builder's id carry-over).
    pub fn update(
        self: &Arc<Self>,
        row: Row,
        mut trx: Option<&mut Transaction>,
    ) -> Result<()> {
        let new_row = Arc::new(row);
        let key = new_row.id();
        let _hold = self.acquire_latch(key, LatchMode::Exclusive, trx.as_deref_mut());
        let old_row = {
            let mut inner = self.inner.write();
            let old = match inner.rows.get(&key) {
                Some(r) => Arc::clone(r),
                None => return Err(Error::RowNotFound(Val::Long(key))),
            };
            if *old == *new_row {
                return Err(Error::NoChange(key));
            }
            let mut applied = 0;
            let mut failure = None;
            for (_, index) in inner.indexes.iter_mut() {
                match index.update(&old, Arc::clone(&new_row)) {
                    Ok(_) => applied += 1,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            if let Some(err) = failure {
                // reverse the indexes that already switched to the new row
                for (_, index) in inner.indexes.iter_mut().take(applied) {
                    let _ = index.update(&new_row, Arc::clone(&old));
                }
                return Err(err.into());
            }
            inner.rows.insert(key, Arc::clone(&new_row));
            old
        };
        if let Some(t) = trx {
            t.register_undo(Arc::clone(self), UndoOp::RestoreRow(old_row));
        }
        Ok(())
    }

    /// Removes the row stored under `key` from the map and every index.
    pub fn delete(
        self: &Arc<Self>,
        key: RowId,
        mut trx: Option<&mut Transaction>,
    ) -> Result<()> {
        let _hold = self.acquire_latch(key, LatchMode::Exclusive, trx.as_deref_mut());
        let row = {
            let mut inner = self.inner.write();
            let row = match inner.rows.remove(&key) {
                Some(r) => r,
                None => return Err(Error::RowNotFound(Val::Long(key))),
            };
            for (_, index) in inner.indexes.iter_mut() {
                index.delete(&row)?;
            }
            row
        };
        if let Some(t) = trx {
            t.register_undo(Arc::clone(self), UndoOp::ReinsertRow(row));
        }
        Ok(())
    }

    /// Row latch acquisition for one operation. In auto-commit mode the
    /// returned hold releases the latch when the operation ends; under
    /// a transaction the hold moves into the transaction's registry and
    /// same-key reacquisition is resolved there.
    fn acquire_latch(
        &self,
        key: RowId,
        mode: LatchMode,
        trx: Option<&mut Transaction>,
    ) -> Option<LatchHold> {
        match trx {
            None => Some(LatchHold::acquire(self.latches.latch(key), mode)),
            Some(t) => {
                t.lock_row(self, key, mode);
                None
            }
        }
    }

    /// Applies a compensating operation during rollback. The calling
    /// transaction still holds the exclusive latches of the affected
    /// keys, so only the structural lock is taken here.
    pub(crate) fn apply_undo(&self, op: &UndoOp) -> Result<()> {
        let mut inner = self.inner.write();
        match op {
            UndoOp::RemoveRow(row) => {
                inner.rows.remove(&row.id());
                for (_, index) in inner.indexes.iter_mut() {
                    index.delete(row)?;
                }
            }
            UndoOp::RestoreRow(old) => {
                let current = inner.rows.insert(old.id(), Arc::clone(old));
                match current {
                    Some(current) => {
                        for (_, index) in inner.indexes.iter_mut() {
                            index.update(&current, Arc::clone(old))?;
                        }
                    }
                    None => {
                        for (_, index) in inner.indexes.iter_mut() {
                            index.insert(Arc::clone(old))?;
                        }
                    }
                }
            }
            UndoOp::ReinsertRow(row) => {
                inner.rows.insert(row.id(), Arc::clone(row));
                for (_, index) in inner.indexes.iter_mut() {
                    index.insert(Arc::clone(row))?;
                }
            }
        }
        Ok(())
    }
}
