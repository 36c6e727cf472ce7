use crate::error::{Error, Result};
use crate::table::Table;
use indexmap::IndexMap;
use nimbus_catalog::Schema;
use parking_lot::RwLock;
use semistr::SemiStr;
use std::sync::Arc;

/// Registry mapping table name to table. It could be shared between
/// threads; the embedder typically holds one instance for the process
/// lifetime. The store is volatile: nothing survives the process.
#[derive(Default)]
pub struct Database {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: IndexMap<SemiStr, Arc<Table>>,
}

impl Database {
    #[inline]
    pub fn new() -> Self {
        Database::default()
    }

    pub fn create_table(&self, table_name: &str, schema: Schema) -> Result<Arc<Table>> {
        let mut inner = self.inner.write();
        if inner.tables.contains_key(table_name) {
            return Err(Error::TableAlreadyExists(SemiStr::new(table_name)));
        }
        let table = Arc::new(Table::new(table_name, schema));
        inner
            .tables
            .insert(SemiStr::new(table_name), Arc::clone(&table));
        Ok(table)
    }

    pub fn get_table(&self, table_name: &str) -> Result<Arc<Table>> {
        let inner = self.inner.read();
        match inner.tables.get(table_name) {
            Some(table) => Ok(Arc::clone(table)),
            None => Err(Error::TableNotExists(SemiStr::new(table_name))),
        }
    }

    #[inline]
    pub fn exists_table(&self, table_name: &str) -> bool {
        let inner = self.inner.read();
        inner.tables.contains_key(table_name)
    }

    pub fn drop_table(&self, table_name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.tables.remove(table_name) {
            Some(_) => Ok(()),
            None => Err(Error::TableNotExists(SemiStr::new(table_name))),
        }
    }

    pub fn all_tables(&self) -> Vec<Arc<Table>> {
        let inner = self.inner.read();
        inner.tables.values().cloned().collect()
    }
}
