use crate::error::{Error, Result};
use crate::Index;
use hashbrown::HashMap;
use nimbus_catalog::Row;
use nimbus_datatype::Val;
use semistr::SemiStr;
use std::sync::Arc;

/// Hash-based secondary index: field value to bucket of rows.
///
/// Buckets identify rows by primary key. Empty buckets are removed so
/// map occupancy tracks live values.
pub struct HashIndex {
    field: SemiStr,
    unique: bool,
    buckets: HashMap<Val, Vec<Arc<Row>>>,
}

impl HashIndex {
    #[inline]
    pub fn new(field: &str, unique: bool) -> Self {
        HashIndex {
            field: SemiStr::new(field),
            unique,
            buckets: HashMap::new(),
        }
    }

    #[inline]
    fn value_of<'a>(&self, row: &'a Row) -> Result<&'a Val> {
        row.get(&self.field)
            .ok_or_else(|| Error::MissingIndexValue(self.field.clone()))
    }

    #[inline]
    fn occupied(&self, value: &Val) -> bool {
        self.buckets.get(value).map(|b| !b.is_empty()).unwrap_or(false)
    }
}

impl Index for HashIndex {
    #[inline]
    fn field(&self) -> &str {
        &self.field
    }

    #[inline]
    fn unique(&self) -> bool {
        self.unique
    }

    fn insert(&mut self, row: Arc<Row>) -> Result<()> {
        let value = self.value_of(&row)?.clone();
        if self.unique && self.occupied(&value) {
            return Err(Error::DuplicateValue(self.field.clone()));
        }
        self.buckets.entry(value).or_default().push(row);
        Ok(())
    }

    fn update(&mut self, old: &Row, new: Arc<Row>) -> Result<()> {
        let old_value = self.value_of(old)?;
        let new_value = self.value_of(&new)?.clone();
        if *old_value == new_value {
            // same key: only bucket membership moves
            let bucket = self
                .buckets
                .get_mut(&new_value)
                .ok_or_else(|| Error::ValueNotIndexed(self.field.clone()))?;
            match bucket.iter().position(|r| r.id() == old.id()) {
                Some(pos) => bucket[pos] = new,
                None => bucket.push(new),
            }
            return Ok(());
        }
        // re-key: check the unique constraint before touching the old
        // bucket so a violation leaves the index untouched
        if self.unique && self.occupied(&new_value) {
            return Err(Error::DuplicateValue(self.field.clone()));
        }
        self.delete(old)?;
        self.insert(new)
    }

    fn delete(&mut self, row: &Row) -> Result<()> {
        let value = self.value_of(row)?;
        if let Some(bucket) = self.buckets.get_mut(value) {
            let id = row.id();
            bucket.retain(|r| r.id() != id);
            if bucket.is_empty() {
                let value = value.clone();
                self.buckets.remove(&value);
            }
        }
        Ok(())
    }

    #[inline]
    fn search(&self, key: &Val) -> Vec<Arc<Row>> {
        self.buckets.get(key).cloned().unwrap_or_default()
    }
}
