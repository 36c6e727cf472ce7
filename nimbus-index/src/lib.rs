pub mod error;
pub mod hash;

use crate::error::Result;
use nimbus_catalog::Row;
use nimbus_datatype::Val;
use std::sync::Arc;

pub use hash::HashIndex;

/// Secondary lookup structure keyed by one field's value.
///
/// An index is derived state: it must always reflect exactly the rows
/// currently stored in its owning table for its configured field. The
/// table keeps it current inside the same critical section as the row
/// mutation it shadows.
pub trait Index: Send + Sync {
    /// Name of the indexed field.
    fn field(&self) -> &str;

    /// Whether more than one row per value is forbidden.
    fn unique(&self) -> bool;

    /// Adds a row under its indexed value.
    fn insert(&mut self, row: Arc<Row>) -> Result<()>;

    /// Replaces the old row with the new one. When the indexed value is
    /// unchanged only bucket membership moves; when it changed the row
    /// is re-keyed, with the unique constraint checked before any
    /// mutation so a violation leaves the index untouched.
    fn update(&mut self, old: &Row, new: Arc<Row>) -> Result<()>;

    /// Removes a row from its value's bucket.
    fn delete(&mut self, row: &Row) -> Result<()>;

    /// Snapshot of the bucket for `key`, empty when absent. Never a
    /// live view.
    fn search(&self, key: &Val) -> Vec<Arc<Row>>;
}
