use crate::error::{Error, Result};
use crate::schema::{Schema, PK_FIELD};
use indexmap::IndexMap;
use nimbus_datatype::Val;
use semistr::SemiStr;
use std::sync::Arc;

/// Primary key values are always synthesized Longs.
pub type RowId = i64;

/// Row is an immutable, fully validated tuple of field values,
/// always carrying the synthesized `id`.
///
/// Rows are never mutated in place. An update produces a new row value
/// that replaces the old one in the table, built with
/// [`RowBuilder::keep_id`] so identity is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    data: IndexMap<SemiStr, Val>,
}

impl Row {
    #[inline]
    pub fn builder(schema: Arc<Schema>) -> RowBuilder {
        RowBuilder::new(schema)
    }

    /// Returns the primary key value.
    #[inline]
    pub fn id(&self) -> RowId {
        match self.data.get(PK_FIELD) {
            Some(Val::Long(id)) => *id,
            _ => unreachable!("row always carries the synthesized id"),
        }
    }

    #[inline]
    pub fn get(&self, field: &str) -> Option<&Val> {
        self.data.get(field)
    }

    /// Read-only view of all field values in schema order.
    #[inline]
    pub fn data(&self) -> &IndexMap<SemiStr, Val> {
        &self.data
    }
}

/// Builder bound to a schema. Fields are set one at a time; `build`
/// validates every schema field and assigns the primary key.
#[derive(Debug)]
pub struct RowBuilder {
    schema: Arc<Schema>,
    data: IndexMap<SemiStr, Val>,
    custom_id: Option<RowId>,
}

impl RowBuilder {
    #[inline]
    pub fn new(schema: Arc<Schema>) -> Self {
        RowBuilder {
            schema,
            data: IndexMap::new(),
            custom_id: None,
        }
    }

    /// Sets one field value. The `id` field is managed by the engine
    /// and cannot be set here.
    pub fn set<V: Into<Val>>(mut self, field: &str, value: V) -> Result<Self> {
        if field == PK_FIELD {
            return Err(Error::ReservedFieldName(SemiStr::new(field)));
        }
        if !self.schema.contains_field(field) {
            return Err(Error::FieldNotExists(SemiStr::new(field)));
        }
        self.data.insert(SemiStr::new(field), value.into());
        Ok(self)
    }

    /// Carries over an existing id instead of drawing a fresh one from
    /// the schema sequence. Used only when reconstructing an updated
    /// row so its identity is preserved.
    #[inline]
    pub fn keep_id(mut self, id: RowId) -> Self {
        self.custom_id = Some(id);
        self
    }

    /// Validates every schema field and produces the row. On any
    /// failure no row is produced and no id is consumed.
    pub fn build(self) -> Result<Row> {
        for (name, field) in self.schema.fields() {
            if field.is_primary_key() {
                continue;
            }
            match self.data.get(name) {
                None => return Err(Error::MissingField(name.clone())),
                Some(value) => field.validate(value)?,
            }
        }
        let id = match self.custom_id {
            Some(id) => id,
            None => self.schema.next_row_id(),
        };
        let mut data = self.data;
        data.insert(SemiStr::new(PK_FIELD), Val::Long(id));
        Ok(Row { data })
    }
}
