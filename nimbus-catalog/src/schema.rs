use crate::error::{Error, Result};
use crate::field::{Field, FieldSpec};
use crate::row::RowId;
use indexmap::IndexMap;
use nimbus_datatype::DataType;
use semistr::SemiStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Name of the synthesized primary key field present in every schema.
pub const PK_FIELD: &str = "id";

/// Schema is an immutable, ordered set of typed field definitions,
/// always terminated by the synthesized `id` Long primary key.
///
/// The schema also owns the primary key sequence for its table. Ids are
/// monotonic for the lifetime of the schema instance and never reused,
/// even after deletes or rolled back inserts.
#[derive(Debug)]
pub struct Schema {
    fields: IndexMap<SemiStr, Field>,
    row_id_seq: AtomicI64,
}

impl Schema {
    #[inline]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    #[inline]
    pub fn fields(&self) -> &IndexMap<SemiStr, Field> {
        &self.fields
    }

    #[inline]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    #[inline]
    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the synthesized primary key field.
    #[inline]
    pub fn pk_field(&self) -> &Field {
        // build() always appends the pk field last
        &self.fields[self.fields.len() - 1]
    }

    /// Draws the next primary key value from the sequence.
    #[inline]
    pub fn next_row_id(&self) -> RowId {
        self.row_id_seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: IndexMap<SemiStr, Field>,
}

impl SchemaBuilder {
    /// Appends a field definition.
    ///
    /// Fails if the name is already taken, or if a second field is
    /// declared primary key.
    pub fn add_field(mut self, spec: FieldSpec) -> Result<Self> {
        if self.fields.contains_key(&*spec.name) {
            return Err(Error::FieldAlreadyExists(spec.name));
        }
        if spec.primary_key {
            if let Some(pk) = self.fields.values().find(|f| f.is_primary_key()) {
                return Err(Error::DuplicatePrimaryKey(SemiStr::new(pk.name())));
            }
        }
        let field = Field::new(spec.name.clone(), spec.ty, spec.primary_key, spec.max_length);
        self.fields.insert(spec.name, field);
        Ok(self)
    }

    /// Finalizes the schema, appending the synthesized `id` primary key.
    ///
    /// Fails if the caller declared a field named `id` or marked any
    /// field as primary key: the engine always owns the primary key.
    pub fn build(mut self) -> Result<Schema> {
        if self.fields.contains_key(PK_FIELD) {
            return Err(Error::ReservedFieldName(SemiStr::new(PK_FIELD)));
        }
        if let Some(pk) = self.fields.values().find(|f| f.is_primary_key()) {
            return Err(Error::ExplicitPrimaryKey(SemiStr::new(pk.name())));
        }
        let pk_name = SemiStr::new(PK_FIELD);
        self.fields.insert(
            pk_name.clone(),
            Field::new(pk_name, DataType::Long, true, 0),
        );
        Ok(Schema {
            fields: self.fields,
            row_id_seq: AtomicI64::new(0),
        })
    }
}
