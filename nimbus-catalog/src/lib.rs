pub mod error;
pub mod field;
pub mod row;
pub mod schema;

pub use field::{Field, FieldSpec};
pub use row::{Row, RowBuilder, RowId};
pub use schema::{Schema, SchemaBuilder, PK_FIELD};
