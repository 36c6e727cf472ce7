pub mod db;
pub mod error;
pub mod latch;
pub mod table;
pub mod trx;

pub mod prelude {
    pub use crate::db::Database;
    pub use crate::error::*;
    pub use crate::table::*;
    pub use crate::trx::*;
    pub use nimbus_catalog::{FieldSpec, Row, RowId, Schema};
    pub use nimbus_datatype::{DataType, Val};
}
