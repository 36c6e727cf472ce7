use nimbus_datatype::DataType;
use semistr::SemiStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Field '{0}' already exists in schema")]
    FieldAlreadyExists(SemiStr),
    #[error("Schema already declares primary key field '{0}'")]
    DuplicatePrimaryKey(SemiStr),
    #[error("Field name '{0}' is reserved")]
    ReservedFieldName(SemiStr),
    #[error("Explicit primary key field '{0}' is not allowed")]
    ExplicitPrimaryKey(SemiStr),
    #[error("Field '{0}' does not exist in schema")]
    FieldNotExists(SemiStr),
    #[error("Missing value for field '{0}'")]
    MissingField(SemiStr),
    #[error("Invalid value for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: SemiStr,
        expected: DataType,
        actual: DataType,
    },
    #[error("Value for field '{field}' exceeds max length {max_length}")]
    TextTooLong {
        field: SemiStr,
        max_length: u32,
        length: u32,
    },
}
