use nimbus_catalog::error::Error as CatalogError;
use nimbus_catalog::RowId;
use nimbus_datatype::Val;
use nimbus_index::error::Error as IndexError;
use semistr::SemiStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(SemiStr),
    #[error("Table '{0}' not exists")]
    TableNotExists(SemiStr),
    #[error("Duplicate primary key value {0}")]
    DuplicateKey(RowId),
    #[error("No row found with key {0}")]
    RowNotFound(Val),
    #[error("Index on field '{0}' already exists")]
    IndexAlreadyExists(SemiStr),
    #[error("No index on field '{0}'")]
    IndexNotExists(SemiStr),
    #[error("Primary key field '{0}' is not independently indexable")]
    IndexOnPrimaryKey(SemiStr),
    #[error("Primary key index cannot be removed")]
    RemovePrimaryKeyIndex,
    #[error("No change to update for key {0}")]
    NoChange(RowId),
    #[error("A transaction is already active")]
    TransactionActive,
    #[error("No active transaction")]
    NoActiveTransaction,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Coarse error taxonomy for callers that translate structured
/// failures into user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ValidationFailed,
    InvalidOperation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TableAlreadyExists(_) | Error::DuplicateKey(_) | Error::IndexAlreadyExists(_) => {
                ErrorKind::AlreadyExists
            }
            Error::TableNotExists(_) | Error::RowNotFound(_) | Error::IndexNotExists(_) => {
                ErrorKind::NotFound
            }
            Error::IndexOnPrimaryKey(_)
            | Error::RemovePrimaryKeyIndex
            | Error::NoChange(_)
            | Error::TransactionActive
            | Error::NoActiveTransaction => ErrorKind::InvalidOperation,
            Error::Catalog(e) => match e {
                CatalogError::FieldAlreadyExists(_) => ErrorKind::AlreadyExists,
                CatalogError::DuplicatePrimaryKey(_)
                | CatalogError::ReservedFieldName(_)
                | CatalogError::ExplicitPrimaryKey(_) => ErrorKind::InvalidOperation,
                CatalogError::FieldNotExists(_)
                | CatalogError::MissingField(_)
                | CatalogError::TypeMismatch { .. }
                | CatalogError::TextTooLong { .. } => ErrorKind::ValidationFailed,
            },
            Error::Index(e) => match e {
                IndexError::DuplicateValue(_) => ErrorKind::AlreadyExists,
                IndexError::MissingIndexValue(_) => ErrorKind::ValidationFailed,
                IndexError::ValueNotIndexed(_) => ErrorKind::NotFound,
            },
        }
    }
}
