use semistr::SemiStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Row has no value for indexed field '{0}'")]
    MissingIndexValue(SemiStr),
    #[error("Duplicate value for unique index on field '{0}'")]
    DuplicateValue(SemiStr),
    #[error("Value is not present in index on field '{0}'")]
    ValueNotIndexed(SemiStr),
}
