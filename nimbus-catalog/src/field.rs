use crate::error::{Error, Result};
use nimbus_datatype::{DataType, Val};
use semistr::SemiStr;

/// Field is an immutable, typed column descriptor within a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: SemiStr,
    ty: DataType,
    primary_key: bool,
    max_length: u32,
}

impl Field {
    #[inline]
    pub(crate) fn new(name: SemiStr, ty: DataType, primary_key: bool, max_length: u32) -> Self {
        Field {
            name,
            ty,
            primary_key,
            max_length,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.ty
    }

    #[inline]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Maximum length in characters. Meaningful only for Text fields,
    /// 0 means unbounded.
    #[inline]
    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    /// A value is valid iff its type matches exactly and, for bounded
    /// Text fields, its length does not exceed the bound.
    pub fn validate(&self, value: &Val) -> Result<()> {
        if value.data_type() != self.ty {
            return Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.ty,
                actual: value.data_type(),
            });
        }
        if let Val::Text(s) = value {
            if self.max_length > 0 {
                let length = s.chars().count() as u32;
                if length > self.max_length {
                    return Err(Error::TextTooLong {
                        field: self.name.clone(),
                        max_length: self.max_length,
                        length,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Field spec used when building a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: SemiStr,
    pub ty: DataType,
    pub primary_key: bool,
    pub max_length: u32,
}

impl FieldSpec {
    #[inline]
    pub fn new(name: &str, ty: DataType) -> Self {
        FieldSpec {
            name: SemiStr::new(name),
            ty,
            primary_key: false,
            max_length: 0,
        }
    }

    #[inline]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[inline]
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }
}
