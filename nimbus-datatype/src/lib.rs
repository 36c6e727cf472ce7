use std::fmt;

/// Column data types supported by the storage engine.
///
/// Text is the only variable-length type. Its maximum length is not
/// part of the type but of the field declaring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Long,
    Boolean,
    Text,
}

impl DataType {
    #[inline]
    pub const fn is_fixed_len(self) -> bool {
        !matches!(self, DataType::Text)
    }
}

impl fmt::Display for DataType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Boolean => "boolean",
            DataType::Text => "text",
        };
        f.write_str(s)
    }
}

/// Val is the runtime representation of a single column value.
///
/// There are no floating point variants, so Eq and Hash can be derived
/// and values are usable as hash index keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Val {
    Int(i32),
    Long(i64),
    Bool(bool),
    Text(String),
}

impl Val {
    #[inline]
    pub fn data_type(&self) -> DataType {
        match self {
            Val::Int(_) => DataType::Integer,
            Val::Long(_) => DataType::Long,
            Val::Bool(_) => DataType::Boolean,
            Val::Text(_) => DataType::Text,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Val::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Val::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Val {
    #[inline]
    fn from(value: i32) -> Self {
        Val::Int(value)
    }
}

impl From<i64> for Val {
    #[inline]
    fn from(value: i64) -> Self {
        Val::Long(value)
    }
}

impl From<bool> for Val {
    #[inline]
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

impl From<String> for Val {
    #[inline]
    fn from(value: String) -> Self {
        Val::Text(value)
    }
}

impl From<&str> for Val {
    #[inline]
    fn from(value: &str) -> Self {
        Val::Text(value.to_string())
    }
}

impl fmt::Display for Val {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Int(v) => write!(f, "{}", v),
            Val::Long(v) => write!(f, "{}", v),
            Val::Bool(v) => write!(f, "{}", v),
            Val::Text(s) => f.write_str(s),
        }
    }
}
