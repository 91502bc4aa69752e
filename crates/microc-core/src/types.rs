//! Semantic types.
//!
//! The type set is closed: `int`, `float`, `string`, `void` and fixed-length
//! arrays of one of those.

use std::fmt;

/// A non-array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Float,
    String,
    Void,
}

impl ScalarType {
    /// Resolve a type name as written in source.
    ///
    /// Exactly `int`, `float`, `string` and `void` are recognised.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ScalarType::Int),
            "float" => Some(ScalarType::Float),
            "string" => Some(ScalarType::String),
            "void" => Some(ScalarType::Void),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::String => "string",
            ScalarType::Void => "void",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The semantic type of a declaration or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Void,
    Array { element: ScalarType, len: u64 },
}

impl Type {
    /// Build an array type.
    #[inline]
    pub const fn array(element: ScalarType, len: u64) -> Self {
        Type::Array { element, len }
    }

    /// `int` and `float` are the only numeric types.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Element type of an array, `None` for scalars.
    pub fn element(&self) -> Option<Type> {
        match self {
            Type::Array { element, .. } => Some(Type::from(*element)),
            _ => None,
        }
    }
}

impl From<ScalarType> for Type {
    fn from(scalar: ScalarType) -> Self {
        match scalar {
            ScalarType::Int => Type::Int,
            ScalarType::Float => Type::Float,
            ScalarType::String => Type::String,
            ScalarType::Void => Type::Void,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Void => f.write_str("void"),
            Type::Array { element, len } => write!(f, "{element}[{len}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_names() {
        assert_eq!(ScalarType::from_name("int"), Some(ScalarType::Int));
        assert_eq!(ScalarType::from_name("string"), Some(ScalarType::String));
        assert_eq!(ScalarType::from_name("double"), None);
        assert_eq!(ScalarType::from_name("Int"), None);
    }

    #[test]
    fn numeric_types() {
        assert!(Type::Int.is_numeric());
        assert!(Type::Float.is_numeric());
        assert!(!Type::String.is_numeric());
        assert!(!Type::array(ScalarType::Int, 4).is_numeric());
    }

    #[test]
    fn array_display_and_element() {
        let ty = Type::array(ScalarType::Float, 10);
        assert_eq!(ty.to_string(), "float[10]");
        assert_eq!(ty.element(), Some(Type::Float));
        assert_eq!(Type::Int.element(), None);
    }
}
