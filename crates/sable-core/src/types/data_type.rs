//! Static types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of a variable or expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Integer,
    Decimal,
    Bool,
    Object(ObjectType),
}

/// User-defined object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    /// Names of every transitive supertype
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Whether other types may derive from this one
    #[serde(default)]
    pub inheritable: bool,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            inheritable: false,
        }
    }

    pub fn with_supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn inheritable(mut self) -> Self {
        self.inheritable = true;
        self
    }

    /// Returns true if values of this type are always instances of `other`
    pub fn is_subtype_of(&self, other: &ObjectType) -> bool {
        self.name == other.name || self.supertypes.iter().any(|name| *name == other.name)
    }
}

impl Type {
    pub fn is_number(&self) -> bool {
        matches!(self, Type::Integer | Type::Decimal)
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Type::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Decides statically whether a value of static type `self` is always (`Some(true)`)
    /// or never (`Some(false)`) an instance of `expected`. `None` means only the
    /// runtime type tag can tell.
    pub fn instance_of(&self, expected: &Type) -> Option<bool> {
        match (self, expected) {
            (Type::Object(actual), Type::Object(expected)) => {
                if actual.is_subtype_of(expected) {
                    Some(true)
                } else if !actual.inheritable {
                    Some(false)
                } else if !expected.supertypes.iter().any(|name| *name == actual.name) {
                    // No subtype of `actual` can be an `expected` unless `expected` derives from it
                    Some(false)
                } else {
                    None
                }
            }
            (actual, expected) => Some(actual == expected),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "int"),
            Type::Decimal => write!(f, "decimal"),
            Type::Bool => write!(f, "bool"),
            Type::Object(object) => write!(f, "{}", object.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal() -> ObjectType {
        ObjectType::new("Animal").inheritable()
    }

    fn dog() -> ObjectType {
        ObjectType::new("Dog").with_supertype("Animal").inheritable()
    }

    #[test]
    fn test_upcast_is_always_true() {
        let ty = Type::Object(dog());
        assert_eq!(ty.instance_of(&Type::Object(animal())), Some(true));
    }

    #[test]
    fn test_downcast_needs_runtime_check() {
        let ty = Type::Object(animal());
        assert_eq!(ty.instance_of(&Type::Object(dog())), None);
    }

    #[test]
    fn test_unrelated_types_never_match() {
        let ty = Type::Object(ObjectType::new("Car"));
        assert_eq!(ty.instance_of(&Type::Object(dog())), Some(false));
        assert_eq!(Type::Integer.instance_of(&Type::Bool), Some(false));
    }
}
