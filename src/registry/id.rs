//! Opaque object identifiers.

use std::fmt;

/// An opaque 32-bit handle naming a registered object.
///
/// Value 0 is reserved and always denotes "no object". Identifiers are
/// ordered and equality-comparable but carry no other semantics; the
/// interpreter is the sole authority mapping them to objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// The reserved null identifier.
    pub const NULL: Self = Self(0);

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_id() {
        assert!(ObjectId::NULL.is_null());
        assert!(!ObjectId(1).is_null());
        assert_eq!(ObjectId::NULL, ObjectId(0));
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(ObjectId(1) < ObjectId(2));
        assert_eq!(format!("{}", ObjectId(42)), "#42");
    }
}
