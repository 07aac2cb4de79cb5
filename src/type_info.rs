//! Reflective type information attached to classes loaded through a
//! [`ClassTable`](crate::ClassTable).
//!
//! At the layout level the dispatch vector's type information is an opaque
//! pointer. For classes created by a class table it points to a [`TypeInfo`],
//! which is what lets the table check array element types and string
//! classes. Dispatch vectors created by foreign code are never assumed to
//! carry one.

use alloc::ffi::CString;
use core::ffi::CStr;

use crate::ClassId;

/// The primitive element type of an array class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ElementType {
    /// `boolean[]`
    #[display("boolean")]
    Boolean,
    /// `byte[]`
    #[display("byte")]
    Byte,
    /// `char[]`
    #[display("char")]
    Char,
    /// `short[]`
    #[display("short")]
    Short,
    /// `int[]`
    #[display("int")]
    Int,
    /// `long[]`
    #[display("long")]
    Long,
    /// `float[]`
    #[display("float")]
    Float,
    /// `double[]`
    #[display("double")]
    Double,
}

impl ElementType {
    /// All element types, in JVM descriptor order.
    pub const ALL: [ElementType; 8] = [
        ElementType::Boolean,
        ElementType::Byte,
        ElementType::Char,
        ElementType::Short,
        ElementType::Int,
        ElementType::Long,
        ElementType::Float,
        ElementType::Double,
    ];

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementType::Boolean | ElementType::Byte => 1,
            ElementType::Char | ElementType::Short => 2,
            ElementType::Int | ElementType::Float => 4,
            ElementType::Long | ElementType::Double => 8,
        }
    }

    /// The JVM descriptor of the array class with this element type, e.g.
    /// `[I` for `int[]`.
    pub const fn array_descriptor(self) -> &'static str {
        match self {
            ElementType::Boolean => "[Z",
            ElementType::Byte => "[B",
            ElementType::Char => "[C",
            ElementType::Short => "[S",
            ElementType::Int => "[I",
            ElementType::Long => "[J",
            ElementType::Float => "[F",
            ElementType::Double => "[D",
        }
    }
}

/// The kind of instances a class describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Plain objects, laid out as an [`ObjectHeader`](crate::ObjectHeader).
    Object,
    /// Arrays, laid out as an [`ArrayHeader`](crate::ArrayHeader).
    Array(ElementType),
    /// Strings, laid out as a [`StringHeader`](crate::StringHeader).
    String,
}

/// Type information of a class loaded through a class table.
#[derive(Debug)]
pub struct TypeInfo {
    /// The class name, as interned by the table.
    name: CString,
    /// The id the table assigned to the class.
    id: ClassId,
    /// The kind of instances the class describes.
    kind: TypeKind,
}

impl TypeInfo {
    /// Creates the type information of a class being loaded.
    pub(crate) fn new(name: CString, id: ClassId, kind: TypeKind) -> Self {
        Self { name, id, kind }
    }

    /// The class name.
    pub fn name(&self) -> &CStr {
        &self.name
    }

    /// The class's position in its table.
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// The kind of the class's instances.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes_match_primitives() {
        use crate::primitive::*;
        use core::mem::size_of;

        assert_eq!(ElementType::Boolean.size(), size_of::<jbool>());
        assert_eq!(ElementType::Byte.size(), size_of::<jbyte>());
        assert_eq!(ElementType::Char.size(), size_of::<jchar>());
        assert_eq!(ElementType::Short.size(), size_of::<jshort>());
        assert_eq!(ElementType::Int.size(), size_of::<jint>());
        assert_eq!(ElementType::Long.size(), size_of::<jlong>());
        assert_eq!(ElementType::Float.size(), size_of::<jfloat>());
        assert_eq!(ElementType::Double.size(), size_of::<jdouble>());
    }

    #[test]
    fn test_descriptors_are_distinct() {
        for (index, element) in ElementType::ALL.iter().enumerate() {
            for other in &ElementType::ALL[index + 1..] {
                assert_ne!(element.array_descriptor(), other.array_descriptor());
            }
        }
    }
}
