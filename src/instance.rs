//! Instances allocated against the classes of a [`ClassTable`].
//!
//! Each instance owns its header (and, for arrays, its elements) and borrows
//! the class it was created for. The header is written once, when the
//! instance is created, and only read afterwards, so instances can be shared
//! between threads and read without synchronization.
//!
//! The header pointers handed out by [`Instance::header_ptr`] and friends are
//! what native code receives; they stay valid until the instance is dropped.

use alloc::{boxed::Box, format, string::String};
use core::{ffi::CStr, ptr::NonNull};

use objlayout_internals::{
    ArrayHeader, ObjectHeader, RawArrayRef, RawDispatchVectorRef, RawObjectRef, RawStringRef,
    StringHeader,
    primitive::{jbool, jbyte, jchar, jdouble, jfloat, jint, jlong, jshort},
};
use rootcause::report;

use crate::{
    LayoutError, LayoutResult,
    class_table::{ClassRef, ClassTable, STRING_CLASS},
    config::{LayoutConfig, StringEncoding},
    strings::{self, Encoded},
    type_info::{ElementType, TypeKind},
};

/// Keeps [`ArrayElement`] closed to the primitive types.
mod sealed {
    /// Implemented for the Java primitive types only.
    pub trait Sealed {}
}

/// A primitive type that can be stored in an [`Array`].
pub trait ArrayElement: sealed::Sealed + Copy + Send + Sync + 'static {
    /// The element type of array classes holding this type.
    const ELEMENT_TYPE: ElementType;
}

/// Implements [`ArrayElement`] for primitive types.
macro_rules! array_element {
    ($($ty:ty => $element:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl ArrayElement for $ty {
                const ELEMENT_TYPE: ElementType = ElementType::$element;
            }
        )*
    };
}

array_element! {
    jbool => Boolean,
    jbyte => Byte,
    jchar => Char,
    jshort => Short,
    jint => Int,
    jlong => Long,
    jfloat => Float,
    jdouble => Double,
}

/// Behavior shared by all allocated instances.
pub trait Instance<'t> {
    /// The class the instance was created for.
    fn class(&self) -> ClassRef<'t>;

    /// The instance's header, viewed as a plain object header.
    fn object(&self) -> RawObjectRef<'_>;

    /// A pointer to the instance's header, valid until the instance is
    /// dropped.
    fn header_ptr(&self) -> *const ObjectHeader {
        self.object().as_ptr()
    }

    /// The dispatch vector of the instance's class.
    fn dispatch_vector(&self) -> RawDispatchVectorRef<'t> {
        self.class().dispatch_vector()
    }

    /// Whether the instance's class implements the interface named `name`.
    fn implements_interface(&self, name: &CStr) -> bool {
        self.class().implements_interface(name)
    }
}

/// Fails with `error` unless `class` describes instances of kind `expected`.
fn expect_kind(class: ClassRef<'_>, expected: TypeKind, error: LayoutError) -> LayoutResult<()> {
    if class.kind() == expected {
        Ok(())
    } else {
        Err(report!(error)
            .attach(format!("class {:?} is {:?}", class.name(), class.kind()))
            .attach(format!("expected {expected:?}")))
    }
}

/// A plain object.
pub struct Object<'t> {
    /// Allocated with `Box::leak`, freed on drop.
    header: NonNull<ObjectHeader>,
    /// The class whose dispatch vector the header points to.
    class: ClassRef<'t>,
}

// SAFETY: The header is never mutated after construction, and `ClassRef` is
// `Send + Sync`.
unsafe impl Send for Object<'_> {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for Object<'_> {}

impl<'t> Object<'t> {
    /// Allocates an object of `class`.
    ///
    /// # Errors
    ///
    /// Fails with [`LayoutError::InvalidArgument`] unless `class` is a class
    /// of plain objects.
    pub fn new(class: ClassRef<'t>) -> LayoutResult<Self> {
        expect_kind(class, TypeKind::Object, LayoutError::InvalidArgument)?;

        // SAFETY: The dispatch vector belongs to a class of the table, which is
        // borrowed for `'t` and never mutates or frees its classes. The header
        // is dropped before `'t` ends.
        let header = unsafe { ObjectHeader::new(class.dispatch_vector().as_ptr()) };
        Ok(Self {
            header: NonNull::from(Box::leak(Box::new(header))),
            class,
        })
    }
}

impl<'t> Instance<'t> for Object<'t> {
    fn class(&self) -> ClassRef<'t> {
        self.class
    }

    fn object(&self) -> RawObjectRef<'_> {
        // SAFETY: The header is live until `self` is dropped and only read.
        RawObjectRef::new(unsafe { self.header.as_ref() })
    }
}

impl Drop for Object<'_> {
    fn drop(&mut self) {
        // SAFETY: The header was created by `Box::leak` in `Object::new`, and
        // every reference to it is bounded by a borrow of `self`.
        drop(unsafe { Box::from_raw(self.header.as_ptr()) });
    }
}

impl core::fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Object")
            .field("header", &self.header)
            .field("class", &self.class.name())
            .finish()
    }
}

/// An array of primitive elements.
pub struct Array<'t, T: ArrayElement> {
    /// Allocated with `Box::leak`, freed on drop.
    header: NonNull<ArrayHeader>,
    /// Allocated with `Box::leak`, freed on drop after the header.
    elements: NonNull<[T]>,
    /// The array class whose dispatch vector the header points to.
    class: ClassRef<'t>,
}

// SAFETY: Neither the header nor the elements are mutated after construction,
// and `T` is `Send + Sync`.
unsafe impl<T: ArrayElement> Send for Array<'_, T> {}
// SAFETY: See the `Send` implementation above.
unsafe impl<T: ArrayElement> Sync for Array<'_, T> {}

impl<'t, T: ArrayElement> Array<'t, T> {
    /// Allocates an array of `class` holding `elements`.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::ElementTypeMismatch`] unless `class` is an array class
    ///   with element type `T`.
    /// - [`LayoutError::InvalidArgument`] if there are more elements than a
    ///   [`jint`] can count.
    pub fn new(class: ClassRef<'t>, elements: impl Into<Box<[T]>>) -> LayoutResult<Self> {
        expect_kind(
            class,
            TypeKind::Array(T::ELEMENT_TYPE),
            LayoutError::ElementTypeMismatch,
        )?;

        let elements: Box<[T]> = elements.into();
        let count = elements.len();
        let Ok(length) = jint::try_from(count) else {
            return Err(report!(LayoutError::InvalidArgument)
                .attach(format!("{count} elements do not fit an array length")));
        };
        let elements = NonNull::from(Box::leak(elements));

        // SAFETY:
        // 1. The dispatch vector outlives the header, as in `Object::new`.
        // 2. `elements` holds `length` initialized elements of type `T`, which
        //    is the element type of `class`. They are never mutated and are
        //    freed only after the header.
        let header = unsafe {
            ArrayHeader::new(
                class.dispatch_vector().as_ptr(),
                length,
                elements.cast::<u8>().as_ptr(),
            )
        };

        Ok(Self {
            header: NonNull::from(Box::leak(Box::new(header))),
            elements,
            class,
        })
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements of the array.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: The elements are live until `self` is dropped and only read.
        unsafe { self.elements.as_ref() }
    }

    /// The array header.
    pub fn raw(&self) -> RawArrayRef<'_> {
        // SAFETY: The header is live until `self` is dropped and only read.
        RawArrayRef::new(unsafe { self.header.as_ref() })
    }

    /// A pointer to the array header, valid until the array is dropped.
    pub fn array_header_ptr(&self) -> *const ArrayHeader {
        self.header.as_ptr()
    }
}

impl<'t, T: ArrayElement> Instance<'t> for Array<'t, T> {
    fn class(&self) -> ClassRef<'t> {
        self.class
    }

    fn object(&self) -> RawObjectRef<'_> {
        self.raw().object()
    }
}

impl<T: ArrayElement> Drop for Array<'_, T> {
    fn drop(&mut self) {
        // SAFETY: The header was created by `Box::leak` in `Array::new`, and
        // every reference to it is bounded by a borrow of `self`.
        drop(unsafe { Box::from_raw(self.header.as_ptr()) });
        // SAFETY: Same as above for the elements; the header pointing to them
        // is gone.
        drop(unsafe { Box::from_raw(self.elements.as_ptr()) });
    }
}

impl<T: ArrayElement + core::fmt::Debug> core::fmt::Debug for Array<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Array")
            .field("header", &self.header)
            .field("class", &self.class.name())
            .field("elements", &self.as_slice())
            .finish()
    }
}

/// The character array of a [`JavaString`], typed by its encoding.
enum Characters<'t> {
    /// A `char[]` of UTF-16 code units.
    Utf16(Array<'t, jchar>),
    /// A `byte[]` of Latin-1 or UTF-8 bytes.
    Bytes(Array<'t, jbyte>),
}

impl Characters<'_> {
    /// The header of the character array.
    fn raw(&self) -> RawArrayRef<'_> {
        match self {
            Characters::Utf16(array) => array.raw(),
            Characters::Bytes(array) => array.raw(),
        }
    }
}

/// A string and the character array it points to.
pub struct JavaString<'t> {
    /// Allocated with `Box::leak`, freed on drop before `characters`.
    header: NonNull<StringHeader>,
    /// The character array the header points to.
    characters: Characters<'t>,
    /// The encoding `characters` was written with.
    encoding: StringEncoding,
    /// The string class whose dispatch vector the header points to.
    class: ClassRef<'t>,
}

// SAFETY: The header is never mutated after construction, and the character
// array is `Send + Sync` itself.
unsafe impl Send for JavaString<'_> {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for JavaString<'_> {}

impl<'t> JavaString<'t> {
    /// Allocates a string of `class` holding `text`, with its characters in
    /// an array of `characters_class`.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::InvalidArgument`] unless `class` is a string class.
    /// - [`LayoutError::ElementTypeMismatch`] unless `characters_class` is an
    ///   array class with the element type of `encoding`.
    /// - [`LayoutError::InvalidEncoding`] if `encoding` cannot represent
    ///   `text`.
    pub fn new(
        class: ClassRef<'t>,
        characters_class: ClassRef<'t>,
        text: &str,
        encoding: StringEncoding,
    ) -> LayoutResult<Self> {
        expect_kind(class, TypeKind::String, LayoutError::InvalidArgument)?;

        let characters = match strings::encode(text, encoding)? {
            Encoded::Utf16(units) => Characters::Utf16(Array::new(characters_class, units)?),
            Encoded::Bytes(bytes) => Characters::Bytes(Array::new(characters_class, bytes)?),
        };

        // SAFETY:
        // 1. The dispatch vector outlives the header, as in `Object::new`.
        // 2. The character array header is owned by `characters`, which is
        //    dropped after the string header.
        let header = unsafe {
            StringHeader::new(
                class.dispatch_vector().as_ptr(),
                characters.raw().as_ptr(),
            )
        };

        Ok(Self {
            header: NonNull::from(Box::leak(Box::new(header))),
            characters,
            encoding,
            class,
        })
    }

    /// Allocates a `java.lang.String` of `table` holding `text`, encoded as
    /// the installed [`LayoutConfig`] specifies.
    ///
    /// The table must hold the string class and the character array class,
    /// as a table created by [`ClassTable::with_builtins`] does.
    ///
    /// # Errors
    ///
    /// Fails with [`LayoutError::InvalidArgument`] if either class is missing,
    /// or as [`JavaString::new`] does.
    pub fn in_table(table: &'t ClassTable, text: &str) -> LayoutResult<Self> {
        let encoding = LayoutConfig::current().string_encoding();
        let descriptor = encoding.element_type().array_descriptor();

        let lookup = |name: &str| {
            table.class_by_str(name).ok_or_else(|| {
                report!(LayoutError::InvalidArgument)
                    .attach(format!("class {name:?} is not loaded"))
            })
        };
        Self::new(lookup(STRING_CLASS)?, lookup(descriptor)?, text, encoding)
    }

    /// The encoding of the character array.
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// The string header.
    pub fn raw(&self) -> RawStringRef<'_> {
        // SAFETY: The header is live until `self` is dropped and only read.
        RawStringRef::new(unsafe { self.header.as_ref() })
    }

    /// The header of the character array.
    pub fn characters(&self) -> RawArrayRef<'_> {
        self.characters.raw()
    }

    /// A pointer to the string header, valid until the string is dropped.
    pub fn string_header_ptr(&self) -> *const StringHeader {
        self.header.as_ptr()
    }

    /// Decodes the string's characters.
    ///
    /// # Errors
    ///
    /// Never fails for a string created from a `&str`; the error is reported
    /// for symmetry with [`strings::decode`].
    pub fn to_rust_string(&self) -> LayoutResult<String> {
        // SAFETY: The character array was built with the element type of
        // `self.encoding`.
        unsafe { strings::decode(self.raw(), self.encoding) }
    }
}

impl<'t> Instance<'t> for JavaString<'t> {
    fn class(&self) -> ClassRef<'t> {
        self.class
    }

    fn object(&self) -> RawObjectRef<'_> {
        self.raw().object()
    }
}

impl Drop for JavaString<'_> {
    fn drop(&mut self) {
        // SAFETY: The header was created by `Box::leak` in `JavaString::new`,
        // and every reference to it is bounded by a borrow of `self`.
        drop(unsafe { Box::from_raw(self.header.as_ptr()) });
    }
}

impl core::fmt::Debug for JavaString<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JavaString")
            .field("header", &self.header)
            .field("class", &self.class.name())
            .field("encoding", &self.encoding)
            .field("characters", &self.characters())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::class_table::ClassDefinition;

    static_assertions::assert_impl_all!(Object<'static>: Send, Sync);
    static_assertions::assert_impl_all!(Array<'static, jint>: Send, Sync);
    static_assertions::assert_impl_all!(JavaString<'static>: Send, Sync);

    #[test]
    fn test_object_header_points_at_class() {
        let table = ClassTable::new();
        let id = table
            .load(ClassDefinition::object("Dog").implements("Animal"))
            .unwrap();
        let dog = Object::new(table.class(id).unwrap()).unwrap();

        let read = dog.object().dispatch_vector().unwrap();
        assert!(read.ptr_eq(dog.dispatch_vector()));
        assert!(dog.implements_interface(c"Animal"));
        assert!(!dog.implements_interface(c"Vehicle"));
    }

    #[test]
    fn test_array_layout() {
        let table = ClassTable::with_builtins().unwrap();
        let ints = table.class_by_name(c"[I").unwrap();
        let array = Array::<jint>::new(ints, vec![7, 8, 9]).unwrap();

        assert_eq!(array.len(), 3);
        assert_eq!(array.raw().length(), 3);
        assert_eq!(array.raw().data(), array.as_slice().as_ptr().cast::<u8>());
        assert_eq!(array.as_slice(), &[7, 8, 9]);
        assert!(array.implements_interface(c"java.lang.Cloneable"));

        let empty = Array::<jint>::new(ints, vec![]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.raw().length(), 0);
    }

    #[test]
    fn test_kind_mismatches() {
        let table = ClassTable::with_builtins().unwrap();
        let ints = table.class_by_name(c"[I").unwrap();
        let object = table.class_by_name(c"java.lang.Object").unwrap();

        let report = Array::<jlong>::new(ints, vec![1]).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::ElementTypeMismatch);

        let report = Array::<jint>::new(object, vec![1]).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::ElementTypeMismatch);

        let report = Object::new(ints).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);
    }

    #[test]
    fn test_strings() {
        let table = ClassTable::with_builtins().unwrap();
        let string_class = table.class_by_name(c"java.lang.String").unwrap();
        let chars = table.class_by_name(c"[C").unwrap();
        let bytes = table.class_by_name(c"[B").unwrap();

        let s = JavaString::new(string_class, chars, "hi", StringEncoding::Utf16).unwrap();
        assert_eq!(s.characters().length(), 2);
        assert_eq!(
            s.raw().characters().map(|a| a.as_ptr()),
            Some(s.characters().as_ptr())
        );
        assert_eq!(s.to_rust_string().unwrap(), "hi");
        assert!(s.implements_interface(c"java.lang.Comparable"));

        let s = JavaString::new(string_class, bytes, "hé", StringEncoding::Utf8).unwrap();
        assert_eq!(s.characters().length(), 3);
        assert_eq!(s.to_rust_string().unwrap(), "hé");

        let report =
            JavaString::new(string_class, bytes, "hi", StringEncoding::Utf16).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::ElementTypeMismatch);

        let report = JavaString::new(chars, chars, "hi", StringEncoding::Utf16).unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);
    }

    #[test]
    fn test_in_table_looks_up_classes_by_name() {
        let table = ClassTable::with_builtins().unwrap();
        let s = JavaString::in_table(&table, "abc").unwrap();
        let string_class = table.class_by_name(c"java.lang.String").unwrap();
        assert!(s.dispatch_vector().ptr_eq(string_class.dispatch_vector()));
        assert_eq!(s.to_rust_string().unwrap(), "abc");

        let report = JavaString::in_table(&ClassTable::new(), "abc").unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);

        let strings_only = ClassTable::new();
        let string_class = ClassDefinition::string(STRING_CLASS);
        strings_only.load(string_class).unwrap();
        let report = JavaString::in_table(&strings_only, "abc").unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);
    }
}
