//! This module encapsulates the fields of the instance headers.
//!
//! Every header starts with an [`ObjectHeader`]. [`ArrayHeader`] and
//! [`StringHeader`] embed it as their first field, and all three are
//! `#[repr(C)]`, so a pointer to either extension is also a valid pointer to
//! an [`ObjectHeader`]. That is what lets [`RawObjectRef`] read the dispatch
//! vector of an instance without knowing its kind.

use crate::{
    instance::raw::{RawArrayRef, RawObjectRef, RawStringRef},
    metadata::{DispatchVector, RawDispatchVectorRef},
    primitive::jint,
};

/// Header of every managed instance.
///
/// Layout-compatible with the C record `jobject { dv* dv; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    /// The dispatch vector of the instance's class. Written once when the
    /// instance is allocated.
    dispatch_vector: *const DispatchVector,
}

impl ObjectHeader {
    /// Creates a new object header.
    ///
    /// A null `dispatch_vector` produces a non-conforming header that readers
    /// report as such.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A non-null `dispatch_vector` points to an initialized
    ///    [`DispatchVector`] that stays valid and unmodified for as long as the
    ///    header can be read.
    #[inline]
    pub const unsafe fn new(dispatch_vector: *const DispatchVector) -> Self {
        Self { dispatch_vector }
    }
}

/// Header of an array instance.
///
/// Layout-compatible with the C record
/// `jarray : jobject { int32_t len; intptr_t data; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ArrayHeader {
    /// The common object header
    header: ObjectHeader,
    /// Number of elements
    length: jint,
    /// Address of the first element. Only meaningful if `length > 0`.
    data: *mut u8,
}

impl ArrayHeader {
    /// Creates a new array header.
    ///
    /// The element type is not part of the header; it is implied by the
    /// array's class.
    ///
    /// # Safety
    ///
    /// The caller must ensure, for as long as the header can be read:
    ///
    /// 1. A non-null `dispatch_vector` upholds the requirements of
    ///    [`ObjectHeader::new`].
    /// 2. If `length > 0`, `data` points to `length` initialized, properly
    ///    aligned elements of the array's element type, which are not mutated
    ///    while a shared view of them exists.
    #[inline]
    pub const unsafe fn new(
        dispatch_vector: *const DispatchVector,
        length: jint,
        data: *mut u8,
    ) -> Self {
        Self {
            // SAFETY: Requirement 1 is guaranteed by the caller.
            header: unsafe { ObjectHeader::new(dispatch_vector) },
            length,
            data,
        }
    }
}

/// Header of a string instance.
///
/// Layout-compatible with the C record `jstring : jobject { jarray* chars; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringHeader {
    /// The common object header
    header: ObjectHeader,
    /// The array holding the string's character data
    characters: *const ArrayHeader,
}

impl StringHeader {
    /// Creates a new string header.
    ///
    /// # Safety
    ///
    /// The caller must ensure, for as long as the header can be read:
    ///
    /// 1. A non-null `dispatch_vector` upholds the requirements of
    ///    [`ObjectHeader::new`].
    /// 2. A non-null `characters` points to an initialized [`ArrayHeader`]
    ///    upholding the requirements of [`ArrayHeader::new`].
    #[inline]
    pub const unsafe fn new(
        dispatch_vector: *const DispatchVector,
        characters: *const ArrayHeader,
    ) -> Self {
        Self {
            // SAFETY: Requirement 1 is guaranteed by the caller.
            header: unsafe { ObjectHeader::new(dispatch_vector) },
            characters,
        }
    }
}

impl<'a> RawObjectRef<'a> {
    /// Returns the dispatch vector of the instance, or `None` if the header
    /// does not carry one.
    #[inline]
    pub fn dispatch_vector(self) -> Option<RawDispatchVectorRef<'a>> {
        let ptr = self.as_ptr();

        // SAFETY: `RawObjectRef` guarantees that the pointer refers to an
        // initialized header that stays valid for `'a`.
        let dispatch_vector: *const DispatchVector = unsafe { (*ptr).dispatch_vector };

        // SAFETY: Requirement 1 of `ObjectHeader::new` guarantees that a
        // non-null dispatch vector stays valid for as long as the header can
        // be read, which is at least `'a`.
        unsafe { RawDispatchVectorRef::from_ptr(dispatch_vector) }
    }
}

impl<'a> RawArrayRef<'a> {
    /// Returns the stored element count.
    ///
    /// A conforming array never stores a negative length, but a header coming
    /// from foreign code is returned as-is.
    #[inline]
    pub fn length(self) -> jint {
        let ptr = self.as_ptr();

        // SAFETY: `RawArrayRef` guarantees that the pointer refers to an
        // initialized array header that stays valid for `'a`.
        unsafe { (*ptr).length }
    }

    /// Returns the address of the first element.
    ///
    /// The address must not be dereferenced if [`length`](Self::length) is
    /// not positive.
    #[inline]
    pub fn data(self) -> *const u8 {
        let ptr = self.as_ptr();

        // SAFETY: `RawArrayRef` guarantees that the pointer refers to an
        // initialized array header that stays valid for `'a`.
        let data: *mut u8 = unsafe { (*ptr).data };
        data.cast_const()
    }
}

impl<'a> RawStringRef<'a> {
    /// Returns the array holding the character data, or `None` if the header
    /// does not point to one.
    #[inline]
    pub fn characters(self) -> Option<RawArrayRef<'a>> {
        let ptr = self.as_ptr();

        // SAFETY: `RawStringRef` guarantees that the pointer refers to an
        // initialized string header that stays valid for `'a`.
        let characters: *const ArrayHeader = unsafe { (*ptr).characters };

        // SAFETY: Requirement 2 of `StringHeader::new` guarantees that a
        // non-null characters pointer refers to a valid array header for as
        // long as the string header can be read.
        unsafe { RawArrayRef::from_ptr(characters) }
    }
}
