//! Lifetime-bound pointers to instance headers.
//!
//! This module encapsulates the `ptr` field of [`RawObjectRef`],
//! [`RawArrayRef`] and [`RawStringRef`]. A value of any of these types is a
//! promise that the header behind the pointer is initialized and upholds the
//! contract of its constructor for the lifetime `'a`.
//!
//! # Prefix casts
//!
//! Going from an array or string to its object header
//! ([`RawArrayRef::object`], [`RawStringRef::object`]) is always allowed,
//! since both embed [`ObjectHeader`] at offset zero. Going the other way
//! ([`RawObjectRef::cast_array`], [`RawObjectRef::cast_string`]) requires the
//! caller to know the instance's kind, for instance from its class.

use core::{marker::PhantomData, ptr::NonNull};

use crate::instance::data::{ArrayHeader, ObjectHeader, StringHeader};

/// A lifetime-bound pointer to an initialized [`ObjectHeader`], which may be
/// the prefix of a larger header.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawObjectRef<'a> {
    /// Pointer to the object header
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized [`ObjectHeader`] that upholds
    ///    the requirements of [`ObjectHeader::new`] for `'a`.
    /// 2. If the pointer was derived from an [`ArrayHeader`] or a
    ///    [`StringHeader`], it keeps the provenance of the whole header.
    ptr: NonNull<ObjectHeader>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a ObjectHeader`
    _marker: PhantomData<&'a ObjectHeader>,
}

impl<'a> RawObjectRef<'a> {
    /// Creates a [`RawObjectRef`] from a reference to a plain object header.
    #[inline]
    pub fn new(header: &'a ObjectHeader) -> Self {
        Self {
            ptr: NonNull::from(header),
            _marker: PhantomData,
        }
    }

    /// Creates a [`RawObjectRef`] from a raw pointer, returning `None` for a
    /// null pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A non-null `ptr` points to an initialized header starting with an
    ///    [`ObjectHeader`] that stays valid and unmodified for `'a`.
    #[inline]
    pub unsafe fn from_ptr(ptr: *const ObjectHeader) -> Option<Self> {
        let ptr = NonNull::new(ptr.cast_mut())?;
        Some(Self {
            // SAFETY: Guaranteed by the caller.
            ptr,
            _marker: PhantomData,
        })
    }

    /// Returns the raw pointer to the header.
    #[inline]
    pub fn as_ptr(self) -> *const ObjectHeader {
        self.ptr.as_ptr()
    }

    /// Reinterprets the instance as an array.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The instance is an array, i.e. the header is the prefix of an
    ///    initialized [`ArrayHeader`] and the pointer carries its provenance.
    #[inline]
    pub unsafe fn cast_array(self) -> RawArrayRef<'a> {
        RawArrayRef {
            // SAFETY: Guaranteed by the caller; `ArrayHeader` starts with an
            // `ObjectHeader` at offset zero.
            ptr: self.ptr.cast::<ArrayHeader>(),
            _marker: PhantomData,
        }
    }

    /// Reinterprets the instance as a string.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The instance is a string, i.e. the header is the prefix of an
    ///    initialized [`StringHeader`] and the pointer carries its provenance.
    #[inline]
    pub unsafe fn cast_string(self) -> RawStringRef<'a> {
        RawStringRef {
            // SAFETY: Guaranteed by the caller; `StringHeader` starts with an
            // `ObjectHeader` at offset zero.
            ptr: self.ptr.cast::<StringHeader>(),
            _marker: PhantomData,
        }
    }
}

impl core::fmt::Debug for RawObjectRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawObjectRef")
            .field("ptr", &self.as_ptr())
            .field("dispatch_vector", &self.dispatch_vector())
            .finish()
    }
}

/// A lifetime-bound pointer to an initialized [`ArrayHeader`].
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawArrayRef<'a> {
    /// Pointer to the array header
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized [`ArrayHeader`] that upholds
    ///    the requirements of [`ArrayHeader::new`] for `'a`.
    ptr: NonNull<ArrayHeader>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a ArrayHeader`
    _marker: PhantomData<&'a ArrayHeader>,
}

impl<'a> RawArrayRef<'a> {
    /// Creates a [`RawArrayRef`] from a reference.
    #[inline]
    pub fn new(header: &'a ArrayHeader) -> Self {
        Self {
            ptr: NonNull::from(header),
            _marker: PhantomData,
        }
    }

    /// Creates a [`RawArrayRef`] from a raw pointer, returning `None` for a
    /// null pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A non-null `ptr` points to an initialized [`ArrayHeader`] upholding
    ///    the requirements of [`ArrayHeader::new`] for `'a`.
    #[inline]
    pub unsafe fn from_ptr(ptr: *const ArrayHeader) -> Option<Self> {
        let ptr = NonNull::new(ptr.cast_mut())?;
        Some(Self {
            // SAFETY: Guaranteed by the caller.
            ptr,
            _marker: PhantomData,
        })
    }

    /// Returns the raw pointer to the header.
    #[inline]
    pub fn as_ptr(self) -> *const ArrayHeader {
        self.ptr.as_ptr()
    }

    /// Returns the common object header of the array.
    #[inline]
    pub fn object(self) -> RawObjectRef<'a> {
        RawObjectRef {
            // `ArrayHeader` is `#[repr(C)]` with its `ObjectHeader` at offset
            // zero, and the cast keeps the provenance of the whole header.
            ptr: self.ptr.cast::<ObjectHeader>(),
            _marker: PhantomData,
        }
    }

    /// Returns the elements of the array.
    ///
    /// An array whose length is zero or negative yields an empty slice
    /// without reading the data pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `T` is the element type of the array.
    /// 2. The elements are not mutated during `'a`.
    #[inline]
    pub unsafe fn as_slice<T>(self) -> &'a [T] {
        let length = match usize::try_from(self.length()) {
            Ok(0) | Err(_) => return &[],
            Ok(length) => length,
        };
        let data = self.data().cast::<T>();
        debug_assert!(data.is_aligned());

        // SAFETY: Requirement 2 of `ArrayHeader::new` guarantees that `data`
        // points to `length` initialized, aligned elements of the element type,
        // which is `T` as guaranteed by our caller. Our caller also guarantees
        // that they are not mutated during `'a`.
        unsafe { core::slice::from_raw_parts(data, length) }
    }
}

impl core::fmt::Debug for RawArrayRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawArrayRef")
            .field("ptr", &self.as_ptr())
            .field("length", &self.length())
            .field("data", &self.data())
            .finish()
    }
}

/// A lifetime-bound pointer to an initialized [`StringHeader`].
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawStringRef<'a> {
    /// Pointer to the string header
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized [`StringHeader`] that upholds
    ///    the requirements of [`StringHeader::new`] for `'a`.
    ptr: NonNull<StringHeader>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a StringHeader`
    _marker: PhantomData<&'a StringHeader>,
}

impl<'a> RawStringRef<'a> {
    /// Creates a [`RawStringRef`] from a reference.
    #[inline]
    pub fn new(header: &'a StringHeader) -> Self {
        Self {
            ptr: NonNull::from(header),
            _marker: PhantomData,
        }
    }

    /// Creates a [`RawStringRef`] from a raw pointer, returning `None` for a
    /// null pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A non-null `ptr` points to an initialized [`StringHeader`]
    ///    upholding the requirements of [`StringHeader::new`] for `'a`.
    #[inline]
    pub unsafe fn from_ptr(ptr: *const StringHeader) -> Option<Self> {
        let ptr = NonNull::new(ptr.cast_mut())?;
        Some(Self {
            // SAFETY: Guaranteed by the caller.
            ptr,
            _marker: PhantomData,
        })
    }

    /// Returns the raw pointer to the header.
    #[inline]
    pub fn as_ptr(self) -> *const StringHeader {
        self.ptr.as_ptr()
    }

    /// Returns the common object header of the string.
    #[inline]
    pub fn object(self) -> RawObjectRef<'a> {
        RawObjectRef {
            // Same argument as `RawArrayRef::object`.
            ptr: self.ptr.cast::<ObjectHeader>(),
            _marker: PhantomData,
        }
    }
}

impl core::fmt::Debug for RawStringRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawStringRef")
            .field("ptr", &self.as_ptr())
            .field("characters", &self.characters())
            .finish()
    }
}
