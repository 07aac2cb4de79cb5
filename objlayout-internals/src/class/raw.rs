//! Type-erased class allocation pointer types.
//!
//! This module encapsulates the `ptr` field of [`RawClass`] and
//! [`RawClassRef`], ensuring it is only visible within this module. This
//! visibility restriction guarantees the safety invariant: **the pointer always
//! comes from `Box<ClassData<I>>` and has been linked**.
//!
//! # Safety Invariant
//!
//! Since the `ptr` field can only be set via [`RawClass::new`] (which creates
//! it from `Box::into_raw` and links it immediately), and cannot be modified
//! afterward, the pointers stored in the dispatch vector and in the interface
//! nodes stay valid for as long as the [`RawClass`] exists.
//!
//! # Type Erasure
//!
//! The type information type `I` is erased by casting to
//! `ClassData<Erased>`. The vtable stored within the `ClassData` records `I`
//! so that the allocation can be dropped and the type information downcast.

use alloc::{boxed::Box, ffi::CString, vec::Vec};
use core::{any::TypeId, ptr::NonNull};

use crate::{
    class::data::{ClassData, link},
    util::Erased,
};

/// An owned allocation holding a class's dispatch vector, its interface list
/// and its type information.
///
/// The interface nodes are allocated contiguously when the class is created
/// and are freed together with it. Instances of the class point to the
/// dispatch vector without owning it, so the [`RawClass`] must outlive them.
///
/// We cannot use a [`Box<ClassData<I>>`] directly, because that does not allow
/// us to type-erase the `I`.
#[repr(transparent)]
pub struct RawClass {
    /// Pointer to the inner class data
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<ClassData<I>>` for
    ///    some `I: Send + Sync` using `Box::into_raw`.
    /// 2. The allocation has been linked and is not mutated afterwards.
    /// 3. The pointer will point to the same `ClassData<I>` for the entire
    ///    lifetime of this object.
    ptr: NonNull<ClassData<Erased>>,
}

// SAFETY: The allocation is immutable after linking, and the type information
// is `Send + Sync` as required by `RawClass::new`.
unsafe impl Send for RawClass {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for RawClass {}

impl RawClass {
    /// Creates a new [`RawClass`] with the given interfaces and type
    /// information.
    ///
    /// The interface list is linked in the order given. Names are not checked
    /// for duplicates.
    pub fn new<I>(interface_names: Vec<CString>, type_info: I) -> Self
    where
        I: Send + Sync + 'static,
    {
        let ptr = Box::new(ClassData::new(interface_names, type_info));
        let ptr: *mut ClassData<I> = Box::into_raw(ptr);

        // SAFETY:
        // 1. The pointer was just created by `Box::into_raw`.
        // 2. Nothing else can see the allocation yet.
        unsafe { link(ptr) };

        let ptr: *mut ClassData<Erased> = ptr.cast::<ClassData<Erased>>();

        // SAFETY: `Box::into_raw` returns a non-null pointer
        let ptr: NonNull<ClassData<Erased>> = unsafe { NonNull::new_unchecked(ptr) };

        Self { ptr }
    }

    /// Returns a reference to the [`ClassData`] instance.
    #[inline]
    pub fn as_ref(&self) -> RawClassRef<'_> {
        RawClassRef {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }

    /// Returns a reference to the [`ClassData`] instance that is not tied to
    /// the borrow of `self`.
    ///
    /// Moving a [`RawClass`] does not move the class data, so the reference
    /// stays valid across moves of its owner.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`RawClass`] is not dropped for the lifetime `'a`.
    #[inline]
    pub unsafe fn as_ref_unbounded<'a>(&self) -> RawClassRef<'a> {
        RawClassRef {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }
}

impl core::ops::Drop for RawClass {
    #[inline]
    fn drop(&mut self) {
        let vtable = self.as_ref().vtable();

        // SAFETY:
        // 1. The pointer comes from `Box::into_raw` (guaranteed by
        //    `RawClass::new`)
        // 2. The vtable returned by `self.as_ref().vtable()` is the one stored in
        //    the `ClassData`.
        // 3. The pointer is initialized and has not been previously freed as
        //    guaranteed by the invariants on this type. References derived from
        //    it are bounded by the borrow of `self`, which has ended.
        unsafe {
            vtable.drop(self.ptr);
        }
    }
}

impl core::fmt::Debug for RawClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.as_ref(), f)
    }
}

/// A lifetime-bound pointer to a linked [`ClassData`].
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawClassRef<'a> {
    /// Pointer to the inner class data
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<ClassData<I>>` for
    ///    some `I` using `Box::into_raw`, and has been linked.
    /// 2. The pointer will point to the same `ClassData<I>` for `'a`.
    ptr: NonNull<ClassData<Erased>>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a ClassData<Erased>`
    _marker: core::marker::PhantomData<&'a ClassData<Erased>>,
}

// SAFETY: A `RawClassRef` only ever gives shared access to an allocation owned
// by a `RawClass`, which is `Sync`.
unsafe impl Send for RawClassRef<'_> {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for RawClassRef<'_> {}

impl<'a> RawClassRef<'a> {
    /// Casts the [`RawClassRef`] to a [`ClassData<I>`] reference.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The type `I` matches the actual type information type stored in the
    ///    [`ClassData`].
    #[inline]
    pub(super) unsafe fn cast_inner<I: 'static>(self) -> &'a ClassData<I> {
        // Debug assertion to catch type mismatches in case of bugs
        debug_assert_eq!(self.vtable().type_id(), TypeId::of::<I>());

        let this = self.ptr.cast::<ClassData<I>>();
        // SAFETY: Converting the NonNull pointer to a reference is sound because:
        // - The pointer is non-null, properly aligned, and dereferenceable
        //   (guaranteed by RawClassRef's type invariants)
        // - The pointee is initialized and linked
        // - The type `I` matches the stored type (guaranteed by caller)
        // - The allocation is only ever accessed immutably after linking
        unsafe { this.as_ref() }
    }

    /// Returns the raw pointer to the [`ClassData`] instance.
    #[inline]
    pub(super) fn as_ptr(self) -> *const ClassData<Erased> {
        self.ptr.as_ptr()
    }

    /// Returns the [`TypeId`] of the type information.
    #[inline]
    pub fn type_info_type_id(self) -> TypeId {
        self.vtable().type_id()
    }

    /// Returns the [`core::any::type_name`] of the type information.
    #[inline]
    pub fn type_info_type_name(self) -> &'static str {
        self.vtable().type_name()
    }

    /// Returns the type information if it is of type `I`.
    #[inline]
    pub fn type_info_downcast<I: 'static>(self) -> Option<&'a I> {
        if self.type_info_type_id() == TypeId::of::<I>() {
            // SAFETY: The type was checked just above.
            Some(unsafe { self.type_info_downcast_unchecked::<I>() })
        } else {
            None
        }
    }
}

impl core::fmt::Debug for RawClassRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawClassRef")
            .field("dispatch_vector", &self.dispatch_vector())
            .field("interface_count", &self.interface_count())
            .field("type_info", &self.type_info_type_name())
            .finish()
    }
}
