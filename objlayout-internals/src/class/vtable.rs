//! Vtable for type-erased class allocations.
//!
//! This module contains the [`ClassVtable`] which records the concrete type
//! information type `I` of a [`ClassData`] after `I` has been erased. Its
//! fields are private to this module, and the only constructor pairs the
//! function pointers with `I` at compile time, so **the vtable always matches
//! the type information stored next to it**.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{class::data::ClassData, util::Erased};

/// Vtable for type-erased class allocations.
///
/// # Safety Invariant
///
/// The field `drop` is guaranteed to point to the function defined below
/// instantiated with the type information type `I` that was used to create
/// this [`ClassVtable`].
pub(crate) struct ClassVtable {
    /// Gets the [`TypeId`] of the type information type.
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the type information type.
    type_name: fn() -> &'static str,
    /// Drops the [`Box<ClassData<I>>`] instance pointed to by this pointer.
    drop: unsafe fn(NonNull<ClassData<Erased>>),
}

impl ClassVtable {
    /// Creates a new [`ClassVtable`] for the type information type `I`.
    pub(super) const fn new<I: 'static>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<I>,
                type_name: core::any::type_name::<I>,
                drop: drop::<I>,
            }
        }
    }

    /// Gets the [`TypeId`] of the type information type.
    #[inline]
    pub(super) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the name of the type information type.
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Drops the `Box<ClassData<I>>` instance pointed to by this pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from [`Box<ClassData<I>>`] via [`Box::into_raw`]
    /// 2. This [`ClassVtable`] must be the vtable stored in that
    ///    [`ClassData`].
    /// 3. This method drops the [`Box<ClassData<I>>`], so the caller must
    ///    ensure that the pointer has not previously been dropped, that it is
    ///    able to transfer ownership of the pointer, and that neither it nor
    ///    any pointer into the allocation will be used after calling this
    ///    method.
    #[inline]
    pub(super) unsafe fn drop(&self, ptr: NonNull<ClassData<Erased>>) {
        // SAFETY: We know that `self.drop` points to the function `drop::<I>`
        // below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the caller
        unsafe {
            (self.drop)(ptr);
        }
    }
}

/// Drops the [`Box<ClassData<I>>`] instance pointed to by this pointer.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The pointer comes from [`Box<ClassData<I>>`] via [`Box::into_raw`]
/// 2. The type `I` matches the actual type information type stored in the
///    [`ClassData`]
/// 3. The pointer has not previously been dropped and will not be used
///    afterwards.
unsafe fn drop<I: 'static>(ptr: NonNull<ClassData<Erased>>) {
    let ptr: NonNull<ClassData<I>> = ptr.cast::<ClassData<I>>();
    let ptr = ptr.as_ptr();
    // SAFETY: Our pointer has the correct type as guaranteed by the caller, and
    // it came from a call to `Box::into_raw` as also guaranteed by our caller.
    let boxed = unsafe { Box::from_raw(ptr) };
    core::mem::drop(boxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_vtable_type_id() {
        let vtable = ClassVtable::new::<u32>();
        assert_eq!(vtable.type_id(), TypeId::of::<u32>());
        assert_eq!(vtable.type_name(), "u32");

        let other = ClassVtable::new::<i64>();
        assert_ne!(other.type_id(), vtable.type_id());
    }
}
