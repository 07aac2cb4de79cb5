//! This module encapsulates the fields of the [`ClassData`]. Since this is the
//! only place they are visible, the [`ClassVtable`] is guaranteed to stay in
//! sync with the stored type information, and the pointers inside the
//! dispatch vector and the interface nodes are guaranteed to point into the
//! same allocation.

use alloc::{boxed::Box, ffi::CString, vec::Vec};
use core::ffi::{c_char, c_void};

use crate::{
    class::{raw::RawClassRef, vtable::ClassVtable},
    metadata::{DispatchVector, InterfaceNode, RawDispatchVectorRef},
};

/// All metadata of one class in a single allocation.
///
/// This struct uses `#[repr(C)]` so that the fields in front of `type_info`
/// can be read through a `ClassData<Erased>` pointer, and so that a pointer to
/// the allocation is also a pointer to its dispatch vector.
#[repr(C)]
pub(super) struct ClassData<I: 'static> {
    /// The dispatch vector shared by every instance of the class
    dispatch_vector: DispatchVector,
    /// The vtable of this allocation
    vtable: &'static ClassVtable,
    /// Interface names, in declaration order
    interface_names: Box<[CString]>,
    /// Interface list nodes, one per name, allocated contiguously
    interface_nodes: Box<[InterfaceNode]>,
    /// The type information the dispatch vector points to
    type_info: I,
}

impl<I: 'static> ClassData<I> {
    /// Creates a new, unlinked [`ClassData`].
    ///
    /// The dispatch vector and the interface nodes are placeholders until
    /// [`link`] has run on the final allocation.
    pub(super) fn new(interface_names: Vec<CString>, type_info: I) -> Self {
        let interface_nodes = interface_names
            .iter()
            .map(|_| InterfaceNode::unlinked())
            .collect();

        Self {
            dispatch_vector: DispatchVector::empty(),
            vtable: ClassVtable::new::<I>(),
            interface_names: interface_names.into_boxed_slice(),
            interface_nodes,
            type_info,
        }
    }
}

/// Links the interface nodes of a boxed [`ClassData`] in declaration order and
/// points its dispatch vector at the list head and at the type information.
///
/// All pointers are derived from `ptr`, so they stay valid for as long as the
/// allocation is not moved or freed.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `ptr` comes from [`Box::into_raw`] on a `Box<ClassData<I>>` created by
///    [`ClassData::new`].
/// 2. No reference into the allocation exists and no reader can reach it
///    while this function runs.
pub(super) unsafe fn link<I: 'static>(ptr: *mut ClassData<I>) {
    // SAFETY: The allocation is valid and exclusively ours (1, 2). The shared
    // reference ends before any pointer into the nodes is taken.
    let count: usize = unsafe { (&(*ptr).interface_nodes).len() };
    // SAFETY: The allocation is valid and exclusively ours (1, 2).
    let names: *const CString = unsafe { (*ptr).interface_names.as_ptr() };
    // SAFETY: The allocation is valid and exclusively ours (1, 2).
    let nodes: *mut InterfaceNode = unsafe { (*ptr).interface_nodes.as_mut_ptr() };

    for index in 0..count {
        let next: *const InterfaceNode = if index + 1 < count {
            nodes.wrapping_add(index + 1).cast_const()
        } else {
            core::ptr::null()
        };

        // SAFETY: `ClassData::new` creates exactly one node per name, so
        // `index` is in bounds of the names as well.
        let name_ptr: *const CString = unsafe { names.add(index) };
        // SAFETY: `name_ptr` points to an initialized `CString`.
        let name: *const c_char = unsafe { (*name_ptr).as_ptr() };

        // SAFETY:
        // 1. `next` is null or the following node of the same boxed slice, which
        //    is written by a later iteration before anything can read it.
        // 2. Every link moves forward in the slice, so the chain ends after at
        //    most `count` steps.
        // 3. `name` is a NUL-terminated string owned by the same allocation.
        // 4. Nothing in the allocation is mutated after this function returns.
        let node = unsafe { InterfaceNode::new(next, name) };

        // SAFETY: `index < count`, so the slot is in bounds.
        let slot: *mut InterfaceNode = unsafe { nodes.add(index) };
        // SAFETY: The slot is valid for writes and exclusively ours (2).
        unsafe { slot.write(node) };
    }

    let head: *const InterfaceNode = if count == 0 {
        core::ptr::null()
    } else {
        nodes.cast_const()
    };

    // SAFETY: The allocation is valid (1); we only create a raw pointer to the
    // field.
    let type_info: *const I = unsafe { &raw const (*ptr).type_info };

    // SAFETY:
    // 1. `head` is null or the first node of the chain linked above, which
    //    lives as long as the allocation.
    // 2. The chain is not mutated after this function returns.
    let dispatch_vector = unsafe { DispatchVector::new(head, type_info.cast::<c_void>()) };

    // SAFETY: The allocation is valid and exclusively ours (1, 2).
    let slot: *mut DispatchVector = unsafe { &raw mut (*ptr).dispatch_vector };
    // SAFETY: The slot is valid for writes; `DispatchVector` has no drop glue.
    unsafe { slot.write(dispatch_vector) };
}

impl<'a> RawClassRef<'a> {
    /// Returns a reference to the [`ClassVtable`] of the [`ClassData`]
    /// instance.
    #[inline]
    pub(super) fn vtable(self) -> &'static ClassVtable {
        let ptr = self.as_ptr();
        // SAFETY: We don't know the actual type information type, but we do
        // know that the pointer refers to a `ClassData<I>` for some specific
        // `I`. Since `ClassData<I>` is `#[repr(C)]`, we can create pointers to
        // the fields in front of the type information.
        //
        // We need to take care to avoid creating an actual reference to the
        // `ClassData` itself though, as that would still be undefined behavior
        // since we don't have the right type.
        let vtable_ptr: *const &'static ClassVtable = unsafe { &raw const (*ptr).vtable };

        // SAFETY: Dereferencing the pointer and getting out the `&'static
        // ClassVtable` is valid for the same reasons.
        unsafe { *vtable_ptr }
    }

    /// Returns the dispatch vector of the class.
    #[inline]
    pub fn dispatch_vector(self) -> RawDispatchVectorRef<'a> {
        let ptr = self.as_ptr();
        // SAFETY: Same argument as in `vtable`; the dispatch vector is the first
        // field of the `#[repr(C)]` struct.
        let dispatch_vector: *const DispatchVector = unsafe { &raw const (*ptr).dispatch_vector };

        // SAFETY: The dispatch vector was linked before the `RawClass` was
        // handed out and is never mutated afterwards. The allocation lives for
        // `'a`.
        let dispatch_vector: &'a DispatchVector = unsafe { &*dispatch_vector };
        RawDispatchVectorRef::new(dispatch_vector)
    }

    /// Returns the number of interfaces the class implements.
    #[inline]
    pub fn interface_count(self) -> usize {
        let ptr = self.as_ptr();
        // SAFETY: Same argument as in `vtable`.
        let nodes: *const Box<[InterfaceNode]> = unsafe { &raw const (*ptr).interface_nodes };

        // SAFETY: The boxed slice is initialized, lives for `'a` and is never
        // mutated after linking, so a shared reference to it is valid.
        let nodes: &'a Box<[InterfaceNode]> = unsafe { &*nodes };
        nodes.len()
    }

    /// Accesses the type information as a reference to the specified type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type `I` matches the actual type
    /// information type stored in the [`ClassData`].
    #[inline]
    pub unsafe fn type_info_downcast_unchecked<I: 'static>(self) -> &'a I {
        // SAFETY: The inner function requires that `I` matches the type stored,
        // but that is guaranteed by our caller.
        let this = unsafe { self.cast_inner::<I>() };
        &this.type_info
    }
}
