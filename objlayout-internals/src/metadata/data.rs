//! This module encapsulates the fields of [`InterfaceNode`] and
//! [`DispatchVector`]. Since this is the only place they are visible, the
//! only way to put a pointer into either record is through the unsafe
//! constructors below, whose contracts are what the readers in
//! [`raw`](super::raw) rely on.

use core::ffi::{CStr, c_char, c_void};

use crate::metadata::raw::{RawDispatchVectorRef, RawInterfaceNodeRef};

/// One entry in the singly linked list of interfaces implemented by a class.
///
/// Layout-compatible with the C record `it { it* next; char* interface_name; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterfaceNode {
    /// The next node of the same list, or null at the end of the list.
    next: *const InterfaceNode,
    /// NUL-terminated name of the interface.
    interface_name: *const c_char,
}

// SAFETY: An `InterfaceNode` is never mutated after construction and only
// points to other nodes and to byte strings, which are equally immutable
// (requirement 3 of `InterfaceNode::new`).
unsafe impl Send for InterfaceNode {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for InterfaceNode {}

impl InterfaceNode {
    /// Creates a new interface node.
    ///
    /// A well-formed list reaches null after a finite number of `next` links.
    /// A cyclic list is not unsound to read, but unbounded walks over it never
    /// terminate.
    ///
    /// # Safety
    ///
    /// For as long as the node can be reached by a reader, the caller must
    /// ensure that:
    ///
    /// 1. `next` is null or points to an initialized [`InterfaceNode`] that
    ///    itself upholds these requirements.
    /// 2. `interface_name` points to a valid NUL-terminated string.
    /// 3. Neither this node nor anything it points to is mutated.
    #[inline]
    pub const unsafe fn new(next: *const InterfaceNode, interface_name: *const c_char) -> Self {
        Self {
            next,
            interface_name,
        }
    }

    /// A node that is not yet part of any list.
    ///
    /// Only used while a class allocation is being linked; such a node is
    /// overwritten before a reader can reach it.
    #[inline]
    pub(crate) const fn unlinked() -> Self {
        Self {
            next: core::ptr::null(),
            interface_name: core::ptr::null(),
        }
    }
}

/// Per-class metadata block shared by every instance of the class.
///
/// Layout-compatible with the C record `dv { it* it; void* type_info; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DispatchVector {
    /// Head of the interface list, or null if the class implements no
    /// interfaces.
    interface_list: *const InterfaceNode,
    /// Opaque reflective type information. Its meaning is defined by whoever
    /// created the dispatch vector.
    type_info: *const c_void,
}

// SAFETY: A `DispatchVector` is never mutated after construction, and the
// interface list it points to is immutable (requirement 2 of
// `DispatchVector::new`). The type information is never dereferenced by this
// crate.
unsafe impl Send for DispatchVector {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for DispatchVector {}

impl DispatchVector {
    /// Creates a new dispatch vector.
    ///
    /// # Safety
    ///
    /// For as long as the dispatch vector can be reached by a reader, the
    /// caller must ensure that:
    ///
    /// 1. `interface_list` is null or points to an initialized
    ///    [`InterfaceNode`] upholding the requirements of
    ///    [`InterfaceNode::new`].
    /// 2. The interface list is not mutated.
    #[inline]
    pub const unsafe fn new(
        interface_list: *const InterfaceNode,
        type_info: *const c_void,
    ) -> Self {
        Self {
            interface_list,
            type_info,
        }
    }

    /// Creates a dispatch vector for a class without interfaces and without
    /// type information.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            interface_list: core::ptr::null(),
            type_info: core::ptr::null(),
        }
    }
}

impl<'a> RawInterfaceNodeRef<'a> {
    /// Returns the next node of the list, if any.
    #[inline]
    pub fn next(self) -> Option<RawInterfaceNodeRef<'a>> {
        let ptr = self.as_ptr();

        // SAFETY: `RawInterfaceNodeRef` guarantees that the pointer refers to
        // an initialized node that stays valid for `'a`.
        let next: *const InterfaceNode = unsafe { (*ptr).next };

        // SAFETY: Requirement 1 of `InterfaceNode::new` guarantees that `next`
        // is null or points to a node with the same guarantees, valid for as
        // long as this node is reachable.
        unsafe { RawInterfaceNodeRef::from_ptr(next) }
    }

    /// Returns the name of the interface stored in this node.
    #[inline]
    pub fn interface_name(self) -> &'a CStr {
        let ptr = self.as_ptr();

        // SAFETY: `RawInterfaceNodeRef` guarantees that the pointer refers to
        // an initialized node that stays valid for `'a`.
        let name: *const c_char = unsafe { (*ptr).interface_name };

        // SAFETY: Requirement 2 of `InterfaceNode::new` guarantees a valid
        // NUL-terminated string that is not mutated while the node is
        // reachable.
        unsafe { CStr::from_ptr(name) }
    }
}

impl<'a> RawDispatchVectorRef<'a> {
    /// Returns the head of the interface list, or `None` if the class
    /// implements no interfaces.
    #[inline]
    pub fn interface_list(self) -> Option<RawInterfaceNodeRef<'a>> {
        let ptr = self.as_ptr();

        // SAFETY: `RawDispatchVectorRef` guarantees that the pointer refers to
        // an initialized dispatch vector that stays valid for `'a`.
        let head: *const InterfaceNode = unsafe { (*ptr).interface_list };

        // SAFETY: Requirement 1 of `DispatchVector::new` guarantees that the
        // head is null or a valid node for as long as the dispatch vector is
        // reachable.
        unsafe { RawInterfaceNodeRef::from_ptr(head) }
    }

    /// Returns the opaque type information pointer.
    #[inline]
    pub fn type_info(self) -> *const c_void {
        let ptr = self.as_ptr();

        // SAFETY: `RawDispatchVectorRef` guarantees that the pointer refers to
        // an initialized dispatch vector that stays valid for `'a`.
        unsafe { (*ptr).type_info }
    }
}
