//! Lifetime-bound pointers to class-level metadata.
//!
//! This module encapsulates the `ptr` field of [`RawDispatchVectorRef`] and
//! [`RawInterfaceNodeRef`]. The only ways to obtain one are the safe
//! constructors taking a reference and the unsafe `from_ptr` constructors,
//! so the pointers are always either derived from a live reference or vouched
//! for by the caller.
//!
//! # Walking the interface list
//!
//! [`RawDispatchVectorRef::interfaces`] follows `next` links until it reaches
//! null, so it only terminates on well-formed lists. Lists that were handed
//! over by foreign code can be checked with
//! [`RawDispatchVectorRef::implements_interface_bounded`], which gives up
//! after a fixed number of nodes.

use core::{ffi::CStr, iter::FusedIterator, marker::PhantomData, ptr::NonNull};

use crate::metadata::data::{DispatchVector, InterfaceNode};

/// A lifetime-bound pointer to an initialized [`DispatchVector`].
///
/// Copying the pointer never copies the dispatch vector: every copy refers to
/// the one block shared by all instances of the class.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawDispatchVectorRef<'a> {
    /// Pointer to the dispatch vector
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized [`DispatchVector`] that stays
    ///    valid and unmodified for `'a`.
    ptr: NonNull<DispatchVector>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a DispatchVector`
    _marker: PhantomData<&'a DispatchVector>,
}

// SAFETY: `DispatchVector` is `Sync`, so sharing a pointer to it across
// threads is equivalent to sharing a `&'a DispatchVector`.
unsafe impl Send for RawDispatchVectorRef<'_> {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for RawDispatchVectorRef<'_> {}

impl<'a> RawDispatchVectorRef<'a> {
    /// Creates a [`RawDispatchVectorRef`] from a reference.
    #[inline]
    pub fn new(dispatch_vector: &'a DispatchVector) -> Self {
        Self {
            ptr: NonNull::from(dispatch_vector),
            _marker: PhantomData,
        }
    }

    /// Creates a [`RawDispatchVectorRef`] from a raw pointer, returning `None`
    /// for a null pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A non-null `ptr` points to an initialized [`DispatchVector`] that
    ///    stays valid and unmodified for `'a`.
    #[inline]
    pub unsafe fn from_ptr(ptr: *const DispatchVector) -> Option<Self> {
        let ptr = NonNull::new(ptr.cast_mut())?;
        Some(Self {
            // SAFETY: Guaranteed by the caller.
            ptr,
            _marker: PhantomData,
        })
    }

    /// Returns the raw pointer to the dispatch vector.
    #[inline]
    pub fn as_ptr(self) -> *const DispatchVector {
        self.ptr.as_ptr()
    }

    /// Returns `true` if both references point to the same dispatch vector.
    #[inline]
    pub fn ptr_eq(self, other: RawDispatchVectorRef<'_>) -> bool {
        core::ptr::eq(self.as_ptr(), other.as_ptr())
    }

    /// Returns an iterator over the names of the implemented interfaces, in
    /// list order.
    #[inline]
    pub fn interfaces(self) -> Interfaces<'a> {
        Interfaces {
            node: self.interface_list(),
        }
    }

    /// Returns `true` if the class implements an interface whose name is equal
    /// to `name`.
    ///
    /// The list is walked from its head until a node with an equal name is
    /// found. A class without interfaces answers `false` immediately.
    pub fn implements_interface(self, name: &CStr) -> bool {
        self.interfaces().any(|interface| interface == name)
    }

    /// Like [`implements_interface`](Self::implements_interface), but follows
    /// at most `limit` nodes.
    ///
    /// Returns `None` if the list is longer than `limit` and no match was
    /// found within the first `limit` nodes.
    pub fn implements_interface_bounded(self, name: &CStr, limit: usize) -> Option<bool> {
        let mut node = self.interface_list();
        let mut visited = 0;
        while let Some(current) = node {
            if visited == limit {
                return None;
            }
            if current.interface_name() == name {
                return Some(true);
            }
            visited += 1;
            node = current.next();
        }
        Some(false)
    }
}

impl core::fmt::Debug for RawDispatchVectorRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("RawDispatchVectorRef")
            .field(&self.as_ptr())
            .finish()
    }
}

/// A lifetime-bound pointer to an initialized [`InterfaceNode`].
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawInterfaceNodeRef<'a> {
    /// Pointer to the node
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized [`InterfaceNode`] upholding the
    ///    requirements of [`InterfaceNode::new`] for `'a`.
    ptr: NonNull<InterfaceNode>,

    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a InterfaceNode`
    _marker: PhantomData<&'a InterfaceNode>,
}

// SAFETY: `InterfaceNode` is `Sync`.
unsafe impl Send for RawInterfaceNodeRef<'_> {}
// SAFETY: See the `Send` implementation above.
unsafe impl Sync for RawInterfaceNodeRef<'_> {}

impl<'a> RawInterfaceNodeRef<'a> {
    /// Creates a [`RawInterfaceNodeRef`] from a raw pointer, returning `None`
    /// for a null pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. A non-null `ptr` points to an initialized [`InterfaceNode`] upholding
    ///    the requirements of [`InterfaceNode::new`] for `'a`.
    #[inline]
    pub unsafe fn from_ptr(ptr: *const InterfaceNode) -> Option<Self> {
        let ptr = NonNull::new(ptr.cast_mut())?;
        Some(Self {
            // SAFETY: Guaranteed by the caller.
            ptr,
            _marker: PhantomData,
        })
    }

    /// Returns the raw pointer to the node.
    #[inline]
    pub fn as_ptr(self) -> *const InterfaceNode {
        self.ptr.as_ptr()
    }
}

impl core::fmt::Debug for RawInterfaceNodeRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawInterfaceNodeRef")
            .field("interface_name", &self.interface_name())
            .finish()
    }
}

/// Iterator over the interface names of a dispatch vector.
///
/// Created by [`RawDispatchVectorRef::interfaces`].
#[derive(Clone, Debug)]
pub struct Interfaces<'a> {
    /// The next node to yield, or `None` once the list is exhausted.
    node: Option<RawInterfaceNodeRef<'a>>,
}

impl<'a> Iterator for Interfaces<'a> {
    type Item = &'a CStr;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.next();
        Some(node.interface_name())
    }
}

impl FusedIterator for Interfaces<'_> {}
