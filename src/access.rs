//! Checked reads of instance headers and dispatch vectors handed in as raw
//! pointers.
//!
//! These are the operations compiled code relies on. They never write, and
//! they never repair what they read: a violation of the layout contract is
//! returned as a [`LayoutError`] at the point where it is detected.
//!
//! Interface lists reached through a raw pointer cannot be proven acyclic,
//! so [`implements_interface`] follows at most
//! [`LayoutConfig::max_interface_chain`] nodes.

use alloc::format;
use core::ffi::CStr;

use objlayout_internals::{
    ArrayHeader, DispatchVector, ObjectHeader, RawArrayRef, RawDispatchVectorRef,
    RawInterfaceNodeRef, RawObjectRef, RawStringRef, StringHeader, primitive::jint,
};
use rootcause::report;

use crate::{LayoutError, LayoutResult, config::LayoutConfig};

/// Reads the dispatch vector of any instance.
///
/// # Errors
///
/// Fails with [`LayoutError::InvalidReference`] if `instance` is null or its
/// header carries no dispatch vector.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `instance` points to an initialized header starting with an
///    [`ObjectHeader`] that stays valid and unmodified for `'a`.
pub unsafe fn dispatch_vector<'a>(
    instance: *const ObjectHeader,
) -> LayoutResult<RawDispatchVectorRef<'a>> {
    // SAFETY: Guaranteed by the caller.
    let Some(object) = (unsafe { RawObjectRef::from_ptr(instance) }) else {
        return Err(report!(LayoutError::InvalidReference).attach("null instance"));
    };
    object.dispatch_vector().ok_or_else(|| {
        tracing::warn!(instance = ?instance, "instance header has no dispatch vector");
        report!(LayoutError::InvalidReference)
            .attach(format!("instance {instance:p} has no dispatch vector"))
    })
}

/// Returns the head of the dispatch vector's interface list, or `None` if the
/// class implements no interfaces.
pub fn interface_list(
    dispatch_vector: RawDispatchVectorRef<'_>,
) -> Option<RawInterfaceNodeRef<'_>> {
    dispatch_vector.interface_list()
}

/// Checks whether the class described by `dispatch_vector` implements the
/// interface named `name`.
///
/// Names are compared by content. An empty list implements nothing.
///
/// # Errors
///
/// - [`LayoutError::InvalidArgument`] if `dispatch_vector` is null.
/// - [`LayoutError::MalformedMetadata`] if the list is longer than the
///   configured walk bound. The bound is read at call time and applies to
///   every list, including those of classes loaded while a larger bound was
///   installed.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `dispatch_vector` points to an initialized
///    [`DispatchVector`] whose interface nodes and names stay valid and
///    unmodified for the duration of the call.
pub unsafe fn implements_interface(
    dispatch_vector: *const DispatchVector,
    name: &CStr,
) -> LayoutResult<bool> {
    // SAFETY: Guaranteed by the caller.
    let dispatch_vector = unsafe { RawDispatchVectorRef::from_ptr(dispatch_vector) };
    let Some(dispatch_vector) = dispatch_vector else {
        return Err(report!(LayoutError::InvalidArgument).attach("null dispatch vector"));
    };

    let limit = LayoutConfig::current().max_interface_chain();
    match dispatch_vector.implements_interface_bounded(name, limit) {
        Some(found) => {
            tracing::trace!(
                dispatch_vector = ?dispatch_vector.as_ptr(),
                interface = ?name,
                found,
                "interface lookup"
            );
            Ok(found)
        }
        None => {
            tracing::warn!(
                dispatch_vector = ?dispatch_vector.as_ptr(),
                limit,
                "interface list exceeds the walk bound"
            );
            Err(report!(LayoutError::MalformedMetadata)
                .attach(format!(
                    "interface list of {:p} is longer than {limit} nodes",
                    dispatch_vector.as_ptr()
                ))
                .attach("the list is cyclic or exceeds the installed walk bound"))
        }
    }
}

/// Reads the array header at `array`, rejecting null pointers and negative
/// lengths.
///
/// # Safety
///
/// Same as [`array_length`].
unsafe fn checked_array<'a>(array: *const ArrayHeader) -> LayoutResult<RawArrayRef<'a>> {
    // SAFETY: Guaranteed by the caller.
    let Some(array) = (unsafe { RawArrayRef::from_ptr(array) }) else {
        return Err(report!(LayoutError::InvalidReference).attach("null array"));
    };
    let length = array.length();
    if length < 0 {
        tracing::warn!(array = ?array.as_ptr(), length, "negative array length");
        return Err(report!(LayoutError::MalformedMetadata)
            .attach(format!("array {:p} stores length {length}", array.as_ptr())));
    }
    Ok(array)
}

/// Reads the element count of an array.
///
/// # Errors
///
/// - [`LayoutError::InvalidReference`] if `array` is null.
/// - [`LayoutError::MalformedMetadata`] if the stored length is negative.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `array` points to an initialized [`ArrayHeader`] that stays
///    valid for the duration of the call.
pub unsafe fn array_length(array: *const ArrayHeader) -> LayoutResult<jint> {
    // SAFETY: Guaranteed by the caller.
    unsafe { checked_array(array) }.map(RawArrayRef::length)
}

/// Reads the address of an array's first element.
///
/// The address must not be dereferenced if the array is empty.
///
/// # Errors
///
/// See [`array_length`].
///
/// # Safety
///
/// See [`array_length`].
pub unsafe fn array_data(array: *const ArrayHeader) -> LayoutResult<*const u8> {
    // SAFETY: Guaranteed by the caller.
    unsafe { checked_array(array) }.map(RawArrayRef::data)
}

/// Reads the character array of a string.
///
/// # Errors
///
/// Fails with [`LayoutError::InvalidReference`] if `string` is null or has
/// no character array.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `string` points to an initialized [`StringHeader`] whose
///    character array stays valid and unmodified for `'a`.
pub unsafe fn string_characters<'a>(string: *const StringHeader) -> LayoutResult<RawArrayRef<'a>> {
    // SAFETY: Guaranteed by the caller.
    let Some(string) = (unsafe { RawStringRef::from_ptr(string) }) else {
        return Err(report!(LayoutError::InvalidReference).attach("null string"));
    };
    let Some(characters) = string.characters() else {
        tracing::warn!(string = ?string.as_ptr(), "string has no character array");
        return Err(report!(LayoutError::InvalidReference)
            .attach(format!("string {:p} has no character array", string.as_ptr())));
    };
    Ok(characters)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;
    use core::ptr;

    use objlayout_internals::InterfaceNode;

    use super::*;

    #[test]
    fn test_null_inputs() {
        // SAFETY: Null pointers are accepted by every function.
        let report = unsafe { dispatch_vector(ptr::null()) }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidReference);

        // SAFETY: See above.
        let report = unsafe { implements_interface(ptr::null(), c"I") }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidArgument);

        // SAFETY: See above.
        let report = unsafe { array_length(ptr::null()) }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidReference);

        // SAFETY: See above.
        let report = unsafe { array_data(ptr::null()) }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidReference);

        // SAFETY: See above.
        let report = unsafe { string_characters(ptr::null()) }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidReference);
    }

    #[test]
    fn test_header_without_dispatch_vector() {
        // SAFETY: A null dispatch vector is allowed and never read.
        let header = unsafe { ObjectHeader::new(ptr::null()) };
        // SAFETY: `header` outlives the call.
        let report = unsafe { dispatch_vector(&header) }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::InvalidReference);
    }

    #[test]
    fn test_negative_length() {
        let dv = DispatchVector::empty();
        // SAFETY: The length is negative, so `data` is never read.
        let header = unsafe { ArrayHeader::new(&dv, -1, ptr::null_mut()) };
        // SAFETY: `header` outlives the call.
        let report = unsafe { array_length(&header) }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::MalformedMetadata);
    }

    #[test]
    fn test_walk_bound_reports_cycles() {
        let mut nodes: Vec<InterfaceNode> = Vec::with_capacity(2);
        let first = nodes.as_mut_ptr();
        let second = first.wrapping_add(1);
        // SAFETY: Both slots are written below, before any read, and the names
        // are static. The nodes form a cycle, which the bounded walk has to
        // survive.
        let a = unsafe { InterfaceNode::new(second, c"A".as_ptr()) };
        // SAFETY: See above.
        let b = unsafe { InterfaceNode::new(first, c"B".as_ptr()) };
        // SAFETY: `first` is within the reserved capacity.
        unsafe { first.write(a) };
        // SAFETY: `second` is within the reserved capacity.
        unsafe { second.write(b) };
        // SAFETY: The nodes stay alive and unmodified until the end of the
        // test.
        let dv = unsafe { DispatchVector::new(first, ptr::null()) };

        // SAFETY: `dv` and its nodes outlive the call.
        let found = unsafe { implements_interface(&dv, c"B") }.unwrap();
        assert!(found);

        // SAFETY: See above.
        let report = unsafe { implements_interface(&dv, c"C") }.unwrap_err();
        assert_eq!(*report.current_context(), LayoutError::MalformedMetadata);
    }

    #[test]
    fn test_empty_list() {
        let dv = DispatchVector::empty();
        assert!(interface_list(RawDispatchVectorRef::new(&dv)).is_none());
        // SAFETY: `dv` outlives the call.
        assert!(!unsafe { implements_interface(&dv, c"Comparable") }.unwrap());
    }
}
