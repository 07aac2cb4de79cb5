//! C entry points for compiled code.
//!
//! Reports cannot cross the C boundary. Each function logs the report at
//! error level and returns a sentinel instead: a null pointer, `false`, or
//! `-1` for lengths.

use core::ffi::{CStr, c_char};

use objlayout_internals::{
    ArrayHeader, DispatchVector, ObjectHeader, StringHeader, primitive::jint,
};
use rootcause::report;

use crate::{LayoutError, LayoutResult, access};

/// Unwraps `result`, logging the report and returning `sentinel` on error.
fn or_sentinel<T>(function: &'static str, result: LayoutResult<T>, sentinel: T) -> T {
    result.unwrap_or_else(|report| {
        tracing::error!(function, %report, "object layout violation");
        sentinel
    })
}

/// Returns the dispatch vector of `instance`, or null.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `instance` points to a live instance header that is not
///    mutated during the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objlayout_dispatch_vector(
    instance: *const ObjectHeader,
) -> *const DispatchVector {
    // SAFETY: Guaranteed by the caller.
    let result = unsafe { access::dispatch_vector(instance) };
    or_sentinel(
        "objlayout_dispatch_vector",
        result.map(|dispatch_vector| dispatch_vector.as_ptr()),
        core::ptr::null(),
    )
}

/// Returns whether the class described by `dispatch_vector` implements the
/// interface named `name`, or `false` on error.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `dispatch_vector` points to a live dispatch vector whose
///    interface list is not mutated during the call.
/// 2. A non-null `name` points to a NUL-terminated string that is valid for
///    the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objlayout_implements_interface(
    dispatch_vector: *const DispatchVector,
    name: *const c_char,
) -> bool {
    let result = if name.is_null() {
        Err(report!(LayoutError::InvalidArgument).attach("null interface name"))
    } else {
        // SAFETY: Requirement 2, and `name` is not null.
        let name = unsafe { CStr::from_ptr(name) };
        // SAFETY: Requirement 1.
        unsafe { access::implements_interface(dispatch_vector, name) }
    };
    or_sentinel("objlayout_implements_interface", result, false)
}

/// Returns the length of `array`, or `-1`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `array` points to a live array header.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objlayout_array_length(array: *const ArrayHeader) -> jint {
    // SAFETY: Guaranteed by the caller.
    let result = unsafe { access::array_length(array) };
    or_sentinel("objlayout_array_length", result, -1)
}

/// Returns the address of the first element of `array`, or null.
///
/// # Safety
///
/// See [`objlayout_array_length`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objlayout_array_data(array: *const ArrayHeader) -> *const u8 {
    // SAFETY: Guaranteed by the caller.
    let result = unsafe { access::array_data(array) };
    or_sentinel("objlayout_array_data", result, core::ptr::null())
}

/// Returns the character array of `string`, or null.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. A non-null `string` points to a live string header.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn objlayout_string_characters(
    string: *const StringHeader,
) -> *const ArrayHeader {
    // SAFETY: Guaranteed by the caller.
    let result = unsafe { access::string_characters(string) };
    or_sentinel(
        "objlayout_string_characters",
        result.map(|characters| characters.as_ptr()),
        core::ptr::null(),
    )
}
