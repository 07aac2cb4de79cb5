//! Integration tests for the objlayout-internals crate.
//!
//! These tests build class allocations with [`RawClass`], put instance headers
//! on top of them the way an allocator would, and read everything back through
//! the `Raw*Ref` types only.
//!
//! ## Metadata
//! - `test_animal_scenario`: interface lookup on a class with two interfaces
//! - `test_order_independence`: every declared interface is found wherever it
//!   sits in the list
//! - `test_zero_interfaces`: the empty list answers `false` for any name
//!
//! ## Instances
//! - `test_instances_share_dispatch_vector`: two headers of one class read the
//!   identical dispatch vector
//! - `test_array_and_string_headers`: array length/data and string characters
//!   through the common prefix
//!
//! ## Concurrency
//! - `test_concurrent_readers`: unsynchronized readers on several threads

use std::ffi::{CStr, CString};

use objlayout_internals::{
    ArrayHeader, ObjectHeader, RawArrayRef, RawClass, RawObjectRef, RawStringRef, StringHeader,
    primitive::{jchar, jint},
};

fn class_with(interfaces: &[&str]) -> RawClass {
    let names = interfaces
        .iter()
        .map(|name| CString::new(*name).unwrap())
        .collect();
    RawClass::new(names, ())
}

#[test]
fn test_animal_scenario() {
    let animal = class_with(&["Named", "Comparable"]);
    let dv = animal.as_ref().dispatch_vector();

    assert!(dv.implements_interface(c"Named"));
    assert!(dv.implements_interface(c"Comparable"));
    assert!(!dv.implements_interface(c"Flying"));
    // Comparison is by content, not by pointer.
    let owned = CString::new("Named").unwrap();
    assert!(dv.implements_interface(&owned));
}

#[test]
fn test_order_independence() {
    let declared = [
        "Serializable",
        "Cloneable",
        "Comparable",
        "Iterable",
        "Named",
    ];
    for rotation in 0..declared.len() {
        let mut order = declared.to_vec();
        order.rotate_left(rotation);
        let class = class_with(&order);
        let dv = class.as_ref().dispatch_vector();
        for name in declared {
            let name = CString::new(name).unwrap();
            assert!(
                dv.implements_interface(&name),
                "{name:?} at rotation {rotation}"
            );
        }
        assert!(!dv.implements_interface(c"Runnable"));
    }
}

#[test]
fn test_zero_interfaces() {
    let class = class_with(&[]);
    let dv = class.as_ref().dispatch_vector();
    assert!(dv.interface_list().is_none());
    for name in [c"Named", c"", c"java.lang.Object"] {
        assert!(!dv.implements_interface(name));
    }
    assert_eq!(dv.implements_interface_bounded(c"Named", 0), Some(false));
}

#[test]
fn test_instances_share_dispatch_vector() {
    let class = class_with(&["Named"]);
    let dv = class.as_ref().dispatch_vector();

    // SAFETY: `class` outlives both headers.
    let first = unsafe { ObjectHeader::new(dv.as_ptr()) };
    // SAFETY: `class` outlives both headers.
    let second = unsafe { ObjectHeader::new(dv.as_ptr()) };

    let first_dv = RawObjectRef::new(&first).dispatch_vector().unwrap();
    let second_dv = RawObjectRef::new(&second).dispatch_vector().unwrap();
    assert!(first_dv.ptr_eq(second_dv));
    assert!(first_dv.ptr_eq(dv));
}

#[test]
fn test_array_and_string_headers() {
    let int_array = class_with(&["Cloneable"]);
    let char_array = class_with(&[]);
    let string = class_with(&["CharSequence"]);

    let mut values: Vec<jint> = vec![3, 1, 4, 1, 5];
    let values_ptr = values.as_mut_ptr().cast::<u8>();
    let int_dv = int_array.as_ref().dispatch_vector().as_ptr();
    // SAFETY: `int_array` and `values` outlive the header.
    let array = unsafe { ArrayHeader::new(int_dv, 5, values_ptr) };
    let array_ref = RawArrayRef::new(&array);
    assert_eq!(array_ref.length(), 5);
    // SAFETY: The elements are `jint` and are not mutated.
    assert_eq!(unsafe { array_ref.as_slice::<jint>() }, &[3, 1, 4, 1, 5]);
    assert!(
        array_ref
            .object()
            .dispatch_vector()
            .unwrap()
            .implements_interface(c"Cloneable")
    );

    let mut units: Vec<jchar> = "hey".encode_utf16().collect();
    let units_ptr = units.as_mut_ptr().cast::<u8>();
    let char_dv = char_array.as_ref().dispatch_vector().as_ptr();
    // SAFETY: `char_array` and `units` outlive the header.
    let characters = unsafe { ArrayHeader::new(char_dv, 3, units_ptr) };
    let string_dv = string.as_ref().dispatch_vector().as_ptr();
    // SAFETY: `string` and `characters` outlive the header.
    let header = unsafe { StringHeader::new(string_dv, &characters) };

    let string_ref = RawStringRef::new(&header);
    let chars = string_ref.characters().unwrap();
    assert_eq!(chars.length(), 3);
    // SAFETY: The elements are `jchar` and are not mutated.
    let decoded = String::from_utf16(unsafe { chars.as_slice::<jchar>() }).unwrap();
    assert_eq!(decoded, "hey");

    let as_object = string_ref.object();
    // SAFETY: The object was derived from a string header.
    let back = unsafe { as_object.cast_string() };
    assert_eq!(back.as_ptr(), string_ref.as_ptr());
}

#[test]
fn test_concurrent_readers() {
    let class = class_with(&["Named", "Comparable", "Serializable"]);
    let dv = class.as_ref().dispatch_vector();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    let names: Vec<&CStr> = dv.interfaces().collect();
                    (
                        dv.as_ptr() as usize,
                        names.len(),
                        dv.implements_interface(c"Serializable"),
                    )
                })
            })
            .collect();

        for handle in handles {
            let (address, count, found) = handle.join().unwrap();
            assert_eq!(address, dv.as_ptr() as usize);
            assert_eq!(count, 3);
            assert!(found);
        }
    });
}
