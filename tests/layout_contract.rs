//! Integration tests for the object layout contract.
//!
//! Instances are allocated through a [`ClassTable`] and then read back the way
//! compiled code would, through the raw-pointer functions of
//! [`objlayout::access`] and the C entry points of [`objlayout::ffi`].
//!
//! ## Interfaces
//! - `test_animal_scenario`: `Animal` implements `Named` and `Comparable`
//! - `test_order_independence`: every declared interface is found wherever it
//!   sits in the list
//! - `test_zero_interfaces`: a class without interfaces implements nothing
//!
//! ## Instances
//! - `test_instances_share_dispatch_vector`: two objects of one class read the
//!   identical dispatch vector, which maps back to the class
//! - `test_arrays`: lengths are never negative and data covers the elements
//! - `test_empty_array`: length 0, no element access
//! - `test_string_characters`: characters are present and have the string's
//!   length
//!
//! ## Boundaries
//! - `test_ffi_round_trip`: the C entry points agree with the Rust API
//! - `test_concurrent_readers`: unsynchronized readers on several threads

use std::{ffi::CString, thread};

use objlayout::{
    ClassDefinition, ClassTable, access, ffi,
    instance::{Array, Instance, JavaString, Object},
    primitive::{jchar, jdouble, jint},
    strings::StringEncoding,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_animal_scenario() {
    init_logging();
    let table = ClassTable::new();
    let animal = table
        .load(
            ClassDefinition::object("Animal")
                .implements("Named")
                .implements("Comparable"),
        )
        .unwrap();
    let animal = Object::new(table.class(animal).unwrap()).unwrap();

    // SAFETY: `animal` is live for the whole test.
    let dv = unsafe { access::dispatch_vector(animal.header_ptr()) }.unwrap();
    // SAFETY: The dispatch vector belongs to `table`, which outlives the calls.
    assert!(unsafe { access::implements_interface(dv.as_ptr(), c"Named") }.unwrap());
    // SAFETY: See above.
    assert!(!unsafe { access::implements_interface(dv.as_ptr(), c"Flying") }.unwrap());

    let head = access::interface_list(dv).unwrap();
    assert_eq!(head.interface_name(), c"Named");
    assert_eq!(head.next().unwrap().interface_name(), c"Comparable");
    assert!(head.next().unwrap().next().is_none());
}

#[test]
fn test_order_independence() {
    let names = ["A", "B", "C", "D", "E"];
    let table = ClassTable::new();

    for rotation in 0..names.len() {
        let mut rotated = names;
        rotated.rotate_left(rotation);
        let definition = rotated.iter().fold(
            ClassDefinition::object(format!("Rotated{rotation}")),
            |definition, name| definition.implements(*name),
        );
        let class = table.class(table.load(definition).unwrap()).unwrap();

        for name in names {
            let name = CString::new(name).unwrap();
            // SAFETY: The dispatch vector belongs to `table`.
            let found =
                unsafe { access::implements_interface(class.dispatch_vector().as_ptr(), &name) };
            assert!(found.unwrap(), "{name:?} missing in rotation {rotation}");
        }
    }
}

#[test]
fn test_zero_interfaces() {
    let table = ClassTable::with_builtins().unwrap();
    let object = table.class_by_name(c"java.lang.Object").unwrap();
    let dv = object.dispatch_vector();

    assert!(access::interface_list(dv).is_none());
    for name in [c"", c"java.lang.Cloneable", c"Anything"] {
        // SAFETY: The dispatch vector belongs to `table`.
        assert!(!unsafe { access::implements_interface(dv.as_ptr(), name) }.unwrap());
    }
}

#[test]
fn test_instances_share_dispatch_vector() {
    let table = ClassTable::new();
    let dog = table.load(ClassDefinition::object("Dog")).unwrap();
    let dog = table.class(dog).unwrap();
    let first = Object::new(dog).unwrap();
    let second = Object::new(dog).unwrap();

    assert_ne!(first.header_ptr(), second.header_ptr());
    // SAFETY: Both objects are live for the whole test.
    let a = unsafe { access::dispatch_vector(first.header_ptr()) }.unwrap();
    // SAFETY: See above.
    let b = unsafe { access::dispatch_vector(second.header_ptr()) }.unwrap();
    assert!(a.ptr_eq(b));
    assert!(a.ptr_eq(dog.dispatch_vector()));

    let class = table.class_of_dispatch_vector(a.as_ptr()).unwrap();
    assert_eq!(class.id(), dog.id());
    assert_eq!(class.name(), c"Dog");
}

#[test]
fn test_arrays() {
    let table = ClassTable::with_builtins().unwrap();
    let doubles = table.class_by_name(c"[D").unwrap();
    let array = Array::<jdouble>::new(doubles, vec![0.5, 1.5, 2.5, 3.5]).unwrap();

    // SAFETY: `array` is live for the whole test.
    let length = unsafe { access::array_length(array.array_header_ptr()) }.unwrap();
    assert_eq!(length, 4);
    // SAFETY: See above.
    let data = unsafe { access::array_data(array.array_header_ptr()) }.unwrap();
    // SAFETY: `data` points to `length` doubles owned by `array`.
    let elements = unsafe { std::slice::from_raw_parts(data.cast::<jdouble>(), 4) };
    assert_eq!(elements, &[0.5, 1.5, 2.5, 3.5]);

    // The array header is also a plain object header.
    // SAFETY: See above.
    let dv = unsafe { access::dispatch_vector(array.header_ptr()) }.unwrap();
    assert!(dv.ptr_eq(doubles.dispatch_vector()));
}

#[test]
fn test_empty_array() {
    let table = ClassTable::with_builtins().unwrap();
    let ints = table.class_by_name(c"[I").unwrap();
    let array = Array::<jint>::new(ints, Vec::new()).unwrap();

    // SAFETY: `array` is live for the whole test.
    assert_eq!(unsafe { access::array_length(array.array_header_ptr()) }.unwrap(), 0);
    // SAFETY: The length is zero, so no element is read.
    assert!(unsafe { array.raw().as_slice::<jint>() }.is_empty());
}

#[test]
fn test_string_characters() {
    let table = ClassTable::with_builtins().unwrap();
    let string_class = table.class_by_name(c"java.lang.String").unwrap();
    let chars = table.class_by_name(c"[C").unwrap();
    let text = "naïve 🦀";
    let string = JavaString::new(string_class, chars, text, StringEncoding::Utf16).unwrap();

    // SAFETY: `string` is live for the whole test.
    let characters = unsafe { access::string_characters(string.string_header_ptr()) }.unwrap();
    let declared = text.encode_utf16().count();
    // SAFETY: See above.
    let length = unsafe { access::array_length(characters.as_ptr()) }.unwrap();
    assert_eq!(usize::try_from(length).unwrap(), declared);

    // SAFETY: The characters of a UTF-16 string are `jchar`s.
    let units = unsafe { characters.as_slice::<jchar>() };
    assert_eq!(String::from_utf16(units).unwrap(), text);
    assert!(string.implements_interface(c"java.lang.CharSequence"));
}

#[test]
fn test_ffi_round_trip() {
    init_logging();
    let table = ClassTable::with_builtins().unwrap();
    let ints = table.class_by_name(c"[I").unwrap();
    let array = Array::<jint>::new(ints, vec![4, 5]).unwrap();

    // SAFETY: `array` is live for the whole test.
    let dv = unsafe { ffi::objlayout_dispatch_vector(array.header_ptr()) };
    assert_eq!(dv, ints.dispatch_vector().as_ptr());
    // SAFETY: `dv` belongs to `table`; the name is a static C string.
    assert!(unsafe { ffi::objlayout_implements_interface(dv, c"java.io.Serializable".as_ptr()) });
    // SAFETY: See above.
    assert!(!unsafe { ffi::objlayout_implements_interface(dv, c"java.util.List".as_ptr()) });
    // SAFETY: `array` is live for the whole test.
    assert_eq!(unsafe { ffi::objlayout_array_length(array.array_header_ptr()) }, 2);
    // SAFETY: See above.
    let data = unsafe { ffi::objlayout_array_data(array.array_header_ptr()) };
    assert_eq!(data, array.as_slice().as_ptr().cast::<u8>());

    let string = JavaString::in_table(&table, "ok").unwrap();
    // SAFETY: `string` is live for the whole test.
    let characters = unsafe { ffi::objlayout_string_characters(string.string_header_ptr()) };
    assert_eq!(characters, string.characters().as_ptr());
}

#[test]
fn test_concurrent_readers() {
    let table = ClassTable::new();
    let id = table
        .load(
            ClassDefinition::object("Shared")
                .implements("Runnable")
                .implements("AutoCloseable"),
        )
        .unwrap();
    let shared = Object::new(table.class(id).unwrap()).unwrap();
    let expected = shared.dispatch_vector().as_ptr().addr();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let mut seen = Vec::new();
                    for _ in 0..1000 {
                        // SAFETY: `shared` outlives the scope and is never
                        // mutated.
                        let dv = unsafe { access::dispatch_vector(shared.header_ptr()) }.unwrap();
                        assert!(dv.implements_interface(c"AutoCloseable"));
                        assert!(!dv.implements_interface(c"Iterable"));
                        seen.push(dv.as_ptr().addr());
                    }
                    seen
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().unwrap();
            assert!(seen.iter().all(|&address| address == expected));
        }
    });

    // Loading more classes while instances exist leaves their metadata alone.
    let other = table.clone();
    thread::scope(|scope| {
        for index in 0..4 {
            let other = &other;
            scope.spawn(move || {
                other
                    .load(ClassDefinition::object(format!("Loaded{index}")))
                    .unwrap();
            });
        }
    });
    assert_eq!(table.len(), 5);
    assert!(shared.implements_interface(c"Runnable"));
}
