//! Java primitive types as they appear in native code.
//!
//! The names follow the JNI convention so that signatures written against
//! this crate read the same as the C declarations emitted by the compiler.

#![allow(non_camel_case_types)]

/// Java `boolean`.
pub type jbool = bool;
/// Java `byte`.
pub type jbyte = i8;
/// Java `char`, a UTF-16 code unit.
pub type jchar = u16;
/// Java `short`.
pub type jshort = i16;
/// Java `int`. Also the type of an array's length field.
pub type jint = i32;
/// Java `long`.
pub type jlong = i64;
/// Java `float`.
pub type jfloat = f32;
/// Java `double`.
pub type jdouble = f64;
