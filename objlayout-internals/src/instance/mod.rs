//! Module containing the instance headers: the common object header and its
//! array and string extensions.

mod data;
mod raw;

pub use self::{
    data::{ArrayHeader, ObjectHeader, StringHeader},
    raw::{RawArrayRef, RawObjectRef, RawStringRef},
};
