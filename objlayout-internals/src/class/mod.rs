//! Module containing the owned allocation that holds one class's metadata

mod data;
mod raw;
mod vtable;

pub use self::raw::{RawClass, RawClassRef};
