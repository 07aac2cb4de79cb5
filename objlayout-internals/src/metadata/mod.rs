//! Module containing the class-level metadata records: the dispatch vector
//! and the interface list it points to.

mod data;
mod raw;

pub use self::{
    data::{DispatchVector, InterfaceNode},
    raw::{Interfaces, RawDispatchVectorRef, RawInterfaceNodeRef},
};
