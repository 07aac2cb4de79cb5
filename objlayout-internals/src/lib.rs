#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`objlayout`].
//!
//! # Overview
//!
//! This crate contains the `#[repr(C)]` records that make up the object model
//! of a Java-like runtime, the unsafe constructors that establish their
//! invariants, and the lifetime-bound reference types that read them.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`objlayout`] crate,
//! not this one.
//!
//! # Architecture
//!
//! The crate is organized around three groups of types:
//!
//! - **[`metadata`]**: Class-level records, shared by every instance
//!   - [`DispatchVector`]: Per-class block with the interface list and type
//!     information
//!   - [`InterfaceNode`]: One entry of the singly linked interface list
//!   - [`RawDispatchVectorRef`]/[`RawInterfaceNodeRef`]: Borrowed readers
//!
//! - **[`instance`]**: Instance headers
//!   - [`ObjectHeader`]: The common prefix of every instance
//!   - [`ArrayHeader`]/[`StringHeader`]: Extensions embedding the object
//!     header as their first field
//!   - [`RawObjectRef`]/[`RawArrayRef`]/[`RawStringRef`]: Borrowed readers
//!
//! - **[`class`]**: Owned class allocations
//!   - [`RawClass`]: One allocation holding a dispatch vector, its interface
//!     nodes and type-erased type information
//!   - [`ClassData`]: `#[repr(C)]` wrapper enabling field access on erased
//!     types
//!   - [`ClassVtable`]: Function pointers recording the erased type
//!
//! # Safety Strategy
//!
//! The records hold raw pointers because foreign code reads and writes the
//! same memory. Rust code can only read them through the `Raw*Ref` types,
//! which exist only if the pointers they are built from upheld the contract
//! of the matching unsafe constructor.
//!
//! This crate maintains safety through:
//!
//! - **Module-based encapsulation**: Record fields are private to the module
//!   that reads them, making invariants locally verifiable within a single
//!   file
//! - **`#[repr(C)]` layout**: Fixes field order and offsets to the C ABI and
//!   makes prefix casts between headers sound
//! - **Documented constructor contracts**: Every unsafe constructor states
//!   exactly what a reader may assume
//!
//! [`objlayout`]: https://docs.rs/objlayout/latest/objlayout/
//! [`ClassData`]: class::data::ClassData
//! [`ClassVtable`]: class::vtable::ClassVtable

extern crate alloc;

mod class;
pub mod instance;
pub mod metadata;
pub mod primitive;
mod util;

pub use class::{RawClass, RawClassRef};
pub use instance::{
    ArrayHeader, ObjectHeader, RawArrayRef, RawObjectRef, RawStringRef, StringHeader,
};
pub use metadata::{
    DispatchVector, InterfaceNode, Interfaces, RawDispatchVectorRef, RawInterfaceNodeRef,
};
