#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    clippy::missing_docs_in_private_items,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The native object model of a Java-like runtime.
//!
//! ## Overview
//!
//! Compiled code and the runtime agree on how instances and class metadata
//! are laid out in memory. Every instance starts with an [`ObjectHeader`]
//! holding a pointer to its class's [`DispatchVector`]. Arrays and strings
//! extend that header with their own fields, and because the common header
//! is always at offset zero, code that only knows it has "some instance" can
//! still find the dispatch vector. The dispatch vector in turn points to a
//! singly-linked list of [`InterfaceNode`]s naming the interfaces the class
//! implements.
//!
//! All of these records are `#[repr(C)]` and can be handed to C code as-is.
//!
//! ## Quick Example
//!
//! ```
//! use objlayout::{
//!     ClassDefinition, ClassTable,
//!     instance::{Instance, Object},
//! };
//!
//! let table = ClassTable::new();
//! let dog = table.load(ClassDefinition::object("Dog").implements("Animal"))?;
//! let dog = Object::new(table.class(dog).unwrap())?;
//!
//! // SAFETY: `dog` is a live instance.
//! let dispatch_vector = unsafe { objlayout::access::dispatch_vector(dog.header_ptr()) }?;
//! assert!(dispatch_vector.implements_interface(c"Animal"));
//! # Ok::<(), rootcause::Report<objlayout::LayoutError>>(())
//! ```
//!
//! ## Layers
//!
//! - The records themselves and the lifetime-bound `Raw*Ref` views over them
//!   live in the [`objlayout-internals`] crate and are re-exported here.
//! - [`access`] performs the contract's reads on raw pointers, reporting null
//!   references, negative lengths and runaway interface lists as
//!   [`LayoutError`]s.
//! - [`ClassTable`] owns class metadata, and [`instance`] allocates instances
//!   that borrow it.
//! - [`strings`] converts string instances to and from Rust strings.
//! - [`ffi`] exposes the reads to C.
//! - [`config`] holds the process-wide settings.
//!
//! [`objlayout-internals`]: objlayout_internals
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` when a class is loaded,
//! `trace` for interface lookups, `warn` when malformed metadata is found,
//! and `error` when a C entry point swallows a report.
//!
//! ## Features
//!
//! - `std`: Use `std::sync::RwLock` for the global configuration and enable
//!   `LayoutConfig::from_env`.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod access;
pub mod class_table;
pub mod config;
mod error;
pub mod ffi;
pub mod instance;
mod lock;
pub mod prelude;
pub mod strings;
pub mod type_info;

pub use objlayout_internals::{
    ArrayHeader, DispatchVector, InterfaceNode, Interfaces, ObjectHeader, RawArrayRef,
    RawDispatchVectorRef, RawInterfaceNodeRef, RawObjectRef, RawStringRef, StringHeader,
    primitive,
};

pub use self::{
    class_table::{ClassDefinition, ClassId, ClassRef, ClassTable},
    error::{LayoutError, LayoutResult},
};
