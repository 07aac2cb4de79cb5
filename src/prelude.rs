//! Commonly used items for convenient importing.
//!
//! ```rust
//! use objlayout::prelude::*;
//!
//! let table = ClassTable::with_builtins()?;
//! let numbers = table.class_by_name(c"[I").unwrap();
//! let array = Array::<jint>::new(numbers, vec![1, 2, 3])?;
//! assert_eq!(array.raw().length(), 3);
//! # Ok::<(), Report<LayoutError>>(())
//! ```

pub use rootcause::Report;

pub use crate::{
    ClassDefinition, ClassTable, LayoutError, LayoutResult,
    config::{LayoutConfig, StringEncoding},
    instance::{Array, ArrayElement, Instance, JavaString, Object},
    primitive::*,
    type_info::{ElementType, TypeKind},
};
