//! Internal utility types.

/// Marker type used when type-erasing the type information stored in a
/// class allocation.
///
/// `ClassData<Erased>` represents a class whose concrete type information
/// type is unknown at the current scope. Only the fields in front of the type
/// information may be read through such a pointer.
pub(crate) struct Erased;
