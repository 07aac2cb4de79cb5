//! The error type shared by every fallible operation of the crate.

use rootcause::Report;

/// What went wrong when reading or building the object model.
///
/// Errors are always wrapped in a [`Report`], which carries the details
/// (offending name, pointer or length) as attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::Error)]
pub enum LayoutError {
    /// An operation received a null or non-conforming reference where a
    /// valid one was required.
    #[display("invalid reference")]
    InvalidReference,
    /// An argument other than an instance reference was absent or malformed.
    #[display("invalid argument")]
    InvalidArgument,
    /// Class metadata violates an integrity precondition: a cyclic or
    /// over-long interface list, a repeated interface, or a negative array
    /// length.
    #[display("malformed class metadata")]
    MalformedMetadata,
    /// A class with the same name has already been loaded.
    #[display("class is already loaded")]
    DuplicateClass,
    /// An instance's class does not have the kind or element type required by
    /// the operation.
    #[display("element type mismatch")]
    ElementTypeMismatch,
    /// String data cannot be represented in, or decoded from, the configured
    /// encoding.
    #[display("invalid string encoding")]
    InvalidEncoding,
}

/// Result type of the fallible operations of this crate.
pub type LayoutResult<T> = Result<T, Report<LayoutError>>;
