//! Conversion between Rust strings and the character arrays of string
//! instances.

use alloc::{format, string::String, vec::Vec};

use objlayout_internals::{
    RawArrayRef, RawStringRef,
    primitive::{jbyte, jchar},
};
use rootcause::report;

use crate::{LayoutError, LayoutResult, config::LayoutConfig};

pub use crate::config::StringEncoding;

/// Character data encoded for a string's character array.
pub(crate) enum Encoded {
    /// UTF-16 code units for a `char[]`.
    Utf16(Vec<jchar>),
    /// Latin-1 or UTF-8 bytes for a `byte[]`.
    Bytes(Vec<jbyte>),
}

/// Encodes `text` for storage in a character array.
///
/// Fails with [`LayoutError::InvalidEncoding`] if `text` contains a character
/// the encoding cannot represent.
pub(crate) fn encode(text: &str, encoding: StringEncoding) -> LayoutResult<Encoded> {
    match encoding {
        StringEncoding::Utf16 => Ok(Encoded::Utf16(text.encode_utf16().collect())),
        StringEncoding::Utf8 => Ok(Encoded::Bytes(
            text.bytes().map(|byte| jbyte::from_ne_bytes([byte])).collect(),
        )),
        StringEncoding::Latin1 => text
            .chars()
            .map(|character| match u8::try_from(character) {
                Ok(byte) => Ok(jbyte::from_ne_bytes([byte])),
                Err(_) => Err(report!(LayoutError::InvalidEncoding)
                    .attach(format!("{character:?} is outside Latin-1"))),
            })
            .collect::<LayoutResult<Vec<_>>>()
            .map(Encoded::Bytes),
    }
}

/// Decodes the character array of `string`.
///
/// # Errors
///
/// - [`LayoutError::InvalidReference`] if the string has no character array.
/// - [`LayoutError::MalformedMetadata`] if the array stores a negative length.
/// - [`LayoutError::InvalidEncoding`] if the characters are not valid in
///   `encoding`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The elements of the character array have the type implied by
///    `encoding`, i.e. [`jchar`] for [`StringEncoding::Utf16`] and [`jbyte`]
///    otherwise.
pub unsafe fn decode(string: RawStringRef<'_>, encoding: StringEncoding) -> LayoutResult<String> {
    let Some(characters) = string.characters() else {
        return Err(report!(LayoutError::InvalidReference)
            .attach(format!("string {:p} has no character array", string.as_ptr())));
    };
    // SAFETY: Guaranteed by the caller.
    unsafe { decode_array(characters, encoding) }
}

/// Decodes the character array of `string` with the encoding of the
/// installed [`LayoutConfig`].
///
/// # Errors
///
/// See [`decode`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The elements of the character array have the type implied by the
///    configured encoding.
pub unsafe fn decode_with_config(string: RawStringRef<'_>) -> LayoutResult<String> {
    let encoding = LayoutConfig::current().string_encoding();
    // SAFETY: Guaranteed by the caller.
    unsafe { decode(string, encoding) }
}

/// # Safety
///
/// Same as [`decode`], for the character array itself.
pub(crate) unsafe fn decode_array(
    characters: RawArrayRef<'_>,
    encoding: StringEncoding,
) -> LayoutResult<String> {
    if characters.length() < 0 {
        tracing::warn!(length = characters.length(), "negative character array length");
        return Err(report!(LayoutError::MalformedMetadata)
            .attach(format!("character array length {}", characters.length())));
    }

    match encoding {
        StringEncoding::Utf16 => {
            // SAFETY: The elements are `jchar`, guaranteed by the caller.
            let units = unsafe { characters.as_slice::<jchar>() };
            char::decode_utf16(units.iter().copied())
                .collect::<Result<String, _>>()
                .map_err(|error| {
                    report!(LayoutError::InvalidEncoding).attach(format!(
                        "unpaired surrogate {:#06x}",
                        error.unpaired_surrogate()
                    ))
                })
        }
        StringEncoding::Latin1 => {
            // SAFETY: The elements are `jbyte`, guaranteed by the caller, and
            // `u8` has the same layout with every bit pattern valid.
            let bytes = unsafe { characters.as_slice::<u8>() };
            Ok(bytes.iter().copied().map(char::from).collect())
        }
        StringEncoding::Utf8 => {
            // SAFETY: Same as for Latin-1.
            let bytes = unsafe { characters.as_slice::<u8>() };
            core::str::from_utf8(bytes).map(String::from).map_err(|error| {
                report!(LayoutError::InvalidEncoding)
                    .attach(format!("invalid UTF-8 after {} bytes", error.valid_up_to()))
            })
        }
    }
}
