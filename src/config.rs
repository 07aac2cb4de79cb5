//! Global configuration of the object model.
//!
//! # Quick Start
//!
//! ```rust
//! use objlayout::config::{LayoutConfig, StringEncoding};
//!
//! LayoutConfig::new()
//!     .with_string_encoding(StringEncoding::Latin1)
//!     .with_max_interface_chain(256)
//!     .install()
//!     .expect("failed to install configuration");
//!
//! assert_eq!(LayoutConfig::current().string_encoding(), StringEncoding::Latin1);
//! ```
//!
//! Without an installed configuration, [`LayoutConfig::current`] returns the
//! defaults.
//!
//! # Environment Variables
//!
//! With the `std` feature, [`LayoutConfig::from_env`] reads `OBJLAYOUT` as a
//! comma-separated list of options:
//! - `utf16`, `latin1`, `utf8` - The encoding of string character arrays
//! - `max-interfaces=<n>` - The walk bound for interface lists

use crate::{lock::RwLock, type_info::ElementType};

/// The installed configuration, if any.
static CONFIG: RwLock<Option<LayoutConfig>> = RwLock::new(None);

/// How the character array of a string is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
pub enum StringEncoding {
    /// UTF-16 code units in a `char[]`, as the JVM stores them.
    #[default]
    #[display("utf16")]
    Utf16,
    /// One byte per character in a `byte[]`, covering U+0000 to U+00FF.
    #[display("latin1")]
    Latin1,
    /// UTF-8 bytes in a `byte[]`.
    #[display("utf8")]
    Utf8,
}

impl StringEncoding {
    /// The element type of the character array used by this encoding.
    pub const fn element_type(self) -> ElementType {
        match self {
            StringEncoding::Utf16 => ElementType::Char,
            StringEncoding::Latin1 | StringEncoding::Utf8 => ElementType::Byte,
        }
    }
}

/// Configuration of the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// The encoding of string character arrays.
    string_encoding: StringEncoding,
    /// The interface walk bound.
    max_interface_chain: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned when attempting to install a configuration when one is
/// already installed.
///
/// Contains the configuration that was attempted to be installed.
#[derive(Clone, Copy)]
pub struct ConfigAlreadyInstalledError(pub LayoutConfig);

impl core::fmt::Debug for ConfigAlreadyInstalledError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigAlreadyInstalledError").finish()
    }
}

impl core::fmt::Display for ConfigAlreadyInstalledError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "a layout configuration is already installed")
    }
}

impl core::error::Error for ConfigAlreadyInstalledError {}

impl LayoutConfig {
    /// Default walk bound: the largest interface count a class file can
    /// declare.
    pub const DEFAULT_MAX_INTERFACE_CHAIN: usize = u16::MAX as usize;

    /// Creates a configuration with the default settings.
    pub const fn new() -> Self {
        Self {
            string_encoding: StringEncoding::Utf16,
            max_interface_chain: Self::DEFAULT_MAX_INTERFACE_CHAIN,
        }
    }

    /// Sets the encoding of string character arrays.
    #[must_use]
    pub const fn with_string_encoding(mut self, string_encoding: StringEncoding) -> Self {
        self.string_encoding = string_encoding;
        self
    }

    /// Sets the largest number of interface nodes followed when walking a
    /// list of unknown origin, and the largest number of interfaces a class
    /// table accepts for one class.
    ///
    /// The bound is read on every raw-pointer lookup, not when a class is
    /// loaded. Lowering it below the interface count of a class that is
    /// already loaded makes [`access::implements_interface`] report
    /// [`LayoutError::MalformedMetadata`] for that class, while
    /// [`ClassRef::implements_interface`] keeps answering from the
    /// table-built list.
    ///
    /// [`access::implements_interface`]: crate::access::implements_interface
    /// [`LayoutError::MalformedMetadata`]: crate::LayoutError::MalformedMetadata
    /// [`ClassRef::implements_interface`]: crate::ClassRef::implements_interface
    #[must_use]
    pub const fn with_max_interface_chain(mut self, max_interface_chain: usize) -> Self {
        self.max_interface_chain = max_interface_chain;
        self
    }

    /// The encoding of string character arrays.
    pub const fn string_encoding(&self) -> StringEncoding {
        self.string_encoding
    }

    /// The interface walk bound.
    pub const fn max_interface_chain(&self) -> usize {
        self.max_interface_chain
    }

    /// Builds a configuration from a comma-separated option list.
    ///
    /// Unknown options are logged and ignored.
    pub fn parse_options(options: &str) -> Self {
        let mut config = Self::new();
        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            if option.eq_ignore_ascii_case("utf16") {
                config.string_encoding = StringEncoding::Utf16;
            } else if option.eq_ignore_ascii_case("latin1") {
                config.string_encoding = StringEncoding::Latin1;
            } else if option.eq_ignore_ascii_case("utf8") {
                config.string_encoding = StringEncoding::Utf8;
            } else if let Some(value) = option.strip_prefix("max-interfaces=") {
                match value.parse() {
                    Ok(limit) => config.max_interface_chain = limit,
                    Err(_) => tracing::warn!(option, "ignoring invalid interface bound"),
                }
            } else {
                tracing::warn!(option, "ignoring unknown layout option");
            }
        }
        config
    }

    /// Builds a configuration from the `OBJLAYOUT` environment variable.
    #[cfg(feature = "std")]
    pub fn from_env() -> Self {
        match std::env::var_os("OBJLAYOUT") {
            Some(var) => Self::parse_options(&var.to_string_lossy()),
            None => Self::new(),
        }
    }

    /// Installs this configuration globally.
    ///
    /// # Errors
    ///
    /// Returns the configuration back if one is already installed. Use
    /// [`replace`](Self::replace) to overwrite it.
    pub fn install(self) -> Result<(), ConfigAlreadyInstalledError> {
        let mut slot = CONFIG.write();
        if slot.is_some() {
            return Err(ConfigAlreadyInstalledError(self));
        }
        tracing::debug!(config = ?self, "installing layout configuration");
        *slot = Some(self);
        Ok(())
    }

    /// Replaces the installed configuration with `self`.
    ///
    /// Returns the previously installed configuration, if any.
    pub fn replace(self) -> Option<LayoutConfig> {
        tracing::debug!(config = ?self, "replacing layout configuration");
        CONFIG.write().replace(self)
    }

    /// Returns the installed configuration, or the defaults if none is
    /// installed.
    pub fn current() -> LayoutConfig {
        (*CONFIG.read()).unwrap_or_default()
    }
}
