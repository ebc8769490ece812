//! Flags and small value types of callable members.
//!
//! # Key Types
//! - [`ParamFlags`]: metadata and attribute derived flags of one parameter
//! - [`CallingConvention`], [`CharSet`]: the P/Invoke mapping flags of an import
//! - [`EntryPoint`]: how a call reaches its target, by symbol, ordinal or vtable slot

use std::fmt;

use bitflags::bitflags;

use crate::metadata::tables::PInvokeAttributes;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Marshaling flags of a parameter or return slot
    pub struct ParamFlags: u32 {
        /// `[In]`
        const IN = 0x0001;
        /// `[Out]`
        const OUT = 0x0002;
        /// `[Optional]`
        const OPTIONAL = 0x0010;
        /// `ReservedAttribute`, the caller must always pass zero
        const RESERVED = 0x0100;
        /// `ConstAttribute`
        const CONST = 0x0200;
        /// `MemorySizeAttribute`, a byte buffer passed as a plain pointer
        const SIZED_BUFFER = 0x0400;
        /// `RetValAttribute`, the out parameter is the logical result
        const RETVAL = 0x0800;
        /// `ComOutPtrAttribute`
        const COM_OUT_PTR = 0x1000;
        /// `DoNotReleaseAttribute`, the caller does not own the returned resource
        const DO_NOT_RELEASE = 0x2000;
    }
}

impl ParamFlags {
    /// Extract the `In`/`Out`/`Optional` bits of `Param.Flags`
    #[must_use]
    pub fn from_param_flags(flags: u16) -> Self {
        Self::from_bits_truncate(u32::from(flags)) & (Self::IN | Self::OUT | Self::OPTIONAL)
    }
}

/// Calling convention of a P/Invoke import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// Platform default, `__stdcall` on x86 and the native convention elsewhere
    #[default]
    Winapi,
    /// `__cdecl`
    Cdecl,
    /// `__stdcall`
    Stdcall,
    /// `__thiscall`, not callable from script
    Thiscall,
    /// `__fastcall`
    Fastcall,
}

impl CallingConvention {
    /// Extract the calling convention of `ImplMap.MappingFlags`. Imports without one use
    /// the platform default.
    #[must_use]
    pub fn from_import_flags(flags: u16) -> Self {
        match u32::from(flags) & PInvokeAttributes::CALL_CONV_MASK {
            PInvokeAttributes::CALL_CONV_CDECL => CallingConvention::Cdecl,
            PInvokeAttributes::CALL_CONV_STDCALL => CallingConvention::Stdcall,
            PInvokeAttributes::CALL_CONV_THISCALL => CallingConvention::Thiscall,
            PInvokeAttributes::CALL_CONV_FASTCALL => CallingConvention::Fastcall,
            _ => CallingConvention::Winapi,
        }
    }
}

/// Character set of the strings an import takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// Not specified
    #[default]
    NotSpecified,
    /// 8-bit strings
    Ansi,
    /// UTF-16 strings
    Unicode,
    /// Chosen by the platform
    Auto,
}

impl CharSet {
    /// Extract the character set of `ImplMap.MappingFlags`
    #[must_use]
    pub fn from_import_flags(flags: u16) -> Self {
        match u32::from(flags) & PInvokeAttributes::CHAR_SET_MASK {
            PInvokeAttributes::CHAR_SET_ANSI => CharSet::Ansi,
            PInvokeAttributes::CHAR_SET_UNICODE => CharSet::Unicode,
            PInvokeAttributes::CHAR_SET_AUTO => CharSet::Auto,
            _ => CharSet::NotSpecified,
        }
    }
}

/// Where a call is dispatched to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Exported symbol of a library
    Symbol {
        /// Library name, e.g. `KERNEL32.dll`
        library: String,
        /// Exported name
        name: String,
    },
    /// Export by ordinal, resolved at call time
    Ordinal {
        /// Library name
        library: String,
        /// Export ordinal
        ordinal: u32,
    },
    /// COM method, called through the interface's vtable
    Vtable(u32),
}

impl EntryPoint {
    /// Builds the entry point of an import. Names of the form `#123` are ordinals.
    #[must_use]
    pub fn import(library: &str, name: &str) -> EntryPoint {
        if let Some(ordinal) = name
            .strip_prefix('#')
            .and_then(|digits| digits.parse::<u32>().ok())
        {
            return EntryPoint::Ordinal {
                library: library.to_string(),
                ordinal,
            };
        }

        EntryPoint::Symbol {
            library: library.to_string(),
            name: name.to_string(),
        }
    }

    /// The library of an import, `None` for vtable calls.
    #[must_use]
    pub fn library(&self) -> Option<&str> {
        match self {
            EntryPoint::Symbol { library, .. } | EntryPoint::Ordinal { library, .. } => {
                Some(library)
            }
            EntryPoint::Vtable(_) => None,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Symbol { library, name } => write!(f, "{library}\\{name}"),
            EntryPoint::Ordinal { library, ordinal } => write!(f, "{library}\\#{ordinal}"),
            EntryPoint::Vtable(index) => write!(f, "vtable[{index}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_flags() {
        assert_eq!(
            CallingConvention::from_import_flags(0x0240),
            CallingConvention::Cdecl
        );
        assert_eq!(
            CallingConvention::from_import_flags(0x0400),
            CallingConvention::Thiscall
        );
        assert_eq!(
            CallingConvention::from_import_flags(0x0000),
            CallingConvention::Winapi
        );
        assert_eq!(CharSet::from_import_flags(0x0104), CharSet::Unicode);
        assert_eq!(CharSet::from_import_flags(0x0106), CharSet::Auto);
        assert_eq!(CharSet::from_import_flags(0x0100), CharSet::NotSpecified);
    }

    #[test]
    fn entry_points() {
        assert_eq!(
            EntryPoint::import("SHELL32.dll", "#680"),
            EntryPoint::Ordinal {
                library: "SHELL32.dll".to_string(),
                ordinal: 680
            }
        );
        let symbol = EntryPoint::import("USER32.dll", "MessageBoxW");
        assert_eq!(symbol.to_string(), "USER32.dll\\MessageBoxW");
        assert_eq!(symbol.library(), Some("USER32.dll"));
        assert_eq!(EntryPoint::Vtable(5).library(), None);
    }

    #[test]
    fn param_flags_keep_metadata_bits() {
        let flags = ParamFlags::from_param_flags(0x1013);
        assert_eq!(flags, ParamFlags::IN | ParamFlags::OUT | ParamFlags::OPTIONAL);
    }
}
