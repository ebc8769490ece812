use std::fmt;

use strum::{EnumCount, EnumIter};

#[allow(non_snake_case, dead_code, missing_docs)]
/// Possible bytes that represent varioud 'Types' for a signature - from coreclr
pub mod ELEMENT_TYPE {
    //Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition,represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// Width of every pointer-sized value; the generated code targets 64-bit processes only
pub const POINTER_SIZE: u32 = 8;

/// The primitive types a native signature can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum PrimitiveKind {
    /// System.Void
    Void,
    /// System.Boolean, marshalled as a 4-byte `BOOL`
    Boolean,
    /// System.Char, a UTF-16 code unit
    Char,
    /// System.SByte
    SByte,
    /// System.Byte
    Byte,
    /// System.Int16
    Int16,
    /// System.UInt16
    UInt16,
    /// System.Int32
    Int32,
    /// System.UInt32
    UInt32,
    /// System.Int64
    Int64,
    /// System.UInt64
    UInt64,
    /// System.Single
    Single,
    /// System.Double
    Double,
    /// System.IntPtr
    IntPtr,
    /// System.UIntPtr
    UIntPtr,
}

impl PrimitiveKind {
    /// Maps a signature element type to its primitive, `None` for non-primitive codes.
    #[must_use]
    pub fn from_element_type(code: u8) -> Option<PrimitiveKind> {
        Some(match code {
            ELEMENT_TYPE::VOID => PrimitiveKind::Void,
            ELEMENT_TYPE::BOOLEAN => PrimitiveKind::Boolean,
            ELEMENT_TYPE::CHAR => PrimitiveKind::Char,
            ELEMENT_TYPE::I1 => PrimitiveKind::SByte,
            ELEMENT_TYPE::U1 => PrimitiveKind::Byte,
            ELEMENT_TYPE::I2 => PrimitiveKind::Int16,
            ELEMENT_TYPE::U2 => PrimitiveKind::UInt16,
            ELEMENT_TYPE::I4 => PrimitiveKind::Int32,
            ELEMENT_TYPE::U4 => PrimitiveKind::UInt32,
            ELEMENT_TYPE::I8 => PrimitiveKind::Int64,
            ELEMENT_TYPE::U8 => PrimitiveKind::UInt64,
            ELEMENT_TYPE::R4 => PrimitiveKind::Single,
            ELEMENT_TYPE::R8 => PrimitiveKind::Double,
            ELEMENT_TYPE::I => PrimitiveKind::IntPtr,
            ELEMENT_TYPE::U => PrimitiveKind::UIntPtr,
            _ => return None,
        })
    }

    /// Byte width of a value of this kind.
    ///
    /// `Void` only appears behind a pointer and is treated as pointer-sized.
    #[must_use]
    pub fn width(self) -> u32 {
        match self {
            PrimitiveKind::Byte | PrimitiveKind::SByte => 1,
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 | PrimitiveKind::Char => 2,
            PrimitiveKind::Int32
            | PrimitiveKind::UInt32
            | PrimitiveKind::Single
            | PrimitiveKind::Boolean => 4,
            PrimitiveKind::Int64
            | PrimitiveKind::UInt64
            | PrimitiveKind::Double
            | PrimitiveKind::IntPtr
            | PrimitiveKind::UIntPtr
            | PrimitiveKind::Void => 8,
        }
    }

    /// Returns `true` for the signed integer kinds.
    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
                | PrimitiveKind::IntPtr
                | PrimitiveKind::Boolean
        )
    }

    /// Returns `true` for `Single` and `Double`.
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::Single | PrimitiveKind::Double)
    }

    /// Returns `true` for the pointer-sized integers.
    #[must_use]
    pub fn is_pointer_sized(self) -> bool {
        matches!(self, PrimitiveKind::IntPtr | PrimitiveKind::UIntPtr)
    }

    /// Type tag for foreign calls (`DllCall` argument and return types).
    ///
    /// `UInt64` is passed as `int64`; the script runtime has no unsigned 64-bit type and the
    /// bit pattern is preserved.
    #[must_use]
    pub fn call_type(self) -> &'static str {
        match self {
            PrimitiveKind::Single => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Boolean | PrimitiveKind::Int32 => "int",
            PrimitiveKind::UInt32 => "uint",
            PrimitiveKind::Int64 | PrimitiveKind::UInt64 => "int64",
            PrimitiveKind::Int16 => "short",
            PrimitiveKind::UInt16 => "ushort",
            PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Char => "char",
            PrimitiveKind::IntPtr | PrimitiveKind::UIntPtr | PrimitiveKind::Void => "ptr",
        }
    }

    /// Type tag for raw memory access (`NumGet`/`NumPut`).
    ///
    /// Differs from [`PrimitiveKind::call_type`] in that unsigned bytes and UTF-16 code
    /// units keep their width and signedness.
    #[must_use]
    pub fn storage_type(self) -> &'static str {
        match self {
            PrimitiveKind::Byte => "uchar",
            PrimitiveKind::Char => "ushort",
            other => other.call_type(),
        }
    }

    /// Type name used in generated documentation.
    #[must_use]
    pub fn doc_type(self) -> &'static str {
        match self {
            PrimitiveKind::Single | PrimitiveKind::Double => "Float",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::IntPtr | PrimitiveKind::UIntPtr | PrimitiveKind::Void => "Pointer",
            _ => "Integer",
        }
    }

    /// The runtime type name, as it appears in metadata (`Int32`, `UIntPtr`, ...).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "Void",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::SByte => "SByte",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Int16 => "Int16",
            PrimitiveKind::UInt16 => "UInt16",
            PrimitiveKind::Int32 => "Int32",
            PrimitiveKind::UInt32 => "UInt32",
            PrimitiveKind::Int64 => "Int64",
            PrimitiveKind::UInt64 => "UInt64",
            PrimitiveKind::Single => "Single",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::IntPtr => "IntPtr",
            PrimitiveKind::UIntPtr => "UIntPtr",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
