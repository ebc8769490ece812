use strum::{EnumCount, EnumIter};

/// Identifier of a metadata table (ECMA-335 II.22).
///
/// The discriminant is the table number used in tokens and in the `valid` bit vector of the
/// tables stream header. Tables are stored in the stream in ascending order of this number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumIter, EnumCount)]
#[repr(u8)]
pub enum TableId {
    /// Module definition, exactly one row
    Module = 0x00,
    /// References to types in this or other scopes
    TypeRef = 0x01,
    /// Type definitions
    TypeDef = 0x02,
    /// Field indirection (uncompressed streams only)
    FieldPtr = 0x03,
    /// Field definitions
    Field = 0x04,
    /// Method indirection (uncompressed streams only)
    MethodPtr = 0x05,
    /// Method definitions
    MethodDef = 0x06,
    /// Parameter indirection (uncompressed streams only)
    ParamPtr = 0x07,
    /// Parameter definitions
    Param = 0x08,
    /// Interfaces implemented by a type
    InterfaceImpl = 0x09,
    /// References to members of other types
    MemberRef = 0x0A,
    /// Compile-time constants of fields, params and properties
    Constant = 0x0B,
    /// Custom attributes
    CustomAttribute = 0x0C,
    /// Marshalling descriptors
    FieldMarshal = 0x0D,
    /// Security declarations
    DeclSecurity = 0x0E,
    /// Explicit packing and size of a type
    ClassLayout = 0x0F,
    /// Explicit field offsets
    FieldLayout = 0x10,
    /// Standalone signatures
    StandAloneSig = 0x11,
    /// Type to event list mapping
    EventMap = 0x12,
    /// Event indirection
    EventPtr = 0x13,
    /// Event definitions
    Event = 0x14,
    /// Type to property list mapping
    PropertyMap = 0x15,
    /// Property indirection
    PropertyPtr = 0x16,
    /// Property definitions
    Property = 0x17,
    /// Property and event accessor association
    MethodSemantics = 0x18,
    /// Method implementation overrides
    MethodImpl = 0x19,
    /// References to native modules (DLL names)
    ModuleRef = 0x1A,
    /// Type specifications
    TypeSpec = 0x1B,
    /// P/Invoke import information
    ImplMap = 0x1C,
    /// Initial data of fields
    FieldRVA = 0x1D,
    /// Edit-and-continue log
    EncLog = 0x1E,
    /// Edit-and-continue mapping
    EncMap = 0x1F,
    /// Assembly definition
    Assembly = 0x20,
    /// Unused
    AssemblyProcessor = 0x21,
    /// Unused
    AssemblyOS = 0x22,
    /// References to other assemblies
    AssemblyRef = 0x23,
    /// Unused
    AssemblyRefProcessor = 0x24,
    /// Unused
    AssemblyRefOS = 0x25,
    /// Files of a multi-file assembly
    File = 0x26,
    /// Types exported from other files
    ExportedType = 0x27,
    /// Manifest resources
    ManifestResource = 0x28,
    /// Nested type to enclosing type mapping
    NestedClass = 0x29,
    /// Generic parameters
    GenericParam = 0x2A,
    /// Generic method instantiations
    MethodSpec = 0x2B,
    /// Generic parameter constraints
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Returns the token of row `row` in this table.
    #[must_use]
    pub fn token(self, row: u32) -> crate::metadata::token::Token {
        crate::metadata::token::Token::from_parts(self as u8, row)
    }
}
