use strum::{EnumCount, EnumIter};

use crate::{
    file::io::{read_le_at, write_le_at},
    metadata::{
        tables::{TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// The coded index kinds of ECMA-335 II.24.2.6.
///
/// A coded index packs a table tag into the low bits and a row id into the remaining bits.
/// Whether it occupies 2 or 4 bytes depends on the largest table it can reference.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef`, `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param`, `Property`
    HasConstant,
    /// Any table that may own a custom attribute
    HasCustomAttribute,
    /// `Field`, `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef`, `Assembly`
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, `TypeSpec`
    MemberRefParent,
    /// `Event`, `Property`
    HasSemantics,
    /// `MethodDef`, `MemberRef`
    MethodDefOrRef,
    /// `Field`, `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef`, `ExportedType`
    Implementation,
    /// Constructor of a custom attribute, `MethodDef` or `MemberRef` (tags 2 and 3)
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef`, `TypeRef`
    ResolutionScope,
    /// `TypeDef`, `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// Returns the tables this coded index can reference, indexed by tag.
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are unused; 2 is MethodDef and 3 is MemberRef
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of low bits holding the table tag.
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        let count = self.tables().len();
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }

    /// Returns the tag encoding `table`, preferring the canonical tag for attribute constructors.
    #[must_use]
    pub fn tag_of(&self, table: TableId) -> Option<u32> {
        if *self == CodedIndexType::CustomAttributeType {
            return match table {
                TableId::MethodDef => Some(2),
                TableId::MemberRef => Some(3),
                _ => None,
            };
        }

        self.tables()
            .iter()
            .position(|candidate| *candidate == table)
            .map(|tag| tag as u32)
    }
}

/// A decoded coded index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedIndex {
    /// The referenced table
    pub tag: TableId,
    /// The referenced 1-based row, 0 for null
    pub row: u32,
    /// Token of the referenced row
    pub token: Token,
}

impl CodedIndex {
    /// Creates a coded index referencing `row` of `tag`.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: tag.token(row),
        }
    }

    /// Returns `true` if the index references no row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }

    /// Reads a coded index of kind `ci_type` at `offset`.
    ///
    /// # Errors
    /// Returns an error on truncated input or an invalid tag.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfoRef,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = if info.coded_index_bytes(ci_type) == 4 {
            read_le_at::<u32>(data, offset)?
        } else {
            u32::from(read_le_at::<u16>(data, offset)?)
        };

        let (tag, row) = info.decode_coded_index(coded_index, ci_type)?;
        Ok(CodedIndex::new(tag, row))
    }

    /// Writes this coded index as kind `ci_type` at `offset`.
    ///
    /// # Errors
    /// Returns an error if the table cannot be encoded by `ci_type` or the buffer is too small.
    pub fn write(
        &self,
        data: &mut [u8],
        offset: &mut usize,
        info: &TableInfoRef,
        ci_type: CodedIndexType,
    ) -> Result<()> {
        let Some(tag) = ci_type.tag_of(self.tag) else {
            return Err(malformed_error!(
                "Table {:?} cannot be encoded as {:?}",
                self.tag,
                ci_type
            ));
        };

        let value = (self.row << ci_type.tag_bits()) | tag;
        if info.coded_index_bytes(ci_type) == 4 {
            write_le_at::<u32>(data, offset, value)
        } else {
            let small = u16::try_from(value)
                .map_err(|_| malformed_error!("Coded index {} does not fit into 2 bytes", value))?;
            write_le_at::<u16>(data, offset, small)
        }
    }
}
