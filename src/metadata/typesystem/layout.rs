//! Struct layouts and the native layout algorithm.
//!
//! [`compute_layout`] replicates how a native compiler places fields: every field is aligned
//! to `min(logical width, packing)`, the struct is tail-padded to the largest alignment it
//! saw, and a packing directive can only shrink the effective alignment. Unions place every
//! member at offset zero; explicit layouts take offsets verbatim from the FieldLayout table.
//!
//! The engine is a pure function of its [`LayoutInput`]. Identical field lists always
//! produce identical offsets, independent of registry state or build order.
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::metadata::typesystem::{
//!     compute_layout, FieldInput, LayoutInput, LayoutKind, PrimitiveKind, TypeDescriptor,
//! };
//!
//! let layout = compute_layout(&LayoutInput {
//!     kind: LayoutKind::Sequential,
//!     packing: 8,
//!     union: false,
//!     fields: vec![
//!         FieldInput::new("a", TypeDescriptor::primitive(PrimitiveKind::Int32)),
//!         FieldInput::new("b", TypeDescriptor::primitive(PrimitiveKind::Int64)),
//!     ],
//! })?;
//!
//! assert_eq!(layout.members[1].offset, 8);
//! assert_eq!(layout.size, 16);
//! # Ok::<(), winmdgen::Error>(())
//! ```

use bitflags::bitflags;

use crate::{metadata::typesystem::TypeDescriptor, Error, Result};

/// How a compiler may place the fields of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutKind {
    /// Runtime chosen, laid out like `Sequential` for native interop
    Auto,
    /// Declaration order
    #[default]
    Sequential,
    /// Offsets from the FieldLayout table
    Explicit,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Per-member facts gathered from attributes and type names
    pub struct MemberFlags: u32 {
        /// `ObsoleteAttribute`
        const DEPRECATED = 0x0001;
        /// `ReservedAttribute`, the member must stay zero and is not exposed
        const RESERVED = 0x0002;
        /// Padding member synthesised by the metadata generator
        const ALIGNMENT = 0x0004;
        /// The member's type is a union
        const UNION = 0x0008;
        /// The member's type is a compiler-synthesised anonymous aggregate
        const ANONYMOUS = 0x0010;
        /// Strings of the declaring type are 8-bit
        const ANSI = 0x0020;
        /// Strings of the declaring type are UTF-16
        const UNICODE = 0x0040;
        /// The member backs one or more bitfields
        const NATIVE_BITFIELD = 0x0080;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Per-type facts gathered from attributes, flags and the type name
    pub struct LayoutFlags: u32 {
        /// All members share offset zero
        const UNION = 0x0001;
        /// Compiler-synthesised aggregate (`_Anonymous_e__Struct`, `_u_e__Union`, ...)
        const ANONYMOUS = 0x0002;
        /// Strings are 8-bit
        const ANSI = 0x0004;
        /// Strings are UTF-16
        const UNICODE = 0x0008;
        /// `ObsoleteAttribute`
        const DEPRECATED = 0x0010;
        /// Declared inside another type
        const NESTED = 0x0020;
    }
}

/// One sub-field of a bitfield-backed member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitfield {
    /// Sub-field name
    pub name: String,
    /// Bit offset inside the backing member
    pub offset: u32,
    /// Width in bits
    pub length: u32,
}

impl Bitfield {
    /// Mask of the sub-field, before shifting.
    #[must_use]
    pub fn mask(&self) -> u64 {
        if self.length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.length) - 1
        }
    }

    /// Extracts the sub-field from the backing value.
    #[must_use]
    pub fn get(&self, backing: u64) -> u64 {
        backing.checked_shr(self.offset).unwrap_or(0) & self.mask()
    }

    /// Returns `backing` with the sub-field replaced by `value`; other bits are unchanged.
    #[must_use]
    pub fn set(&self, backing: u64, value: u64) -> u64 {
        let shifted_mask = self.mask().checked_shl(self.offset).unwrap_or(0);
        let shifted_value = (value & self.mask()).checked_shl(self.offset).unwrap_or(0);
        shifted_value | (backing & !shifted_mask)
    }
}

/// A field of a [`StructLayout`]
#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    /// Field name
    pub name: String,
    /// Field row, `0` for members that do not come from the Field table
    pub field: u32,
    /// Decoded type
    pub descriptor: TypeDescriptor,
    /// Byte offset from the start of the declaring struct
    pub offset: u32,
    /// Byte size
    pub size: u32,
    /// Attribute and name derived flags
    pub flags: MemberFlags,
    /// Sub-fields sharing this member's storage, in declaration order
    pub bitfields: Vec<Bitfield>,
}

impl StructMember {
    /// The nested aggregate this member embeds, if it is flattened into its parent when
    /// presented.
    #[must_use]
    pub fn flattened(&self) -> Option<&StructLayout> {
        match &self.descriptor {
            TypeDescriptor::Struct(layout)
                if layout.flags.contains(LayoutFlags::NESTED)
                    && self
                        .flags
                        .intersects(MemberFlags::UNION | MemberFlags::ANONYMOUS) =>
            {
                Some(layout)
            }
            _ => None,
        }
    }

    /// Returns `true` if the member is padding that is never exposed.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.flags
            .intersects(MemberFlags::RESERVED | MemberFlags::ALIGNMENT)
    }
}

/// The computed layout of one struct, union or COM interface.
///
/// Built once per qualified name by the [`crate::metadata::typesystem::TypeRegistry`] and
/// shared through `Arc` by every member that embeds it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructLayout {
    /// Simple name
    pub name: String,
    /// Namespace, that of the outermost enclosing type for nested types
    pub namespace: String,
    /// `Namespace.Outer.Inner`
    pub qualified_name: String,
    /// TypeDef row
    pub typedef: u32,
    /// Layout kind from the TypeDef flags
    pub kind: LayoutKind,
    /// Type level flags
    pub flags: LayoutFlags,
    /// Members in declaration order, static and literal fields excluded
    pub members: Vec<StructMember>,
    /// Total size in bytes, tail padding included
    pub size: u32,
    /// Effective packing, never larger than the largest member alignment
    pub packing_size: u32,
    /// Member initialised to the struct size on construction
    pub struct_size_field: Option<String>,
    /// Minimum supported platform, e.g. `windows10.0.10240`
    pub min_platform: Option<String>,
    /// Architecture mask (`X86 = 1`, `X64 = 2`, `Arm64 = 4`)
    pub architecture: Option<u32>,
}

impl StructLayout {
    /// Returns `true` for unions.
    #[must_use]
    pub fn is_union(&self) -> bool {
        self.flags.contains(LayoutFlags::UNION)
    }

    /// Returns `true` if strings in this type are UTF-16.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        !self.flags.contains(LayoutFlags::ANSI)
    }

    /// Looks up a member by name, case-sensitively.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// One field handed to the layout engine
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInput {
    /// Field name
    pub name: String,
    /// Field row, `0` when synthetic
    pub field: u32,
    /// Decoded type
    pub descriptor: TypeDescriptor,
    /// Offset from the FieldLayout table
    pub explicit_offset: Option<u32>,
    /// Member flags
    pub flags: MemberFlags,
    /// Bitfields backed by this field
    pub bitfields: Vec<Bitfield>,
}

impl FieldInput {
    /// A field without explicit offset, flags or bitfields.
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> FieldInput {
        FieldInput {
            name: name.into(),
            field: 0,
            descriptor,
            explicit_offset: None,
            flags: MemberFlags::empty(),
            bitfields: Vec::new(),
        }
    }
}

/// Everything the layout algorithm depends on
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInput {
    /// Layout kind
    pub kind: LayoutKind,
    /// Declared packing, already defaulted when the metadata declares none
    pub packing: u32,
    /// Place every member at offset zero
    pub union: bool,
    /// Fields in declaration order
    pub fields: Vec<FieldInput>,
}

/// Output of [`compute_layout`]
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedLayout {
    /// Members with their offsets and sizes
    pub members: Vec<StructMember>,
    /// Total size, tail padding included
    pub size: u32,
    /// Effective packing
    pub packing_size: u32,
}

/// Default packing when the metadata declares none.
#[must_use]
pub fn default_packing(wide: bool) -> u32 {
    if wide {
        8
    } else {
        4
    }
}

fn align_up(offset: u32, alignment: u32) -> Option<u32> {
    offset.checked_add((alignment - offset % alignment) % alignment)
}

fn too_large(name: &str) -> Error {
    malformed_error!("Field {} does not fit in a 32-bit struct", name)
}

/// Lays out `input.fields`.
///
/// # Arguments
///
/// * `input` - Layout kind, declared packing and the fields in declaration order
///
/// # Errors
/// Returns [`Error::Unsupported`] for a field whose type is [`TypeDescriptor::Other`],
/// [`Error::MissingData`] for an explicit layout field without a FieldLayout row, and
/// [`Error::Malformed`] if a field size or offset overflows a `u32`.
pub fn compute_layout(input: &LayoutInput) -> Result<ComputedLayout> {
    let packing = input.packing.max(1);
    let mut members = Vec::with_capacity(input.fields.len());
    let mut offset = 0u32;
    let mut max_alignment = 1u32;
    let mut extent = 0u32;

    for field in &input.fields {
        if let TypeDescriptor::Other(raw) = &field.descriptor {
            return Err(Error::Unsupported(format!(
                "field {} has unsupported type {raw}",
                field.name
            )));
        }

        let size = field
            .descriptor
            .checked_width()
            .ok_or_else(|| too_large(&field.name))?;
        let alignment = field.descriptor.logical_width().min(packing).max(1);
        max_alignment = max_alignment.max(alignment);

        let member_offset = if input.union {
            0
        } else if input.kind == LayoutKind::Explicit {
            field.explicit_offset.ok_or_else(|| {
                Error::MissingData(format!("explicit offset of field {}", field.name))
            })?
        } else {
            let placed = align_up(offset, alignment).ok_or_else(|| too_large(&field.name))?;
            offset = placed
                .checked_add(size)
                .ok_or_else(|| too_large(&field.name))?;
            placed
        };

        let end = member_offset
            .checked_add(size)
            .ok_or_else(|| too_large(&field.name))?;
        extent = extent.max(end);
        members.push(StructMember {
            name: field.name.clone(),
            field: field.field,
            descriptor: field.descriptor.clone(),
            offset: member_offset,
            size,
            flags: field.flags,
            bitfields: field.bitfields.clone(),
        });
    }

    let unpadded = if input.union || input.kind == LayoutKind::Explicit {
        extent
    } else {
        offset
    };

    let size = align_up(unpadded, max_alignment)
        .ok_or_else(|| malformed_error!("Struct size {} overflows when padded", unpadded))?;

    Ok(ComputedLayout {
        members,
        size,
        packing_size: packing.min(max_alignment),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::typesystem::PrimitiveKind;

    fn int(kind: PrimitiveKind) -> TypeDescriptor {
        TypeDescriptor::primitive(kind)
    }

    fn sequential(packing: u32, fields: Vec<FieldInput>) -> LayoutInput {
        LayoutInput {
            kind: LayoutKind::Sequential,
            packing,
            union: false,
            fields,
        }
    }

    #[test]
    fn two_ints() {
        let layout = compute_layout(&sequential(
            4,
            vec![
                FieldInput::new("a", int(PrimitiveKind::Int32)),
                FieldInput::new("b", int(PrimitiveKind::Int32)),
            ],
        ))
        .unwrap();

        assert_eq!(layout.members[0].offset, 0);
        assert_eq!(layout.members[1].offset, 4);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.packing_size, 4);
    }

    #[test]
    fn padding_before_wide_field() {
        let layout = compute_layout(&sequential(
            8,
            vec![
                FieldInput::new("a", int(PrimitiveKind::Int32)),
                FieldInput::new("b", int(PrimitiveKind::Int64)),
            ],
        ))
        .unwrap();

        assert_eq!(layout.members[1].offset, 8);
        assert_eq!(layout.size, 16);
        assert_eq!(layout.packing_size, 8);
    }

    #[test]
    fn packing_shrinks_alignment() {
        let layout = compute_layout(&sequential(
            4,
            vec![
                FieldInput::new("a", int(PrimitiveKind::Int32)),
                FieldInput::new("b", int(PrimitiveKind::Int64)),
            ],
        ))
        .unwrap();

        assert_eq!(layout.members[1].offset, 4);
        assert_eq!(layout.size, 12);
        assert_eq!(layout.packing_size, 4);
    }

    #[test]
    fn union() {
        let layout = compute_layout(&LayoutInput {
            kind: LayoutKind::Sequential,
            packing: 8,
            union: true,
            fields: vec![
                FieldInput::new("a", int(PrimitiveKind::Int32)),
                FieldInput::new("b", int(PrimitiveKind::Int64)),
            ],
        })
        .unwrap();

        assert!(layout.members.iter().all(|member| member.offset == 0));
        assert_eq!(layout.size, 8);
    }

    #[test]
    fn union_tail_padding() {
        // A 3 byte array next to a 2 byte member pads to 4
        let layout = compute_layout(&LayoutInput {
            kind: LayoutKind::Sequential,
            packing: 8,
            union: true,
            fields: vec![
                FieldInput::new(
                    "bytes",
                    TypeDescriptor::Array {
                        element: Box::new(int(PrimitiveKind::Byte)),
                        length: 3,
                    },
                ),
                FieldInput::new("word", int(PrimitiveKind::UInt16)),
            ],
        })
        .unwrap();

        assert_eq!(layout.size, 4);
        assert_eq!(layout.packing_size, 2);
    }

    #[test]
    fn explicit() {
        let mut low = FieldInput::new("low", int(PrimitiveKind::UInt32));
        low.explicit_offset = Some(0);
        let mut high = FieldInput::new("high", int(PrimitiveKind::UInt32));
        high.explicit_offset = Some(4);
        let mut whole = FieldInput::new("whole", int(PrimitiveKind::UInt64));
        whole.explicit_offset = Some(0);

        let layout = compute_layout(&LayoutInput {
            kind: LayoutKind::Explicit,
            packing: 8,
            union: false,
            fields: vec![low, high, whole],
        })
        .unwrap();

        assert_eq!(layout.members[1].offset, 4);
        assert_eq!(layout.members[2].offset, 0);
        assert_eq!(layout.size, 8);

        let missing = LayoutInput {
            kind: LayoutKind::Explicit,
            packing: 8,
            union: false,
            fields: vec![FieldInput::new("x", int(PrimitiveKind::Int32))],
        };
        assert!(matches!(
            compute_layout(&missing),
            Err(Error::MissingData(_))
        ));
    }

    #[test]
    fn strings_and_arrays_align_on_elements() {
        let layout = compute_layout(&sequential(
            8,
            vec![
                FieldInput::new("flag", int(PrimitiveKind::Byte)),
                FieldInput::new(
                    "name",
                    TypeDescriptor::String {
                        length: 3,
                        wide: true,
                    },
                ),
                FieldInput::new(
                    "values",
                    TypeDescriptor::Array {
                        element: Box::new(int(PrimitiveKind::UInt32)),
                        length: 2,
                    },
                ),
            ],
        ))
        .unwrap();

        assert_eq!(layout.members[1].offset, 2);
        assert_eq!(layout.members[1].size, 6);
        assert_eq!(layout.members[2].offset, 8);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn embedded_struct() {
        let point = Arc::new(StructLayout {
            name: "POINT".to_string(),
            size: 8,
            packing_size: 4,
            ..StructLayout::default()
        });

        let layout = compute_layout(&sequential(
            8,
            vec![
                FieldInput::new("tag", int(PrimitiveKind::UInt16)),
                FieldInput::new("pt", TypeDescriptor::Struct(point)),
            ],
        ))
        .unwrap();

        assert_eq!(layout.members[1].offset, 8);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn unsupported_member() {
        let result = compute_layout(&sequential(
            8,
            vec![FieldInput::new("s", TypeDescriptor::Other("String".to_string()))],
        ));
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn oversized_fields_fail() {
        let huge = || TypeDescriptor::Array {
            element: Box::new(int(PrimitiveKind::UInt64)),
            length: 0x1FFF_FFFF,
        };

        let result = compute_layout(&sequential(
            8,
            vec![
                FieldInput::new("a", int(PrimitiveKind::Int32)),
                FieldInput::new("big", huge()),
            ],
        ));
        assert!(matches!(result, Err(Error::Malformed { .. })));

        // Fits on its own, but not after a preceding member
        let almost = || TypeDescriptor::Array {
            element: Box::new(int(PrimitiveKind::Byte)),
            length: u32::MAX - 2,
        };
        let result = compute_layout(&sequential(
            8,
            vec![
                FieldInput::new("a", int(PrimitiveKind::Int32)),
                FieldInput::new("bytes", almost()),
            ],
        ));
        assert!(matches!(result, Err(Error::Malformed { .. })));

        let mut late = FieldInput::new("late", int(PrimitiveKind::Int64));
        late.explicit_offset = Some(u32::MAX - 4);
        let result = compute_layout(&LayoutInput {
            kind: LayoutKind::Explicit,
            packing: 8,
            union: false,
            fields: vec![late],
        });
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn invariants() {
        let kinds = [
            PrimitiveKind::Byte,
            PrimitiveKind::Int64,
            PrimitiveKind::UInt16,
            PrimitiveKind::Double,
            PrimitiveKind::Int32,
            PrimitiveKind::Char,
            PrimitiveKind::IntPtr,
        ];

        for packing in [1, 2, 4, 8] {
            let fields: Vec<FieldInput> = kinds
                .iter()
                .enumerate()
                .map(|(index, kind)| FieldInput::new(format!("f{index}"), int(*kind)))
                .collect();
            let input = sequential(packing, fields);

            let first = compute_layout(&input).unwrap();
            let second = compute_layout(&input).unwrap();
            assert_eq!(first, second);

            let mut max_alignment = 1;
            for member in &first.members {
                let alignment = member.size.min(packing);
                max_alignment = max_alignment.max(alignment);
                assert_eq!(member.offset % alignment, 0, "packing {packing}");
            }
            assert_eq!(first.size % max_alignment, 0);
        }
    }

    #[test]
    fn bitfield_accessors() {
        let bitfield = Bitfield {
            name: "fMode".to_string(),
            offset: 3,
            length: 4,
        };

        let backing = 0xFFFF_0007u64;
        let updated = bitfield.set(backing, 0b1011);
        assert_eq!(bitfield.get(updated), 0b1011);
        assert_eq!(updated & !(0xF << 3), backing & !(0xF << 3));
        assert_eq!(bitfield.set(0, 0xFF), 0xF << 3);

        let full = Bitfield {
            name: "all".to_string(),
            offset: 0,
            length: 64,
        };
        assert_eq!(full.get(u64::MAX), u64::MAX);
    }
}
