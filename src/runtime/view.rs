//! Views that read and write struct members in place.
//!
//! A [`StructView`] pairs a [`StructLayout`] with a mutable byte buffer and resolves member
//! names through the layout's presentation, so flattened union and anonymous members are
//! addressed the way the generated classes expose them. Inline arrays and embedded structs
//! are borrowed as [`ArrayView`] and nested [`StructView`]s over the same bytes; nothing is
//! copied.

use crate::{
    metadata::typesystem::{Bitfield, Presentation, StructLayout, TypeDescriptor},
    runtime::value::{read_string, write_string, Scalar, Value},
    Error, Result,
};

fn missing(layout: &StructLayout, name: &str) -> Error {
    Error::MissingData(format!("member {name} of {}", layout.name))
}

/// Named access to the members of a struct stored in a byte buffer.
///
/// Members are addressed by their presented names: members of nested unions and anonymous
/// aggregates are reachable directly from the outer struct, and names are matched without
/// regard to case, the way the generated classes expose them.
pub struct StructView<'a> {
    layout: &'a StructLayout,
    presentation: Presentation<'a>,
    data: &'a mut [u8],
}

impl<'a> StructView<'a> {
    /// Creates a view of `layout` over `data`.
    ///
    /// # Arguments
    ///
    /// * `layout` - The computed layout describing the buffer
    /// * `data` - At least `layout.size` bytes; trailing bytes are ignored
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if `data` is smaller than the struct.
    pub fn new(layout: &'a StructLayout, data: &'a mut [u8]) -> Result<StructView<'a>> {
        if data.len() < layout.size as usize {
            return Err(out_of_bounds_error!());
        }

        Ok(StructView {
            layout,
            presentation: layout.presentation(),
            data,
        })
    }

    /// The layout being viewed.
    #[must_use]
    pub fn layout(&self) -> &StructLayout {
        self.layout
    }

    fn find(&self, name: &str) -> Result<(usize, &'a TypeDescriptor)> {
        self.presentation
            .members
            .iter()
            .find(|member| member.name.eq_ignore_ascii_case(name))
            .map(|member| (member.offset as usize, &member.member.descriptor))
            .ok_or_else(|| missing(self.layout, name))
    }

    fn find_bitfield(&self, name: &str) -> Result<(usize, Scalar, &'a Bitfield)> {
        for member in &self.presentation.members {
            if let Some(bitfield) = member
                .member
                .bitfields
                .iter()
                .find(|bitfield| bitfield.name.eq_ignore_ascii_case(name))
            {
                let scalar = Scalar::of(&member.member.descriptor).ok_or_else(|| {
                    Error::Unsupported(format!("bitfield {name} has a non-scalar backing member"))
                })?;
                return Ok((member.offset as usize, scalar, bitfield));
            }
        }

        Err(missing(self.layout, name))
    }

    /// Reads a scalar, pointer or string member.
    ///
    /// # Errors
    /// Returns [`Error::MissingData`] for unknown names and [`Error::Unsupported`] for
    /// arrays and structs, which are reached through [`StructView::array`] and
    /// [`StructView::nested`].
    pub fn get(&self, name: &str) -> Result<Value> {
        let (offset, descriptor) = self.find(name)?;
        if let TypeDescriptor::String { length, wide } = descriptor {
            return read_string(self.data, offset, *length, *wide);
        }

        match Scalar::of(descriptor) {
            Some(scalar) => scalar.read(self.data, offset),
            None => Err(Error::Unsupported(format!(
                "member {name} of type {descriptor} is not a scalar"
            ))),
        }
    }

    /// Writes a scalar, pointer or string member. Integers are truncated to the member
    /// width; strings are truncated to fit their buffer with a terminator.
    ///
    /// # Errors
    /// See [`StructView::get`]; also fails if `value` cannot be stored in the member.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let (offset, descriptor) = self.find(name)?;
        if let TypeDescriptor::String { length, wide } = descriptor {
            let Value::String(text) = &value else {
                return Err(Error::Unsupported(format!("member {name} holds a string")));
            };
            return write_string(self.data, offset, *length, *wide, text);
        }

        match Scalar::of(descriptor) {
            Some(scalar) => scalar.write(self.data, offset, &value),
            None => Err(Error::Unsupported(format!(
                "member {name} of type {descriptor} is not a scalar"
            ))),
        }
    }

    /// Reads the bitfield sub-field `name` from its backing member.
    ///
    /// # Errors
    /// Returns [`Error::MissingData`] if no member declares the sub-field.
    pub fn bitfield(&self, name: &str) -> Result<u64> {
        let (offset, scalar, bitfield) = self.find_bitfield(name)?;
        Ok(bitfield.get(scalar.read_bits(self.data, offset)?))
    }

    /// Replaces the bitfield sub-field `name`; other bits of the backing member are kept.
    ///
    /// # Errors
    /// See [`StructView::bitfield`].
    pub fn set_bitfield(&mut self, name: &str, value: u64) -> Result<()> {
        let (offset, scalar, bitfield) = self.find_bitfield(name)?;
        let backing = scalar.read_bits(self.data, offset)?;
        scalar.write_bits(self.data, offset, bitfield.set(backing, value))
    }

    /// A view of the inline array `name`.
    ///
    /// # Errors
    /// Returns [`Error::Unsupported`] if the member is not an array.
    pub fn array(&mut self, name: &str) -> Result<ArrayView<'_>> {
        let (offset, descriptor) = self.find(name)?;
        let TypeDescriptor::Array { element, length } = descriptor else {
            return Err(Error::Unsupported(format!("member {name} is not an array")));
        };

        let end = offset + descriptor.width() as usize;
        let Some(data) = self.data.get_mut(offset..end) else {
            return Err(out_of_bounds_error!());
        };

        Ok(ArrayView {
            element,
            length: *length,
            data,
        })
    }

    /// A view of the embedded struct `name`, over the same bytes.
    ///
    /// # Errors
    /// Returns [`Error::Unsupported`] if the member is not an embedded struct.
    pub fn nested(&mut self, name: &str) -> Result<StructView<'_>> {
        let (offset, descriptor) = self.find(name)?;
        let TypeDescriptor::Struct(layout) = descriptor else {
            return Err(Error::Unsupported(format!("member {name} is not a struct")));
        };

        let end = offset + layout.size as usize;
        let Some(data) = self.data.get_mut(offset..end) else {
            return Err(out_of_bounds_error!());
        };
        StructView::new(layout, data)
    }
}

/// Bounds-checked access to the elements of an inline array.
pub struct ArrayView<'a> {
    element: &'a TypeDescriptor,
    length: u32,
    data: &'a mut [u8],
}

impl ArrayView<'_> {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.length
    }

    /// Returns `true` for zero-length arrays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn offset(&self, index: u32) -> Result<usize> {
        if index >= self.length {
            return Err(out_of_bounds_error!());
        }
        index
            .checked_mul(self.element.width())
            .map(|offset| offset as usize)
            .ok_or(out_of_bounds_error!())
    }

    fn scalar(&self) -> Result<Scalar> {
        Scalar::of(self.element).ok_or_else(|| {
            Error::Unsupported(format!("elements of type {} are not scalars", self.element))
        })
    }

    /// Reads element `index`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] past the end and [`Error::Unsupported`] for arrays of
    /// structs, whose elements are reached through [`ArrayView::nested`].
    pub fn get(&self, index: u32) -> Result<Value> {
        let offset = self.offset(index)?;
        self.scalar()?.read(self.data, offset)
    }

    /// Writes element `index`.
    ///
    /// # Errors
    /// See [`ArrayView::get`].
    pub fn set(&mut self, index: u32, value: &Value) -> Result<()> {
        let offset = self.offset(index)?;
        self.scalar()?.write(self.data, offset, value)
    }

    /// A view of struct element `index`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] past the end and [`Error::Unsupported`] if the
    /// elements are not structs.
    pub fn nested(&mut self, index: u32) -> Result<StructView<'_>> {
        let offset = self.offset(index)?;
        let TypeDescriptor::Struct(layout) = self.element else {
            return Err(Error::Unsupported(format!(
                "elements of type {} are not structs",
                self.element
            )));
        };

        let end = offset + layout.size as usize;
        let Some(data) = self.data.get_mut(offset..end) else {
            return Err(out_of_bounds_error!());
        };
        StructView::new(layout, data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::typesystem::{
        compute_layout, FieldInput, LayoutFlags, LayoutInput, LayoutKind, MemberFlags,
        PrimitiveKind,
    };

    fn layout(name: &str, union: bool, flags: LayoutFlags, fields: Vec<FieldInput>) -> StructLayout {
        let computed = compute_layout(&LayoutInput {
            kind: LayoutKind::Sequential,
            packing: 8,
            union,
            fields,
        })
        .unwrap();

        StructLayout {
            name: name.to_string(),
            flags,
            members: computed.members,
            size: computed.size,
            packing_size: computed.packing_size,
            ..StructLayout::default()
        }
    }

    fn int(kind: PrimitiveKind) -> TypeDescriptor {
        TypeDescriptor::primitive(kind)
    }

    #[test]
    fn bitfields_keep_other_bits() {
        let mut flags = FieldInput::new("_bitfield", int(PrimitiveKind::UInt32));
        flags.flags = MemberFlags::NATIVE_BITFIELD;
        flags.bitfields = vec![Bitfield {
            name: "Level".to_string(),
            offset: 3,
            length: 4,
        }];
        let layout = layout("FLAGS", false, LayoutFlags::empty(), vec![flags]);

        let mut buffer = vec![0u8; 4];
        buffer.copy_from_slice(&0xFFFF_0007u32.to_le_bytes());
        let mut view = StructView::new(&layout, &mut buffer).unwrap();
        view.set_bitfield("Level", 0b1011).unwrap();

        assert_eq!(view.bitfield("Level").unwrap(), 0b1011);
        assert_eq!(view.get("_bitfield").unwrap(), Value::UInt(0xFFFF_005F));
    }

    #[test]
    fn nested_and_flattened_members() {
        let inner = Arc::new(layout(
            "_Anonymous_e__Union",
            true,
            LayoutFlags::UNION | LayoutFlags::NESTED | LayoutFlags::ANONYMOUS,
            vec![
                FieldInput::new("wide", int(PrimitiveKind::UInt64)),
                FieldInput::new("narrow", int(PrimitiveKind::UInt16)),
            ],
        ));
        let point = Arc::new(layout(
            "POINT",
            false,
            LayoutFlags::empty(),
            vec![
                FieldInput::new("x", int(PrimitiveKind::Int32)),
                FieldInput::new("y", int(PrimitiveKind::Int32)),
            ],
        ));

        let mut anonymous = FieldInput::new("Anonymous", TypeDescriptor::Struct(inner));
        anonymous.flags = MemberFlags::UNION | MemberFlags::ANONYMOUS;
        let outer = layout(
            "OUTER",
            false,
            LayoutFlags::empty(),
            vec![
                FieldInput::new("kind", int(PrimitiveKind::Byte)),
                anonymous,
                FieldInput::new("origin", TypeDescriptor::Struct(point)),
                FieldInput::new(
                    "name",
                    TypeDescriptor::String {
                        length: 8,
                        wide: true,
                    },
                ),
                FieldInput::new(
                    "counts",
                    TypeDescriptor::Array {
                        element: Box::new(int(PrimitiveKind::Int16)),
                        length: 3,
                    },
                ),
            ],
        );

        let mut buffer = vec![0u8; outer.size as usize];
        let mut view = StructView::new(&outer, &mut buffer).unwrap();

        view.set("WIDE", Value::UInt(0x1_0002)).unwrap();
        assert_eq!(view.get("narrow").unwrap(), Value::UInt(2));

        view.nested("origin").unwrap().set("y", Value::Int(-1)).unwrap();
        assert_eq!(view.nested("origin").unwrap().get("y").unwrap(), Value::Int(-1));

        view.set("name", Value::String("window".to_string())).unwrap();
        assert_eq!(view.get("name").unwrap(), Value::String("window".to_string()));

        let mut counts = view.array("counts").unwrap();
        assert_eq!(counts.len(), 3);
        counts.set(2, &Value::Int(-5)).unwrap();
        assert_eq!(counts.get(2).unwrap(), Value::Int(-5));
        assert!(counts.get(3).is_err());

        assert!(view.get("origin").is_err());
        assert!(view.get("missing").is_err());
        assert!(view.array("kind").is_err());
    }

    #[test]
    fn buffer_too_small() {
        let layout = layout(
            "SMALL",
            false,
            LayoutFlags::empty(),
            vec![FieldInput::new("value", int(PrimitiveKind::Int64))],
        );
        let mut buffer = vec![0u8; 4];
        assert!(StructView::new(&layout, &mut buffer).is_err());
    }
}
