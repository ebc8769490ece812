//! Presentation of a layout as the flat member list a generated class exposes.
//!
//! Layouts stay immutable; flattening, de-duplication and renaming happen here, once, into
//! a separate [`Presentation`].

use std::sync::Arc;

use crate::metadata::typesystem::{
    Bitfield, LayoutFlags, StructLayout, StructMember, TypeDescriptor,
};

/// A member as exposed by a generated class
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedMember<'a> {
    /// Exposed name, suffixed when it collides with an earlier member
    pub name: String,
    /// Offset from the start of the outermost struct
    pub offset: u32,
    /// The underlying member
    pub member: &'a StructMember,
}

impl PresentedMember<'_> {
    /// Bitfield sub-fields exposed as accessors; `Reserved` sub-fields are hidden.
    pub fn exposed_bitfields(&self) -> impl Iterator<Item = &Bitfield> {
        self.member
            .bitfields
            .iter()
            .filter(|bitfield| bitfield.name != "Reserved")
    }
}

/// The exposed view of a [`StructLayout`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Presentation<'a> {
    /// Members in emission order
    pub members: Vec<PresentedMember<'a>>,
    /// Nested named aggregates that are not flattened and must be defined inside the
    /// generated class, without duplicates
    pub nested: Vec<Arc<StructLayout>>,
}

fn same_member(left: &PresentedMember<'_>, right: &StructMember, offset: u32) -> bool {
    if !left.member.bitfields.is_empty() && !right.bitfields.is_empty() {
        return left.member.bitfields == right.bitfields;
    }

    left.offset == offset && left.member.name.eq_ignore_ascii_case(&right.name)
}

impl StructLayout {
    /// Builds the exposed member list.
    ///
    /// Reserved and alignment members are dropped, nested unions and anonymous aggregates
    /// are flattened at their embedding offset, members duplicated across union branches
    /// are emitted once and colliding names receive numeric suffixes.
    #[must_use]
    pub fn presentation(&self) -> Presentation<'_> {
        let mut presentation = Presentation::default();
        self.present_into(0, &mut presentation);
        presentation
    }

    fn present_into<'a>(&'a self, base: u32, presentation: &mut Presentation<'a>) {
        for member in &self.members {
            if let TypeDescriptor::Struct(layout) = &member.descriptor {
                if member.flattened().is_none()
                    && layout.flags.contains(LayoutFlags::NESTED)
                    && !presentation
                        .nested
                        .iter()
                        .any(|nested| nested.name == layout.name)
                {
                    presentation.nested.push(layout.clone());
                }
            }
        }

        for member in &self.members {
            if member.is_hidden() {
                continue;
            }

            let offset = base + member.offset;
            if let Some(embedded) = member.flattened() {
                embedded.present_into(offset, presentation);
                continue;
            }

            if presentation
                .members
                .iter()
                .any(|existing| same_member(existing, member, offset))
            {
                continue;
            }

            let mut name = member.name.clone();
            let mut suffix = 0;
            while presentation
                .members
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(&name))
            {
                suffix += 1;
                name = format!("{}{suffix}", member.name);
            }

            presentation.members.push(PresentedMember {
                name,
                offset,
                member,
            });
        }
    }
}
