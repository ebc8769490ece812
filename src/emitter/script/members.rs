//! Struct and handle class bodies: nested classes, member accessors and bitfields.

use std::fmt::Write;

use crate::{
    emitter::script::{class_name, escape_docs, indented, ScriptWriter},
    metadata::typesystem::{
        Bitfield, LayoutFlags, MemberFlags, PresentedMember, StructLayout, TypeDescriptor,
    },
    Error, Result,
};

/// The expression naming the class of an embedded aggregate.
///
/// Nested types are defined inside the outer class and are reached through it.
fn struct_reference(layout: &StructLayout) -> String {
    if layout.flags.contains(LayoutFlags::NESTED) {
        format!("%this.__Class%.{}", class_name(&layout.name))
    } else {
        class_name(&layout.name)
    }
}

fn doc_type(descriptor: &TypeDescriptor) -> String {
    match descriptor {
        TypeDescriptor::Struct(layout) => class_name(&layout.name),
        other => other.doc_type(),
    }
}

impl ScriptWriter<'_> {
    /// Writes the nested classes and member accessors of `layout`.
    pub(super) fn write_struct_body(&self, out: &mut String, layout: &StructLayout) -> Result<()> {
        let presentation = layout.presentation();

        for nested in &presentation.nested {
            let mut body = String::new();
            let _ = writeln!(body, "    static sizeof => {}", nested.size);
            let _ = writeln!(body, "    static packingSize => {}", nested.packing_size);
            self.write_struct_body(&mut body, nested)?;

            out.push('\n');
            let _ = writeln!(
                out,
                "    class {} extends Win32Struct {{",
                class_name(&nested.name)
            );
            out.push_str(&indented(&body));
            out.push_str("    }\n");
        }

        for member in &presentation.members {
            out.push('\n');
            self.write_member_docs(out, layout, member);
            write_accessor(out, layout, member)?;

            for bitfield in member.exposed_bitfields() {
                out.push('\n');
                self.write_bitfield(out, layout, &member.name, bitfield);
            }
        }

        Ok(())
    }

    /// Writes the constructor initialising the self-size member, if the struct has one.
    pub(super) fn write_size_initializer(&self, out: &mut String, layout: &StructLayout) {
        let Some(field) = &layout.struct_size_field else {
            return;
        };

        out.push('\n');
        out.push_str("    /**\n");
        let _ = writeln!(
            out,
            "     * Initializes the struct. `{field}` must always contain the size of the struct."
        );
        out.push_str(
            "     * @param {Integer} ptr The location at which to create the struct, or 0 to create a new `Buffer`\n",
        );
        out.push_str("     */\n");
        out.push_str("    __New(ptr := 0){\n");
        out.push_str("        super.__New(ptr)\n");
        let _ = writeln!(out, "        this.{field} := {}", layout.size);
        out.push_str("    }\n");
    }

    fn write_member_docs(&self, out: &mut String, layout: &StructLayout, member: &PresentedMember<'_>) {
        out.push_str("    /**\n");
        if let Some(description) = self
            .docs
            .get(&layout.name)
            .and_then(|details| details.fields.get(&member.member.name))
        {
            let _ = writeln!(out, "     * {}", escape_docs(description, "    "));
        }

        let mut exposed = member.exposed_bitfields().peekable();
        if exposed.peek().is_some() {
            out.push_str("     * This bitfield backs the following members:\n");
            for bitfield in exposed {
                let _ = writeln!(out, "     * - {}", bitfield.name);
            }
        }

        if member.member.flags.contains(MemberFlags::DEPRECATED) {
            out.push_str("     * @deprecated\n");
        }
        let _ = writeln!(out, "     * @type {{{}}}", doc_type(&member.member.descriptor));
        out.push_str("     */\n");
    }

    fn write_bitfield(&self, out: &mut String, layout: &StructLayout, backing: &str, bitfield: &Bitfield) {
        out.push_str("    /**\n");
        if let Some(description) = self
            .docs
            .get(&layout.name)
            .and_then(|details| details.fields.get(&bitfield.name))
        {
            let _ = writeln!(out, "     * {}", escape_docs(description, "    "));
        }
        out.push_str("     * @type {Integer}\n");
        out.push_str("     */\n");

        let mask = bitfield.mask();
        let offset = bitfield.offset;
        let _ = writeln!(out, "    {} {{", bitfield.name);
        let _ = writeln!(
            out,
            "        get => (this.{backing} >> {offset}) & {mask:#X}"
        );
        let _ = writeln!(
            out,
            "        set => this.{backing} := ((value & {mask:#X}) << {offset}) | (this.{backing} & ~({mask:#X} << {offset}))"
        );
        out.push_str("    }\n");
    }
}

fn write_accessor(out: &mut String, layout: &StructLayout, member: &PresentedMember<'_>) -> Result<()> {
    let name = &member.name;
    let offset = member.offset;

    match &member.member.descriptor {
        TypeDescriptor::String { length, wide } => {
            let encoding = if *wide { "UTF-16" } else { "UTF-8" };
            let capacity = length.saturating_sub(1);
            let _ = writeln!(out, "    {name} {{");
            let _ = writeln!(
                out,
                "        get => StrGet(this.ptr + {offset}, {capacity}, \"{encoding}\")"
            );
            let _ = writeln!(
                out,
                "        set => StrPut(value, this.ptr + {offset}, {capacity}, \"{encoding}\")"
            );
            out.push_str("    }\n");
        }
        TypeDescriptor::Array { element, length } => {
            let (class, storage) = match element.as_ref() {
                TypeDescriptor::Struct(embedded) => (struct_reference(embedded), ""),
                other => (
                    "Primitive".to_string(),
                    other.storage_type().ok_or_else(|| {
                        Error::Unsupported(format!(
                            "{}.{name}: array of {other} has no accessor",
                            layout.name
                        ))
                    })?,
                ),
            };

            let _ = writeln!(out, "    {name}{{");
            out.push_str("        get {\n");
            let _ = writeln!(out, "            if(!this.HasProp(\"__{name}ProxyArray\"))");
            let _ = writeln!(
                out,
                "                this.__{name}ProxyArray := Win32FixedArray(this.ptr + {offset}, {length}, {class}, \"{storage}\")"
            );
            let _ = writeln!(out, "            return this.__{name}ProxyArray");
            out.push_str("        }\n");
            out.push_str("    }\n");
        }
        TypeDescriptor::Struct(embedded) => {
            let _ = writeln!(out, "    {name}{{");
            out.push_str("        get {\n");
            let _ = writeln!(out, "            if(!this.HasProp(\"__{name}\"))");
            let _ = writeln!(
                out,
                "                this.__{name} := {}(this.ptr + {offset})",
                struct_reference(embedded)
            );
            let _ = writeln!(out, "            return this.__{name}");
            out.push_str("        }\n");
            out.push_str("    }\n");
        }
        other => {
            let storage = other.storage_type().ok_or_else(|| {
                Error::Unsupported(format!("{}.{name}: {other} has no accessor", layout.name))
            })?;
            let _ = writeln!(out, "    {name} {{");
            let _ = writeln!(out, "        get => NumGet(this, {offset}, \"{storage}\")");
            let _ = writeln!(
                out,
                "        set => NumPut(\"{storage}\", value, this, {offset})"
            );
            out.push_str("    }\n");
        }
    }

    Ok(())
}
