use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use winmdgen::metadata::typesystem::{StructLayout, TypeDecoder, TypeRegistry};

use crate::{
    app::GlobalOptions,
    commands::common::{find_type, load_view},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct MemberEntry {
    offset: u32,
    size: u32,
    name: String,
    r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    flags: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bitfields: Vec<BitfieldEntry>,
}

#[derive(Debug, Serialize)]
struct BitfieldEntry {
    name: String,
    offset: u32,
    length: u32,
}

#[derive(Debug, Serialize)]
struct LayoutOutput {
    name: String,
    kind: String,
    size: u32,
    packing: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    flags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    struct_size_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    architecture: Option<u32>,
    members: Vec<MemberEntry>,
}

fn flag_names<I: Iterator<Item = (&'static str, F)>, F>(names: I) -> String {
    names.map(|(name, _)| name).collect::<Vec<_>>().join(" | ")
}

fn describe(layout: &StructLayout) -> LayoutOutput {
    let members = layout
        .members
        .iter()
        .map(|member| MemberEntry {
            offset: member.offset,
            size: member.size,
            name: member.name.clone(),
            r#type: member.descriptor.to_string(),
            flags: flag_names(member.flags.iter_names()),
            bitfields: member
                .bitfields
                .iter()
                .map(|bitfield| BitfieldEntry {
                    name: bitfield.name.clone(),
                    offset: bitfield.offset,
                    length: bitfield.length,
                })
                .collect(),
        })
        .collect();

    LayoutOutput {
        name: layout.qualified_name.clone(),
        kind: if layout.is_union() { "union" } else { "struct" }.to_string(),
        size: layout.size,
        packing: layout.packing_size,
        flags: flag_names(layout.flags.iter_names()),
        struct_size_field: layout.struct_size_field.clone(),
        architecture: layout.architecture,
        members,
    }
}

pub fn run(path: &Path, name: &str, opts: &GlobalOptions) -> anyhow::Result<()> {
    let view = load_view(path)?;
    let metadata = view.metadata();
    let rid = find_type(metadata, name)?;

    let registry = TypeRegistry::new();
    let mut decoder = TypeDecoder::new(metadata, &registry);
    let layout = decoder
        .layout(rid)
        .with_context(|| format!("failed to compute the layout of {name}"))?;

    print_output(&describe(&layout), opts, |out| {
        println!("Type:     {} ({})", out.name, out.kind);
        println!("Size:     {}", out.size);
        println!("Packing:  {}", out.packing);
        if !out.flags.is_empty() {
            println!("Flags:    {}", out.flags);
        }
        if let Some(field) = &out.struct_size_field {
            println!("Size at:  {field}");
        }
        if let Some(mask) = out.architecture {
            println!("Arch:     0x{mask:X}");
        }

        println!();
        let mut tw = TabWriter::new(vec![
            ("Offset", Align::Right),
            ("Size", Align::Right),
            ("Name", Align::Left),
            ("Type", Align::Left),
            ("Flags", Align::Left),
        ]);
        for m in &out.members {
            tw.row(vec![
                m.offset.to_string(),
                m.size.to_string(),
                m.name.clone(),
                m.r#type.clone(),
                m.flags.clone(),
            ]);
            for b in &m.bitfields {
                tw.row(vec![
                    String::new(),
                    String::new(),
                    format!("  .{}", b.name),
                    format!("bits {}..{}", b.offset, b.offset + b.length),
                    String::new(),
                ]);
            }
        }
        tw.print();
    })
}
