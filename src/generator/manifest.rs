//! The `manifest.xml` record of what a run consumed.

use md5::{Digest, Md5};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};
use sha1::Sha1;

use crate::{generator::RunSummary, metadata::view::Metadata, Result};

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Digests of one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDigest {
    /// File name
    pub name: String,
    /// Lower-case hex SHA-1
    pub sha1: String,
    /// Lower-case hex MD5
    pub md5: String,
}

impl InputDigest {
    /// Hashes `data`, recorded under `name`.
    pub fn of(name: impl Into<String>, data: &[u8]) -> InputDigest {
        InputDigest {
            name: name.into(),
            sha1: to_hex(&Sha1::digest(data)),
            md5: to_hex(&Md5::digest(data)),
        }
    }
}

/// Renders the manifest of a run over `metadata`.
pub(crate) fn render(
    metadata: &Metadata<'_>,
    inputs: &[InputDigest],
    summary: &RunSummary,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("manifest").with_attributes([
        ("generator", env!("CARGO_PKG_NAME")),
        ("version", env!("CARGO_PKG_VERSION")),
    ])))?;

    let module = metadata.module_name()?;
    let mvid = metadata.mvid()?.to_string();
    writer.write_event(Event::Empty(BytesStart::new("metadata").with_attributes([
        ("version", metadata.version()),
        ("module", module),
        ("mvid", mvid.as_str()),
    ])))?;

    for input in inputs {
        writer.write_event(Event::Empty(BytesStart::new("input").with_attributes([
            ("name", input.name.as_str()),
            ("sha1", input.sha1.as_str()),
            ("md5", input.md5.as_str()),
        ])))?;
    }

    let emitted = summary.emitted.to_string();
    let skipped = summary.skipped.to_string();
    let failed = summary.failed.to_string();
    writer.write_event(Event::Empty(BytesStart::new("summary").with_attributes([
        ("emitted", emitted.as_str()),
        ("skipped", skipped.as_str()),
        ("failed", failed.as_str()),
    ])))?;

    writer.write_event(Event::End(BytesEnd::new("manifest")))?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests() {
        let digest = InputDigest::of("empty.winmd", b"");
        assert_eq!(digest.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(digest.md5, "d41d8cd98f00b204e9800998ecf8427e");

        let digest = InputDigest::of("abc", b"abc");
        assert_eq!(digest.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(digest.md5, "900150983cd24fb0d6963f7d28e17f72");
    }
}
