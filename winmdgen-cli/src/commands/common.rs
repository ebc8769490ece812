use std::path::Path;

use anyhow::Context;
use winmdgen::{metadata::view::Metadata, MetadataView};

/// Load a metadata image, memory-mapped.
pub fn load_view(path: &Path) -> anyhow::Result<MetadataView> {
    MetadataView::from_file(path)
        .with_context(|| format!("failed to load metadata: {}", path.display()))
}

/// Find the TypeDef row of a namespace-qualified name.
///
/// Top-level types are looked up by namespace and name; nested types (`Ns.Outer.Inner`)
/// fall back to a scan over every qualified name.
pub fn find_type(metadata: &Metadata<'_>, qualified: &str) -> anyhow::Result<u32> {
    if let Some((namespace, name)) = qualified.rsplit_once('.') {
        if let Some(rid) = metadata.find_typedef(namespace, name) {
            return Ok(rid);
        }
    }

    (1..=metadata.type_count())
        .find(|rid| {
            metadata
                .qualified_name(*rid)
                .is_ok_and(|candidate| candidate == qualified)
        })
        .with_context(|| format!("type not found: {qualified}"))
}
