//! Resolution of TypeRef rows to TypeDef rows of the same image.
//!
//! A TypeRef names its target by namespace, name and resolution scope:
//!
//! - `Module`: the type lives in this image and is found through the name index;
//! - `TypeRef`: the type is nested, so the enclosing reference is resolved first and its
//!   nested types are searched by name;
//! - `AssemblyRef` / `ModuleRef`: the type lives elsewhere. Resolution fails and callers fall
//!   back to an opaque pointer.
//!
//! The context-scoped path resolves a reference against the nested types of one declaring
//! type only. Compiler-generated aggregates share simple names across many parents
//! (`_Anonymous_e__Union`), so a reference emitted inside such a parent must be looked up
//! there first.

use crate::{
    metadata::{tables::TableId, view::Metadata},
    Error, Result,
};

/// Nesting depth after which a TypeRef chain is considered malformed
const MAX_NESTING_DEPTH: usize = 64;

/// Resolves TypeRef rows of one image
#[derive(Clone, Copy)]
pub struct TypeResolver<'m, 'a> {
    metadata: &'m Metadata<'a>,
}

impl<'m, 'a> TypeResolver<'m, 'a> {
    /// Creates a resolver over `metadata`.
    #[must_use]
    pub fn new(metadata: &'m Metadata<'a>) -> Self {
        TypeResolver { metadata }
    }

    /// Resolves TypeRef row `typeref` globally.
    ///
    /// Returns `Ok(None)` for references to other assemblies or modules, and for local
    /// references that name no existing type.
    ///
    /// # Errors
    /// Returns an error if a row or name cannot be read, or the nesting chain is too deep.
    pub fn resolve(&self, typeref: u32) -> Result<Option<u32>> {
        self.resolve_with_depth(typeref, 0)
    }

    fn resolve_with_depth(&self, typeref: u32, depth: usize) -> Result<Option<u32>> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(Error::RecursionLimit(MAX_NESTING_DEPTH));
        }

        let row = self.metadata.typeref(typeref)?;
        let (namespace, name) = self.metadata.typeref_name(&row)?;

        match row.resolution_scope.tag {
            TableId::Module => Ok(self.metadata.find_typedef(namespace, name)),
            TableId::TypeRef => match self.resolve_with_depth(row.resolution_scope.row, depth + 1)? {
                Some(enclosing) => self.find_nested(enclosing, name),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// Resolves TypeRef row `typeref` against the nested types of `context` only.
    ///
    /// # Errors
    /// Returns an error if a row or name cannot be read.
    pub fn resolve_in(&self, typeref: u32, context: u32) -> Result<Option<u32>> {
        let row = self.metadata.typeref(typeref)?;
        let (_, name) = self.metadata.typeref_name(&row)?;
        self.find_nested(context, name)
    }

    /// Resolves a reference used inside `context`: nested types of the context first, then
    /// the global path.
    ///
    /// # Errors
    /// See [`TypeResolver::resolve`].
    pub fn resolve_from(&self, typeref: u32, context: Option<u32>) -> Result<Option<u32>> {
        if let Some(context) = context {
            if let Some(found) = self.resolve_in(typeref, context)? {
                return Ok(Some(found));
            }
        }

        self.resolve(typeref)
    }

    /// Namespace and name a TypeRef row points at.
    ///
    /// # Errors
    /// Returns an error if the row or its names cannot be read.
    pub fn referenced_name(&self, typeref: u32) -> Result<(&'a str, &'a str)> {
        let row = self.metadata.typeref(typeref)?;
        self.metadata.typeref_name(&row)
    }

    fn find_nested(&self, enclosing: u32, name: &str) -> Result<Option<u32>> {
        for nested in self.metadata.index().nested_types(enclosing) {
            let typedef = self.metadata.typedef(*nested)?;
            if self.metadata.string(typedef.type_name)? == name {
                return Ok(Some(*nested));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::MetadataBuilder, metadata::view::MetadataView};

    #[test]
    fn resolution_scopes() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let rect = builder.struct_type("Windows.Win32.Foundation", "RECT").finish();
        let outer = builder.struct_type("Windows.Win32.Test", "OUTER").finish();
        let nested = builder
            .struct_type("", "_Anonymous_e__Union")
            .nested_in(outer)
            .finish();

        let local = builder.type_ref("Windows.Win32.Foundation", "RECT");
        let external = builder.external_type_ref("System", "Guid");
        let outer_ref = builder.type_ref("Windows.Win32.Test", "OUTER");
        let nested_ref = builder.nested_type_ref(outer_ref, "_Anonymous_e__Union");
        let missing = builder.type_ref("Windows.Win32.Test", "MISSING");

        let view = MetadataView::from_metadata(builder.build().unwrap()).unwrap();
        let resolver = TypeResolver::new(view.metadata());

        assert_eq!(resolver.resolve(local).unwrap(), Some(rect));
        assert_eq!(resolver.resolve(external).unwrap(), None);
        assert_eq!(resolver.resolve(nested_ref).unwrap(), Some(nested));
        assert_eq!(resolver.resolve(missing).unwrap(), None);
        assert_eq!(resolver.resolve_in(nested_ref, outer).unwrap(), Some(nested));
        assert_eq!(resolver.resolve_in(local, outer).unwrap(), None);
        assert_eq!(resolver.resolve_from(local, Some(outer)).unwrap(), Some(rect));
        assert_eq!(
            resolver.referenced_name(external).unwrap(),
            ("System", "Guid")
        );
    }
}
