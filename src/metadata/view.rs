//! Loaded metadata images.
//!
//! [`MetadataView`] owns the bytes of an image (a PE container or a bare `BSJB` root) and
//! keeps a [`Metadata`] view borrowing from them: the metadata root, the streams the
//! generator consumes, and the [`MetadataIndex`] built over the tables. Everything above
//! this layer works with `&Metadata` and never touches raw offsets.
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::MetadataView;
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let metadata = view.metadata();
//! println!("{} ({} types)", metadata.version(), metadata.type_count());
//! # Ok::<(), winmdgen::Error>(())
//! ```

use std::path::Path;

use ouroboros::self_referencing;

use crate::{
    file::File,
    metadata::{
        cor20header::Cor20Header,
        customattributes::{CustomAttribute, KnownAttribute},
        index::MetadataIndex,
        root::Root,
        signatures::{parse_method_signature, SignatureParameter},
        streams::{Blob, Guid, Strings, TablesHeader},
        tables::{
            ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldRaw, ImplMapRaw,
            InterfaceImplRaw, MemberRefRaw, MethodDefRaw, ModuleRaw, ModuleRefRaw, ParamRaw,
            RowReadable, TableId, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
    },
    Error, Result,
};

/// Stand-in for an absent `#Strings` or `#Blob` heap
static EMPTY_HEAP: [u8; 1] = [0];

/// The bytes a [`MetadataView`] is built over
enum Source {
    /// A PE image carrying a CLR header
    Image(File),
    /// A bare metadata root
    Metadata(Vec<u8>),
}

impl Source {
    /// Returns the bytes of the metadata root.
    fn metadata_root(&self) -> Result<&[u8]> {
        match self {
            Source::Metadata(data) => Ok(data),
            Source::Image(file) => {
                let (clr_rva, clr_size) = file.clr()?;
                let clr_offset = file.rva_to_offset(clr_rva)?;
                let cor20_header = Cor20Header::read(file.data_slice(clr_offset, clr_size)?)?;

                let metadata_offset = file.rva_to_offset(cor20_header.meta_data_rva as usize)?;
                file.data_slice(metadata_offset, cor20_header.meta_data_size as usize)
            }
        }
    }
}

/// Borrowed view over the streams and indices of one metadata image.
pub struct Metadata<'a> {
    root: Root,
    tables: TablesHeader<'a>,
    strings: Strings<'a>,
    blobs: Blob<'a>,
    guids: Guid<'a>,
    index: MetadataIndex,
}

impl<'a> Metadata<'a> {
    /// Parses the metadata root in `data` and indexes its tables.
    ///
    /// # Errors
    /// Returns an error if the root or a stream is malformed, or if the image has no `#~`
    /// stream.
    pub fn read(data: &'a [u8]) -> Result<Metadata<'a>> {
        let root = Root::read(data)?;

        let mut tables = None;
        let mut strings = None;
        let mut blobs = None;
        let mut guids = None;

        for stream in &root.stream_headers {
            let start = stream.offset as usize;
            let end = start + stream.size as usize;
            let Some(stream_data) = data.get(start..end) else {
                return Err(out_of_bounds_error!());
            };

            match stream.name.as_str() {
                "#~" | "#-" => tables = Some(TablesHeader::from(stream_data)?),
                "#Strings" => strings = Some(Strings::from(stream_data)?),
                "#Blob" => blobs = Some(Blob::from(stream_data)?),
                "#GUID" => guids = Some(Guid::from(stream_data)?),
                _ => {}
            }
        }

        let Some(tables) = tables else {
            return Err(malformed_error!("Metadata has no #~ stream"));
        };
        let strings = match strings {
            Some(strings) => strings,
            None => Strings::from(&EMPTY_HEAP)?,
        };
        let blobs = match blobs {
            Some(blobs) => blobs,
            None => Blob::from(&EMPTY_HEAP)?,
        };
        let guids = match guids {
            Some(guids) => guids,
            None => Guid::from(&[])?,
        };

        let index = MetadataIndex::build(&tables, &strings)?;

        Ok(Metadata {
            root,
            tables,
            strings,
            blobs,
            guids,
            index,
        })
    }

    /// The metadata root.
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Version string of the metadata root.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.root.version
    }

    /// The `#~` tables header.
    #[must_use]
    pub fn tables(&self) -> &TablesHeader<'a> {
        &self.tables
    }

    /// The lookup indices built over the tables.
    #[must_use]
    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    /// Reads a string from the `#Strings` heap.
    ///
    /// # Errors
    /// Returns an error if `index` is outside the heap or the string is invalid.
    pub fn string(&self, index: u32) -> Result<&'a str> {
        self.strings.get(index as usize)
    }

    /// Reads a blob from the `#Blob` heap.
    ///
    /// # Errors
    /// Returns an error if `index` is outside the heap.
    pub fn blob(&self, index: u32) -> Result<&'a [u8]> {
        self.blobs.get(index as usize)
    }

    /// Reads a GUID from the `#GUID` heap.
    ///
    /// # Errors
    /// Returns an error if `index` is outside the heap.
    pub fn guid(&self, index: u32) -> Result<uguid::Guid> {
        self.guids.get(index as usize)
    }

    /// Decodes row `rid` of the table of row type `T`.
    #[must_use]
    pub fn row<T: RowReadable>(&self, rid: u32) -> Option<T> {
        self.tables.table::<T>()?.get(rid)
    }

    /// Number of rows in the TypeDef table.
    #[must_use]
    pub fn type_count(&self) -> u32 {
        self.tables.table_row_count(TableId::TypeDef)
    }

    /// Iterates the TypeDef table in table order.
    pub fn typedefs(&self) -> impl Iterator<Item = TypeDefRaw> + 'a {
        self.tables.table::<TypeDefRaw>().into_iter().flat_map(|table| {
            let row_count = table.row_count();
            (1..=row_count).filter_map(move |rid| table.get(rid))
        })
    }

    /// Returns TypeDef row `rid`.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the row does not exist.
    pub fn typedef(&self, rid: u32) -> Result<TypeDefRaw> {
        self.row::<TypeDefRaw>(rid)
            .ok_or(Error::TypeNotFound(TableId::TypeDef.token(rid)))
    }

    /// Returns the TypeRef row `rid`.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the row does not exist.
    pub fn typeref(&self, rid: u32) -> Result<TypeRefRaw> {
        self.row::<TypeRefRaw>(rid)
            .ok_or(Error::TypeNotFound(TableId::TypeRef.token(rid)))
    }

    /// Namespace and name of a TypeDef row.
    ///
    /// # Errors
    /// Returns an error if a name cannot be read from the `#Strings` heap.
    pub fn typedef_name(&self, typedef: &TypeDefRaw) -> Result<(&'a str, &'a str)> {
        Ok((
            self.string(typedef.type_namespace)?,
            self.string(typedef.type_name)?,
        ))
    }

    /// Namespace and name of a TypeRef row.
    ///
    /// # Errors
    /// Returns an error if a name cannot be read from the `#Strings` heap.
    pub fn typeref_name(&self, typeref: &TypeRefRaw) -> Result<(&'a str, &'a str)> {
        Ok((
            self.string(typeref.type_namespace)?,
            self.string(typeref.type_name)?,
        ))
    }

    /// Qualified name of a TypeDef row.
    ///
    /// Nested types are qualified by their enclosing type, `Namespace.Outer.Inner`, so
    /// that compiler-generated aggregates sharing a simple name stay distinct.
    ///
    /// # Errors
    /// Returns an error if a row or name cannot be read.
    pub fn qualified_name(&self, rid: u32) -> Result<String> {
        let typedef = self.typedef(rid)?;
        let (namespace, name) = self.typedef_name(&typedef)?;

        let mut segments = vec![name];
        let mut namespace = namespace;
        let mut current = rid;
        let mut depth = 0;
        while let Some(enclosing) = self.index.enclosing_type(current) {
            depth += 1;
            if depth > 64 {
                return Err(Error::RecursionLimit(64));
            }

            let outer = self.typedef(enclosing)?;
            let (outer_namespace, outer_name) = self.typedef_name(&outer)?;
            segments.push(outer_name);
            namespace = outer_namespace;
            current = enclosing;
        }

        segments.reverse();
        let name = segments.join(".");
        if namespace.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{namespace}.{name}"))
        }
    }

    /// First top-level TypeDef named `namespace.name`.
    #[must_use]
    pub fn find_typedef(&self, namespace: &str, name: &str) -> Option<u32> {
        self.index.types_named(namespace, name).first().copied()
    }

    /// Fields owned by a TypeDef row, in declaration order.
    #[must_use]
    pub fn fields(&self, typedef: u32) -> Vec<FieldRaw> {
        let Some(table) = self.tables.table::<FieldRaw>() else {
            return Vec::new();
        };
        self.index
            .field_range(typedef)
            .filter_map(|rid| table.get(rid))
            .collect()
    }

    /// Methods owned by a TypeDef row, in declaration order.
    #[must_use]
    pub fn methods(&self, typedef: u32) -> Vec<MethodDefRaw> {
        let Some(table) = self.tables.table::<MethodDefRaw>() else {
            return Vec::new();
        };
        self.index
            .method_range(typedef)
            .filter_map(|rid| table.get(rid))
            .collect()
    }

    /// Param rows owned by a MethodDef row, ordered by sequence.
    #[must_use]
    pub fn params(&self, method: u32) -> Vec<ParamRaw> {
        let Some(table) = self.tables.table::<ParamRaw>() else {
            return Vec::new();
        };
        let mut params: Vec<ParamRaw> = self
            .index
            .param_range(method)
            .filter_map(|rid| table.get(rid))
            .collect();
        params.sort_by_key(|param| param.sequence);
        params
    }

    /// The ClassLayout row of a TypeDef row.
    #[must_use]
    pub fn class_layout(&self, typedef: u32) -> Option<ClassLayoutRaw> {
        self.row(self.index.class_layout(typedef)?)
    }

    /// The explicit offset of a Field row.
    #[must_use]
    pub fn field_offset(&self, field: u32) -> Option<u32> {
        self.index.field_offset(field)
    }

    /// The Constant row attached to `parent`.
    #[must_use]
    pub fn constant(&self, parent: Token) -> Option<ConstantRaw> {
        self.row(self.index.constant(parent)?)
    }

    /// The ImplMap row of a MethodDef row.
    #[must_use]
    pub fn impl_map(&self, method: u32) -> Option<ImplMapRaw> {
        self.row(self.index.impl_map(method)?)
    }

    /// Name of a ModuleRef row, the library of a P/Invoke import.
    ///
    /// # Errors
    /// Returns an error if the row or its name cannot be read.
    pub fn module_ref_name(&self, rid: u32) -> Result<&'a str> {
        let module_ref = self
            .row::<ModuleRefRaw>(rid)
            .ok_or(Error::TypeNotFound(TableId::ModuleRef.token(rid)))?;
        self.string(module_ref.name)
    }

    /// InterfaceImpl rows of a TypeDef row.
    #[must_use]
    pub fn interface_impls(&self, typedef: u32) -> Vec<InterfaceImplRaw> {
        self.index
            .interface_impls(typedef)
            .iter()
            .filter_map(|rid| self.row(*rid))
            .collect()
    }

    /// Name of the module, from the first Module row.
    ///
    /// # Errors
    /// Returns an error if the image has no Module row.
    pub fn module_name(&self) -> Result<&'a str> {
        let module = self
            .row::<ModuleRaw>(1)
            .ok_or_else(|| Error::MissingData("Module row".to_string()))?;
        self.string(module.name)
    }

    /// MVID of the module.
    ///
    /// # Errors
    /// Returns an error if the image has no Module row or the GUID is out of bounds.
    pub fn mvid(&self) -> Result<uguid::Guid> {
        let module = self
            .row::<ModuleRaw>(1)
            .ok_or_else(|| Error::MissingData("Module row".to_string()))?;
        self.guid(module.mvid)
    }

    /// Namespace and name of the type declaring an attribute constructor.
    fn attribute_type_name(&self, attribute: &CustomAttributeRaw) -> Result<(&'a str, &'a str)> {
        match attribute.constructor.tag {
            TableId::MemberRef => {
                let member_ref = self
                    .row::<MemberRefRaw>(attribute.constructor.row)
                    .ok_or(Error::TypeNotFound(attribute.constructor.token))?;
                match member_ref.class.tag {
                    TableId::TypeRef => self.typeref_name(&self.typeref(member_ref.class.row)?),
                    TableId::TypeDef => self.typedef_name(&self.typedef(member_ref.class.row)?),
                    _ => Err(Error::Unsupported(format!(
                        "attribute constructor parent {:?}",
                        member_ref.class.tag
                    ))),
                }
            }
            TableId::MethodDef => {
                let owner = self
                    .index
                    .method_owner(attribute.constructor.row)
                    .ok_or(Error::TypeNotFound(attribute.constructor.token))?;
                self.typedef_name(&self.typedef(owner)?)
            }
            other => Err(malformed_error!(
                "Invalid attribute constructor table - {:?}",
                other
            )),
        }
    }

    /// Parameters of an attribute constructor.
    fn attribute_params(&self, attribute: &CustomAttributeRaw) -> Result<Vec<SignatureParameter>> {
        let signature = match attribute.constructor.tag {
            TableId::MemberRef => {
                self.row::<MemberRefRaw>(attribute.constructor.row)
                    .ok_or(Error::TypeNotFound(attribute.constructor.token))?
                    .signature
            }
            _ => {
                self.row::<MethodDefRaw>(attribute.constructor.row)
                    .ok_or(Error::TypeNotFound(attribute.constructor.token))?
                    .signature
            }
        };

        Ok(parse_method_signature(self.blob(signature)?)?.params)
    }

    /// Custom attributes applied to `parent`, in table order.
    ///
    /// # Errors
    /// Returns an error if an attribute constructor or its signature cannot be read.
    pub fn custom_attributes(&self, parent: Token) -> Result<Vec<CustomAttribute<'a>>> {
        let Some(table) = self.tables.table::<CustomAttributeRaw>() else {
            return Ok(Vec::new());
        };

        let mut attributes = Vec::new();
        for rid in self.index.attributes(parent) {
            let Some(row) = table.get(*rid) else {
                continue;
            };

            let (namespace, name) = self.attribute_type_name(&row)?;
            // Unrecognized attributes are only ever matched by name
            let params = if KnownAttribute::recognizes(name) {
                self.attribute_params(&row)?
            } else {
                Vec::new()
            };

            attributes.push(CustomAttribute {
                parent,
                name,
                namespace,
                blob: self.blob(row.value)?,
                params,
            });
        }

        Ok(attributes)
    }

    /// Decoded attributes of `parent` that belong to the supported set.
    ///
    /// # Errors
    /// Returns an error if a supported attribute is malformed.
    pub fn known_attributes(&self, parent: Token) -> Result<Vec<KnownAttribute>> {
        let mut known = Vec::new();
        for attribute in self.custom_attributes(parent)? {
            if let Some(decoded) = attribute.known()? {
                known.push(decoded);
            }
        }
        Ok(known)
    }

    /// Returns `true` if `parent` carries an attribute named `name`.
    ///
    /// Attribute blobs are not decoded.
    #[must_use]
    pub fn has_attribute(&self, parent: Token, name: &str) -> bool {
        let Some(table) = self.tables.table::<CustomAttributeRaw>() else {
            return false;
        };

        self.index.attributes(parent).iter().any(|rid| {
            table
                .get(*rid)
                .and_then(|row| self.attribute_type_name(&row).ok())
                .is_some_and(|(_, attribute)| {
                    attribute.strip_suffix("Attribute").unwrap_or(attribute)
                        == name.strip_suffix("Attribute").unwrap_or(name)
                })
        })
    }
}

#[self_referencing]
/// An owned metadata image.
///
/// The view keeps the image bytes alive and exposes the [`Metadata`] borrowed from them.
/// It is `Send + Sync`, so one view can back a parallel generator run.
pub struct MetadataView {
    /// The bytes of the image
    source: Source,

    #[borrows(source)]
    #[covariant]
    /// The decoded view over `source`
    metadata: Metadata<'this>,
}

impl MetadataView {
    /// Loads a metadata image (`.winmd`) from disk through a memory map.
    ///
    /// The PE container is parsed once, the CLR header located and the metadata root
    /// decoded and indexed; the mapping stays alive for as long as the view does.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the metadata image
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use winmdgen::MetadataView;
    /// use std::path::Path;
    ///
    /// let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
    /// println!("{} types", view.metadata().type_count());
    /// # Ok::<(), winmdgen::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a PE image with a CLR header, or
    /// carries malformed metadata.
    pub fn from_file(path: &Path) -> Result<MetadataView> {
        Self::load(Source::Image(File::from_file(path)?))
    }

    /// Loads a metadata image from a PE image in memory.
    ///
    /// # Errors
    /// See [`MetadataView::from_file`].
    pub fn from_mem(data: Vec<u8>) -> Result<MetadataView> {
        Self::load(Source::Image(File::from_mem(data)?))
    }

    /// Loads a bare metadata root (starting with `BSJB`) without a PE container.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty or the metadata is malformed.
    pub fn from_metadata(data: Vec<u8>) -> Result<MetadataView> {
        if data.is_empty() {
            return Err(Error::Empty);
        }

        Self::load(Source::Metadata(data))
    }

    fn load(source: Source) -> Result<MetadataView> {
        MetadataView::try_new(source, |source| Metadata::read(source.metadata_root()?))
    }

    /// The decoded metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata<'_> {
        self.borrow_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MetadataBuilder;

    #[test]
    fn empty() {
        assert!(matches!(
            MetadataView::from_metadata(Vec::new()),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn not_metadata() {
        assert!(MetadataView::from_metadata(vec![0u8; 64]).is_err());
    }

    #[test]
    fn built_image() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let outer = builder.struct_type("Windows.Win32.Test", "OUTER").finish();
        builder
            .struct_type("", "_Anonymous_e__Union")
            .nested_in(outer)
            .finish();

        let view = MetadataView::from_metadata(builder.build().unwrap()).unwrap();
        let metadata = view.metadata();

        assert_eq!(metadata.module_name().unwrap(), "Test.winmd");
        assert_eq!(metadata.version(), "WindowsRuntime 1.4");
        assert!(metadata.find_typedef("Windows.Win32.Test", "OUTER").is_some());
        assert!(metadata.find_typedef("", "_Anonymous_e__Union").is_none());

        let nested = metadata.index().nested_types(outer)[0];
        assert_eq!(
            metadata.qualified_name(nested).unwrap(),
            "Windows.Win32.Test.OUTER._Anonymous_e__Union"
        );
    }
}
