//! Decoding of signatures into [`TypeDescriptor`]s and classification of type definitions.
//!
//! The decoder is the only place where raw [`TypeSignature`] trees meet the type tables.
//! Every token a signature names is resolved and classified:
//!
//! | Definition | Descriptor |
//! |---|---|
//! | `HRESULT` | [`TypeDescriptor::Hresult`] |
//! | derives from `System.Enum` | `Primitive` of its `value__` field, aliased to the enum name |
//! | interface with a GUID, an `IUnknown`/`IDispatch` base, or abstract without base | [`TypeDescriptor::ComInterface`] |
//! | no fields and `UnmanagedFunctionPointerAttribute` | [`TypeDescriptor::FunctionPointer`] |
//! | one instance field decoding to a scalar | `NativeTypedef` with the marker attribute, else the collapsed scalar |
//! | anything else | [`TypeDescriptor::Struct`] with its computed layout |
//!
//! References that leave the image degrade to opaque pointers and never fail. Pointees are
//! decoded without building layouts, so types that point at each other resolve without
//! recursion; a type that contains itself by value is reported as
//! [`crate::Error::CyclicLayout`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::{metadata::typesystem::{TypeDecoder, TypeRegistry}, MetadataView};
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let registry = TypeRegistry::new();
//! let mut decoder = TypeDecoder::new(view.metadata(), &registry);
//!
//! if let Some(rect) = view.metadata().find_typedef("Windows.Win32.Foundation", "RECT") {
//!     let layout = decoder.layout(rect)?;
//!     println!("RECT is {} bytes", layout.size);
//! }
//! # Ok::<(), winmdgen::Error>(())
//! ```

use std::{collections::HashSet, sync::Arc};

use log::debug;

use crate::{
    metadata::{
        customattributes::KnownAttribute,
        signatures::{
            parse_field_signature, parse_type_spec_signature, SignatureArray,
            SignatureParameter, TypeSignature,
        },
        tables::{FieldAttributes, FieldRaw, TableId, TypeAttributes, TypeDefRaw, TypeSpecRaw},
        token::Token,
        typesystem::{
            compute_layout, default_packing, Bitfield, FieldInput, LayoutFlags, LayoutInput,
            LayoutKind, MemberFlags, PrimitiveKind, StructLayout, TypeDescriptor, TypeRegistry,
            TypeResolver,
        },
        view::Metadata,
    },
    Error, Result,
};

/// Prefix of padding members synthesised by the metadata generator
const ALIGNMENT_PREFIX: &str = "___MISSING_ALIGNMENT__";

/// Outcome of classifying a TypeDef row, before any layout is built
enum Classified {
    Descriptor(TypeDescriptor),
    Struct,
    ComInterface,
}

/// Collapses the single-field wrapper `name` around `inner` to the scalar it stands for.
///
/// Pointer-sized integers, pointers and function pointers become an opaque pointer named
/// after the wrapper; other primitives keep their kind under the wrapper's name. Applying
/// the collapse to its own output yields the same descriptor.
#[must_use]
pub fn collapse(name: &str, inner: &TypeDescriptor) -> TypeDescriptor {
    match inner.terminal() {
        TypeDescriptor::Primitive { kind, .. } if kind.is_pointer_sized() => {
            TypeDescriptor::opaque(name)
        }
        TypeDescriptor::Primitive { kind, .. } => TypeDescriptor::Primitive {
            kind: *kind,
            alias: Some(name.to_string()),
        },
        TypeDescriptor::Pointer { .. } | TypeDescriptor::FunctionPointer(_) => {
            TypeDescriptor::opaque(name)
        }
        TypeDescriptor::Hresult => TypeDescriptor::Hresult,
        other => other.clone(),
    }
}

fn primitive_kind(signature: &TypeSignature) -> Option<PrimitiveKind> {
    let kind = match signature {
        TypeSignature::Void => PrimitiveKind::Void,
        TypeSignature::Boolean => PrimitiveKind::Boolean,
        TypeSignature::Char => PrimitiveKind::Char,
        TypeSignature::I1 => PrimitiveKind::SByte,
        TypeSignature::U1 => PrimitiveKind::Byte,
        TypeSignature::I2 => PrimitiveKind::Int16,
        TypeSignature::U2 => PrimitiveKind::UInt16,
        TypeSignature::I4 => PrimitiveKind::Int32,
        TypeSignature::U4 => PrimitiveKind::UInt32,
        TypeSignature::I8 => PrimitiveKind::Int64,
        TypeSignature::U8 => PrimitiveKind::UInt64,
        TypeSignature::R4 => PrimitiveKind::Single,
        TypeSignature::R8 => PrimitiveKind::Double,
        TypeSignature::I => PrimitiveKind::IntPtr,
        TypeSignature::U => PrimitiveKind::UIntPtr,
        _ => return None,
    };
    Some(kind)
}

fn is_instance(field: &FieldRaw) -> bool {
    let flags = u32::from(field.flags);
    flags & (FieldAttributes::STATIC | FieldAttributes::LITERAL) == 0
}

fn is_character(name: &str) -> bool {
    ["char", "wchar", "tchar"]
        .iter()
        .any(|character| name.eq_ignore_ascii_case(character))
}

/// Decodes signatures and type definitions of one image into [`TypeDescriptor`]s.
///
/// A decoder is cheap and single-threaded; parallel runs create one per worker and share
/// the [`TypeRegistry`].
pub struct TypeDecoder<'m, 'a> {
    metadata: &'m Metadata<'a>,
    registry: &'m TypeRegistry,
    resolver: TypeResolver<'m, 'a>,
    /// Layouts under construction, for by-value cycle detection
    visiting: HashSet<u32>,
    /// Types under classification, for pointer cycles through single-field wrappers
    classifying: HashSet<u32>,
}

impl<'m, 'a> TypeDecoder<'m, 'a> {
    /// Creates a decoder over `metadata` that stores layouts in `registry`.
    #[must_use]
    pub fn new(metadata: &'m Metadata<'a>, registry: &'m TypeRegistry) -> Self {
        TypeDecoder {
            metadata,
            registry,
            resolver: TypeResolver::new(metadata),
            visiting: HashSet::new(),
            classifying: HashSet::new(),
        }
    }

    /// The image being decoded.
    #[must_use]
    pub fn metadata(&self) -> &'m Metadata<'a> {
        self.metadata
    }

    /// The registry layouts are stored in.
    #[must_use]
    pub fn registry(&self) -> &'m TypeRegistry {
        self.registry
    }

    /// The resolver used for TypeRef rows.
    #[must_use]
    pub fn resolver(&self) -> TypeResolver<'m, 'a> {
        self.resolver
    }

    /// Decodes the signature of `field`, declared by TypeDef row `context`.
    ///
    /// # Errors
    /// Returns an error if the blob is not a field signature or a named type cannot be read.
    pub fn decode_field(&mut self, field: &FieldRaw, context: u32) -> Result<TypeDescriptor> {
        let signature = parse_field_signature(self.metadata.blob(field.signature)?)?;
        self.decode_signature(&signature.base, Some(context))
    }

    /// Decodes a parameter or return slot. By-reference parameters decode to an opaque
    /// pointer named after the referenced type.
    ///
    /// # Errors
    /// See [`TypeDecoder::decode_signature`].
    pub fn decode_parameter(
        &mut self,
        parameter: &SignatureParameter,
        context: Option<u32>,
    ) -> Result<TypeDescriptor> {
        if parameter.by_ref {
            let (name, _) = self.decode_pointee(&parameter.base, context)?;
            return Ok(TypeDescriptor::opaque(name));
        }

        self.decode_signature(&parameter.base, context)
    }

    /// Decodes a type signature in value position.
    ///
    /// `context` is the declaring type; references are resolved against its nested types
    /// before the global lookup. Shapes outside the supported set decode to
    /// [`TypeDescriptor::Other`].
    ///
    /// # Errors
    /// Returns an error if a named row cannot be read, a TypeSpec blob is malformed, or a
    /// struct named by value cannot be laid out.
    pub fn decode_signature(
        &mut self,
        signature: &TypeSignature,
        context: Option<u32>,
    ) -> Result<TypeDescriptor> {
        if let Some(kind) = primitive_kind(signature) {
            return Ok(TypeDescriptor::primitive(kind));
        }

        match signature {
            TypeSignature::Ptr(pointer) => {
                let (name, pointee) = self.decode_pointee(&pointer.base, context)?;
                Ok(TypeDescriptor::Pointer {
                    name,
                    pointee: pointee.map(Box::new),
                })
            }
            TypeSignature::ByRef(inner) => {
                let (name, _) = self.decode_pointee(inner, context)?;
                Ok(TypeDescriptor::opaque(name))
            }
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                self.decode_token(*token, context)
            }
            TypeSignature::Array(array) => self.decode_array(array, context),
            TypeSignature::FnPtr(_) => Ok(TypeDescriptor::FunctionPointer(
                "FunctionPointer".to_string(),
            )),
            TypeSignature::Pinned(inner) => self.decode_signature(inner, context),
            TypeSignature::String => Ok(TypeDescriptor::Other("String".to_string())),
            TypeSignature::Unsupported(code) => Ok(TypeDescriptor::Other(format!(
                "element type 0x{code:02X}"
            ))),
            _ => Ok(TypeDescriptor::Other("unknown element type".to_string())),
        }
    }

    fn decode_array(
        &mut self,
        array: &SignatureArray,
        context: Option<u32>,
    ) -> Result<TypeDescriptor> {
        let element = self.decode_signature(&array.base, context)?;
        let Some(length) = array.fixed_length() else {
            return Ok(TypeDescriptor::Other(
                "array without a fixed length".to_string(),
            ));
        };

        if is_character(&element.name()) {
            return Ok(TypeDescriptor::String {
                length,
                wide: element.width() != 1,
            });
        }

        Ok(TypeDescriptor::Array {
            element: Box::new(element),
            length,
        })
    }

    fn decode_token(&mut self, token: Token, context: Option<u32>) -> Result<TypeDescriptor> {
        match token.table() {
            0x02 => self.decode_definition(token.row()),
            0x01 => match self.resolver.resolve_from(token.row(), context)? {
                Some(typedef) => self.decode_definition(typedef),
                None => self.decode_unresolved(token.row()),
            },
            0x1B => {
                let signature = self.type_spec(token)?;
                self.decode_signature(&signature, context)
            }
            _ => Err(malformed_error!("Invalid type token - {}", token)),
        }
    }

    fn type_spec(&self, token: Token) -> Result<TypeSignature> {
        let type_spec = self
            .metadata
            .row::<TypeSpecRaw>(token.row())
            .ok_or(Error::TypeNotFound(token))?;
        Ok(parse_type_spec_signature(self.metadata.blob(type_spec.signature)?)?.base)
    }

    fn decode_unresolved(&mut self, typeref: u32) -> Result<TypeDescriptor> {
        let (namespace, name) = self.resolver.referenced_name(typeref)?;
        if namespace == "System" && name == "Guid" {
            return Ok(TypeDescriptor::Struct(self.guid_layout()?));
        }

        debug!("{namespace}.{name} is not defined in this image, using an opaque pointer");
        Ok(TypeDescriptor::opaque(name))
    }

    /// Decodes a pointee without building layouts. Returns the pointee's name and, for
    /// types that are not structs or interfaces, its descriptor.
    fn decode_pointee(
        &mut self,
        signature: &TypeSignature,
        context: Option<u32>,
    ) -> Result<(String, Option<TypeDescriptor>)> {
        match signature {
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                self.decode_pointee_token(*token, context)
            }
            TypeSignature::Pinned(inner) => self.decode_pointee(inner, context),
            other => {
                let descriptor = self.decode_signature(other, context)?;
                Ok((descriptor.name(), Some(descriptor)))
            }
        }
    }

    fn decode_pointee_token(
        &mut self,
        token: Token,
        context: Option<u32>,
    ) -> Result<(String, Option<TypeDescriptor>)> {
        let typedef = match token.table() {
            0x02 => token.row(),
            0x01 => match self.resolver.resolve_from(token.row(), context)? {
                Some(typedef) => typedef,
                None => {
                    let (_, name) = self.resolver.referenced_name(token.row())?;
                    return Ok((name.to_string(), None));
                }
            },
            0x1B => {
                let signature = self.type_spec(token)?;
                return self.decode_pointee(&signature, context);
            }
            _ => return Err(malformed_error!("Invalid type token - {}", token)),
        };

        match self.classify(typedef)? {
            Classified::Descriptor(descriptor) => Ok((descriptor.name(), Some(descriptor))),
            Classified::Struct | Classified::ComInterface => {
                let row = self.metadata.typedef(typedef)?;
                let (_, name) = self.metadata.typedef_name(&row)?;
                Ok((name.to_string(), None))
            }
        }
    }

    /// Decodes TypeDef row `rid` in value position, building its layout if it is a struct
    /// or interface.
    ///
    /// # Errors
    /// Returns an error if the type cannot be classified or laid out.
    pub fn decode_definition(&mut self, rid: u32) -> Result<TypeDescriptor> {
        match self.classify(rid)? {
            Classified::Descriptor(descriptor) => Ok(descriptor),
            Classified::Struct => Ok(TypeDescriptor::Struct(self.layout(rid)?)),
            Classified::ComInterface => Ok(TypeDescriptor::ComInterface(self.com_layout(rid)?)),
        }
    }

    fn classify(&mut self, rid: u32) -> Result<Classified> {
        // A wrapper reached again while deciding what it wraps can only be pointed at
        if !self.classifying.insert(rid) {
            return Ok(Classified::Struct);
        }

        let classified = self.classify_definition(rid);
        self.classifying.remove(&rid);
        classified
    }

    fn classify_definition(&mut self, rid: u32) -> Result<Classified> {
        let typedef = self.metadata.typedef(rid)?;
        let (_, name) = self.metadata.typedef_name(&typedef)?;

        if name == "HRESULT" {
            return Ok(Classified::Descriptor(TypeDescriptor::Hresult));
        }

        let base = self.base_name(&typedef)?;
        if base == Some(("System", "Enum")) {
            return Ok(Classified::Descriptor(TypeDescriptor::Primitive {
                kind: self.enum_kind(rid)?,
                alias: Some(name.to_string()),
            }));
        }

        if typedef.flags & TypeAttributes::INTERFACE != 0 {
            if self.is_com(&typedef, base)? {
                return Ok(Classified::ComInterface);
            }
            return Ok(Classified::Descriptor(TypeDescriptor::Other(format!(
                "unsupported interface {name}"
            ))));
        }

        let fields: Vec<FieldRaw> = self
            .metadata
            .fields(rid)
            .into_iter()
            .filter(is_instance)
            .collect();

        if fields.is_empty() {
            if self
                .metadata
                .has_attribute(typedef.token, "UnmanagedFunctionPointer")
            {
                return Ok(Classified::Descriptor(TypeDescriptor::FunctionPointer(
                    name.to_string(),
                )));
            }
            if base == Some(("System", "MulticastDelegate")) {
                return Ok(Classified::Descriptor(TypeDescriptor::Other(format!(
                    "unsupported delegate {name}"
                ))));
            }
        }

        if let [field] = fields.as_slice() {
            let inner = self.decode_field(field, rid)?;
            if inner.is_scalar() {
                if self.metadata.has_attribute(typedef.token, "NativeTypedef") {
                    return Ok(Classified::Descriptor(TypeDescriptor::NativeTypedef {
                        name: name.to_string(),
                        typedef: rid,
                        underlying: Box::new(inner),
                    }));
                }
                return Ok(Classified::Descriptor(collapse(name, &inner)));
            }
        }

        Ok(Classified::Struct)
    }

    fn base_name(&self, typedef: &TypeDefRaw) -> Result<Option<(&'a str, &'a str)>> {
        if typedef.extends.is_null() {
            return Ok(None);
        }

        match typedef.extends.tag {
            TableId::TypeRef => Ok(Some(
                self.metadata
                    .typeref_name(&self.metadata.typeref(typedef.extends.row)?)?,
            )),
            TableId::TypeDef => Ok(Some(
                self.metadata
                    .typedef_name(&self.metadata.typedef(typedef.extends.row)?)?,
            )),
            _ => Ok(None),
        }
    }

    fn enum_kind(&self, rid: u32) -> Result<PrimitiveKind> {
        for field in self.metadata.fields(rid) {
            if is_instance(&field) {
                let signature = parse_field_signature(self.metadata.blob(field.signature)?)?;
                return Ok(primitive_kind(&signature.base).unwrap_or(PrimitiveKind::Int32));
            }
        }

        Ok(PrimitiveKind::Int32)
    }

    fn is_com(&self, typedef: &TypeDefRaw, base: Option<(&str, &str)>) -> Result<bool> {
        if self.metadata.has_attribute(typedef.token, "Guid") {
            return Ok(true);
        }

        let is_root = |name: &str| name == "IUnknown" || name == "IDispatch";
        if base.is_some_and(|(_, name)| is_root(name)) {
            return Ok(true);
        }

        for interface in self.metadata.interface_impls(typedef.rid) {
            let name = match interface.interface.tag {
                TableId::TypeRef => {
                    self.metadata
                        .typeref_name(&self.metadata.typeref(interface.interface.row)?)?
                        .1
                }
                TableId::TypeDef => {
                    self.metadata
                        .typedef_name(&self.metadata.typedef(interface.interface.row)?)?
                        .1
                }
                _ => continue,
            };
            if is_root(name) {
                return Ok(true);
            }
        }

        Ok(typedef.extends.is_null() && typedef.flags & TypeAttributes::ABSTRACT != 0)
    }

    /// Returns `true` if TypeDef row `rid` derives from `System.Enum`.
    ///
    /// # Errors
    /// Returns an error if the row or its base cannot be read.
    pub fn is_enum(&self, rid: u32) -> Result<bool> {
        let typedef = self.metadata.typedef(rid)?;
        Ok(self.base_name(&typedef)? == Some(("System", "Enum")))
    }

    /// Returns `true` if TypeDef row `rid` is classified as a COM interface.
    ///
    /// # Errors
    /// Returns an error if the row or its bases cannot be read.
    pub fn is_com_interface(&self, rid: u32) -> Result<bool> {
        let typedef = self.metadata.typedef(rid)?;
        if typedef.flags & TypeAttributes::INTERFACE == 0 {
            return Ok(false);
        }
        let base = self.base_name(&typedef)?;
        self.is_com(&typedef, base)
    }

    /// Returns `true` if TypeDef row `rid` is an unmanaged function pointer type.
    ///
    /// # Errors
    /// Returns an error if the row cannot be read.
    pub fn is_function_pointer(&self, rid: u32) -> Result<bool> {
        let typedef = self.metadata.typedef(rid)?;
        Ok(self
            .metadata
            .has_attribute(typedef.token, "UnmanagedFunctionPointer")
            && !self.metadata.fields(rid).iter().any(is_instance))
    }

    /// Returns `true` if TypeDef row `rid` is a handle: a native typedef with a free
    /// function or invalid values.
    ///
    /// # Errors
    /// Returns an error if the row cannot be read.
    pub fn is_handle(&self, rid: u32) -> Result<bool> {
        let token = self.metadata.typedef(rid)?.token;
        Ok(self.metadata.has_attribute(token, "NativeTypedef")
            && (self.metadata.has_attribute(token, "RAIIFree")
                || self.metadata.has_attribute(token, "InvalidHandleValue")))
    }

    /// The layout of TypeDef row `rid`, built on first request.
    ///
    /// # Errors
    /// Returns [`Error::CyclicLayout`] if the type contains itself by value,
    /// [`Error::Unsupported`] if a member has an unsupported type, and any error raised
    /// while decoding the members.
    pub fn layout(&mut self, rid: u32) -> Result<Arc<StructLayout>> {
        let qualified = self.metadata.qualified_name(rid)?;
        if self.visiting.contains(&rid) {
            return Err(Error::CyclicLayout(qualified));
        }
        if let Some(layout) = self.registry.get(&qualified) {
            return Ok(layout);
        }

        self.visiting.insert(rid);
        let registry = self.registry;
        let layout = registry.get_or_build(&qualified, || self.build_layout(rid, &qualified));
        self.visiting.remove(&rid);
        layout
    }

    /// The registry entry of COM interface `rid`. Interfaces are only ever passed by
    /// pointer, so the entry has no members.
    ///
    /// # Errors
    /// Returns an error if the row or its names cannot be read.
    pub fn com_layout(&mut self, rid: u32) -> Result<Arc<StructLayout>> {
        let qualified = self.metadata.qualified_name(rid)?;
        let typedef = self.metadata.typedef(rid)?;
        let (namespace, name) = self.metadata.typedef_name(&typedef)?;

        self.registry.get_or_build(&qualified, || {
            Ok(StructLayout {
                name: name.to_string(),
                namespace: namespace.to_string(),
                qualified_name: qualified.clone(),
                typedef: rid,
                size: 8,
                packing_size: 8,
                ..StructLayout::default()
            })
        })
    }

    fn guid_layout(&mut self) -> Result<Arc<StructLayout>> {
        self.registry.get_or_build("System.Guid", || {
            let uint = |kind| TypeDescriptor::primitive(kind);
            let computed = compute_layout(&LayoutInput {
                kind: LayoutKind::Sequential,
                packing: 8,
                union: false,
                fields: vec![
                    FieldInput::new("Data1", uint(PrimitiveKind::UInt32)),
                    FieldInput::new("Data2", uint(PrimitiveKind::UInt16)),
                    FieldInput::new("Data3", uint(PrimitiveKind::UInt16)),
                    FieldInput::new(
                        "Data4",
                        TypeDescriptor::Array {
                            element: Box::new(uint(PrimitiveKind::Byte)),
                            length: 8,
                        },
                    ),
                ],
            })?;

            Ok(StructLayout {
                name: "Guid".to_string(),
                namespace: "System".to_string(),
                qualified_name: "System.Guid".to_string(),
                kind: LayoutKind::Sequential,
                members: computed.members,
                size: computed.size,
                packing_size: computed.packing_size,
                ..StructLayout::default()
            })
        })
    }

    fn outermost_namespace(&self, rid: u32) -> Result<&'a str> {
        let mut current = rid;
        let mut depth = 0;
        while let Some(enclosing) = self.metadata.index().enclosing_type(current) {
            depth += 1;
            if depth > 64 {
                return Err(Error::RecursionLimit(64));
            }
            current = enclosing;
        }

        let typedef = self.metadata.typedef(current)?;
        Ok(self.metadata.typedef_name(&typedef)?.0)
    }

    fn build_layout(&mut self, rid: u32, qualified: &str) -> Result<StructLayout> {
        let typedef = self.metadata.typedef(rid)?;
        let (_, name) = self.metadata.typedef_name(&typedef)?;

        let kind = match typedef.flags & TypeAttributes::LAYOUT_MASK {
            TypeAttributes::EXPLICIT_LAYOUT => LayoutKind::Explicit,
            TypeAttributes::SEQUENTIAL_LAYOUT => LayoutKind::Sequential,
            _ => LayoutKind::Auto,
        };

        let mut flags = LayoutFlags::empty();
        let mut ansi = false;
        let mut unicode = typedef.flags & TypeAttributes::STRING_FORMAT_MASK
            == TypeAttributes::UNICODE_CLASS;
        let mut struct_size_field = None;
        let mut min_platform = None;
        let mut architecture = None;

        for attribute in self.metadata.known_attributes(typedef.token)? {
            match attribute {
                KnownAttribute::Ansi => ansi = true,
                KnownAttribute::Unicode => unicode = true,
                KnownAttribute::Obsolete(_) => flags |= LayoutFlags::DEPRECATED,
                KnownAttribute::StructSizeField(field) => struct_size_field = Some(field),
                KnownAttribute::SupportedOsPlatform(platform) => min_platform = Some(platform),
                KnownAttribute::SupportedArchitecture(mask) => architecture = Some(mask),
                _ => {}
            }
        }

        if ansi && !unicode {
            flags |= LayoutFlags::ANSI;
        } else if unicode {
            flags |= LayoutFlags::UNICODE;
        }
        if self.metadata.index().enclosing_type(rid).is_some() {
            flags |= LayoutFlags::NESTED;
        }
        if name.ends_with("_e__Struct") || name.ends_with("_e__Union") || name.starts_with("_Anonymous")
        {
            flags |= LayoutFlags::ANONYMOUS;
        }

        let mut fields = Vec::new();
        for field in self.metadata.fields(rid).iter().filter(|field| is_instance(field)) {
            fields.push(self.field_input(field, rid, flags)?);
        }

        if name.ends_with("_e__Union")
            || (kind == LayoutKind::Explicit
                && fields.len() > 1
                && fields.iter().all(|field| field.explicit_offset == Some(0)))
        {
            flags |= LayoutFlags::UNION;
        }

        let packing = match self.metadata.class_layout(rid) {
            Some(class_layout) if class_layout.packing_size != 0 => {
                u32::from(class_layout.packing_size)
            }
            _ => default_packing(!flags.contains(LayoutFlags::ANSI)),
        };

        let computed = compute_layout(&LayoutInput {
            kind,
            packing,
            union: flags.contains(LayoutFlags::UNION),
            fields,
        })
        .map_err(|error| match error {
            Error::Unsupported(message) => Error::Unsupported(format!("{qualified}: {message}")),
            other => other,
        })?;

        Ok(StructLayout {
            name: name.to_string(),
            namespace: self.outermost_namespace(rid)?.to_string(),
            qualified_name: qualified.to_string(),
            typedef: rid,
            kind,
            flags,
            members: computed.members,
            size: computed.size,
            packing_size: computed.packing_size,
            struct_size_field,
            min_platform,
            architecture,
        })
    }

    fn field_input(
        &mut self,
        field: &FieldRaw,
        context: u32,
        parent: LayoutFlags,
    ) -> Result<FieldInput> {
        let name = self.metadata.string(field.name)?;
        let mut descriptor = self.decode_field(field, context)?;

        // Character buffers take their width from the declaring type
        if let TypeDescriptor::String { wide, .. } = &mut descriptor {
            if parent.contains(LayoutFlags::ANSI) {
                *wide = false;
            }
        }

        let mut flags = MemberFlags::empty();
        let mut bitfields = Vec::new();
        for attribute in self.metadata.known_attributes(field.token)? {
            match attribute {
                KnownAttribute::Obsolete(_) => flags |= MemberFlags::DEPRECATED,
                KnownAttribute::Reserved => flags |= MemberFlags::RESERVED,
                KnownAttribute::NativeBitfield {
                    name,
                    offset,
                    length,
                } => {
                    flags |= MemberFlags::NATIVE_BITFIELD;
                    bitfields.push(Bitfield {
                        name,
                        offset,
                        length,
                    });
                }
                _ => {}
            }
        }

        if name.starts_with(ALIGNMENT_PREFIX) {
            flags |= MemberFlags::ALIGNMENT;
        }

        let type_name = match &descriptor {
            TypeDescriptor::Array { element, .. } => element.name(),
            other => other.name(),
        };
        let embeds_union = matches!(&descriptor, TypeDescriptor::Struct(layout) if layout.is_union());
        if type_name.ends_with("_e__Union") || embeds_union {
            flags |= MemberFlags::UNION;
        }
        if type_name.starts_with("_Anonymous") {
            flags |= MemberFlags::ANONYMOUS;
        }
        if parent.contains(LayoutFlags::ANSI) {
            flags |= MemberFlags::ANSI;
        }
        if parent.contains(LayoutFlags::UNICODE) {
            flags |= MemberFlags::UNICODE;
        }

        Ok(FieldInput {
            name: name.to_string(),
            field: field.rid,
            descriptor,
            explicit_offset: self.metadata.field_offset(field.rid),
            flags,
            bitfields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{AttributeDef, FieldDef, MetadataBuilder},
        metadata::{signatures::SignaturePointer, view::MetadataView},
    };

    const NS: &str = "Windows.Win32.Test";

    fn value_type(rid: u32) -> TypeSignature {
        TypeSignature::ValueType(TableId::TypeDef.token(rid))
    }

    fn pointer(base: TypeSignature) -> TypeSignature {
        TypeSignature::Ptr(SignaturePointer {
            modifiers: Vec::new(),
            base: Box::new(base),
        })
    }

    fn array(base: TypeSignature, length: u32) -> TypeSignature {
        TypeSignature::Array(SignatureArray {
            base: Box::new(base),
            rank: 1,
            dimensions: vec![crate::metadata::signatures::ArrayDimensions {
                size: Some(length),
                lower_bound: None,
            }],
        })
    }

    fn load(builder: &MetadataBuilder) -> MetadataView {
        MetadataView::from_metadata(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn pseudo_primitives_collapse() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let handle = builder
            .struct_type(NS, "HCURSOR_LIKE")
            .field(FieldDef::new("Value", TypeSignature::I))
            .finish();
        let boolean = builder
            .struct_type(NS, "BOOL")
            .attribute(AttributeDef::new("NativeTypedefAttribute"))
            .field(FieldDef::new("Value", TypeSignature::I4))
            .finish();
        let error = builder
            .enum_type(NS, "WIN32_ERROR", TypeSignature::U4)
            .finish();
        let hresult = builder
            .struct_type("Windows.Win32.Foundation", "HRESULT")
            .field(FieldDef::new("Value", TypeSignature::I4))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let collapsed = decoder.decode_definition(handle).unwrap();
        assert_eq!(collapsed, TypeDescriptor::opaque("HCURSOR_LIKE"));
        assert_eq!(collapsed.width(), 8);
        assert_eq!(collapse("HCURSOR_LIKE", &collapsed), collapsed);

        let typedef = decoder.decode_definition(boolean).unwrap();
        assert!(matches!(typedef, TypeDescriptor::NativeTypedef { .. }));
        assert_eq!(typedef.call_type(), "int");
        assert_eq!(typedef.width(), 4);

        assert_eq!(
            decoder.decode_definition(error).unwrap(),
            TypeDescriptor::Primitive {
                kind: PrimitiveKind::UInt32,
                alias: Some("WIN32_ERROR".to_string()),
            }
        );
        assert_eq!(
            decoder.decode_definition(hresult).unwrap(),
            TypeDescriptor::Hresult
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn string_typedef_passes_as_pointer() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let pstr = builder
            .struct_type("Windows.Win32.Foundation", "PSTR")
            .attribute(AttributeDef::new("NativeTypedefAttribute"))
            .field(FieldDef::new("Value", pointer(TypeSignature::U1)))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let descriptor = decoder.decode_definition(pstr).unwrap();
        assert_eq!(descriptor.call_type(), "ptr");
        assert_eq!(descriptor.storage_type(), Some("ptr"));
        assert_eq!(descriptor.name(), "PSTR");
    }

    #[test]
    fn interfaces_and_delegates() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let unknown = builder.external_type_ref("Windows.Win32.System.Com", "IUnknown");
        let com = builder
            .interface_type(NS, "IWidget")
            .implements(TableId::TypeRef, unknown)
            .finish();
        let with_guid = builder
            .interface_type(NS, "IGadget")
            .attribute(AttributeDef::guid(uguid::guid!("6d5140c1-7436-11ce-8034-00aa006009fa")))
            .finish();
        let plain = builder
            .interface_type(NS, "IPlain")
            .clear_flags(TypeAttributes::ABSTRACT)
            .finish();
        let callback = builder
            .delegate_type(NS, "WNDPROC")
            .attribute(AttributeDef::new("UnmanagedFunctionPointerAttribute").enum_value(1))
            .finish();
        let managed = builder.delegate_type(NS, "EventHandler").finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        assert!(matches!(
            decoder.decode_definition(com).unwrap(),
            TypeDescriptor::ComInterface(_)
        ));
        assert!(decoder.is_com_interface(with_guid).unwrap());
        assert!(!decoder.is_com_interface(plain).unwrap());
        assert!(matches!(
            decoder.decode_definition(plain).unwrap(),
            TypeDescriptor::Other(_)
        ));
        assert_eq!(
            decoder.decode_definition(callback).unwrap(),
            TypeDescriptor::FunctionPointer("WNDPROC".to_string())
        );
        assert!(decoder.is_function_pointer(callback).unwrap());
        assert!(matches!(
            decoder.decode_definition(managed).unwrap(),
            TypeDescriptor::Other(_)
        ));

        let layout = decoder.com_layout(com).unwrap();
        assert_eq!(layout.size, 8);
        assert!(layout.members.is_empty());
    }

    #[test]
    fn struct_layouts_are_shared() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let point = builder
            .struct_type(NS, "POINT")
            .field(FieldDef::new("x", TypeSignature::I4))
            .field(FieldDef::new("y", TypeSignature::I4))
            .finish();
        let line = builder
            .struct_type(NS, "LINE")
            .field(FieldDef::new("from", value_type(point)))
            .field(FieldDef::new("to", value_type(point)))
            .field(FieldDef::new("points", array(value_type(point), 2)))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let line = decoder.layout(line).unwrap();
        let point = decoder.layout(point).unwrap();
        assert_eq!(point.size, 8);
        assert_eq!(point.packing_size, 4);
        assert_eq!(line.size, 32);
        assert_eq!(line.member("to").unwrap().offset, 8);
        assert_eq!(line.member("points").unwrap().offset, 16);

        let from = line.member("from").unwrap().descriptor.layout().unwrap();
        assert!(Arc::ptr_eq(from, &point));
        assert_eq!(registry.build_count(), 2);
    }

    #[test]
    fn pointer_cycles_resolve() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let node_ref = builder.type_ref(NS, "NODE");
        let node = builder
            .struct_type(NS, "NODE")
            .field(FieldDef::new(
                "next",
                pointer(TypeSignature::ValueType(TableId::TypeRef.token(node_ref))),
            ))
            .field(FieldDef::new("value", TypeSignature::I4))
            .finish();
        let link_ref = builder.type_ref(NS, "LINK");
        let link = builder
            .struct_type(NS, "LINK")
            .field(FieldDef::new(
                "next",
                pointer(TypeSignature::ValueType(TableId::TypeRef.token(link_ref))),
            ))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let layout = decoder.layout(node).unwrap();
        assert_eq!(layout.size, 16);
        assert_eq!(
            layout.member("next").unwrap().descriptor,
            TypeDescriptor::opaque("NODE")
        );
        assert_eq!(
            decoder.decode_definition(link).unwrap(),
            TypeDescriptor::opaque("LINK")
        );
    }

    #[test]
    fn by_value_cycles_fail() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let second = builder.type_ref(NS, "SECOND");
        let first = builder
            .struct_type(NS, "FIRST")
            .field(FieldDef::new(
                "second",
                TypeSignature::ValueType(TableId::TypeRef.token(second)),
            ))
            .field(FieldDef::new("a", TypeSignature::I4))
            .finish();
        builder
            .struct_type(NS, "SECOND")
            .field(FieldDef::new("first", value_type(first)))
            .field(FieldDef::new("b", TypeSignature::I4))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        assert!(matches!(
            decoder.layout(first),
            Err(Error::CyclicLayout(name)) if name == "Windows.Win32.Test.FIRST"
        ));
    }

    #[test]
    fn strings_guids_and_external_types() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let guid = builder.external_type_ref("System", "Guid");
        let foreign = builder.external_type_ref("Windows.Foundation", "IInspectable");
        let font = builder
            .struct_type(NS, "LOGFONTW")
            .attribute(AttributeDef::new("UnicodeAttribute"))
            .field(FieldDef::new("lfHeight", TypeSignature::I4))
            .field(FieldDef::new("lfFaceName", array(TypeSignature::Char, 32)))
            .field(FieldDef::new("id", TypeSignature::ValueType(TableId::TypeRef.token(guid))))
            .field(FieldDef::new("other", TypeSignature::Class(TableId::TypeRef.token(foreign))))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let layout = decoder.layout(font).unwrap();
        assert!(layout.flags.contains(LayoutFlags::UNICODE));
        assert_eq!(
            layout.member("lfFaceName").unwrap().descriptor,
            TypeDescriptor::String {
                length: 32,
                wide: true
            }
        );
        assert_eq!(layout.member("id").unwrap().offset, 72);
        assert_eq!(layout.member("id").unwrap().size, 16);
        assert_eq!(
            layout.member("other").unwrap().descriptor,
            TypeDescriptor::opaque("IInspectable")
        );
        assert_eq!(layout.member("other").unwrap().offset, 88);
        assert_eq!(layout.size, 96);
    }

    #[test]
    fn ansi_strings_are_narrow() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let name = builder
            .struct_type(NS, "NAME_A")
            .attribute(AttributeDef::new("AnsiAttribute"))
            .field(FieldDef::new("name", array(TypeSignature::Char, 8)))
            .field(FieldDef::new("id", TypeSignature::U4))
            .finish();
        let bytes = builder
            .struct_type(NS, "NAME_W")
            .attribute(AttributeDef::new("UnicodeAttribute"))
            .field(FieldDef::new("name", array(TypeSignature::Char, 8)))
            .field(FieldDef::new("tag", array(TypeSignature::U1, 8)))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let layout = decoder.layout(name).unwrap();
        assert!(layout.flags.contains(LayoutFlags::ANSI));
        assert_eq!(
            layout.member("name").unwrap().descriptor,
            TypeDescriptor::String {
                length: 8,
                wide: false
            }
        );
        assert_eq!(layout.member("name").unwrap().size, 8);
        assert_eq!(layout.member("id").unwrap().offset, 8);
        assert_eq!(layout.size, 12);

        let wide = decoder.layout(bytes).unwrap();
        assert_eq!(wide.member("name").unwrap().size, 16);
        assert_eq!(wide.member("tag").unwrap().offset, 16);
        assert_eq!(wide.size, 24);
    }

    #[test]
    fn oversized_array_fails_its_type() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let huge = builder
            .struct_type(NS, "HUGE")
            .field(FieldDef::new("a", TypeSignature::I4))
            .field(FieldDef::new("big", array(TypeSignature::U8, 0x1FFF_FFFF)))
            .finish();
        let point = builder
            .struct_type(NS, "POINT")
            .field(FieldDef::new("x", TypeSignature::I4))
            .field(FieldDef::new("y", TypeSignature::I4))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        assert!(matches!(decoder.layout(huge), Err(Error::Malformed { .. })));
        assert!(registry.get("Windows.Win32.Test.HUGE").is_none());
        assert_eq!(decoder.layout(point).unwrap().size, 8);
    }

    #[test]
    fn type_spec_fields() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let point = builder
            .struct_type(NS, "POINT")
            .field(FieldDef::new("x", TypeSignature::I4))
            .field(FieldDef::new("y", TypeSignature::I4))
            .finish();
        let word = builder.type_spec(&TypeSignature::U2);
        let spec_point = builder.type_spec(&value_type(point));
        let tagged = builder
            .struct_type(NS, "TAGGED")
            .field(FieldDef::new(
                "tag",
                TypeSignature::ValueType(TableId::TypeSpec.token(word)),
            ))
            .field(FieldDef::new("value", TypeSignature::I4))
            .field(FieldDef::new(
                "origin",
                pointer(TypeSignature::ValueType(TableId::TypeSpec.token(spec_point))),
            ))
            .field(FieldDef::new(
                "corner",
                TypeSignature::ValueType(TableId::TypeSpec.token(spec_point)),
            ))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        let layout = decoder.layout(tagged).unwrap();
        let tag = layout.member("tag").unwrap();
        assert_eq!(tag.descriptor, TypeDescriptor::primitive(PrimitiveKind::UInt16));
        assert_eq!(tag.size, 2);
        assert_eq!(layout.member("value").unwrap().offset, 4);

        let origin = layout.member("origin").unwrap();
        assert_eq!(origin.descriptor, TypeDescriptor::opaque("POINT"));
        assert_eq!(origin.offset, 8);

        let corner = layout.member("corner").unwrap();
        assert_eq!(corner.offset, 16);
        assert_eq!(corner.descriptor.layout().unwrap().name, "POINT");
        assert_eq!(layout.size, 24);
    }

    #[test]
    fn nested_unions_and_bitfields() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let outer_ref = builder.type_ref(NS, "PROPVALUE");
        let union_ref = builder.nested_type_ref(outer_ref, "_Anonymous_e__Union");
        let outer = builder
            .struct_type(NS, "PROPVALUE")
            .field(FieldDef::new("kind", TypeSignature::U4))
            .field(FieldDef::new(
                "Anonymous",
                TypeSignature::ValueType(TableId::TypeRef.token(union_ref)),
            ))
            .field(
                FieldDef::new("_bitfield", TypeSignature::U4)
                    .attribute(AttributeDef::bitfield("Enabled", 0, 1))
                    .attribute(AttributeDef::bitfield("Level", 3, 4)),
            )
            .finish();
        let union = builder
            .struct_type("", "_Anonymous_e__Union")
            .explicit_layout()
            .nested_in(outer)
            .field(FieldDef::new("small", TypeSignature::U2).offset(0))
            .field(FieldDef::new("large", TypeSignature::U8).offset(0))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        assert_eq!(
            decoder.resolver().resolve_in(union_ref, outer).unwrap(),
            Some(union)
        );

        let layout = decoder.layout(outer).unwrap();
        let anonymous = layout.member("Anonymous").unwrap();
        assert_eq!(anonymous.offset, 8);
        assert!(anonymous
            .flags
            .contains(MemberFlags::UNION | MemberFlags::ANONYMOUS));

        let embedded = anonymous.descriptor.layout().unwrap();
        assert!(embedded.is_union());
        assert_eq!(embedded.size, 8);
        assert_eq!(embedded.namespace, NS);
        assert_eq!(embedded.qualified_name, "Windows.Win32.Test.PROPVALUE._Anonymous_e__Union");

        let bits = layout.member("_bitfield").unwrap();
        assert!(bits.flags.contains(MemberFlags::NATIVE_BITFIELD));
        assert_eq!(bits.bitfields[1].name, "Level");
        assert_eq!(bits.bitfields[1].offset, 3);
        assert_eq!(layout.size, 24);

        let presented: Vec<String> = layout
            .presentation()
            .members
            .iter()
            .map(|member| member.name.clone())
            .collect();
        assert_eq!(presented, vec!["kind", "small", "large", "_bitfield"]);
    }

    #[test]
    fn handles_and_unsupported_members() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let handle = builder
            .struct_type("Windows.Win32.Foundation", "HANDLE")
            .attribute(AttributeDef::new("NativeTypedefAttribute"))
            .attribute(AttributeDef::new("RAIIFreeAttribute").string("CloseHandle"))
            .attribute(AttributeDef::new("InvalidHandleValueAttribute").i64(-1))
            .field(FieldDef::new("Value", TypeSignature::I))
            .finish();
        let broken = builder
            .struct_type(NS, "BROKEN")
            .field(FieldDef::new("name", TypeSignature::String))
            .field(FieldDef::new("size", TypeSignature::U4))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);

        assert!(decoder.is_handle(handle).unwrap());
        assert!(!decoder.is_handle(broken).unwrap());
        assert!(matches!(decoder.layout(broken), Err(Error::Unsupported(_))));
        assert!(registry.get("Windows.Win32.Test.BROKEN").is_none());
    }
}
