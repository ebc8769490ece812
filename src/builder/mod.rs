//! In-memory writer for Windows metadata images.
//!
//! [`MetadataBuilder`] assembles a bare metadata root (`BSJB`, the `#~` tables stream and the
//! `#Strings`, `#GUID` and `#Blob` heaps) from a handful of declarative definitions: structs,
//! enums, COM interfaces, delegates and the static classes that hold P/Invoke imports. The
//! result loads through [`crate::MetadataView::from_metadata`] like any `.winmd` root.
//!
//! The builder exists so that fixtures, benchmarks and tests can describe exactly the
//! metadata shape they exercise instead of shipping binary images.
//!
//! # Key Components
//!
//! - [`MetadataBuilder`] - Type references, type definitions and the final image
//! - [`TypeBuilder`] - Fluent definition of one TypeDef row and everything it owns
//! - [`FieldDef`], [`MethodDef`], [`ParamDef`] - Members of a type
//! - [`AttributeDef`] - Custom attributes with positional and named arguments
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::{
//!     builder::{FieldDef, MetadataBuilder},
//!     metadata::signatures::TypeSignature,
//!     MetadataView,
//! };
//!
//! let mut builder = MetadataBuilder::new("Sample.winmd");
//! builder
//!     .struct_type("Windows.Win32.Foundation", "POINT")
//!     .field(FieldDef::new("x", TypeSignature::I4))
//!     .field(FieldDef::new("y", TypeSignature::I4))
//!     .finish();
//!
//! let view = MetadataView::from_metadata(builder.build()?)?;
//! assert!(view.metadata().find_typedef("Windows.Win32.Foundation", "POINT").is_some());
//! # Ok::<(), winmdgen::Error>(())
//! ```

mod attribute;
mod heaps;
mod members;
mod signature;
mod writer;

pub use attribute::AttributeDef;
pub use heaps::{write_compressed_uint, BlobHeap, GuidHeap, StringHeap};
pub use members::{FieldDef, MethodDef, ParamDef};
pub use signature::{encode_field, encode_method, encode_type};

use std::collections::HashMap;

use sha1::{Digest, Sha1};

use crate::{
    metadata::{
        constants::ConstantValue,
        signatures::{SignatureMethod, SignatureParameter, TypeSignature},
        tables::{
            AssemblyRefRaw, ClassLayoutRaw, CodedIndex, ConstantRaw, CustomAttributeRaw,
            FieldAttributes, FieldLayoutRaw, FieldRaw, ImplMapRaw, InterfaceImplRaw,
            MemberRefRaw, MethodDefRaw, ModuleRaw, ModuleRefRaw, NestedClassRaw, ParamRaw,
            TableId, TypeAttributes, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
        },
        typesystem::ELEMENT_TYPE,
    },
    Error, Result,
};

/// Version string of the metadata root
pub const METADATA_VERSION: &str = "WindowsRuntime 1.4";

/// Builds a metadata image in memory.
///
/// Every method that adds rows returns the row id it created, so later definitions can
/// reference earlier ones through [`TableId::token`]. Errors from the fluent calls (a NUL byte
/// in a name, an unencodable signature) are kept and reported by [`MetadataBuilder::build`].
pub struct MetadataBuilder {
    pub(crate) strings: StringHeap,
    pub(crate) blobs: BlobHeap,
    pub(crate) guids: GuidHeap,

    pub(crate) modules: Vec<ModuleRaw>,
    pub(crate) type_refs: Vec<TypeRefRaw>,
    pub(crate) type_defs: Vec<TypeDefRaw>,
    pub(crate) fields: Vec<FieldRaw>,
    pub(crate) methods: Vec<MethodDefRaw>,
    pub(crate) params: Vec<ParamRaw>,
    pub(crate) interface_impls: Vec<InterfaceImplRaw>,
    pub(crate) member_refs: Vec<MemberRefRaw>,
    pub(crate) constants: Vec<ConstantRaw>,
    pub(crate) custom_attributes: Vec<CustomAttributeRaw>,
    pub(crate) class_layouts: Vec<ClassLayoutRaw>,
    pub(crate) field_layouts: Vec<FieldLayoutRaw>,
    pub(crate) module_refs: Vec<ModuleRefRaw>,
    pub(crate) type_specs: Vec<TypeSpecRaw>,
    pub(crate) impl_maps: Vec<ImplMapRaw>,
    pub(crate) assembly_refs: Vec<AssemblyRefRaw>,
    pub(crate) nested_classes: Vec<NestedClassRaw>,

    type_ref_rows: HashMap<(CodedIndex, String, String), u32>,
    member_ref_rows: HashMap<(u32, u32), u32>,
    module_ref_rows: HashMap<String, u32>,
    assembly_ref_rows: HashMap<String, u32>,
    deferred: Option<String>,
}

impl MetadataBuilder {
    /// Starts an image for module `module`, holding only the `<Module>` type.
    #[must_use]
    pub fn new(module: &str) -> MetadataBuilder {
        let mut builder = MetadataBuilder {
            strings: StringHeap::default(),
            blobs: BlobHeap::default(),
            guids: GuidHeap::default(),
            modules: Vec::new(),
            type_refs: Vec::new(),
            type_defs: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            params: Vec::new(),
            interface_impls: Vec::new(),
            member_refs: Vec::new(),
            constants: Vec::new(),
            custom_attributes: Vec::new(),
            class_layouts: Vec::new(),
            field_layouts: Vec::new(),
            module_refs: Vec::new(),
            type_specs: Vec::new(),
            impl_maps: Vec::new(),
            assembly_refs: Vec::new(),
            nested_classes: Vec::new(),
            type_ref_rows: HashMap::new(),
            member_ref_rows: HashMap::new(),
            module_ref_rows: HashMap::new(),
            assembly_ref_rows: HashMap::new(),
            deferred: None,
        };

        let result = builder.add_module(module);
        builder.record(result);
        builder
    }

    fn add_module(&mut self, module: &str) -> Result<()> {
        // The MVID only has to be stable for a given module name
        let digest = Sha1::digest(module.as_bytes());
        let mut mvid = [0u8; 16];
        mvid.copy_from_slice(&digest[..16]);

        let name = self.strings.intern(module)?;
        let mvid = self.guids.add(uguid::Guid::from_bytes(mvid))?;
        self.modules.push(ModuleRaw {
            rid: 1,
            token: TableId::Module.token(1),
            offset: 0,
            generation: 0,
            name,
            mvid,
            encid: 0,
            encbaseid: 0,
        });

        let module_type = self.strings.intern("<Module>")?;
        self.type_defs.push(TypeDefRaw {
            rid: 1,
            token: TableId::TypeDef.token(1),
            offset: 0,
            flags: 0,
            type_name: module_type,
            type_namespace: 0,
            extends: CodedIndex::new(TableId::TypeDef, 0),
            field_list: 1,
            method_list: 1,
        });
        Ok(())
    }

    /// Keeps the first error of an infallible-looking call for [`MetadataBuilder::build`].
    fn record<T: Default>(&mut self, result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                if self.deferred.is_none() {
                    self.deferred = Some(error.to_string());
                }
                T::default()
            }
        }
    }

    fn next_rid(len: usize) -> u32 {
        u32::try_from(len + 1).unwrap_or(u32::MAX)
    }

    fn intern_type_ref(&mut self, scope: CodedIndex, namespace: &str, name: &str) -> Result<u32> {
        let key = (scope, namespace.to_string(), name.to_string());
        if let Some(rid) = self.type_ref_rows.get(&key) {
            return Ok(*rid);
        }

        let rid = Self::next_rid(self.type_refs.len());
        self.type_refs.push(TypeRefRaw {
            rid,
            token: TableId::TypeRef.token(rid),
            offset: 0,
            resolution_scope: scope,
            type_name: self.strings.intern(name)?,
            type_namespace: self.strings.intern(namespace)?,
        });
        self.type_ref_rows.insert(key, rid);
        Ok(rid)
    }

    fn assembly_ref(&mut self, namespace: &str) -> Result<u32> {
        let (assembly, version) = if namespace == "System" || namespace.starts_with("System.") {
            ("netstandard", [2, 1, 0, 0])
        } else {
            ("Windows.Win32", [0, 0, 0, 0])
        };
        if let Some(rid) = self.assembly_ref_rows.get(assembly) {
            return Ok(*rid);
        }

        let rid = Self::next_rid(self.assembly_refs.len());
        self.assembly_refs.push(AssemblyRefRaw {
            rid,
            token: TableId::AssemblyRef.token(rid),
            offset: 0,
            major_version: version[0],
            minor_version: version[1],
            build_number: version[2],
            revision_number: version[3],
            flags: 0,
            public_key_or_token: 0,
            name: self.strings.intern(assembly)?,
            culture: 0,
            hash_value: 0,
        });
        self.assembly_ref_rows.insert(assembly.to_string(), rid);
        Ok(rid)
    }

    fn external_ref(&mut self, namespace: &str, name: &str) -> Result<u32> {
        let assembly = self.assembly_ref(namespace)?;
        self.intern_type_ref(CodedIndex::new(TableId::AssemblyRef, assembly), namespace, name)
    }

    /// A TypeRef to `namespace.name` scoped to this module. Repeated calls return the same row.
    pub fn type_ref(&mut self, namespace: &str, name: &str) -> u32 {
        let result = self.intern_type_ref(CodedIndex::new(TableId::Module, 1), namespace, name);
        self.record(result)
    }

    /// A TypeRef to `namespace.name` in another assembly.
    pub fn external_type_ref(&mut self, namespace: &str, name: &str) -> u32 {
        let result = self.external_ref(namespace, name);
        self.record(result)
    }

    /// A TypeRef to the nested type `name` of the type referenced by TypeRef `enclosing`.
    pub fn nested_type_ref(&mut self, enclosing: u32, name: &str) -> u32 {
        let result = self.intern_type_ref(CodedIndex::new(TableId::TypeRef, enclosing), "", name);
        self.record(result)
    }

    /// A ModuleRef naming `library`. Repeated calls return the same row.
    pub fn module_ref(&mut self, library: &str) -> u32 {
        let result = self.intern_module_ref(library);
        self.record(result)
    }

    fn intern_module_ref(&mut self, library: &str) -> Result<u32> {
        if let Some(rid) = self.module_ref_rows.get(library) {
            return Ok(*rid);
        }

        let rid = Self::next_rid(self.module_refs.len());
        self.module_refs.push(ModuleRefRaw {
            rid,
            token: TableId::ModuleRef.token(rid),
            offset: 0,
            name: self.strings.intern(library)?,
        });
        self.module_ref_rows.insert(library.to_string(), rid);
        Ok(rid)
    }

    /// A TypeSpec row holding `signature`.
    pub fn type_spec(&mut self, signature: &TypeSignature) -> u32 {
        let result = self.add_type_spec(signature);
        self.record(result)
    }

    fn add_type_spec(&mut self, signature: &TypeSignature) -> Result<u32> {
        let mut blob = Vec::new();
        encode_type(signature, &mut blob)?;

        let rid = Self::next_rid(self.type_specs.len());
        self.type_specs.push(TypeSpecRaw {
            rid,
            token: TableId::TypeSpec.token(rid),
            offset: 0,
            signature: self.blobs.intern(&blob)?,
        });
        Ok(rid)
    }

    fn system_base(&mut self, name: &str) -> CodedIndex {
        let row = self.external_type_ref("System", name);
        CodedIndex::new(TableId::TypeRef, row)
    }

    fn define(
        &mut self,
        namespace: &str,
        name: &str,
        flags: u32,
        extends: CodedIndex,
    ) -> TypeBuilder<'_> {
        let rid = Self::next_rid(self.type_defs.len());
        TypeBuilder {
            builder: self,
            definition: TypeDefinition {
                rid,
                namespace: namespace.to_string(),
                name: name.to_string(),
                flags,
                extends,
                enclosing: None,
                packing: None,
                class_size: None,
                interfaces: Vec::new(),
                attributes: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    /// A sequential value type deriving from `System.ValueType`.
    pub fn struct_type(&mut self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        let extends = self.system_base("ValueType");
        self.define(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEQUENTIAL_LAYOUT | TypeAttributes::SEALED,
            extends,
        )
    }

    /// An enum deriving from `System.Enum` whose `value__` field has type `underlying`.
    pub fn enum_type(
        &mut self,
        namespace: &str,
        name: &str,
        underlying: TypeSignature,
    ) -> TypeBuilder<'_> {
        let extends = self.system_base("Enum");
        self.define(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            extends,
        )
        .field(FieldDef::new("value__", underlying).flags(
            FieldAttributes::PUBLIC
                | FieldAttributes::SPECIAL_NAME
                | FieldAttributes::RTSPECIAL_NAME,
        ))
    }

    /// An abstract interface without a base type.
    pub fn interface_type(&mut self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        self.define(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            CodedIndex::new(TableId::TypeDef, 0),
        )
    }

    /// A delegate deriving from `System.MulticastDelegate`.
    pub fn delegate_type(&mut self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        let extends = self.system_base("MulticastDelegate");
        self.define(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            extends,
        )
    }

    /// A static class deriving from `System.Object`, the container of imports and constants.
    pub fn class_type(&mut self, namespace: &str, name: &str) -> TypeBuilder<'_> {
        let extends = self.system_base("Object");
        self.define(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::ABSTRACT | TypeAttributes::SEALED,
            extends,
        )
    }

    fn add_attribute(&mut self, parent: CodedIndex, attribute: &AttributeDef) -> Result<()> {
        let class = self.external_ref(&attribute.namespace, &attribute.name)?;
        let enum_type = if attribute.has_enum_argument() {
            TypeSignature::ValueType(TableId::TypeRef.token(self.external_ref("System", "Enum")?))
        } else {
            TypeSignature::Void
        };

        let constructor = SignatureMethod {
            has_this: true,
            return_type: SignatureParameter {
                base: TypeSignature::Void,
                ..SignatureParameter::default()
            },
            params: attribute
                .constructor_params(&enum_type)
                .into_iter()
                .map(|base| SignatureParameter {
                    base,
                    ..SignatureParameter::default()
                })
                .collect(),
            ..SignatureMethod::default()
        };
        let mut signature = Vec::new();
        encode_method(&constructor, &mut signature)?;
        let signature = self.blobs.intern(&signature)?;

        let member_ref = match self.member_ref_rows.get(&(class, signature)) {
            Some(rid) => *rid,
            None => {
                let rid = Self::next_rid(self.member_refs.len());
                self.member_refs.push(MemberRefRaw {
                    rid,
                    token: TableId::MemberRef.token(rid),
                    offset: 0,
                    class: CodedIndex::new(TableId::TypeRef, class),
                    name: self.strings.intern(".ctor")?,
                    signature,
                });
                self.member_ref_rows.insert((class, signature), rid);
                rid
            }
        };

        let rid = Self::next_rid(self.custom_attributes.len());
        self.custom_attributes.push(CustomAttributeRaw {
            rid,
            token: TableId::CustomAttribute.token(rid),
            offset: 0,
            parent,
            constructor: CodedIndex::new(TableId::MemberRef, member_ref),
            value: self.blobs.intern(&attribute.value_blob()?)?,
        });
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_field(&mut self, field: &FieldDef) -> Result<u32> {
        let rid = Self::next_rid(self.fields.len());
        self.fields.push(FieldRaw {
            rid,
            token: TableId::Field.token(rid),
            offset: 0,
            flags: field.flags as u16,
            name: self.strings.intern(&field.name)?,
            signature: self.blobs.intern(&encode_field(&field.signature)?)?,
        });

        if let Some(field_offset) = field.offset {
            let layout = Self::next_rid(self.field_layouts.len());
            self.field_layouts.push(FieldLayoutRaw {
                rid: layout,
                token: TableId::FieldLayout.token(layout),
                offset: 0,
                field_offset,
                field: rid,
            });
        }

        if let Some(value) = &field.constant {
            let (base, blob) = constant_blob(value)?;
            let constant = Self::next_rid(self.constants.len());
            self.constants.push(ConstantRaw {
                rid: constant,
                token: TableId::Constant.token(constant),
                offset: 0,
                base,
                padding: 0,
                parent: CodedIndex::new(TableId::Field, rid),
                value: self.blobs.intern(&blob)?,
            });
        }

        for attribute in &field.attributes {
            self.add_attribute(CodedIndex::new(TableId::Field, rid), attribute)?;
        }
        Ok(rid)
    }

    fn add_param(
        &mut self,
        sequence: u16,
        name: &str,
        flags: u16,
        attributes: &[AttributeDef],
    ) -> Result<()> {
        let rid = Self::next_rid(self.params.len());
        self.params.push(ParamRaw {
            rid,
            token: TableId::Param.token(rid),
            offset: 0,
            flags,
            sequence,
            name: self.strings.intern(name)?,
        });

        for attribute in attributes {
            self.add_attribute(CodedIndex::new(TableId::Param, rid), attribute)?;
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_method(&mut self, method: &MethodDef) -> Result<u32> {
        let mut signature = Vec::new();
        encode_method(&method.signature(), &mut signature)?;

        let rid = Self::next_rid(self.methods.len());
        self.methods.push(MethodDefRaw {
            rid,
            token: TableId::MethodDef.token(rid),
            offset: 0,
            rva: 0,
            impl_flags: method.impl_flags as u16,
            flags: method.flags as u16,
            name: self.strings.intern(&method.name)?,
            signature: self.blobs.intern(&signature)?,
            param_list: Self::next_rid(self.params.len()),
        });

        if !method.return_attributes.is_empty() {
            self.add_param(0, "", 0, &method.return_attributes)?;
        }
        for (sequence, param) in (1u16..).zip(&method.params) {
            self.add_param(sequence, &param.name, param.flags, &param.attributes)?;
        }

        if let Some(import) = &method.import {
            let scope = self.intern_module_ref(&import.library)?;
            let symbol = import.name.as_deref().unwrap_or(&method.name);
            let impl_map = Self::next_rid(self.impl_maps.len());
            self.impl_maps.push(ImplMapRaw {
                rid: impl_map,
                token: TableId::ImplMap.token(impl_map),
                offset: 0,
                mapping_flags: import.flags,
                member_forwarded: CodedIndex::new(TableId::MethodDef, rid),
                import_name: self.strings.intern(symbol)?,
                import_scope: scope,
            });
        }

        for attribute in &method.attributes {
            self.add_attribute(CodedIndex::new(TableId::MethodDef, rid), attribute)?;
        }
        Ok(rid)
    }
}

/// Element type and little-endian blob of a Constant row holding `value`.
fn constant_blob(value: &ConstantValue) -> Result<(u8, Vec<u8>)> {
    let encoded = match value {
        ConstantValue::Boolean(value) => (ELEMENT_TYPE::BOOLEAN, vec![u8::from(*value)]),
        ConstantValue::Char(value) => (ELEMENT_TYPE::CHAR, value.to_le_bytes().to_vec()),
        ConstantValue::I1(value) => (ELEMENT_TYPE::I1, value.to_le_bytes().to_vec()),
        ConstantValue::U1(value) => (ELEMENT_TYPE::U1, vec![*value]),
        ConstantValue::I2(value) => (ELEMENT_TYPE::I2, value.to_le_bytes().to_vec()),
        ConstantValue::U2(value) => (ELEMENT_TYPE::U2, value.to_le_bytes().to_vec()),
        ConstantValue::I4(value) => (ELEMENT_TYPE::I4, value.to_le_bytes().to_vec()),
        ConstantValue::U4(value) => (ELEMENT_TYPE::U4, value.to_le_bytes().to_vec()),
        ConstantValue::I8(value) => (ELEMENT_TYPE::I8, value.to_le_bytes().to_vec()),
        ConstantValue::U8(value) => (ELEMENT_TYPE::U8, value.to_le_bytes().to_vec()),
        ConstantValue::R4(value) => (ELEMENT_TYPE::R4, value.to_le_bytes().to_vec()),
        ConstantValue::R8(value) => (ELEMENT_TYPE::R8, value.to_le_bytes().to_vec()),
        ConstantValue::String(value) => (
            ELEMENT_TYPE::STRING,
            value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        ),
        ConstantValue::Null => (ELEMENT_TYPE::CLASS, vec![0; 4]),
        ConstantValue::Guid(_) => {
            return Err(Error::Unsupported(
                "GUID constants are declared through GuidAttribute".to_string(),
            ))
        }
    };

    Ok(encoded)
}

/// A type definition collected by [`TypeBuilder`]
struct TypeDefinition {
    rid: u32,
    namespace: String,
    name: String,
    flags: u32,
    extends: CodedIndex,
    enclosing: Option<u32>,
    packing: Option<u16>,
    class_size: Option<u32>,
    interfaces: Vec<CodedIndex>,
    attributes: Vec<AttributeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
}

impl MetadataBuilder {
    fn add_type(&mut self, definition: &TypeDefinition) -> Result<()> {
        let rid = definition.rid;
        self.type_defs.push(TypeDefRaw {
            rid,
            token: TableId::TypeDef.token(rid),
            offset: 0,
            flags: definition.flags,
            type_name: self.strings.intern(&definition.name)?,
            type_namespace: self.strings.intern(&definition.namespace)?,
            extends: definition.extends,
            field_list: Self::next_rid(self.fields.len()),
            method_list: Self::next_rid(self.methods.len()),
        });

        for field in &definition.fields {
            self.add_field(field)?;
        }
        for method in &definition.methods {
            self.add_method(method)?;
        }

        for interface in &definition.interfaces {
            let row = Self::next_rid(self.interface_impls.len());
            self.interface_impls.push(InterfaceImplRaw {
                rid: row,
                token: TableId::InterfaceImpl.token(row),
                offset: 0,
                class: rid,
                interface: *interface,
            });
        }

        if definition.packing.is_some() || definition.class_size.is_some() {
            let row = Self::next_rid(self.class_layouts.len());
            self.class_layouts.push(ClassLayoutRaw {
                rid: row,
                token: TableId::ClassLayout.token(row),
                offset: 0,
                packing_size: definition.packing.unwrap_or(0),
                class_size: definition.class_size.unwrap_or(0),
                parent: rid,
            });
        }

        if let Some(enclosing) = definition.enclosing {
            let row = Self::next_rid(self.nested_classes.len());
            self.nested_classes.push(NestedClassRaw {
                rid: row,
                token: TableId::NestedClass.token(row),
                offset: 0,
                nested_class: rid,
                enclosing_class: enclosing,
            });
        }

        for attribute in &definition.attributes {
            self.add_attribute(CodedIndex::new(TableId::TypeDef, rid), attribute)?;
        }
        Ok(())
    }
}

/// Fluent definition of one TypeDef row. Nothing is written until [`TypeBuilder::finish`].
///
/// The row id is reserved when the builder is created, so members can refer to their own
/// type (enum members do) before the row exists.
pub struct TypeBuilder<'a> {
    builder: &'a mut MetadataBuilder,
    definition: TypeDefinition,
}

impl TypeBuilder<'_> {
    /// Row id the type will occupy.
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.definition.rid
    }

    /// Nests the type inside TypeDef row `enclosing`.
    #[must_use]
    pub fn nested_in(mut self, enclosing: u32) -> Self {
        self.definition.enclosing = Some(enclosing);
        self.definition.flags = (self.definition.flags & !TypeAttributes::VISIBILITY_MASK)
            | TypeAttributes::NESTED_PUBLIC;
        self
    }

    /// Adds `TypeAttributes` bits.
    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.definition.flags |= flags;
        self
    }

    /// Removes `TypeAttributes` bits.
    #[must_use]
    pub fn clear_flags(mut self, flags: u32) -> Self {
        self.definition.flags &= !flags;
        self
    }

    /// Switches to explicit layout, where every field carries its own offset.
    #[must_use]
    pub fn explicit_layout(mut self) -> Self {
        self.definition.flags = (self.definition.flags & !TypeAttributes::LAYOUT_MASK)
            | TypeAttributes::EXPLICIT_LAYOUT;
        self
    }

    /// Sets the packing size of the ClassLayout row.
    #[must_use]
    pub fn packing(mut self, packing: u16) -> Self {
        self.definition.packing = Some(packing);
        self
    }

    /// Sets the class size of the ClassLayout row.
    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.definition.class_size = Some(size);
        self
    }

    /// Declares a base interface: a row of `table`, which must be TypeDef, TypeRef or TypeSpec.
    #[must_use]
    pub fn implements(mut self, table: TableId, row: u32) -> Self {
        self.definition.interfaces.push(CodedIndex::new(table, row));
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.definition.attributes.push(attribute);
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.definition.fields.push(field);
        self
    }

    /// Adds an enum member: a literal static field of the type itself.
    #[must_use]
    pub fn member(self, name: &str, value: ConstantValue) -> Self {
        let own = TypeSignature::ValueType(TableId::TypeDef.token(self.definition.rid));
        self.field(FieldDef::new(name, own).constant(value))
    }

    /// Adds a method.
    #[must_use]
    pub fn method(mut self, method: MethodDef) -> Self {
        self.definition.methods.push(method);
        self
    }

    /// Writes the type and everything it owns, returning its TypeDef row id.
    pub fn finish(self) -> u32 {
        let TypeBuilder {
            builder,
            definition,
        } = self;

        let result = builder.add_type(&definition);
        builder.record(result);
        definition.rid
    }
}
