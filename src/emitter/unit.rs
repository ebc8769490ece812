//! Emission units: one generated file per top-level type definition.

use std::{collections::BTreeSet, sync::Arc};

use log::debug;
use strum::{Display, EnumIter};

use crate::{
    metadata::{
        constants::{field_constant, ConstantValue},
        customattributes::KnownAttribute,
        method::{ComInterface, EntryPoint, InterfaceBase, MethodContract},
        tables::{FieldAttributes, FieldRaw, TableId, TypeAttributes},
        token::Token,
        typesystem::{LayoutFlags, PrimitiveKind, StructLayout, TypeDecoder, TypeDescriptor},
        view::Metadata,
    },
    Error, Result,
};

/// Name of the per-namespace container of functions and constants
pub const API_CONTAINER: &str = "Apis";

/// A type named by namespace and metadata name, the unit of `#Include`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeName {
    /// Namespace
    pub namespace: String,
    /// Metadata name, which is also the file stem
    pub name: String,
}

impl TypeName {
    /// Creates a type name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> TypeName {
        TypeName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// The kind of an emission unit, without its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum UnitKind {
    /// Struct or union with member accessors
    Struct,
    /// Native handle with invalid values and a free function
    Handle,
    /// Enumeration of named constants
    Enum,
    /// The `Apis` container of a namespace
    ApiModule,
    /// COM interface
    ComInterface,
}

/// A constant: an enum member or a literal field of an API module
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantMember {
    /// Member name
    pub name: String,
    /// Literal value
    pub value: ConstantValue,
    /// Marked obsolete
    pub deprecated: bool,
}

/// A handle type
#[derive(Debug, Clone, PartialEq)]
pub struct HandleUnit {
    /// Layout of the wrapper, a single pointer-sized member
    pub layout: Arc<StructLayout>,
    /// Values that denote an invalid handle
    pub invalid_values: Vec<i64>,
    /// Function of the same namespace that releases the handle
    pub free_function: Option<String>,
}

/// An enum type
#[derive(Debug, Clone, PartialEq)]
pub struct EnumUnit {
    /// Underlying integer type
    pub underlying: PrimitiveKind,
    /// Carries `FlagsAttribute`
    pub flags: bool,
    /// Marked obsolete
    pub deprecated: bool,
    /// Members, in declaration order
    pub members: Vec<ConstantMember>,
}

/// The `Apis` container of a namespace
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiModule {
    /// Constants, by name
    pub constants: Vec<ConstantMember>,
    /// Imported functions, by name
    pub methods: Vec<MethodContract>,
}

/// A COM interface together with the class it extends
#[derive(Debug, Clone, PartialEq)]
pub struct ComUnit {
    /// Identity and methods
    pub interface: ComInterface,
    /// Base interface declared in the image; `None` for roots and external bases
    pub base: Option<TypeName>,
}

/// What a unit emits
#[derive(Debug, Clone, PartialEq)]
pub enum EmitterKind {
    /// Struct or union
    Struct(Arc<StructLayout>),
    /// Handle
    Handle(HandleUnit),
    /// Enum
    Enum(EnumUnit),
    /// API module
    ApiModule(ApiModule),
    /// COM interface
    ComInterface(ComUnit),
}

impl EmitterKind {
    /// The kind tag.
    #[must_use]
    pub fn unit_kind(&self) -> UnitKind {
        match self {
            EmitterKind::Struct(_) => UnitKind::Struct,
            EmitterKind::Handle(_) => UnitKind::Handle,
            EmitterKind::Enum(_) => UnitKind::Enum,
            EmitterKind::ApiModule(_) => UnitKind::ApiModule,
            EmitterKind::ComInterface(_) => UnitKind::ComInterface,
        }
    }
}

/// Outcome of classifying a type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The type gets a unit of this kind
    Emit(UnitKind),
    /// The type is not emitted on its own
    Skip(&'static str),
}

/// One generated file
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionUnit {
    /// TypeDef row
    pub typedef: u32,
    /// Namespace
    pub namespace: String,
    /// Metadata name
    pub name: String,
    /// Contents
    pub kind: EmitterKind,
    /// Types defined in other files that the unit refers to, sorted
    pub imports: Vec<TypeName>,
}

fn is_instance(field: &FieldRaw) -> bool {
    u32::from(field.flags) & (FieldAttributes::STATIC | FieldAttributes::LITERAL) == 0
}

fn is_deprecated(metadata: &Metadata, field: &FieldRaw) -> bool {
    metadata.has_attribute(field.token, "Obsolete")
}

/// Decides whether TypeDef row `rid` gets a unit of its own, and of which kind.
///
/// Nested types are emitted inside their parent; delegates, field-less value types and
/// single-field wrappers that collapse to a scalar are never emitted.
///
/// # Errors
/// Returns [`Error::Unsupported`] for value types whose members have no supported shape,
/// and any error raised while reading or classifying the row.
pub fn classify(decoder: &mut TypeDecoder, rid: u32) -> Result<Classification> {
    let metadata = decoder.metadata();
    if metadata.index().enclosing_type(rid).is_some() {
        return Ok(Classification::Skip("nested type"));
    }

    let typedef = metadata.typedef(rid)?;
    let (_, name) = metadata.typedef_name(&typedef)?;

    if typedef.flags & TypeAttributes::INTERFACE != 0 {
        return Ok(Classification::Emit(UnitKind::ComInterface));
    }
    if typedef.extends.tag != TableId::TypeRef || typedef.extends.is_null() {
        return Ok(Classification::Skip("base is not a type reference"));
    }
    if name == API_CONTAINER {
        return Ok(Classification::Emit(UnitKind::ApiModule));
    }

    let (_, base) = metadata.typeref_name(&metadata.typeref(typedef.extends.row)?)?;
    match base {
        "Enum" => return Ok(Classification::Emit(UnitKind::Enum)),
        "ValueType" => {}
        "MulticastDelegate" => return Ok(Classification::Skip("delegate")),
        _ => return Ok(Classification::Skip("not a value type")),
    }

    if !metadata.fields(rid).iter().any(is_instance) {
        return Ok(Classification::Skip("no instance fields"));
    }
    if decoder.is_handle(rid)? {
        return Ok(Classification::Emit(UnitKind::Handle));
    }

    match decoder.decode_definition(rid)? {
        TypeDescriptor::Struct(_) => Ok(Classification::Emit(UnitKind::Struct)),
        TypeDescriptor::Other(raw) => Err(Error::Unsupported(format!("{name}: {raw}"))),
        _ => Ok(Classification::Skip("pseudo-primitive")),
    }
}

impl EmissionUnit {
    /// Builds the unit of kind `kind` for TypeDef row `rid`.
    ///
    /// # Errors
    /// Returns an error if the layout, a constant, a method contract or the interface
    /// identity cannot be built. Errors are fatal for this unit only.
    pub fn build(decoder: &mut TypeDecoder, rid: u32, kind: UnitKind) -> Result<EmissionUnit> {
        let metadata = decoder.metadata();
        let typedef = metadata.typedef(rid)?;
        let (namespace, name) = metadata.typedef_name(&typedef)?;

        let mut imports = BTreeSet::new();
        let kind = match kind {
            UnitKind::Struct => {
                let layout = decoder.layout(rid)?;
                struct_imports(&layout, &mut imports);
                EmitterKind::Struct(layout)
            }
            UnitKind::Handle => {
                let layout = decoder.layout(rid)?;
                struct_imports(&layout, &mut imports);
                EmitterKind::Handle(handle(metadata, typedef.token, layout)?)
            }
            UnitKind::Enum => EmitterKind::Enum(enumeration(decoder, rid)?),
            UnitKind::ApiModule => {
                let module = api_module(decoder, rid)?;
                for method in &module.methods {
                    method_imports(method, &mut imports);
                }
                EmitterKind::ApiModule(module)
            }
            UnitKind::ComInterface => {
                if !decoder.is_com_interface(rid)? {
                    return Err(Error::Unsupported(format!(
                        "interface {name} is not a COM interface"
                    )));
                }
                let interface = ComInterface::read(decoder, rid)?;
                let base = match &interface.base {
                    Some(InterfaceBase::Local(base)) => {
                        let row = metadata.typedef(*base)?;
                        let (namespace, name) = metadata.typedef_name(&row)?;
                        let base = TypeName::new(namespace, name);
                        imports.insert(base.clone());
                        Some(base)
                    }
                    Some(InterfaceBase::External { .. }) | None => None,
                };
                for method in &interface.methods {
                    method_imports(method, &mut imports);
                }
                EmitterKind::ComInterface(ComUnit { interface, base })
            }
        };

        let own = TypeName::new(namespace, name);
        imports.remove(&own);

        Ok(EmissionUnit {
            typedef: rid,
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            imports: imports.into_iter().collect(),
        })
    }

    /// Namespace-qualified metadata name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Path of the generated file relative to the output root, `/`-separated.
    #[must_use]
    pub fn relative_path(&self) -> String {
        let mut path = self.namespace.replace('.', "/");
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(&self.name);
        path.push_str(".ahk");
        path
    }
}

/// Embedded struct types defined in their own files, at any depth of nested classes.
fn struct_imports(layout: &StructLayout, imports: &mut BTreeSet<TypeName>) {
    let presentation = layout.presentation();
    for presented in &presentation.members {
        let embedded = match &presented.member.descriptor {
            TypeDescriptor::Struct(embedded) => embedded,
            TypeDescriptor::Array { element, .. } => match element.as_ref() {
                TypeDescriptor::Struct(embedded) => embedded,
                _ => continue,
            },
            _ => continue,
        };
        if !embedded.flags.contains(LayoutFlags::NESTED) {
            imports.insert(TypeName::new(&embedded.namespace, &embedded.name));
        }
    }

    for nested in &presentation.nested {
        struct_imports(nested, imports);
    }
}

fn method_imports(method: &MethodContract, imports: &mut BTreeSet<TypeName>) {
    if matches!(method.entry_point, EntryPoint::Ordinal { .. }) {
        imports.insert(TypeName::new("Windows.Win32.Foundation", API_CONTAINER));
        imports.insert(TypeName::new("Windows.Win32.System.LibraryLoader", API_CONTAINER));
    }
    if let Some(handle) = &method.handle_return {
        imports.insert(TypeName::new(&handle.namespace, &handle.name));
    }
}

fn handle(metadata: &Metadata, token: Token, layout: Arc<StructLayout>) -> Result<HandleUnit> {
    let mut invalid_values = Vec::new();
    let mut free_function = None;
    for attribute in metadata.known_attributes(token)? {
        match attribute {
            KnownAttribute::InvalidHandleValue(value) => invalid_values.push(value),
            KnownAttribute::RaiiFree(function) => free_function = Some(function),
            _ => {}
        }
    }

    if layout.members.is_empty() {
        return Err(Error::MissingData(format!(
            "{}: handle without a value field",
            layout.qualified_name
        )));
    }

    Ok(HandleUnit {
        layout,
        invalid_values,
        free_function,
    })
}

fn enumeration(decoder: &mut TypeDecoder, rid: u32) -> Result<EnumUnit> {
    let metadata = decoder.metadata();
    let token = metadata.typedef(rid)?.token;

    let underlying = match decoder.decode_definition(rid)? {
        TypeDescriptor::Primitive { kind, .. } => kind,
        _ => PrimitiveKind::Int32,
    };

    let mut members = Vec::new();
    for field in metadata.fields(rid) {
        if is_instance(&field) {
            continue;
        }
        let name = metadata.string(field.name)?;
        let value = field_constant(metadata, &field)?
            .ok_or_else(|| Error::MissingData(format!("enum member {name} has no value")))?;
        members.push(ConstantMember {
            name: name.to_string(),
            value,
            deprecated: is_deprecated(metadata, &field),
        });
    }

    Ok(EnumUnit {
        underlying,
        flags: metadata.has_attribute(token, "Flags"),
        deprecated: metadata.has_attribute(token, "Obsolete"),
        members,
    })
}

fn api_module(decoder: &mut TypeDecoder, rid: u32) -> Result<ApiModule> {
    let metadata = decoder.metadata();
    let mut module = ApiModule::default();

    for field in metadata.fields(rid) {
        let name = metadata.string(field.name)?;
        match field_constant(metadata, &field)? {
            Some(value) => module.constants.push(ConstantMember {
                name: name.to_string(),
                value,
                deprecated: is_deprecated(metadata, &field),
            }),
            None => debug!("{name}: skipping non-literal field"),
        }
    }

    for method in metadata.methods(rid) {
        module
            .methods
            .push(MethodContract::from_import(decoder, &method)?);
    }

    module.constants.sort_by(|left, right| left.name.cmp(&right.name));
    module.constants.dedup_by(|right, left| left.name == right.name);
    module.methods.sort_by(|left, right| left.name.cmp(&right.name));
    module.methods.dedup_by(|right, left| left.name == right.name);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{AttributeDef, FieldDef, MetadataBuilder, MethodDef},
        metadata::{
            signatures::TypeSignature, tables::PInvokeAttributes, typesystem::TypeRegistry,
            view::MetadataView,
        },
    };

    const NS: &str = "Windows.Win32.Test";

    fn fixture() -> MetadataView {
        let mut builder = MetadataBuilder::new("Test.winmd");
        builder
            .struct_type("Windows.Win32.Foundation", "POINT")
            .field(FieldDef::new("x", TypeSignature::I4))
            .field(FieldDef::new("y", TypeSignature::I4))
            .finish();
        builder
            .struct_type("Windows.Win32.Foundation", "HANDLE")
            .attribute(AttributeDef::new("NativeTypedefAttribute"))
            .attribute(AttributeDef::new("RAIIFreeAttribute").string("CloseHandle"))
            .attribute(AttributeDef::new("InvalidHandleValueAttribute").i64(-1))
            .attribute(AttributeDef::new("InvalidHandleValueAttribute").i64(0))
            .field(FieldDef::new("Value", TypeSignature::I))
            .finish();
        builder
            .struct_type("Windows.Win32.Foundation", "BOOL")
            .field(FieldDef::new("Value", TypeSignature::I4))
            .finish();
        let point = builder.type_ref("Windows.Win32.Foundation", "POINT");
        builder
            .struct_type(NS, "LINE")
            .field(FieldDef::new(
                "from",
                TypeSignature::ValueType(TableId::TypeRef.token(point)),
            ))
            .field(FieldDef::new(
                "to",
                TypeSignature::ValueType(TableId::TypeRef.token(point)),
            ))
            .finish();
        builder
            .enum_type(NS, "COLOR", TypeSignature::U4)
            .attribute(AttributeDef::new("FlagsAttribute"))
            .member("COLOR_RED", ConstantValue::U4(1))
            .member("COLOR_GREEN", ConstantValue::U4(2))
            .finish();
        builder
            .class_type(NS, API_CONTAINER)
            .field(FieldDef::new("Z_LAST", TypeSignature::I4).constant(ConstantValue::I4(26)))
            .field(FieldDef::new("A_FIRST", TypeSignature::I4).constant(ConstantValue::I4(1)))
            .method(
                MethodDef::import("ByOrdinal", "SHELL32.dll", PInvokeAttributes::CALL_CONV_WINAPI)
                    .import_name("#12"),
            )
            .method(MethodDef::import("Beep", "KERNEL32.dll", 0).returns(TypeSignature::U4))
            .finish();
        builder.delegate_type(NS, "CALLBACK").finish();
        MetadataView::from_metadata(builder.build().unwrap()).unwrap()
    }

    fn classify_named(view: &MetadataView, namespace: &str, name: &str) -> Classification {
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(view.metadata(), &registry);
        let rid = view.metadata().find_typedef(namespace, name).unwrap();
        classify(&mut decoder, rid).unwrap()
    }

    #[test]
    fn classification() {
        let view = fixture();
        let foundation = "Windows.Win32.Foundation";
        assert_eq!(
            classify_named(&view, foundation, "POINT"),
            Classification::Emit(UnitKind::Struct)
        );
        assert_eq!(
            classify_named(&view, foundation, "HANDLE"),
            Classification::Emit(UnitKind::Handle)
        );
        assert_eq!(
            classify_named(&view, foundation, "BOOL"),
            Classification::Skip("pseudo-primitive")
        );
        assert_eq!(
            classify_named(&view, NS, "COLOR"),
            Classification::Emit(UnitKind::Enum)
        );
        assert_eq!(
            classify_named(&view, NS, API_CONTAINER),
            Classification::Emit(UnitKind::ApiModule)
        );
        assert_eq!(
            classify_named(&view, NS, "CALLBACK"),
            Classification::Skip("delegate")
        );
        assert_eq!(
            classify_named(&view, "", "<Module>"),
            Classification::Skip("base is not a type reference")
        );
    }

    #[test]
    fn units() {
        let view = fixture();
        let metadata = view.metadata();
        let registry = TypeRegistry::new();
        let mut decoder = TypeDecoder::new(metadata, &registry);

        let line = metadata.find_typedef(NS, "LINE").unwrap();
        let unit = EmissionUnit::build(&mut decoder, line, UnitKind::Struct).unwrap();
        assert_eq!(unit.relative_path(), "Windows/Win32/Test/LINE.ahk");
        assert_eq!(unit.qualified_name(), "Windows.Win32.Test.LINE");
        assert_eq!(
            unit.imports,
            vec![TypeName::new("Windows.Win32.Foundation", "POINT")]
        );

        let handle = metadata
            .find_typedef("Windows.Win32.Foundation", "HANDLE")
            .unwrap();
        let unit = EmissionUnit::build(&mut decoder, handle, UnitKind::Handle).unwrap();
        let EmitterKind::Handle(handle) = &unit.kind else {
            panic!("expected a handle, got {}", unit.kind.unit_kind());
        };
        assert_eq!(handle.invalid_values, vec![-1, 0]);
        assert_eq!(handle.free_function.as_deref(), Some("CloseHandle"));

        let color = metadata.find_typedef(NS, "COLOR").unwrap();
        let unit = EmissionUnit::build(&mut decoder, color, UnitKind::Enum).unwrap();
        let EmitterKind::Enum(color) = &unit.kind else {
            panic!("expected an enum");
        };
        assert_eq!(color.underlying, PrimitiveKind::UInt32);
        assert!(color.flags);
        assert_eq!(color.members.len(), 2);
        assert_eq!(color.members[1].value, ConstantValue::U4(2));

        let apis = metadata.find_typedef(NS, API_CONTAINER).unwrap();
        let unit = EmissionUnit::build(&mut decoder, apis, UnitKind::ApiModule).unwrap();
        let EmitterKind::ApiModule(module) = &unit.kind else {
            panic!("expected an API module");
        };
        let constants: Vec<&str> = module.constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(constants, ["A_FIRST", "Z_LAST"]);
        let methods: Vec<&str> = module.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, ["Beep", "ByOrdinal"]);
        assert_eq!(
            unit.imports,
            vec![
                TypeName::new("Windows.Win32.Foundation", API_CONTAINER),
                TypeName::new("Windows.Win32.System.LibraryLoader", API_CONTAINER),
            ]
        );
    }
}
