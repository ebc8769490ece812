//! Marshaling contracts of P/Invoke imports and COM methods.
//!
//! A [`MethodContract`] is everything the emitter needs to generate a foreign call: the
//! decoded parameter list with the return slot at index 0, the per-parameter marshaling
//! flags, how the call is dispatched and how failures are reported.

use log::debug;

use crate::{
    metadata::{
        customattributes::KnownAttribute,
        method::{CallingConvention, CharSet, EntryPoint, ParamFlags},
        signatures::{parse_method_signature, SignatureMethod},
        tables::{MethodDefRaw, ParamRaw, PInvokeAttributes},
        typesystem::{PrimitiveKind, TypeDecoder, TypeDescriptor},
    },
    Error, Result,
};

/// One parameter, or the return slot at sequence 0
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterContract {
    /// Parameter name, `param{n}` when the metadata has none
    pub name: String,
    /// Position, 0 for the return slot
    pub sequence: u16,
    /// Decoded type
    pub descriptor: TypeDescriptor,
    /// Marshaling flags
    pub flags: ParamFlags,
    /// For sized buffers, the parameter that holds the byte count
    pub size_param: Option<u16>,
}

impl ParameterContract {
    /// Returns `true` if the caller must always pass zero.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.flags.contains(ParamFlags::RESERVED)
    }

    /// Returns `true` if the parameter is a string pointer (`PWSTR`, `PSTR` and their
    /// const variants).
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(
            &self.descriptor,
            TypeDescriptor::NativeTypedef { name, .. }
                if matches!(name.as_str(), "PWSTR" | "PSTR" | "PCWSTR" | "PCSTR")
        )
    }
}

/// A handle returned by value, wrapped into its handle class by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleReturn {
    /// TypeDef row of the handle type
    pub typedef: u32,
    /// Namespace of the handle type
    pub namespace: String,
    /// Handle type name
    pub name: String,
    /// The field holding the raw handle value
    pub field: String,
    /// `false` if the callee keeps ownership of the handle
    pub owned: bool,
    /// Return values that mean "no handle" rather than a failure
    pub ignore_values: Vec<i64>,
}

/// The complete calling contract of a callable member
#[derive(Debug, Clone, PartialEq)]
pub struct MethodContract {
    /// Method name
    pub name: String,
    /// MethodDef row
    pub method: u32,
    /// Return slot at index 0, then the parameters in order
    pub parameters: Vec<ParameterContract>,
    /// Calling convention
    pub calling_convention: CallingConvention,
    /// Character set of string parameters
    pub char_set: CharSet,
    /// The callee reports failures through the last-error slot
    pub sets_last_error: bool,
    /// Dispatch target
    pub entry_point: EntryPoint,
    /// A non-zero `HRESULT` result must be raised
    pub throws_on_failure: bool,
    /// Set when the return value is a handle
    pub handle_return: Option<HandleReturn>,
    /// Carries `ObsoleteAttribute`
    pub deprecated: bool,
    /// `SupportedOSPlatformAttribute`
    pub min_platform: Option<String>,
}

impl MethodContract {
    /// Builds the contract of P/Invoke import `method`.
    ///
    /// # Errors
    /// Returns [`Error::MissingData`] if the method has no ImplMap row,
    /// [`Error::Unsupported`] if a parameter has an unsupported type, and any error raised
    /// while decoding the signature.
    pub fn from_import(decoder: &mut TypeDecoder, method: &MethodDefRaw) -> Result<Self> {
        let metadata = decoder.metadata();
        let name = metadata.string(method.name)?;
        let impl_map = metadata
            .impl_map(method.rid)
            .ok_or_else(|| Error::MissingData(format!("{name}: no ImplMap row")))?;

        let library = metadata.module_ref_name(impl_map.import_scope)?;
        let import_name = metadata.string(impl_map.import_name)?;
        let import_name = if import_name.is_empty() { name } else { import_name };

        let mut contract = Self::build(decoder, method, EntryPoint::import(library, import_name))?;
        contract.calling_convention = CallingConvention::from_import_flags(impl_map.mapping_flags);
        contract.char_set = CharSet::from_import_flags(impl_map.mapping_flags);
        contract.sets_last_error =
            u32::from(impl_map.mapping_flags) & PInvokeAttributes::SUPPORTS_LAST_ERROR != 0;
        Ok(contract)
    }

    /// Builds the contract of COM method `method` called through vtable slot `index`.
    ///
    /// # Errors
    /// See [`MethodContract::from_import`].
    pub fn from_com(decoder: &mut TypeDecoder, method: &MethodDefRaw, index: u32) -> Result<Self> {
        Self::build(decoder, method, EntryPoint::Vtable(index))
    }

    fn build(
        decoder: &mut TypeDecoder,
        method: &MethodDefRaw,
        entry_point: EntryPoint,
    ) -> Result<Self> {
        let metadata = decoder.metadata();
        let name = metadata.string(method.name)?.to_string();
        let signature = parse_method_signature(metadata.blob(method.signature)?)?;
        let context = metadata.index().method_owner(method.rid);

        let parameters = parameters(decoder, method, &signature, context)
            .map_err(|error| match error {
                Error::Unsupported(message) => Error::Unsupported(format!("{name}: {message}")),
                other => other,
            })?;

        let mut preserve_sig = None;
        let mut relaxed_hresult = false;
        let mut deprecated = false;
        let mut min_platform = None;
        for attribute in metadata.known_attributes(method.token)? {
            match attribute {
                KnownAttribute::PreserveSig(value) => preserve_sig = Some(value),
                KnownAttribute::CanReturnMultipleSuccessValues
                | KnownAttribute::CanReturnErrorsAsSuccess => relaxed_hresult = true,
                KnownAttribute::Obsolete(_) => deprecated = true,
                KnownAttribute::SupportedOsPlatform(platform) => min_platform = Some(platform),
                _ => {}
            }
        }

        let returns_hresult = matches!(parameters[0].descriptor.terminal(), TypeDescriptor::Hresult);
        let throws_on_failure = returns_hresult
            && match preserve_sig {
                None => true,
                Some(false) => false,
                Some(true) => !relaxed_hresult,
            };

        let handle_return = handle_return(decoder, &parameters[0])?;

        Ok(MethodContract {
            name,
            method: method.rid,
            parameters,
            calling_convention: CallingConvention::default(),
            char_set: CharSet::default(),
            sets_last_error: false,
            entry_point,
            throws_on_failure,
            handle_return,
            deprecated,
            min_platform,
        })
    }

    /// The return slot.
    #[must_use]
    pub fn return_value(&self) -> &ParameterContract {
        &self.parameters[0]
    }

    /// Returns `true` unless the method returns `void`.
    #[must_use]
    pub fn has_return_value(&self) -> bool {
        !matches!(
            self.parameters[0].descriptor,
            TypeDescriptor::Primitive {
                kind: PrimitiveKind::Void,
                ..
            }
        )
    }

    /// The parameters after the return slot.
    #[must_use]
    pub fn arguments(&self) -> &[ParameterContract] {
        &self.parameters[1..]
    }

    /// Returns `true` if the method can be called from script. `thiscall` members cannot.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        self.calling_convention != CallingConvention::Thiscall
    }
}

fn parameters(
    decoder: &mut TypeDecoder,
    method: &MethodDefRaw,
    signature: &SignatureMethod,
    context: Option<u32>,
) -> Result<Vec<ParameterContract>> {
    let metadata = decoder.metadata();
    let rows = metadata.params(method.rid);
    let row = |sequence: u16| rows.iter().find(|param| param.sequence == sequence);

    let mut parameters = Vec::with_capacity(signature.params.len() + 1);
    let returned = decoder.decode_parameter(&signature.return_type, context)?;
    parameters.push(parameter(decoder, row(0), 0, returned)?);

    for (index, param) in signature.params.iter().enumerate() {
        let sequence = u16::try_from(index + 1)
            .map_err(|_| malformed_error!("Too many parameters - {}", index + 1))?;
        let descriptor = decoder.decode_parameter(param, context)?;
        parameters.push(parameter(decoder, row(sequence), sequence, descriptor)?);
    }

    Ok(parameters)
}

fn parameter(
    decoder: &TypeDecoder,
    row: Option<&ParamRaw>,
    sequence: u16,
    descriptor: TypeDescriptor,
) -> Result<ParameterContract> {
    let metadata = decoder.metadata();
    let name = match row {
        Some(row) if row.name != 0 => metadata.string(row.name)?.to_string(),
        _ if sequence == 0 => String::new(),
        _ => format!("param{sequence}"),
    };

    if let TypeDescriptor::Other(raw) = &descriptor {
        return Err(Error::Unsupported(if sequence == 0 {
            format!("unsupported return type {raw}")
        } else {
            format!("parameter {name} has unsupported type {raw}")
        }));
    }

    let mut contract = ParameterContract {
        name,
        sequence,
        descriptor,
        flags: ParamFlags::empty(),
        size_param: None,
    };
    let Some(row) = row else {
        return Ok(contract);
    };

    contract.flags = ParamFlags::from_param_flags(row.flags);
    for attribute in metadata.known_attributes(row.token)? {
        match attribute {
            KnownAttribute::Reserved => contract.flags |= ParamFlags::RESERVED,
            KnownAttribute::Const => contract.flags |= ParamFlags::CONST,
            KnownAttribute::RetVal => contract.flags |= ParamFlags::RETVAL,
            KnownAttribute::ComOutPtr => contract.flags |= ParamFlags::COM_OUT_PTR,
            KnownAttribute::DoNotRelease => contract.flags |= ParamFlags::DO_NOT_RELEASE,
            KnownAttribute::MemorySize(bytes) => {
                contract.flags |= ParamFlags::SIZED_BUFFER;
                contract.size_param = bytes;
                let pointee = match &contract.descriptor {
                    TypeDescriptor::Pointer { name, .. } => name.clone(),
                    other => other.name(),
                };
                contract.descriptor = TypeDescriptor::opaque(pointee);
            }
            _ => {}
        }
    }

    Ok(contract)
}

fn handle_return(
    decoder: &TypeDecoder,
    returned: &ParameterContract,
) -> Result<Option<HandleReturn>> {
    let TypeDescriptor::NativeTypedef { name, typedef, .. } = &returned.descriptor else {
        return Ok(None);
    };
    if !decoder.is_handle(*typedef)? {
        return Ok(None);
    }

    let metadata = decoder.metadata();
    let row = metadata.typedef(*typedef)?;
    let (namespace, _) = metadata.typedef_name(&row)?;
    let field = match metadata.fields(*typedef).first() {
        Some(field) => metadata.string(field.name)?.to_string(),
        None => return Err(Error::MissingData(format!("{name}: handle without a value field"))),
    };

    let mut ignore_values = Vec::new();
    for attribute in metadata.known_attributes(row.token)? {
        if let KnownAttribute::IgnoreIfReturn(value) = attribute {
            match parse_integer(&value) {
                Some(value) => ignore_values.push(value),
                None => debug!("{name}: ignoring non-numeric IgnoreIfReturn value {value}"),
            }
        }
    }

    Ok(Some(HandleReturn {
        typedef: *typedef,
        namespace: namespace.to_string(),
        name: name.clone(),
        field,
        owned: !returned.flags.contains(ParamFlags::DO_NOT_RELEASE),
        ignore_values,
    }))
}

#[allow(clippy::cast_possible_wrap)]
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok().map(|value| value as i64),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{AttributeDef, FieldDef, MetadataBuilder, MethodDef, ParamDef},
        metadata::{
            signatures::{SignaturePointer, TypeSignature},
            tables::{PInvokeAttributes, TableId},
            typesystem::TypeRegistry,
            view::MetadataView,
        },
    };

    const NS: &str = "Windows.Win32.Test";

    fn pointer(base: TypeSignature) -> TypeSignature {
        TypeSignature::Ptr(SignaturePointer {
            modifiers: Vec::new(),
            base: Box::new(base),
        })
    }

    fn load(builder: &MetadataBuilder) -> MetadataView {
        MetadataView::from_metadata(builder.build().unwrap()).unwrap()
    }

    fn import(view: &MetadataView, registry: &TypeRegistry, name: &str) -> MethodContract {
        let metadata = view.metadata();
        let apis = metadata.find_typedef(NS, "Apis").unwrap();
        let method = metadata
            .methods(apis)
            .into_iter()
            .find(|method| metadata.string(method.name).unwrap() == name)
            .unwrap();
        let mut decoder = TypeDecoder::new(metadata, registry);
        MethodContract::from_import(&mut decoder, &method).unwrap()
    }

    #[test]
    fn import_flags_and_parameters() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let flags = PInvokeAttributes::CALL_CONV_WINAPI
            | PInvokeAttributes::CHAR_SET_UNICODE
            | PInvokeAttributes::SUPPORTS_LAST_ERROR;
        builder
            .class_type(NS, "Apis")
            .method(
                MethodDef::import("GetThing", "KERNEL32.dll", flags)
                    .returns(TypeSignature::U4)
                    .param(ParamDef::new("in", TypeSignature::U4).flags(0x0001))
                    .param(
                        ParamDef::new("lpReserved", pointer(TypeSignature::Void))
                            .attribute(AttributeDef::new("ReservedAttribute")),
                    )
                    .param(
                        ParamDef::new("buffer", pointer(TypeSignature::U1))
                            .flags(0x0002)
                            .attribute(
                                AttributeDef::new("MemorySizeAttribute")
                                    .named_u16("BytesParamIndex", 3),
                            ),
                    )
                    .param(ParamDef::new("size", TypeSignature::U4)),
            )
            .method(MethodDef::import("ByOrdinal", "SHELL32.dll", 0).import_name("#680"))
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();

        let contract = import(&view, &registry, "GetThing");
        assert_eq!(contract.calling_convention, CallingConvention::Winapi);
        assert_eq!(contract.char_set, CharSet::Unicode);
        assert!(contract.sets_last_error);
        assert!(contract.has_return_value());
        assert!(!contract.throws_on_failure);
        assert_eq!(
            contract.entry_point,
            EntryPoint::Symbol {
                library: "KERNEL32.dll".to_string(),
                name: "GetThing".to_string()
            }
        );

        let arguments = contract.arguments();
        assert_eq!(arguments.len(), 4);
        assert_eq!(arguments[0].name, "in");
        assert_eq!(arguments[0].flags, ParamFlags::IN);
        assert!(arguments[1].is_reserved());
        assert!(arguments[2].flags.contains(ParamFlags::OUT | ParamFlags::SIZED_BUFFER));
        assert_eq!(arguments[2].size_param, Some(3));
        assert_eq!(arguments[2].descriptor, TypeDescriptor::opaque("Byte"));
        assert_eq!(arguments[3].sequence, 4);

        let ordinal = import(&view, &registry, "ByOrdinal");
        assert!(!ordinal.has_return_value());
        assert_eq!(
            ordinal.entry_point,
            EntryPoint::Ordinal {
                library: "SHELL32.dll".to_string(),
                ordinal: 680
            }
        );
    }

    #[test]
    fn hresult_failures_raise_unless_preserved() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        builder
            .struct_type("Windows.Win32.Foundation", "HRESULT")
            .field(FieldDef::new("Value", TypeSignature::I4))
            .finish();
        let hresult = builder.type_ref("Windows.Win32.Foundation", "HRESULT");
        let returns = || TypeSignature::ValueType(TableId::TypeRef.token(hresult));

        builder
            .class_type(NS, "Apis")
            .method(MethodDef::import("Plain", "OLE32.dll", 0).returns(returns()))
            .method(
                MethodDef::import("Preserved", "OLE32.dll", 0)
                    .returns(returns())
                    .attribute(AttributeDef::new("PreserveSigAttribute").bool(false)),
            )
            .method(
                MethodDef::import("Relaxed", "OLE32.dll", 0)
                    .returns(returns())
                    .attribute(AttributeDef::new("PreserveSigAttribute").bool(true))
                    .attribute(AttributeDef::new("CanReturnErrorsAsSuccessAttribute")),
            )
            .method(
                MethodDef::import("Strict", "OLE32.dll", 0)
                    .returns(returns())
                    .attribute(AttributeDef::new("PreserveSigAttribute").bool(true)),
            )
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();

        let plain = import(&view, &registry, "Plain");
        assert_eq!(plain.return_value().descriptor, TypeDescriptor::Hresult);
        assert!(plain.throws_on_failure);
        assert!(!import(&view, &registry, "Preserved").throws_on_failure);
        assert!(!import(&view, &registry, "Relaxed").throws_on_failure);
        assert!(import(&view, &registry, "Strict").throws_on_failure);
    }

    #[test]
    fn handle_returns_and_strings() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        builder
            .struct_type("Windows.Win32.Foundation", "HANDLE")
            .attribute(AttributeDef::new("NativeTypedefAttribute"))
            .attribute(AttributeDef::new("RAIIFreeAttribute").string("CloseHandle"))
            .attribute(AttributeDef::new("InvalidHandleValueAttribute").i64(-1))
            .attribute(AttributeDef::new("IgnoreIfReturnAttribute").string("0"))
            .field(FieldDef::new("Value", TypeSignature::I))
            .finish();
        builder
            .struct_type("Windows.Win32.Foundation", "PWSTR")
            .attribute(AttributeDef::new("NativeTypedefAttribute"))
            .field(FieldDef::new("Value", pointer(TypeSignature::Char)))
            .finish();
        let handle = builder.type_ref("Windows.Win32.Foundation", "HANDLE");
        let pwstr = builder.type_ref("Windows.Win32.Foundation", "PWSTR");

        builder
            .class_type(NS, "Apis")
            .method(
                MethodDef::import("OpenThing", "KERNEL32.dll", 0)
                    .returns(TypeSignature::ValueType(TableId::TypeRef.token(handle)))
                    .param(ParamDef::new(
                        "lpName",
                        TypeSignature::ValueType(TableId::TypeRef.token(pwstr)),
                    )),
            )
            .method(
                MethodDef::import("PeekThing", "KERNEL32.dll", 0)
                    .returns(TypeSignature::ValueType(TableId::TypeRef.token(handle)))
                    .return_attribute(AttributeDef::new("DoNotReleaseAttribute")),
            )
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();

        let open = import(&view, &registry, "OpenThing");
        let returned = open.handle_return.as_ref().unwrap();
        assert_eq!(returned.name, "HANDLE");
        assert_eq!(returned.namespace, "Windows.Win32.Foundation");
        assert_eq!(returned.field, "Value");
        assert!(returned.owned);
        assert_eq!(returned.ignore_values, vec![0]);
        assert!(open.arguments()[0].is_string());
        assert_eq!(open.arguments()[0].descriptor.call_type(), "ptr");

        let peek = import(&view, &registry, "PeekThing");
        assert!(!peek.handle_return.unwrap().owned);
    }

    #[test]
    fn unsupported_parameter_is_fatal() {
        let mut builder = MetadataBuilder::new("Test.winmd");
        builder
            .class_type(NS, "Apis")
            .method(
                MethodDef::import("TakesString", "KERNEL32.dll", 0)
                    .param(ParamDef::new("value", TypeSignature::String)),
            )
            .finish();

        let view = load(&builder);
        let registry = TypeRegistry::new();
        let metadata = view.metadata();
        let apis = metadata.find_typedef(NS, "Apis").unwrap();
        let method = metadata.methods(apis).remove(0);
        let mut decoder = TypeDecoder::new(metadata, &registry);

        let error = MethodContract::from_import(&mut decoder, &method).unwrap_err();
        assert!(matches!(error, Error::Unsupported(message) if message.starts_with("TakesString")));
    }

    #[test]
    fn integers() {
        assert_eq!(parse_integer("-1"), Some(-1));
        assert_eq!(parse_integer("0xFFFFFFFFFFFFFFFF"), Some(-1));
        assert_eq!(parse_integer("NULL"), None);
    }
}
