//! AutoHotkey v2 script writer.
//!
//! Every [`EmissionUnit`] becomes one self-contained `.ahk` file that defines a single
//! class. The classes build on a small runtime library expected at the output root:
//! `Win32Struct`, `Win32Handle`, `Win32ComInterface`, `Win32FixedArray` and `Guid`.

mod callables;
mod members;

use std::fmt::Write;

use crate::{
    emitter::{
        docs::{ApiDetails, ApiDocs},
        unit::{
            ApiModule, ComUnit, ConstantMember, EmissionUnit, EmitterKind, EnumUnit, HandleUnit,
        },
    },
    metadata::{
        constants::ConstantValue,
        typesystem::{LayoutFlags, StructLayout},
    },
    Result,
};

/// First line of every generated file
const HEADER: &str = "#Requires AutoHotkey v2.0.0 64-bit";

/// Names that would shadow a global class of the script runtime
const RESERVED_CLASS_NAMES: [&str; 4] = ["string", "number", "float", "integer"];

/// Parameter names that are keywords of the script language
const RESERVED_IDENTIFIERS: [&str; 8] = ["in", "as", "is", "contains", "not", "and", "or", "this"];

/// The class name a type is emitted under.
///
/// The `_e__Struct` suffix of generated aggregate names is dropped, and names that collide
/// with built-in classes are prefixed with `Win32`.
#[must_use]
pub fn class_name(name: &str) -> String {
    let name = name.strip_suffix("_e__Struct").unwrap_or(name);
    if RESERVED_CLASS_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        format!("Win32{name}")
    } else {
        name.to_string()
    }
}

/// A parameter name that is safe to declare, keywords get an `_R` suffix.
#[must_use]
pub fn identifier(name: &str) -> String {
    if RESERVED_IDENTIFIERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        format!("{name}_R")
    } else {
        name.to_string()
    }
}

/// Path from the directory of `namespace` back to the output root, with a trailing `\`.
fn path_to_base(namespace: &str) -> String {
    namespace
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|_| "..\\")
        .collect()
}

/// Relative path from the directory of namespace `from` to that of `to`, with a trailing
/// `\`.
fn relative_path(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('.').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('.').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(left, right)| left == right)
        .count();

    if common == from.len() && common == to.len() {
        return ".\\".to_string();
    }

    let mut path = "..\\".repeat(from.len() - common);
    for segment in &to[common..] {
        path.push_str(segment);
        path.push('\\');
    }
    path
}

/// Makes documentation text safe inside a `/** */` block indented by `indent`.
fn escape_docs(text: &str, indent: &str) -> String {
    text.replace('\r', "")
        .replace("/*", "//")
        .replace("*/", "")
        .replace('\n', &format!("\n{indent} * "))
}

/// Prefixes every non-empty line of `text` with four spaces.
fn indented(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str("    ");
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn constant_doc_type(value: &ConstantValue) -> &'static str {
    match value {
        ConstantValue::R4(_) | ConstantValue::R8(_) => "Float",
        ConstantValue::String(_) | ConstantValue::Guid(_) => "String",
        _ => "Integer",
    }
}

/// Renders [`EmissionUnit`]s as AutoHotkey v2 source
pub struct ScriptWriter<'d> {
    docs: &'d ApiDocs,
    version: String,
}

impl<'d> ScriptWriter<'d> {
    /// Creates a writer drawing doc comments from `docs` and stamping `version`, the
    /// metadata version, into every type.
    pub fn new(docs: &'d ApiDocs, version: impl Into<String>) -> Self {
        ScriptWriter {
            docs,
            version: version.into(),
        }
    }

    /// Renders `unit` as the contents of its file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unsupported`] if a member has no accessor shape.
    pub fn render(&self, unit: &EmissionUnit) -> Result<String> {
        let mut out = String::new();
        match &unit.kind {
            EmitterKind::Struct(layout) => self.write_struct(&mut out, unit, layout)?,
            EmitterKind::Handle(handle) => self.write_handle(&mut out, unit, handle)?,
            EmitterKind::Enum(enumeration) => self.write_enum(&mut out, unit, enumeration),
            EmitterKind::ApiModule(module) => self.write_api_module(&mut out, unit, module),
            EmitterKind::ComInterface(com) => self.write_com_interface(&mut out, unit, com),
        }
        Ok(out)
    }

    fn write_imports(&self, out: &mut String, unit: &EmissionUnit) {
        for import in &unit.imports {
            let _ = writeln!(
                out,
                "#Include {}{}.ahk",
                relative_path(&unit.namespace, &import.namespace),
                import.name
            );
        }
    }

    fn write_type_docs(
        &self,
        out: &mut String,
        name: &str,
        namespace: &str,
        flags: LayoutFlags,
    ) {
        out.push_str("/**\n");
        if let Some(details) = self.docs.get(name) {
            if let Some(description) = &details.description {
                let _ = writeln!(out, " * {}", escape_docs(description, ""));
            }
            if let Some(remarks) = &details.remarks {
                out.push_str(" * @remarks\n");
                let _ = writeln!(out, " * {}", escape_docs(remarks, ""));
            }
            if let Some(link) = &details.help_link {
                let _ = writeln!(out, " * @see {link}");
            }
        }
        let _ = writeln!(out, " * @namespace {namespace}");
        let _ = writeln!(out, " * @version {}", self.version);
        if flags.contains(LayoutFlags::ANSI) {
            out.push_str(" * @charset ANSI\n");
        }
        if flags.contains(LayoutFlags::UNICODE) {
            out.push_str(" * @charset Unicode\n");
        }
        if flags.contains(LayoutFlags::DEPRECATED) {
            out.push_str(" * @deprecated\n");
        }
        out.push_str(" */\n");
    }

    fn write_constant(
        &self,
        out: &mut String,
        constant: &ConstantMember,
        details: Option<&ApiDetails>,
    ) {
        out.push_str("    /**\n");
        if let Some(description) = details.and_then(|details| details.fields.get(&constant.name))
        {
            let _ = writeln!(out, "     * {}", escape_docs(description, "    "));
        }
        if constant.deprecated {
            out.push_str("     * @deprecated\n");
        }
        let _ = writeln!(out, "     * @type {{{}}}", constant_doc_type(&constant.value));
        out.push_str("     */\n");
        let _ = writeln!(
            out,
            "    static {} => {}",
            constant.name,
            constant.value.to_literal()
        );
    }

    fn write_struct(
        &self,
        out: &mut String,
        unit: &EmissionUnit,
        layout: &StructLayout,
    ) -> Result<()> {
        let _ = writeln!(out, "{HEADER}");
        let _ = writeln!(out, "#Include {}Win32Struct.ahk", path_to_base(&unit.namespace));
        self.write_imports(out, unit);
        out.push('\n');

        self.write_type_docs(out, &unit.name, &unit.namespace, layout.flags);
        let _ = writeln!(out, "class {} extends Win32Struct", class_name(&unit.name));
        out.push_str("{\n");
        let _ = writeln!(out, "    static sizeof => {}", layout.size);
        out.push('\n');
        let _ = writeln!(out, "    static packingSize => {}", layout.packing_size);

        self.write_struct_body(out, layout)?;
        self.write_size_initializer(out, layout);
        out.push_str("}\n");
        Ok(())
    }

    fn write_handle(
        &self,
        out: &mut String,
        unit: &EmissionUnit,
        handle: &HandleUnit,
    ) -> Result<()> {
        let layout = &handle.layout;
        let _ = writeln!(out, "{HEADER}");
        let _ = writeln!(out, "#Include {}Win32Handle.ahk", path_to_base(&unit.namespace));
        self.write_imports(out, unit);
        if handle.free_function.is_some() {
            out.push_str("#Include .\\Apis.ahk\n");
        }
        out.push('\n');

        self.write_type_docs(out, &unit.name, &unit.namespace, layout.flags);
        let _ = writeln!(out, "class {} extends Win32Handle", class_name(&unit.name));
        out.push_str("{\n");
        let _ = writeln!(out, "    static sizeof => {}", layout.size);
        out.push('\n');
        let _ = writeln!(out, "    static packingSize => {}", layout.packing_size);
        out.push('\n');
        out.push_str("    /**\n");
        out.push_str("     * The list of values which indicate that the handle is invalid\n");
        out.push_str("     * @type {Array<Integer>}\n");
        out.push_str("     */\n");
        let values: Vec<String> = handle.invalid_values.iter().map(i64::to_string).collect();
        let _ = writeln!(out, "    static invalidValues => [{}]", values.join(", "));

        self.write_struct_body(out, layout)?;

        if let (Some(free), Some(value)) = (&handle.free_function, layout.members.first()) {
            let module = unit.namespace.rsplit('.').next().unwrap_or_default();
            let invalid = handle.invalid_values.first().copied().unwrap_or_default();
            out.push('\n');
            out.push_str("    Free(){\n");
            let _ = writeln!(out, "        {module}.{free}(this.{})", value.name);
            let _ = writeln!(out, "        this.{} := {invalid}", value.name);
            out.push_str("    }\n");
        }

        out.push_str("}\n");
        Ok(())
    }

    fn write_enum(&self, out: &mut String, unit: &EmissionUnit, enumeration: &EnumUnit) {
        let _ = writeln!(out, "{HEADER}");
        out.push('\n');

        let flags = if enumeration.deprecated {
            LayoutFlags::DEPRECATED
        } else {
            LayoutFlags::empty()
        };
        self.write_type_docs(out, &unit.name, &unit.namespace, flags);
        let _ = writeln!(out, "class {}{{", class_name(&unit.name));

        let details = self.docs.get(&unit.name);
        for member in &enumeration.members {
            out.push('\n');
            self.write_constant(out, member, details);
        }

        out.push_str("}\n");
    }

    fn write_api_module(
        &self,
        out: &mut String,
        unit: &EmissionUnit,
        module: &ApiModule,
    ) {
        let class = unit
            .namespace
            .rsplit('.')
            .next()
            .unwrap_or(unit.name.as_str());

        let _ = writeln!(out, "{HEADER}");
        let _ = writeln!(out, "#Include {}Win32Handle.ahk", path_to_base(&unit.namespace));
        self.write_imports(out, unit);
        out.push('\n');

        self.write_type_docs(out, class, &unit.namespace, LayoutFlags::empty());
        let _ = writeln!(out, "class {class} {{");
        out.push('\n');

        out.push_str(";@region Constants\n");
        let details = self.docs.get(class);
        for constant in &module.constants {
            out.push('\n');
            self.write_constant(out, constant, details);
        }
        out.push_str(";@endregion Constants\n");
        out.push('\n');

        out.push_str(";@region Methods\n");
        for method in &module.methods {
            self.write_callable(out, method);
            out.push('\n');
        }
        out.push_str(";@endregion Methods\n");

        out.push_str("}\n");
    }

    fn write_com_interface(
        &self,
        out: &mut String,
        unit: &EmissionUnit,
        com: &ComUnit,
    ) {
        let interface = &com.interface;
        let base_path = path_to_base(&unit.namespace);

        let _ = writeln!(out, "{HEADER}");
        if com.base.is_none() {
            let _ = writeln!(out, "#Include {base_path}Win32ComInterface.ahk");
        }
        let _ = writeln!(out, "#Include {base_path}Guid.ahk");
        self.write_imports(out, unit);
        out.push('\n');

        let name = class_name(&unit.name);
        let base = com
            .base
            .as_ref()
            .map_or_else(|| "Win32ComInterface".to_string(), |base| class_name(&base.name));

        self.write_type_docs(out, &unit.name, &unit.namespace, LayoutFlags::empty());
        let _ = writeln!(out, "class {name} extends {base}{{");

        if let Some(iid) = &interface.iid {
            out.push_str("    /**\n");
            let _ = writeln!(out, "     * The interface identifier for {name}");
            out.push_str("     * @type {Guid}\n");
            out.push_str("     */\n");
            let _ = writeln!(out, "    static IID => Guid(\"{{{iid}}}\")");
        }

        if let Some(clsid) = &interface.clsid {
            out.push('\n');
            out.push_str("    /**\n");
            let _ = writeln!(
                out,
                "     * The class identifier for {}",
                name.strip_prefix('I').unwrap_or(&name)
            );
            out.push_str("     * @type {Guid}\n");
            out.push_str("     */\n");
            let _ = writeln!(out, "    static CLSID => Guid(\"{{{clsid}}}\")");
        }

        for method in &interface.methods {
            out.push('\n');
            self.write_callable(out, method);
        }

        out.push_str("}\n");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        emitter::unit::{TypeName, API_CONTAINER},
        metadata::{
            method::{
                CallingConvention, CharSet, ComInterface, EntryPoint, HandleReturn,
                MethodContract, ParamFlags, ParameterContract,
            },
            typesystem::{Bitfield, MemberFlags, PrimitiveKind, StructMember, TypeDescriptor},
        },
    };

    const NS: &str = "Windows.Win32.Test";

    fn uint() -> TypeDescriptor {
        TypeDescriptor::primitive(PrimitiveKind::UInt32)
    }

    fn member(name: &str, offset: u32, descriptor: TypeDescriptor) -> StructMember {
        StructMember {
            name: name.to_string(),
            field: 0,
            size: descriptor.width(),
            descriptor,
            offset,
            flags: MemberFlags::empty(),
            bitfields: Vec::new(),
        }
    }

    fn handle_type() -> TypeDescriptor {
        TypeDescriptor::NativeTypedef {
            name: "HANDLE".to_string(),
            typedef: 2,
            underlying: Box::new(TypeDescriptor::primitive(PrimitiveKind::IntPtr)),
        }
    }

    fn parameter(name: &str, sequence: u16, descriptor: TypeDescriptor) -> ParameterContract {
        ParameterContract {
            name: name.to_string(),
            sequence,
            descriptor,
            flags: ParamFlags::empty(),
            size_param: None,
        }
    }

    fn contract(
        name: &str,
        entry_point: EntryPoint,
        parameters: Vec<ParameterContract>,
    ) -> MethodContract {
        MethodContract {
            name: name.to_string(),
            method: 1,
            parameters,
            calling_convention: CallingConvention::Winapi,
            char_set: CharSet::NotSpecified,
            sets_last_error: false,
            entry_point,
            throws_on_failure: false,
            handle_return: None,
            deprecated: false,
            min_platform: None,
        }
    }

    fn unit(name: &str, kind: EmitterKind, imports: Vec<TypeName>) -> EmissionUnit {
        EmissionUnit {
            typedef: 1,
            namespace: NS.to_string(),
            name: name.to_string(),
            kind,
            imports,
        }
    }

    fn sample_struct() -> StructLayout {
        let point = Arc::new(StructLayout {
            name: "POINT".to_string(),
            namespace: "Windows.Win32.Foundation".to_string(),
            size: 8,
            packing_size: 4,
            ..StructLayout::default()
        });
        let header = Arc::new(StructLayout {
            name: "_Header".to_string(),
            flags: LayoutFlags::NESTED,
            members: vec![member("kind", 0, uint())],
            size: 4,
            packing_size: 4,
            ..StructLayout::default()
        });

        let mut flags = member("Flags", 76, uint());
        flags.flags = MemberFlags::NATIVE_BITFIELD;
        flags.bitfields = vec![
            Bitfield {
                name: "Enabled".to_string(),
                offset: 0,
                length: 1,
            },
            Bitfield {
                name: "Reserved".to_string(),
                offset: 1,
                length: 31,
            },
        ];

        StructLayout {
            name: "SAMPLE".to_string(),
            namespace: NS.to_string(),
            members: vec![
                member("cbSize", 0, uint()),
                member("szName", 4, TypeDescriptor::String { length: 32, wide: true }),
                member("pt", 68, TypeDescriptor::Struct(point)),
                flags,
                member("hdr", 80, TypeDescriptor::Struct(header)),
                member(
                    "rgValues",
                    84,
                    TypeDescriptor::Array {
                        element: Box::new(TypeDescriptor::primitive(PrimitiveKind::Byte)),
                        length: 4,
                    },
                ),
            ],
            size: 88,
            packing_size: 4,
            struct_size_field: Some("cbSize".to_string()),
            ..StructLayout::default()
        }
    }

    #[test]
    fn names() {
        assert_eq!(class_name("String"), "Win32String");
        assert_eq!(class_name("_Anonymous_e__Struct"), "_Anonymous");
        assert_eq!(class_name("RECT"), "RECT");
        assert_eq!(identifier("in"), "in_R");
        assert_eq!(identifier("This"), "This_R");
        assert_eq!(identifier("hWnd"), "hWnd");
    }

    #[test]
    fn paths() {
        assert_eq!(path_to_base("Windows.Win32.Foundation"), "..\\..\\..\\");
        assert_eq!(
            relative_path("Windows.Win32.UI.Shell", "Windows.Win32.Foundation"),
            "..\\..\\Foundation\\"
        );
        assert_eq!(
            relative_path("Windows.Win32.Foundation", "Windows.Win32.Foundation"),
            ".\\"
        );
        assert_eq!(
            relative_path("Windows.Win32.System", "Windows.Win32.System.Com"),
            "Com\\"
        );
    }

    #[test]
    fn doc_escaping() {
        assert_eq!(
            escape_docs("See /* this */ and\r\nthat", "    "),
            "See // this  and\n     * that"
        );
        assert_eq!(indented("a\n\nb\n"), "    a\n\n    b\n");
    }

    #[test]
    fn struct_file() {
        let mut docs = ApiDocs::new();
        docs.insert(
            "SAMPLE",
            ApiDetails {
                description: Some("A sample.\nSecond line".to_string()),
                fields: [("cbSize".to_string(), "Size in bytes.".to_string())].into(),
                ..ApiDetails::default()
            },
        );
        let writer = ScriptWriter::new(&docs, "1.0.0");
        let script = writer
            .render(&unit(
                "SAMPLE",
                EmitterKind::Struct(Arc::new(sample_struct())),
                vec![TypeName::new("Windows.Win32.Foundation", "POINT")],
            ))
            .unwrap();

        assert!(script.starts_with(
            "#Requires AutoHotkey v2.0.0 64-bit\n#Include ..\\..\\..\\Win32Struct.ahk\n#Include ..\\Foundation\\POINT.ahk\n\n/**\n"
        ));
        assert!(script.contains(" * A sample.\n * Second line\n * @namespace Windows.Win32.Test\n * @version 1.0.0\n */\n"));
        assert!(script.contains(
            "class SAMPLE extends Win32Struct\n{\n    static sizeof => 88\n\n    static packingSize => 4\n"
        ));
        assert!(script.contains("     * Size in bytes.\n     * @type {Integer}\n     */\n    cbSize {\n        get => NumGet(this, 0, \"uint\")\n        set => NumPut(\"uint\", value, this, 0)\n"));
        assert!(script.contains("        get => StrGet(this.ptr + 4, 31, \"UTF-16\")\n"));
        assert!(script.contains("                this.__pt := POINT(this.ptr + 68)\n"));
        assert!(script.contains("     * This bitfield backs the following members:\n     * - Enabled\n     * @type {Integer}\n"));
        assert!(script.contains("    Enabled {\n        get => (this.Flags >> 0) & 0x1\n"));
        assert!(!script.contains("    Reserved {"));
        assert!(script.contains(
            "    class _Header extends Win32Struct {\n        static sizeof => 4\n        static packingSize => 4\n"
        ));
        assert!(script.contains("            get => NumGet(this, 0, \"uint\")\n"));
        assert!(script.contains("                this.__hdr := %this.__Class%._Header(this.ptr + 80)\n"));
        assert!(script.contains(
            "this.__rgValuesProxyArray := Win32FixedArray(this.ptr + 84, 4, Primitive, \"uchar\")"
        ));
        assert!(script.contains("        super.__New(ptr)\n        this.cbSize := 88\n    }\n}\n"));
    }

    #[test]
    fn handle_file() {
        let docs = ApiDocs::new();
        let layout = Arc::new(StructLayout {
            name: "HANDLE".to_string(),
            namespace: NS.to_string(),
            members: vec![member("Value", 0, TypeDescriptor::primitive(PrimitiveKind::IntPtr))],
            size: 8,
            packing_size: 8,
            ..StructLayout::default()
        });
        let handle = HandleUnit {
            layout,
            invalid_values: vec![-1, 0],
            free_function: Some("CloseHandle".to_string()),
        };
        let script = ScriptWriter::new(&docs, "1.0.0")
            .render(&unit("HANDLE", EmitterKind::Handle(handle), Vec::new()))
            .unwrap();

        assert!(script.contains("#Include ..\\..\\..\\Win32Handle.ahk\n#Include .\\Apis.ahk\n"));
        assert!(script.contains("class HANDLE extends Win32Handle\n"));
        assert!(script.contains("    static invalidValues => [-1, 0]\n"));
        assert!(script.contains("        get => NumGet(this, 0, \"ptr\")\n"));
        assert!(script.contains(
            "    Free(){\n        Test.CloseHandle(this.Value)\n        this.Value := -1\n    }\n"
        ));
    }

    #[test]
    fn enum_file() {
        let docs = ApiDocs::new();
        let enumeration = EnumUnit {
            underlying: PrimitiveKind::UInt32,
            flags: true,
            deprecated: false,
            members: vec![
                ConstantMember {
                    name: "COLOR_RED".to_string(),
                    value: ConstantValue::U4(1),
                    deprecated: false,
                },
                ConstantMember {
                    name: "COLOR_OLD".to_string(),
                    value: ConstantValue::U4(2),
                    deprecated: true,
                },
            ],
        };
        let script = ScriptWriter::new(&docs, "1.0.0")
            .render(&unit("COLOR", EmitterKind::Enum(enumeration), Vec::new()))
            .unwrap();

        assert!(script.starts_with("#Requires AutoHotkey v2.0.0 64-bit\n\n/**\n"));
        assert!(script.contains(
            "class COLOR{\n\n    /**\n     * @type {Integer}\n     */\n    static COLOR_RED => 1\n"
        ));
        assert!(script.contains("     * @deprecated\n     * @type {Integer}\n     */\n    static COLOR_OLD => 2\n}\n"));
    }

    #[test]
    fn api_module_file() {
        let mut beep = contract(
            "Beep",
            EntryPoint::import("KERNEL32.dll", "Beep"),
            vec![parameter("", 0, uint()), parameter("in", 1, uint())],
        );
        beep.sets_last_error = true;

        let mut reserved = parameter("dwReserved", 1, uint());
        reserved.flags = ParamFlags::RESERVED;
        let mut by_ordinal = contract(
            "ByOrdinal",
            EntryPoint::import("SHELL32.dll", "#12"),
            vec![
                parameter("", 0, TypeDescriptor::primitive(PrimitiveKind::Void)),
                reserved,
            ],
        );
        by_ordinal.calling_convention = CallingConvention::Cdecl;

        let pwstr = TypeDescriptor::NativeTypedef {
            name: "PWSTR".to_string(),
            typedef: 3,
            underlying: Box::new(TypeDescriptor::Pointer {
                name: "Char".to_string(),
                pointee: None,
            }),
        };
        let mut create = contract(
            "CreateThing",
            EntryPoint::import("KERNEL32.dll", "CreateThingW"),
            vec![
                parameter("", 0, handle_type()),
                parameter("lpName", 1, pwstr),
                parameter("hParent", 2, handle_type()),
            ],
        );
        create.char_set = CharSet::Unicode;
        create.handle_return = Some(HandleReturn {
            typedef: 2,
            namespace: "Windows.Win32.Foundation".to_string(),
            name: "HANDLE".to_string(),
            field: "Value".to_string(),
            owned: true,
            ignore_values: vec![-1, 0],
        });

        let module = ApiModule {
            constants: vec![ConstantMember {
                name: "A_FIRST".to_string(),
                value: ConstantValue::I4(1),
                deprecated: false,
            }],
            methods: vec![beep, by_ordinal, create],
        };

        let mut docs = ApiDocs::new();
        docs.insert(
            "Beep",
            ApiDetails {
                description: Some("Makes a sound.".to_string()),
                params: [("in".to_string(), "Frequency.".to_string())].into(),
                ..ApiDetails::default()
            },
        );
        let script = ScriptWriter::new(&docs, "1.0.0")
            .render(&unit(API_CONTAINER, EmitterKind::ApiModule(module), Vec::new()))
            .unwrap();

        assert!(script.contains("class Test {\n\n;@region Constants\n\n"));
        assert!(script.contains("    static A_FIRST => 1\n;@endregion Constants\n\n;@region Methods\n"));
        assert!(script.contains("     * Makes a sound.\n     * @param {Integer} in_R Frequency.\n"));
        assert!(script.contains("    static Beep(in_R) {\n        A_LastError := 0\n\n"));
        assert!(script.contains(
            "        result := DllCall(\"KERNEL32.dll\\Beep\", \"uint\", in_R, \"uint\")\n\n        if(A_LastError)\n            throw OSError()\n\n        return result\n    }\n"
        ));

        assert!(script.contains("     * @returns {String} Nothing - always returns an empty string\n"));
        assert!(script.contains("    static ByOrdinal() {\n        static dwReserved := 0 ;Reserved parameters must always be NULL\n\n"));
        assert!(script.contains("        procAddr := LibraryLoader.GetProcAddress(hModule, 12)\n\n"));
        assert!(script.contains(
            "        DllCall(procAddr, \"uint\", dwReserved, \"CDecl\")\n\n        Foundation.FreeLibrary(hModule)\n"
        ));

        assert!(script.contains("     * @param {String} lpName\n"));
        assert!(script.contains("     * @returns {HANDLE}\n"));
        assert!(script.contains("     * @charset Unicode\n"));
        assert!(script.contains("        lpName := lpName is String ? StrPtr(lpName) : lpName\n"));
        assert!(script.contains(
            "        hParent := hParent is Win32Handle ? NumGet(hParent, \"ptr\") : hParent\n"
        ));
        assert!(script.contains(
            "DllCall(\"KERNEL32.dll\\CreateThingW\", \"ptr\", lpName, \"ptr\", hParent, \"ptr\")"
        ));
        assert!(script.contains(
            "        if(result == -1 || result == 0)\n            return HANDLE.Invalid()\n\n        return HANDLE({Value: result}, true)\n"
        ));
        assert!(script.ends_with(";@endregion Methods\n}\n"));
    }

    #[test]
    fn com_file() {
        let mut frob = contract(
            "Frob",
            EntryPoint::Vtable(3),
            vec![
                parameter("", 0, TypeDescriptor::Hresult),
                parameter("x", 1, TypeDescriptor::primitive(PrimitiveKind::Int32)),
            ],
        );
        frob.throws_on_failure = true;
        let mut legacy = contract(
            "Legacy",
            EntryPoint::Vtable(4),
            vec![parameter("", 0, TypeDescriptor::primitive(PrimitiveKind::Void))],
        );
        legacy.calling_convention = CallingConvention::Thiscall;

        let interface = ComInterface {
            typedef: 1,
            name: "IWidget".to_string(),
            namespace: NS.to_string(),
            iid: Some(uguid::guid!("00000000-0000-0000-c000-000000000046")),
            clsid: Some(uguid::guid!("11111111-2222-3333-4444-555555555555")),
            base: None,
            vtable_start: 3,
            methods: vec![frob, legacy],
        };
        let com = ComUnit {
            interface,
            base: None,
        };
        let docs = ApiDocs::new();
        let script = ScriptWriter::new(&docs, "1.0.0")
            .render(&unit("IWidget", EmitterKind::ComInterface(com), Vec::new()))
            .unwrap();

        assert!(script.contains(
            "#Include ..\\..\\..\\Win32ComInterface.ahk\n#Include ..\\..\\..\\Guid.ahk\n"
        ));
        assert!(script.contains("class IWidget extends Win32ComInterface{\n"));
        assert!(script.contains("    static IID => Guid(\"{00000000-0000-0000-c000-000000000046}\")\n"));
        assert!(script.contains("     * The class identifier for Widget\n"));
        assert!(script.contains("    Frob(x) {\n        result := ComCall(3, this, \"int\", x, \"int\")\n\n        if(result != 0)\n            throw OSError(result)\n"));
        assert!(script.contains("    Legacy() {\n        throw MethodError("));
    }
}
