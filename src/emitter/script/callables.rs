//! `DllCall` and `ComCall` wrappers.

use std::fmt::Write;

use crate::{
    emitter::script::{class_name, escape_docs, identifier, ScriptWriter},
    metadata::{
        method::{CallingConvention, CharSet, EntryPoint, MethodContract, ParameterContract},
        typesystem::TypeDescriptor,
    },
};

/// Returns `true` for arguments that may be passed as a `Win32Handle` object.
fn is_handle_argument(parameter: &ParameterContract) -> bool {
    matches!(parameter.descriptor, TypeDescriptor::NativeTypedef { .. }) && !parameter.is_string()
}

fn call_type(parameter: &ParameterContract) -> String {
    if parameter.is_string() {
        "ptr".to_string()
    } else {
        parameter.descriptor.call_type()
    }
}

fn doc_type(descriptor: &TypeDescriptor) -> String {
    match descriptor {
        TypeDescriptor::Struct(layout) => class_name(&layout.name),
        TypeDescriptor::NativeTypedef { name, .. }
            if matches!(name.as_str(), "PWSTR" | "PSTR" | "PCWSTR" | "PCSTR") =>
        {
            "String".to_string()
        }
        other => other.doc_type(),
    }
}

impl ScriptWriter<'_> {
    fn write_method_docs(&self, out: &mut String, contract: &MethodContract) {
        let details = self.docs.get(&contract.name);

        out.push_str("    /**\n");
        if let Some(description) = details.and_then(|details| details.description.as_ref()) {
            let _ = writeln!(out, "     * {}", escape_docs(description, "    "));
        }
        if let Some(remarks) = details.and_then(|details| details.remarks.as_ref()) {
            out.push_str("     * @remarks\n");
            let _ = writeln!(out, "     * {}", escape_docs(remarks, "    "));
        }

        for argument in contract.arguments().iter().filter(|a| !a.is_reserved()) {
            let description = details
                .and_then(|details| details.params.get(&argument.name))
                .map(|text| format!(" {}", escape_docs(text, "    ")))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "     * @param {{{}}} {}{description}",
                doc_type(&argument.descriptor),
                identifier(&argument.name)
            );
        }

        if contract.has_return_value() {
            let returned = match &contract.handle_return {
                Some(handle) => class_name(&handle.name),
                None => doc_type(&contract.return_value().descriptor),
            };
            let description = details
                .and_then(|details| details.return_value.as_ref())
                .map(|text| format!(" {}", escape_docs(text, "    ")))
                .unwrap_or_default();
            let _ = writeln!(out, "     * @returns {{{returned}}}{description}");
        } else {
            out.push_str("     * @returns {String} Nothing - always returns an empty string\n");
        }

        if let Some(link) = details.and_then(|details| details.help_link.as_ref()) {
            let _ = writeln!(out, "     * @see {link}");
        }
        match contract.char_set {
            CharSet::Ansi => out.push_str("     * @charset ANSI\n"),
            CharSet::Unicode => out.push_str("     * @charset Unicode\n"),
            CharSet::NotSpecified | CharSet::Auto => {}
        }
        if contract.deprecated {
            out.push_str("     * @deprecated\n");
        }
        if let Some(platform) = &contract.min_platform {
            let _ = writeln!(out, "     * @since {platform}");
        }
        out.push_str("     */\n");
    }

    /// Writes the wrapper of one import or COM method.
    ///
    /// Imports become static methods calling `DllCall`; COM methods become instance
    /// methods calling `ComCall` with their vtable slot.
    pub(super) fn write_callable(&self, out: &mut String, contract: &MethodContract) {
        self.write_method_docs(out, contract);

        let declaration = match contract.entry_point {
            EntryPoint::Vtable(_) => "",
            EntryPoint::Symbol { .. } | EntryPoint::Ordinal { .. } => "static ",
        };
        let arguments: Vec<String> = contract
            .arguments()
            .iter()
            .filter(|argument| !argument.is_reserved())
            .map(|argument| identifier(&argument.name))
            .collect();
        let _ = writeln!(
            out,
            "    {declaration}{}({}) {{",
            contract.name,
            arguments.join(", ")
        );

        if !contract.is_callable() {
            out.push_str("        throw MethodError(\"Not supported: AutoHotkey does not support the thiscall calling convention\", , A_ThisFunc)\n");
            out.push_str("    }\n");
            return;
        }

        let reserved: Vec<String> = contract
            .arguments()
            .iter()
            .filter(|argument| argument.is_reserved())
            .map(|argument| format!("{} := 0", identifier(&argument.name)))
            .collect();
        if !reserved.is_empty() {
            let _ = writeln!(
                out,
                "        static {} ;Reserved parameters must always be NULL",
                reserved.join(", ")
            );
            out.push('\n');
        }

        let mut converted = false;
        for argument in contract.arguments().iter().filter(|a| !a.is_reserved()) {
            let name = identifier(&argument.name);
            if argument.is_string() {
                let _ = writeln!(out, "        {name} := {name} is String ? StrPtr({name}) : {name}");
                converted = true;
            } else if is_handle_argument(argument) {
                let _ = writeln!(
                    out,
                    "        {name} := {name} is Win32Handle ? NumGet({name}, \"ptr\") : {name}"
                );
                converted = true;
            }
        }
        if converted {
            out.push('\n');
        }

        if contract.sets_last_error {
            out.push_str("        A_LastError := 0\n");
            out.push('\n');
        }

        let target = match &contract.entry_point {
            EntryPoint::Symbol { library, name } => format!("DllCall(\"{library}\\{name}\""),
            EntryPoint::Ordinal { library, ordinal } => {
                out.push_str("        ; This method's EntryPoint is an ordinal, so we need to load the dll manually\n");
                let _ = writeln!(out, "        hModule := LibraryLoader.LoadLibraryW(\"{library}\")");
                let _ = writeln!(
                    out,
                    "        procAddr := LibraryLoader.GetProcAddress(hModule, {ordinal})"
                );
                out.push('\n');
                "DllCall(procAddr".to_string()
            }
            EntryPoint::Vtable(index) => format!("ComCall({index}, this"),
        };

        let mut call = target;
        for argument in contract.arguments() {
            let _ = write!(
                call,
                ", \"{}\", {}",
                call_type(argument),
                identifier(&argument.name)
            );
        }

        let cdecl = contract.calling_convention == CallingConvention::Cdecl
            && !matches!(contract.entry_point, EntryPoint::Vtable(_));
        let mut tail = Vec::new();
        if cdecl {
            tail.push("CDecl".to_string());
        }
        if contract.has_return_value() {
            tail.push(call_type(contract.return_value()));
        }
        if !tail.is_empty() {
            let _ = write!(call, ", \"{}\"", tail.join(" "));
        }
        call.push(')');

        if contract.has_return_value() {
            let _ = writeln!(out, "        result := {call}");
        } else {
            let _ = writeln!(out, "        {call}");
        }

        if matches!(contract.entry_point, EntryPoint::Ordinal { .. }) {
            out.push('\n');
            out.push_str("        Foundation.FreeLibrary(hModule)\n");
        }

        if contract.sets_last_error {
            out.push('\n');
            out.push_str("        if(A_LastError)\n");
            out.push_str("            throw OSError()\n");
        }

        if contract.throws_on_failure {
            out.push('\n');
            out.push_str("        if(result != 0)\n");
            out.push_str("            throw OSError(result)\n");
        }

        if contract.has_return_value() {
            out.push('\n');
            match &contract.handle_return {
                Some(handle) => {
                    let class = class_name(&handle.name);
                    if !handle.ignore_values.is_empty() {
                        let checks: Vec<String> = handle
                            .ignore_values
                            .iter()
                            .map(|value| format!("result == {value}"))
                            .collect();
                        let _ = writeln!(out, "        if({})", checks.join(" || "));
                        let _ = writeln!(out, "            return {class}.Invalid()");
                        out.push('\n');
                    }
                    let _ = writeln!(
                        out,
                        "        return {class}({{{}: result}}, {})",
                        handle.field, handle.owned
                    );
                }
                None => out.push_str("        return result\n"),
            }
        }

        out.push_str("    }\n");
    }
}
