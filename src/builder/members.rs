//! Fields, methods and parameters of the metadata writer.

use crate::{
    builder::AttributeDef,
    metadata::{
        constants::ConstantValue,
        signatures::{SignatureMethod, SignatureParameter, TypeSignature},
        tables::{FieldAttributes, MethodAttributes, MethodImplAttributes},
    },
};

/// `HideBySig` of `MethodDef.Flags`
const HIDE_BY_SIG: u32 = 0x0080;
/// `Public` member access of `MethodDef.Flags`
const METHOD_PUBLIC: u32 = 0x0006;

/// A field of a type under construction
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) signature: TypeSignature,
    pub(crate) flags: u32,
    pub(crate) offset: Option<u32>,
    pub(crate) constant: Option<ConstantValue>,
    pub(crate) attributes: Vec<AttributeDef>,
}

impl FieldDef {
    /// A public instance field.
    #[must_use]
    pub fn new(name: &str, signature: TypeSignature) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            signature,
            flags: FieldAttributes::PUBLIC,
            offset: None,
            constant: None,
            attributes: Vec::new(),
        }
    }

    /// Replaces the `FieldAttributes` mask.
    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Places the field at an explicit byte offset through a FieldLayout row.
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Turns the field into a constant holding `value`.
    ///
    /// GUIDs have no Constant row encoding; they become a static field carrying a
    /// `GuidAttribute`, the way Windows metadata declares GUID constants.
    #[must_use]
    pub fn constant(mut self, value: ConstantValue) -> Self {
        if let ConstantValue::Guid(guid) = value {
            self.flags |= FieldAttributes::STATIC;
            self.attributes.push(AttributeDef::guid(guid));
        } else {
            self.flags |=
                FieldAttributes::STATIC | FieldAttributes::LITERAL | FieldAttributes::HAS_DEFAULT;
            self.constant = Some(value);
        }
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A parameter of a method under construction
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub(crate) name: String,
    pub(crate) signature: TypeSignature,
    pub(crate) flags: u16,
    pub(crate) attributes: Vec<AttributeDef>,
}

impl ParamDef {
    /// A parameter without flags.
    #[must_use]
    pub fn new(name: &str, signature: TypeSignature) -> ParamDef {
        ParamDef {
            name: name.to_string(),
            signature,
            flags: 0,
            attributes: Vec::new(),
        }
    }

    /// Replaces the `ParamAttributes` mask.
    #[must_use]
    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// The P/Invoke target of an imported method
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Import {
    pub(crate) library: String,
    pub(crate) name: Option<String>,
    pub(crate) flags: u16,
}

/// A method of a type under construction: a P/Invoke import or a COM interface method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub(crate) name: String,
    pub(crate) flags: u32,
    pub(crate) impl_flags: u32,
    pub(crate) has_this: bool,
    pub(crate) returns: TypeSignature,
    pub(crate) params: Vec<ParamDef>,
    pub(crate) import: Option<Import>,
    pub(crate) attributes: Vec<AttributeDef>,
    pub(crate) return_attributes: Vec<AttributeDef>,
}

impl MethodDef {
    /// An abstract instance method, as declared on COM interfaces. Returns `void` until
    /// [`MethodDef::returns`] says otherwise.
    #[must_use]
    pub fn new(name: &str) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            flags: METHOD_PUBLIC
                | HIDE_BY_SIG
                | MethodAttributes::VIRTUAL
                | MethodAttributes::NEW_SLOT
                | MethodAttributes::ABSTRACT,
            impl_flags: 0,
            has_this: true,
            returns: TypeSignature::Void,
            params: Vec::new(),
            import: None,
            attributes: Vec::new(),
            return_attributes: Vec::new(),
        }
    }

    /// A static P/Invoke import of `name` from `library`; `flags` is the
    /// `PInvokeAttributes` mask of its ImplMap row.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn import(name: &str, library: &str, flags: u32) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            flags: METHOD_PUBLIC
                | HIDE_BY_SIG
                | MethodAttributes::STATIC
                | MethodAttributes::PINVOKE_IMPL,
            impl_flags: MethodImplAttributes::PRESERVE_SIG,
            has_this: false,
            returns: TypeSignature::Void,
            params: Vec::new(),
            import: Some(Import {
                library: library.to_string(),
                name: None,
                flags: flags as u16,
            }),
            attributes: Vec::new(),
            return_attributes: Vec::new(),
        }
    }

    /// Sets the exported symbol when it differs from the method name, `#n` for an ordinal.
    /// Ignored on methods that are not imports.
    #[must_use]
    pub fn import_name(mut self, name: &str) -> Self {
        if let Some(import) = self.import.as_mut() {
            import.name = Some(name.to_string());
        }
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, returns: TypeSignature) -> Self {
        self.returns = returns;
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    /// Attaches a custom attribute to the method.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attaches a custom attribute to the return value, through a Param row of sequence 0.
    #[must_use]
    pub fn return_attribute(mut self, attribute: AttributeDef) -> Self {
        self.return_attributes.push(attribute);
        self
    }

    /// The method signature.
    pub(crate) fn signature(&self) -> SignatureMethod {
        SignatureMethod {
            has_this: self.has_this,
            return_type: SignatureParameter {
                base: self.returns.clone(),
                ..SignatureParameter::default()
            },
            params: self
                .params
                .iter()
                .map(|param| SignatureParameter {
                    base: param.signature.clone(),
                    ..SignatureParameter::default()
                })
                .collect(),
            ..SignatureMethod::default()
        }
    }
}
