//! COM interface identity and vtable numbering.
//!
//! The methods of a COM interface occupy consecutive vtable slots after the slots of every
//! interface it derives from. Bases declared in the same image contribute their declared
//! method count; the two roots, which live outside Windows metadata proper, contribute their
//! well-known counts (`IUnknown` 3, `IDispatch` 7).

use crate::{
    metadata::{
        customattributes::KnownAttribute,
        method::MethodContract,
        tables::TableId,
        typesystem::TypeDecoder,
        view::Metadata,
    },
    Error, Result,
};

/// Base chain length after which an interface hierarchy is considered malformed
const MAX_INTERFACE_DEPTH: usize = 64;

/// The interface a COM interface derives from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceBase {
    /// A TypeDef row of this image
    Local(u32),
    /// An interface outside this image
    External {
        /// Namespace
        namespace: String,
        /// Name
        name: String,
    },
}

impl InterfaceBase {
    /// Number of vtable slots of an external root interface.
    fn external_slots(namespace: &str, name: &str) -> Result<u32> {
        match name {
            "IUnknown" => Ok(3),
            "IDispatch" => Ok(7),
            _ => Err(Error::Unsupported(format!(
                "external base interface {namespace}.{name}"
            ))),
        }
    }
}

/// Identity and methods of one COM interface
#[derive(Debug, Clone, PartialEq)]
pub struct ComInterface {
    /// TypeDef row
    pub typedef: u32,
    /// Interface name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// `GuidAttribute` of the interface
    pub iid: Option<uguid::Guid>,
    /// `GuidAttribute` of the same-named coclass, if the namespace declares one
    pub clsid: Option<uguid::Guid>,
    /// The interface this one derives from
    pub base: Option<InterfaceBase>,
    /// Vtable slot of the first declared method
    pub vtable_start: u32,
    /// Declared methods, in vtable order
    pub methods: Vec<MethodContract>,
}

impl ComInterface {
    /// Reads COM interface `rid` and builds the contracts of its methods.
    ///
    /// # Errors
    /// Returns an error if the interface has more than one base, derives from an external
    /// interface other than `IUnknown`/`IDispatch`, or a method contract cannot be built.
    pub fn read(decoder: &mut TypeDecoder, rid: u32) -> Result<ComInterface> {
        let metadata = decoder.metadata();
        let typedef = metadata.typedef(rid)?;
        let (namespace, name) = metadata.typedef_name(&typedef)?;

        let base = base_interface(decoder, rid)?;
        let vtable_start = vtable_start(decoder, rid)?;

        let clsid = match name.strip_prefix('I') {
            Some(class) if !class.is_empty() => match metadata.find_typedef(namespace, class) {
                Some(class) => guid_of(metadata, class)?,
                None => None,
            },
            _ => None,
        };

        let mut methods = Vec::new();
        for (ordinal, method) in (0u32..).zip(metadata.methods(rid)) {
            methods.push(MethodContract::from_com(
                decoder,
                &method,
                vtable_start + ordinal,
            )?);
        }

        Ok(ComInterface {
            typedef: rid,
            name: name.to_string(),
            namespace: namespace.to_string(),
            iid: guid_of(metadata, rid)?,
            clsid,
            base,
            vtable_start,
            methods,
        })
    }
}

fn guid_of(metadata: &Metadata, rid: u32) -> Result<Option<uguid::Guid>> {
    let token = metadata.typedef(rid)?.token;
    Ok(metadata
        .known_attributes(token)?
        .into_iter()
        .find_map(|attribute| match attribute {
            KnownAttribute::Guid(guid) => Some(guid),
            _ => None,
        }))
}

/// The single base of interface `rid`, `None` for a root interface.
///
/// # Errors
/// Returns [`Error::Malformed`] if the interface declares more than one base and
/// [`Error::Unsupported`] for a base named through a type specification.
pub fn base_interface(decoder: &TypeDecoder, rid: u32) -> Result<Option<InterfaceBase>> {
    let metadata = decoder.metadata();
    let impls = metadata.interface_impls(rid);
    let interface = match impls.as_slice() {
        [] => return Ok(None),
        [single] => single.interface,
        _ => {
            return Err(malformed_error!(
                "Interface {} declares {} base interfaces",
                metadata.qualified_name(rid)?,
                impls.len()
            ))
        }
    };

    match interface.tag {
        TableId::TypeDef => Ok(Some(InterfaceBase::Local(interface.row))),
        TableId::TypeRef => {
            let context = metadata.index().enclosing_type(rid);
            if let Some(local) = decoder.resolver().resolve_from(interface.row, context)? {
                return Ok(Some(InterfaceBase::Local(local)));
            }
            let (namespace, name) = decoder.resolver().referenced_name(interface.row)?;
            Ok(Some(InterfaceBase::External {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }))
        }
        other => Err(Error::Unsupported(format!(
            "base interface named through {other:?}"
        ))),
    }
}

/// Vtable slot of the first method declared by interface `rid`.
///
/// # Errors
/// See [`base_interface`]. A cyclic or too deep base chain is reported as
/// [`Error::RecursionLimit`].
pub fn vtable_start(decoder: &TypeDecoder, rid: u32) -> Result<u32> {
    let metadata = decoder.metadata();
    let mut slots = 0u32;
    let mut current = rid;

    for _ in 0..MAX_INTERFACE_DEPTH {
        match base_interface(decoder, current)? {
            None => return Ok(slots),
            Some(InterfaceBase::Local(base)) => {
                let declared = u32::try_from(metadata.methods(base).len())
                    .map_err(|_| malformed_error!("Too many methods on interface {}", base))?;
                slots += declared;
                current = base;
            }
            Some(InterfaceBase::External { namespace, name }) => {
                return Ok(slots + InterfaceBase::external_slots(&namespace, &name)?);
            }
        }
    }

    Err(Error::RecursionLimit(MAX_INTERFACE_DEPTH))
}
