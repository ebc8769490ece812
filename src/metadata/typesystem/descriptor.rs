//! The closed semantic type model produced by signature decoding.
//!
//! A [`TypeDescriptor`] is what every field, parameter and return slot decodes to. It is
//! deliberately small: everything the emitter and the layout engine need to know about a
//! type is its byte width, how it is read from raw memory and how it is passed across a
//! foreign call. Struct-like variants always carry a fully built [`StructLayout`]; a type
//! that cannot be resolved is represented as an opaque [`TypeDescriptor::Pointer`] and
//! never as a dangling reference.

use std::{fmt, sync::Arc};

use crate::metadata::typesystem::{PrimitiveKind, StructLayout, POINTER_SIZE};

/// Semantic type of a field, parameter or return value
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A primitive, optionally under the name of the enum or wrapper type that collapsed to it
    Primitive {
        /// The primitive kind
        kind: PrimitiveKind,
        /// Name of the enum or pseudo-primitive this primitive stands for
        alias: Option<String>,
    },
    /// A pointer; `pointee` is `None` for opaque pointers and unresolved references
    Pointer {
        /// Name of the pointed-to type, kept for documentation
        name: String,
        /// The pointed-to type, when it is cheap to describe
        pointee: Option<Box<TypeDescriptor>>,
    },
    /// Fixed-length inline array
    Array {
        /// Element type
        element: Box<TypeDescriptor>,
        /// Element count
        length: u32,
    },
    /// Fixed-length inline character buffer
    String {
        /// Number of characters, including the terminator
        length: u32,
        /// `true` for UTF-16 buffers, `false` for 8-bit ones
        wide: bool,
    },
    /// Embedded struct or union
    Struct(Arc<StructLayout>),
    /// COM interface pointer
    ComInterface(Arc<StructLayout>),
    /// Unmanaged function pointer, by type name
    FunctionPointer(String),
    /// A named wrapper over a single value (`HWND`, `BOOL`, ...)
    NativeTypedef {
        /// Type name
        name: String,
        /// TypeDef row of the wrapper
        typedef: u32,
        /// The wrapped value
        underlying: Box<TypeDescriptor>,
    },
    /// `HRESULT`
    Hresult,
    /// A shape outside the supported set; fatal when a member or parameter is built from it
    Other(String),
}

impl TypeDescriptor {
    /// Shorthand for an unaliased primitive.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> TypeDescriptor {
        TypeDescriptor::Primitive { kind, alias: None }
    }

    /// Shorthand for an opaque pointer.
    pub fn opaque(name: impl Into<String>) -> TypeDescriptor {
        TypeDescriptor::Pointer {
            name: name.into(),
            pointee: None,
        }
    }

    /// Byte width of a value of this type when stored inline, saturating at `u32::MAX`.
    ///
    /// Use [`TypeDescriptor::checked_width`] where an oversized array must be rejected.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.checked_width().unwrap_or(u32::MAX)
    }

    /// Byte width of a value of this type when stored inline.
    ///
    /// Returns `None` if an array or string length taken from metadata makes the width
    /// overflow a `u32`.
    #[must_use]
    pub fn checked_width(&self) -> Option<u32> {
        match self {
            TypeDescriptor::Primitive { kind, .. } => Some(kind.width()),
            TypeDescriptor::Pointer { .. }
            | TypeDescriptor::ComInterface(_)
            | TypeDescriptor::FunctionPointer(_)
            | TypeDescriptor::Other(_) => Some(POINTER_SIZE),
            TypeDescriptor::Array { element, length } => {
                element.checked_width()?.checked_mul(*length)
            }
            TypeDescriptor::String { length, wide } => length.checked_mul(char_width(*wide)),
            TypeDescriptor::Struct(layout) => Some(layout.size),
            TypeDescriptor::NativeTypedef { underlying, .. } => underlying.checked_width(),
            TypeDescriptor::Hresult => Some(4),
        }
    }

    /// Width used to align this type inside a struct.
    ///
    /// Arrays align on their element and strings on one character; everything else on its
    /// full width.
    #[must_use]
    pub fn logical_width(&self) -> u32 {
        match self {
            TypeDescriptor::Array { element, .. } => element.width(),
            TypeDescriptor::String { wide, .. } => char_width(*wide),
            other => other.width(),
        }
    }

    /// The type a chain of native typedefs ends in.
    #[must_use]
    pub fn terminal(&self) -> &TypeDescriptor {
        let mut current = self;
        while let TypeDescriptor::NativeTypedef { underlying, .. } = current {
            current = underlying;
        }
        current
    }

    /// Returns `true` if this is a terminal primitive or pointer, the shapes a single-field
    /// wrapper collapses to.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Primitive { .. }
                | TypeDescriptor::Pointer { .. }
                | TypeDescriptor::FunctionPointer(_)
                | TypeDescriptor::NativeTypedef { .. }
                | TypeDescriptor::Hresult
        )
    }

    /// The layout behind a struct or COM interface descriptor.
    #[must_use]
    pub fn layout(&self) -> Option<&Arc<StructLayout>> {
        match self {
            TypeDescriptor::Struct(layout) | TypeDescriptor::ComInterface(layout) => Some(layout),
            _ => None,
        }
    }

    /// Type name as it appears in metadata and documentation.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Primitive { kind, alias } => {
                alias.clone().unwrap_or_else(|| kind.name().to_string())
            }
            TypeDescriptor::Pointer { name, .. }
            | TypeDescriptor::FunctionPointer(name)
            | TypeDescriptor::NativeTypedef { name, .. }
            | TypeDescriptor::Other(name) => name.clone(),
            TypeDescriptor::Array { element, .. } => element.name(),
            TypeDescriptor::String { wide, .. } => {
                if *wide {
                    "WCHAR".to_string()
                } else {
                    "CHAR".to_string()
                }
            }
            TypeDescriptor::Struct(layout) | TypeDescriptor::ComInterface(layout) => {
                layout.name.clone()
            }
            TypeDescriptor::Hresult => "HRESULT".to_string(),
        }
    }

    /// Type tag for passing a value of this type through `DllCall` or `ComCall`.
    #[must_use]
    pub fn call_type(&self) -> String {
        if let TypeDescriptor::NativeTypedef { underlying, .. } = self {
            return match underlying.terminal() {
                TypeDescriptor::Primitive { kind, .. } => kind.call_type().to_string(),
                TypeDescriptor::Hresult => "int".to_string(),
                _ => "ptr".to_string(),
            };
        }

        match self {
            TypeDescriptor::Primitive { kind, .. } => kind.call_type().to_string(),
            TypeDescriptor::Hresult => "int".to_string(),
            TypeDescriptor::Pointer {
                pointee: Some(pointee),
                ..
            } => match pointee.terminal() {
                TypeDescriptor::Primitive { kind, .. } if *kind != PrimitiveKind::Void => {
                    format!("{}*", kind.call_type())
                }
                TypeDescriptor::Hresult => "int*".to_string(),
                _ => "ptr".to_string(),
            },
            _ => "ptr".to_string(),
        }
    }

    /// Type tag for reading or writing a value of this type with `NumGet`/`NumPut`.
    ///
    /// `None` for types that are not a single scalar (arrays, strings, structs).
    #[must_use]
    pub fn storage_type(&self) -> Option<&'static str> {
        match self.terminal() {
            TypeDescriptor::Primitive { kind, .. } => Some(kind.storage_type()),
            TypeDescriptor::Hresult => Some("int"),
            TypeDescriptor::Pointer { .. }
            | TypeDescriptor::ComInterface(_)
            | TypeDescriptor::FunctionPointer(_) => Some("ptr"),
            _ => None,
        }
    }

    /// Type name for generated documentation (`Integer`, `Pointer<RECT>`, ...).
    #[must_use]
    pub fn doc_type(&self) -> String {
        match self {
            TypeDescriptor::Primitive { kind, .. } => kind.doc_type().to_string(),
            TypeDescriptor::Pointer { name, pointee } => match pointee {
                Some(pointee) => format!("Pointer<{}>", pointee.doc_type()),
                None if name.is_empty() || name == "Void" => "Pointer".to_string(),
                None => format!("Pointer<{name}>"),
            },
            TypeDescriptor::Array { element, .. } => format!("Array<{}>", element.doc_type()),
            TypeDescriptor::String { .. } => "String".to_string(),
            TypeDescriptor::Struct(layout) | TypeDescriptor::ComInterface(layout) => {
                layout.name.clone()
            }
            TypeDescriptor::FunctionPointer(_) => "Pointer".to_string(),
            TypeDescriptor::NativeTypedef { name, .. } => name.clone(),
            TypeDescriptor::Hresult => "HRESULT".to_string(),
            TypeDescriptor::Other(_) => "Pointer".to_string(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Pointer { name, .. } => write!(f, "{name}*"),
            TypeDescriptor::Array { element, length } => write!(f, "{element}[{length}]"),
            TypeDescriptor::String { length, .. } => write!(f, "{}[{length}]", self.name()),
            TypeDescriptor::Other(raw) => write!(f, "<unsupported {raw}>"),
            other => f.write_str(&other.name()),
        }
    }
}

/// Byte width of one character of a string buffer.
#[must_use]
pub fn char_width(wide: bool) -> u32 {
    if wide {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> TypeDescriptor {
        TypeDescriptor::NativeTypedef {
            name: name.to_string(),
            typedef: 1,
            underlying: Box::new(TypeDescriptor::primitive(PrimitiveKind::IntPtr)),
        }
    }

    #[test]
    fn widths() {
        assert_eq!(TypeDescriptor::Hresult.width(), 4);
        assert_eq!(TypeDescriptor::opaque("HWND").width(), 8);
        assert_eq!(
            TypeDescriptor::String {
                length: 32,
                wide: true
            }
            .width(),
            64
        );
        let array = TypeDescriptor::Array {
            element: Box::new(TypeDescriptor::primitive(PrimitiveKind::UInt16)),
            length: 5,
        };
        assert_eq!(array.width(), 10);
        assert_eq!(array.logical_width(), 2);
        assert_eq!(handle("HANDLE").width(), 8);
    }

    #[test]
    fn oversized_arrays() {
        let huge = TypeDescriptor::Array {
            element: Box::new(TypeDescriptor::primitive(PrimitiveKind::UInt64)),
            length: 0x1FFF_FFFF,
        };
        assert_eq!(huge.checked_width(), None);
        assert_eq!(huge.width(), u32::MAX);

        let text = TypeDescriptor::String {
            length: 0x8000_0000,
            wide: true,
        };
        assert_eq!(text.checked_width(), None);
        assert_eq!(
            TypeDescriptor::String {
                length: 0x8000_0000,
                wide: false
            }
            .checked_width(),
            Some(0x8000_0000)
        );
    }

    #[test]
    fn terminal() {
        let nested = TypeDescriptor::NativeTypedef {
            name: "HMONITOR".to_string(),
            typedef: 2,
            underlying: Box::new(handle("HANDLE")),
        };
        assert_eq!(
            nested.terminal(),
            &TypeDescriptor::primitive(PrimitiveKind::IntPtr)
        );
        assert_eq!(nested.terminal().terminal(), nested.terminal());
        assert_eq!(nested.call_type(), "ptr");
        assert_eq!(nested.storage_type(), Some("ptr"));
    }

    #[test]
    fn pointer_tags() {
        let to_uint = TypeDescriptor::Pointer {
            name: "UInt32".to_string(),
            pointee: Some(Box::new(TypeDescriptor::primitive(PrimitiveKind::UInt32))),
        };
        assert_eq!(to_uint.call_type(), "uint*");
        assert_eq!(to_uint.doc_type(), "Pointer<Integer>");
        assert_eq!(to_uint.storage_type(), Some("ptr"));

        let to_void = TypeDescriptor::Pointer {
            name: "Void".to_string(),
            pointee: Some(Box::new(TypeDescriptor::primitive(PrimitiveKind::Void))),
        };
        assert_eq!(to_void.call_type(), "ptr");
        assert_eq!(TypeDescriptor::opaque("RECT").doc_type(), "Pointer<RECT>");
    }

    #[test]
    fn names() {
        let aliased = TypeDescriptor::Primitive {
            kind: PrimitiveKind::UInt32,
            alias: Some("WIN32_ERROR".to_string()),
        };
        assert_eq!(aliased.name(), "WIN32_ERROR");
        assert_eq!(aliased.doc_type(), "Integer");
        assert_eq!(TypeDescriptor::Hresult.to_string(), "HRESULT");
        assert_eq!(TypeDescriptor::opaque("RECT").to_string(), "RECT*");
    }
}
