//! The semantic type model of Windows metadata.
//!
//! This module turns raw signatures into the small, closed model the generator emits from,
//! and computes native struct layouts from it.
//!
//! # Key Components
//!
//! - [`PrimitiveKind`]: the primitive types, their widths and foreign-call tags
//! - [`TypeDescriptor`]: the semantic type of a field, parameter or return slot
//! - [`TypeDecoder`]: signature decoding and classification of type definitions
//! - [`TypeResolver`]: TypeRef resolution, global and scoped to a declaring type
//! - [`compute_layout`]: the native struct layout algorithm
//! - [`TypeRegistry`]: memoizing, thread-safe store of built [`StructLayout`]s
//! - [`Presentation`]: the flattened, de-duplicated member list of a layout
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::metadata::typesystem::{PrimitiveKind, TypeDescriptor};
//!
//! let handle = TypeDescriptor::opaque("HWND");
//! assert_eq!(handle.width(), 8);
//! assert_eq!(handle.call_type(), "ptr");
//! assert_eq!(PrimitiveKind::UInt16.width(), 2);
//! ```

mod decoder;
mod descriptor;
mod layout;
mod presentation;
mod primitives;
mod registry;
mod resolver;

pub use decoder::{collapse, TypeDecoder};
pub use descriptor::{char_width, TypeDescriptor};
pub use layout::{
    compute_layout, default_packing, Bitfield, ComputedLayout, FieldInput, LayoutFlags,
    LayoutInput, LayoutKind, MemberFlags, StructLayout, StructMember,
};
pub use presentation::{PresentedMember, Presentation};
pub use primitives::{PrimitiveKind, ELEMENT_TYPE, POINTER_SIZE};
pub use registry::TypeRegistry;
pub use resolver::TypeResolver;
