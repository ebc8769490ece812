//! In-process accessors over raw struct memory.
//!
//! The generated script classes read and write members of a native struct at
//! `base + offset`, with the access width and signedness dictated by the member's
//! [`crate::metadata::typesystem::TypeDescriptor`]. This module implements the same accessor
//! semantics over a `&mut [u8]`, so computed layouts can be exercised directly: a value
//! written through a [`StructView`] lands at exactly the bytes a native compiler would use.
//!
//! # Key Components
//!
//! - [`StructView`] - Named member access over a buffer laid out by a [`crate::metadata::typesystem::StructLayout`]
//! - [`ArrayView`] - Bounds-checked access to a fixed-length inline array
//! - [`Value`] - A scalar or string read from or written to a member
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::{
//!     metadata::typesystem::{
//!         compute_layout, FieldInput, LayoutInput, LayoutKind, PrimitiveKind, StructLayout,
//!         TypeDescriptor,
//!     },
//!     runtime::{StructView, Value},
//! };
//!
//! let computed = compute_layout(&LayoutInput {
//!     kind: LayoutKind::Sequential,
//!     packing: 8,
//!     union: false,
//!     fields: vec![
//!         FieldInput::new("x", TypeDescriptor::primitive(PrimitiveKind::Int32)),
//!         FieldInput::new("y", TypeDescriptor::primitive(PrimitiveKind::Int32)),
//!     ],
//! })?;
//! let point = StructLayout {
//!     name: "POINT".to_string(),
//!     members: computed.members,
//!     size: computed.size,
//!     packing_size: computed.packing_size,
//!     ..StructLayout::default()
//! };
//!
//! let mut buffer = vec![0u8; point.size as usize];
//! let mut view = StructView::new(&point, &mut buffer)?;
//! view.set("y", Value::Int(-7))?;
//! assert_eq!(view.get("y")?, Value::Int(-7));
//! assert_eq!(buffer[4..8], (-7i32).to_le_bytes());
//! # Ok::<(), winmdgen::Error>(())
//! ```

mod value;
mod view;

pub use value::Value;
pub use view::{ArrayView, StructView};
