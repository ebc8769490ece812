// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # winmdgen
//!
//! A generator of AutoHotkey v2 bindings from Windows API metadata (`.winmd`).
//!
//! `winmdgen` reads an ECMA-335 metadata image describing a native API (the Win32 metadata
//! published as `Windows.Win32.winmd`), decodes every type definition into a semantic type
//! model, computes the exact native memory layout of every struct and union, derives the
//! marshaling contract of every imported function and COM method, and emits one
//! self-contained script class per type.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped images, borrowed heaps and lazily decoded rows
//! - **📐 Exact native layouts** - Packing, explicit offsets, unions, nested anonymous aggregates and bitfields
//! - **📞 Marshaling contracts** - Entry points by symbol or ordinal, COM vtable slots, last-error and HRESULT policy
//! - **⚡ Parallel generation** - Per-type work sharded over `rayon` with at-most-once layout construction
//! - **🧪 Synthetic metadata** - A [`builder::MetadataBuilder`] that writes real metadata images for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use winmdgen::prelude::*;
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let options = GeneratorOptions::default().output_dir("out");
//! let summary = Generator::new(&view, options)?.run(&mut DirectorySink::new("out"))?;
//! println!("Emitted {} files, {} failures", summary.emitted, summary.failed);
//! # Ok::<(), winmdgen::Error>(())
//! ```
//!
//! ### Inspecting a layout
//!
//! ```rust,no_run
//! use winmdgen::prelude::*;
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let metadata = view.metadata();
//! let registry = TypeRegistry::new();
//! let mut decoder = TypeDecoder::new(metadata, &registry);
//!
//! if let Some(rid) = metadata.find_typedef("Windows.Win32.Foundation", "RECT") {
//!     let layout = decoder.layout(rid)?;
//!     for member in &layout.members {
//!         println!("{:>4} {:<8} {}", member.offset, member.name, member.descriptor);
//!     }
//! }
//! # Ok::<(), winmdgen::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Metadata image access, the type model, layouts and marshaling contracts
//! - [`emitter`] - Emission units and the AutoHotkey v2 script writer
//! - [`generator`] - The batch driver, output sinks, error log and manifest
//! - [`runtime`] - In-process accessors over raw struct memory, following computed layouts
//! - [`builder`] - A writer for synthetic metadata images
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! A type that fails to build never aborts a run. The generator records it in `errors.txt`
//! and continues with the next type:
//!
//! ```rust,no_run
//! use winmdgen::{Error, MetadataView};
//!
//! match MetadataView::from_file(std::path::Path::new("Windows.Win32.winmd")) {
//!     Ok(view) => println!("{} types", view.metadata().type_count()),
//!     Err(Error::NotSupported) => println!("Not a metadata image"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use winmdgen::prelude::*;
///
/// let view = MetadataView::from_file("Windows.Win32.winmd".as_ref())?;
/// println!("{}", view.metadata().version());
/// # Ok::<(), winmdgen::Error>(())
/// ```
pub mod prelude;

/// Metadata access, type model, struct layouts and marshaling contracts
///
/// # Key Components
///
/// ## Image access
/// - [`metadata::view`] - [`MetadataView`], the owning handle over an image
/// - [`metadata::cor20header`], [`metadata::root`], [`metadata::streams`] - CLR header, root and heaps
/// - [`metadata::tables`], [`metadata::index`] - Raw rows and lookup indices
///
/// ## Type model
/// - [`metadata::signatures`] - Signature blob parsing
/// - [`metadata::customattributes`] - The known attribute set
/// - [`metadata::typesystem`] - Descriptors, classification, layouts and the registry
/// - [`metadata::method`] - Method contracts and COM interfaces
/// - [`metadata::constants`] - Constant values
pub mod metadata;

/// Synthetic metadata images for tests, benches and tooling
pub mod builder;

/// In-process accessors over raw struct memory
pub mod runtime;

/// Emission units and the AutoHotkey v2 script writer
pub mod emitter;

/// The batch driver
pub mod generator;

/// `winmdgen` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `winmdgen` Error type
///
/// See [`error::Error`](Error) for the failure taxonomy.
pub use error::Error;

/// The owning handle over a metadata image.
///
/// # Example
///
/// ```rust,no_run
/// use winmdgen::MetadataView;
/// let view = MetadataView::from_file(std::path::Path::new("Windows.Win32.winmd"))?;
/// println!("{}", view.metadata().module_name()?);
/// # Ok::<(), winmdgen::Error>(())
/// ```
pub use metadata::view::MetadataView;

/// Metadata heaps and the tables header, for direct access.
pub use metadata::streams::{Blob, Guid, StreamHeader, Strings, TablesHeader};

/// Low-level file and byte parsing utilities.
pub use file::{parser::Parser, File};
