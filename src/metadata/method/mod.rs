//! Callable members: P/Invoke imports and COM interface methods.
//!
//! Every callable member is turned into a [`MethodContract`] carrying the decoded
//! parameter list (return slot first), the marshaling flags of each parameter, and the
//! dispatch and failure-reporting policy of the call. COM interfaces additionally get their
//! vtable numbering from [`ComInterface`].
//!
//! # Key Components
//!
//! - [`MethodContract`], [`ParameterContract`], [`HandleReturn`]: the contract of one member
//! - [`ParamFlags`], [`CallingConvention`], [`CharSet`], [`EntryPoint`]: flag and dispatch types
//! - [`ComInterface`], [`base_interface`], [`vtable_start`]: COM identity and vtable layout
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::{
//!     metadata::{method::MethodContract, typesystem::{TypeDecoder, TypeRegistry}},
//!     MetadataView,
//! };
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let metadata = view.metadata();
//! let registry = TypeRegistry::new();
//! let mut decoder = TypeDecoder::new(metadata, &registry);
//!
//! if let Some(apis) = metadata.find_typedef("Windows.Win32.UI.WindowsAndMessaging", "Apis") {
//!     for method in metadata.methods(apis) {
//!         let contract = MethodContract::from_import(&mut decoder, &method)?;
//!         println!("{} -> {}", contract.name, contract.entry_point);
//!     }
//! }
//! # Ok::<(), winmdgen::Error>(())
//! ```

mod com;
mod contract;
mod types;

pub use com::{base_interface, vtable_start, ComInterface, InterfaceBase};
pub use contract::{HandleReturn, MethodContract, ParameterContract};
pub use types::{CallingConvention, CharSet, EntryPoint, ParamFlags};
