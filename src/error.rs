use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the failure taxonomy of the generator: a malformed blob aborts the member
/// being decoded, an unsupported shape is tolerated by the signature decoder but rejected by the
/// step that consumes it, and missing structural data aborts the type it belongs to. Unresolved
/// references to types outside the metadata image are *not* errors, they degrade to opaque
/// pointer descriptors and never surface here.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::InvalidOffset`] - Invalid file offset during parsing
/// - [`Error::Malformed`] - Corrupted or invalid metadata structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
/// - [`Error::Xml`] - Documentation store or manifest XML errors
///
/// ## Type Model Errors
/// - [`Error::TypeNotFound`] - A token did not resolve to a row
/// - [`Error::Unsupported`] - A shape outside the supported closed set reached a build step
/// - [`Error::MissingData`] - Required structural data is absent
/// - [`Error::CyclicLayout`] - A type contains itself by value
/// - [`Error::RecursionLimit`] - Maximum recursion depth exceeded
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust,no_run
/// use winmdgen::{Error, metadata::view::MetadataView};
///
/// match MetadataView::from_file(std::path::Path::new("Windows.Win32.winmd")) {
///     Ok(view) => println!("Loaded {} types", view.metadata().type_count()),
///     Err(Error::NotSupported) => eprintln!("Not a metadata image"),
///     Err(Error::Malformed { message, .. }) => eprintln!("Malformed: {}", message),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // File parsing Errors
    /// Encountered an invalid offset while parsing file structures.
    ///
    /// Usually an RVA that does not map into any section of the PE container.
    #[error("Could not retrieve a valid offset!")]
    InvalidOffset,

    /// The file is damaged and could not be parsed.
    ///
    /// Carries the location in this crate that detected the problem, which makes
    /// malformed-input reports from batch runs traceable.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Returned when the input has no CLR header or metadata root.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error with a custom message.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Error while reading the documentation store or writing the manifest.
    #[error("XML - {0}")]
    Xml(String),

    // Type model errors
    /// A token does not reference an existing row.
    #[error("Failed to find type - {0}")]
    TypeNotFound(Token),

    /// A type code or attribute shape outside the supported set reached a build step.
    ///
    /// The signature decoder tolerates these by producing an `Other` descriptor; layouts,
    /// contracts and constants reject them with this error.
    #[error("Unsupported - {0}")]
    Unsupported(String),

    /// Required structural data is absent, e.g. an explicit layout field without offset.
    #[error("Missing data - {0}")]
    MissingData(String),

    /// A type embeds itself by value, directly or through other value types.
    #[error("Type contains itself by value - {0}")]
    CyclicLayout(String),

    /// Reach the maximum recursion level allowed.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,
}

impl From<quick_xml::Error> for Error {
    fn from(error: quick_xml::Error) -> Self {
        Error::Xml(error.to_string())
    }
}
