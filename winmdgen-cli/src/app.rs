use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// winmdgen - AutoHotkey v2 bindings from Windows API metadata
#[derive(Debug, Parser)]
#[command(name = "winmdgen", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate one script file per type, plus errors.txt and manifest.xml.
    Generate {
        /// Path to the .winmd file.
        #[arg(value_name = "WINMD")]
        path: PathBuf,

        /// Output directory; namespaces become subdirectories.
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// XML documentation store merged into the generated doc comments.
        #[arg(long, value_name = "XML")]
        docs: Option<PathBuf>,

        /// Build units on all cores.
        #[arg(short, long)]
        parallel: bool,

        /// Do not emit API modules (free functions and constants).
        #[arg(long)]
        no_apis: bool,

        /// Do not emit COM interfaces.
        #[arg(long)]
        no_com: bool,
    },

    /// Print the computed native layout of one type.
    Layout {
        /// Path to the .winmd file.
        #[arg(value_name = "WINMD")]
        path: PathBuf,

        /// Namespace-qualified type name (e.g., Windows.Win32.Foundation.RECT).
        #[arg(value_name = "QUALIFIED-NAME")]
        name: String,
    },

    /// Display metadata overview: version, module, MVID and table row counts.
    Info {
        /// Path to the .winmd file.
        #[arg(value_name = "WINMD")]
        path: PathBuf,
    },
}
