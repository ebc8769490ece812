//! Destinations for generated files.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::Result;

/// Destination of generated files.
///
/// Paths are relative, `/`-separated and never escape the sink's root.
pub trait OutputSink {
    /// Stores `contents` under `path`, replacing any earlier file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be stored.
    fn write(&mut self, path: &str, contents: &[u8]) -> Result<()>;
}

/// Writes files below a directory, creating parents as needed
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Creates a sink rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> DirectorySink {
        DirectorySink {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for DirectorySink {
    fn write(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let target = path
            .split('/')
            .fold(self.root.clone(), |target, segment| target.join(segment));
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)?;
        Ok(())
    }
}

/// Keeps files in memory, ordered by path
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    /// Text of the file at `path`, if it was written and is UTF-8.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files
            .get(path)
            .and_then(|contents| std::str::from_utf8(contents).ok())
    }

    /// All files, by path.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        self.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink() {
        let mut sink = MemorySink::new();
        sink.write("A/B.ahk", b"one").unwrap();
        sink.write("A/B.ahk", b"two").unwrap();
        sink.write("errors.txt", &[0xFF]).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.get("A/B.ahk"), Some("two"));
        assert_eq!(sink.get("errors.txt"), None);
        assert_eq!(sink.files().keys().next().map(String::as_str), Some("A/B.ahk"));
    }

    #[test]
    fn directory_sink() {
        let root = std::env::temp_dir().join(format!("winmdgen-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&root);
        sink.write("Windows/Win32/Test/POINT.ahk", b"class POINT").unwrap();

        let written = std::fs::read_to_string(root.join("Windows/Win32/Test/POINT.ahk")).unwrap();
        assert_eq!(written, "class POINT");
        std::fs::remove_dir_all(&root).unwrap();
    }
}
