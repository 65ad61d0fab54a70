//! Documents, records and chunks

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upload extensions the loader understands, lower-case and without the dot
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "csv"];

/// The supported extensions as a phrase for user messages: `.txt, .md or .csv`
pub fn supported_formats() -> String {
    let dotted: Vec<String> = SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect();
    match dotted.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => String::new(),
    }
}

/// A file handed over by the user: raw bytes plus the declared filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased extension of the declared filename, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Read a file from disk, keeping only its file name as the declared name
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// One unit of loaded text: a whole text file or a single CSV row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub text: String,
    /// Originating filename
    pub source: String,
    /// 1-based data row for CSV records
    pub row: Option<usize>,
}

/// A bounded, immutable window over a [`TextRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: String,
    pub content: String,
    pub source: String,
    pub row: Option<usize>,
    /// Position of the parent record in the loaded sequence
    pub record_index: usize,
    /// Position of this chunk within its record
    pub chunk_index: usize,
    /// Byte offset of `content` inside the parent record text
    pub offset: usize,
}

impl TextChunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Byte offset one past the end of `content` in the parent record
    pub fn end(&self) -> usize {
        self.offset + self.content.len()
    }

    /// Human-readable origin, e.g. `sales.csv (row 3)`
    pub fn label(&self) -> String {
        match self.row {
            Some(row) => format!("{} (row {})", self.source, row),
            None => self.source.clone(),
        }
    }
}
