//! Document loader
//!
//! Uploads are staged in a temporary file for the duration of one load call.
//! The file is removed when the call returns, whether loading succeeded or not.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vizrag_core::{Error, Result, TextRecord, UploadedDocument};

/// Loading strategy selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Text,
    Markdown,
    Csv,
}

impl FileFormat {
    /// Pick a format for an upload's declared filename, rejecting anything
    /// outside [`vizrag_core::SUPPORTED_EXTENSIONS`]
    pub fn for_upload(upload: &UploadedDocument) -> Result<Self> {
        let Some(extension) = upload.extension() else {
            return Err(Error::UnsupportedFormat(format!(
                "'{}' has no file extension",
                upload.filename
            )));
        };

        Self::from_extension(&extension).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "'{}' has extension '{}'",
                upload.filename, extension
            ))
        })
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "txt" => Some(FileFormat::Text),
            "md" => Some(FileFormat::Markdown),
            "csv" => Some(FileFormat::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Text => "txt",
            FileFormat::Markdown => "md",
            FileFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Turns uploaded bytes into text records
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    temp_dir: Option<PathBuf>,
}

impl DocumentLoader {
    /// Stage uploads in the system temporary directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage uploads in `dir` instead of the system temporary directory
    pub fn with_temp_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(dir.into()),
        }
    }

    /// Load an upload into ordered records.
    ///
    /// `txt` and `md` files become a single record; `csv` files become one
    /// record per data row, each column rendered as `header: value`.
    pub fn load(&self, upload: &UploadedDocument) -> Result<Vec<TextRecord>> {
        let format = FileFormat::for_upload(upload)?;

        let mut builder = tempfile::Builder::new();
        let suffix = format!(".{}", format.extension());
        builder.prefix("vizrag-upload-").suffix(&suffix);
        let mut staged = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| Error::Ingestion(format!("could not stage upload: {}", e)))?;

        staged
            .write_all(&upload.bytes)
            .and_then(|_| staged.flush())
            .map_err(|e| Error::Ingestion(format!("could not stage upload: {}", e)))?;

        debug!(
            filename = %upload.filename,
            %format,
            bytes = upload.bytes.len(),
            staged = %staged.path().display(),
            "loading upload"
        );

        let records = match format {
            FileFormat::Text | FileFormat::Markdown => {
                load_text(staged.path(), &upload.filename).map(|record| vec![record])
            }
            FileFormat::Csv => load_csv(staged.path(), &upload.filename),
        };

        if let Err(e) = staged.close() {
            warn!(error = %e, "failed to remove staged upload");
        }

        records
    }
}

fn load_text(path: &Path, source: &str) -> Result<TextRecord> {
    let bytes = std::fs::read(path)?;
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    let text = String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Ingestion(format!("'{}' is not valid UTF-8: {}", source, e)))?;

    Ok(TextRecord {
        text,
        source: source.to_string(),
        row: None,
    })
}

fn load_csv(path: &Path, source: &str) -> Result<Vec<TextRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Ingestion(format!("could not open '{}': {}", source, e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Ingestion(format!("'{}' has an unreadable header: {}", source, e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row_number = i + 1;
        let row = row.map_err(|e| {
            Error::Ingestion(format!("'{}' row {} is malformed: {}", source, row_number, e))
        })?;

        let text = row
            .iter()
            .enumerate()
            .map(|(column, value)| {
                let name = headers
                    .get(column)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", column + 1));
                format!("{}: {}", name, value.trim())
            })
            .collect::<Vec<_>>()
            .join("\n");

        records.push(TextRecord {
            text,
            source: source.to_string(),
            row: Some(row_number),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vizrag_core::SUPPORTED_EXTENSIONS;

    fn staged_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    fn format_of(filename: &str) -> Result<FileFormat> {
        FileFormat::for_upload(&UploadedDocument::new(filename, Vec::<u8>::new()))
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(format_of("notes.txt").unwrap(), FileFormat::Text);
        assert_eq!(format_of("Guide.MD").unwrap(), FileFormat::Markdown);
        assert_eq!(format_of("sales.csv").unwrap(), FileFormat::Csv);

        let err = format_of("data.xlsx").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let err = format_of("Makefile").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_every_supported_extension_has_a_format() {
        for extension in SUPPORTED_EXTENSIONS {
            let format = FileFormat::from_extension(extension).unwrap();
            assert_eq!(format.extension(), extension);
        }
        assert!(FileFormat::from_extension("pdf").is_none());
    }

    #[test]
    fn test_text_file_is_one_record() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::with_temp_dir(dir.path());
        let upload = UploadedDocument::new("notes.txt", "line one\n\nline two".as_bytes());

        let records = loader.load(&upload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "line one\n\nline two");
        assert_eq!(records[0].source, "notes.txt");
        assert_eq!(records[0].row, None);
        assert_eq!(staged_files(&dir), 0);
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::with_temp_dir(dir.path());
        let upload = UploadedDocument::new("guide.md", b"\xEF\xBB\xBF# KPI".to_vec());

        let records = loader.load(&upload).unwrap();
        assert_eq!(records[0].text, "# KPI");
    }

    #[test]
    fn test_csv_rows_are_header_aware_records() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::with_temp_dir(dir.path());
        let csv = "Date,Amount,Region\n2024-01-01,100,North\n2024-01-02,250\n";
        let upload = UploadedDocument::new("sales.csv", csv.as_bytes());

        let records = loader.load(&upload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "Date: 2024-01-01\nAmount: 100\nRegion: North");
        assert_eq!(records[0].row, Some(1));
        assert_eq!(records[1].text, "Date: 2024-01-02\nAmount: 250");
        assert_eq!(records[1].row, Some(2));
        assert_eq!(staged_files(&dir), 0);
    }

    #[test]
    fn test_invalid_utf8_fails_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::with_temp_dir(dir.path());
        let upload = UploadedDocument::new("broken.txt", vec![0x66, 0xff, 0xfe, 0x67]);

        let err = loader.load(&upload).unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
        assert_eq!(staged_files(&dir), 0);
    }

    #[test]
    fn test_unsupported_upload_never_staged() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::with_temp_dir(dir.path());
        let upload = UploadedDocument::new("data.xlsx", vec![0x50, 0x4b, 0x03, 0x04]);

        let err = loader.load(&upload).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert_eq!(staged_files(&dir), 0);
    }
}
