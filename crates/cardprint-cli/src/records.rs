//! Record source and output log.

use crate::error::{BatchError, Result};
use cardprint_core::UidBytes;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Enrollment codes to process, one per line of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSource {
    path: PathBuf,
    identifiers: Vec<String>,
}

impl RecordSource {
    /// Read identifiers from `path`.
    ///
    /// Every non-empty line is one identifier, kept as written apart from a
    /// trailing carriage return. Invalid UTF-8 is replaced rather than
    /// rejected.
    ///
    /// # Errors
    ///
    /// `SourceRead` if the file cannot be read, `EmptySource` if it holds
    /// no identifiers.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|source| BatchError::SourceRead {
            path: path.clone(),
            source,
        })?;
        Self::from_text(path, &String::from_utf8_lossy(&bytes))
    }

    fn from_text(path: PathBuf, text: &str) -> Result<Self> {
        let identifiers: Vec<String> = text
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if identifiers.is_empty() {
            return Err(BatchError::EmptySource { path });
        }
        debug!("Loaded {} records from {}", identifiers.len(), path.display());
        Ok(Self { path, identifiers })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Append-only `identifier,UIDHEX` log.
///
/// Each pairing is flushed as soon as it is written, so an interrupted
/// batch keeps every card already processed.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
    written: usize,
}

impl CsvSink<File> {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// `SinkOpen` if the file cannot be opened.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| BatchError::SinkOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one pairing and flush.
    pub fn record(&mut self, identifier: &str, uid: &UidBytes) -> io::Result<()> {
        writeln!(self.writer, "{},{}", identifier, uid.to_compact_hex())?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Pairings written through this sink.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::{NamedTempFile, TempDir};

    #[rstest]
    #[case("000123\n000124\n", &["000123", "000124"])]
    #[case("000123\r\n\r\n000124", &["000123", "000124"])]
    #[case("\n\nA\n\n", &["A"])]
    #[case(" padded \n", &[" padded "])]
    fn test_source_lines(#[case] text: &str, #[case] expected: &[&str]) {
        let source = RecordSource::from_text(PathBuf::from("input.csv"), text).unwrap();
        assert_eq!(source.identifiers(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("\n\r\n\n")]
    fn test_empty_source_is_fatal(#[case] text: &str) {
        let result = RecordSource::from_text(PathBuf::from("input.csv"), text);
        assert!(matches!(result, Err(BatchError::EmptySource { .. })));
    }

    #[test]
    fn test_missing_source_file() {
        let dir = TempDir::new().unwrap();
        let result = RecordSource::from_path(dir.path().join("missing.csv"));
        assert!(matches!(result, Err(BatchError::SourceRead { .. })));
    }

    #[test]
    fn test_source_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "000123\n000124\n").unwrap();

        let source = RecordSource::from_path(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.path(), file.path());
    }

    #[test]
    fn test_sink_format() {
        let mut sink = CsvSink::from_writer(Vec::new());
        sink.record("000123", &UidBytes::new([0x04, 0x1A, 0x2B, 0x3C])).unwrap();
        sink.record("000124", &UidBytes::new([0xDE, 0xAD, 0xBE, 0xEF])).unwrap();

        assert_eq!(sink.written(), 2);
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "000123,041A2B3C\n000124,DEADBEEF\n"
        );
    }

    #[test]
    fn test_sink_appends_to_existing_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "000100,01020304\n").unwrap();

        let mut sink = CsvSink::open_append(file.path()).unwrap();
        sink.record("000123", &UidBytes::new([0x04, 0x1A, 0x2B, 0x3C])).unwrap();

        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "000100,01020304\n000123,041A2B3C\n"
        );
    }

    #[test]
    fn test_unopenable_sink() {
        let dir = TempDir::new().unwrap();
        let result = CsvSink::open_append(dir.path().join("no/such/dir/output.csv"));
        assert!(matches!(result, Err(BatchError::SinkOpen { .. })));
    }
}
