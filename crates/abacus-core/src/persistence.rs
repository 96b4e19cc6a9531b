//! History persistence
//!
//! The engine talks to storage only through [`HistoryStore`]. The default
//! adapter, [`CsvHistoryStore`], keeps the history as a comma-separated file
//! with the header `operation,operand1,operand2,result,timestamp`, written in
//! the configured text encoding.

use crate::calculation::{COLUMNS, Calculation, CalculationRecord};
use crate::error::{CalculatorError, Result};
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A trait for history storage backends.
pub trait HistoryStore: Send + Sync {
    /// Where the history lives
    fn location(&self) -> &Path;

    /// Replaces the stored history with `history`, returning the path written
    fn save(&self, history: &[Calculation]) -> Result<PathBuf>;

    /// Reads the stored history in file order; `None` when nothing is stored
    fn load(&self) -> Result<Option<Vec<Calculation>>>;
}

/// CSV file adapter
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl CsvHistoryStore {
    /// UTF-8 store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_encoding(path, UTF_8)
    }

    pub fn with_encoding(path: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        Self { path: path.into(), encoding }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        // encoding_rs only encodes UTF-16 as UTF-8
        if self.encoding == UTF_16LE {
            return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
        }
        if self.encoding == UTF_16BE {
            return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
        }
        let (bytes, _, unmappable) = self.encoding.encode(text);
        if unmappable {
            return Err(self.error(format!(
                "history contains characters not representable in {}",
                self.encoding.name()
            )));
        }
        Ok(bytes.into_owned())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| self.error(format!("file is not valid {}", self.encoding.name())))
    }

    fn error(&self, err: impl std::fmt::Display) -> CalculatorError {
        CalculatorError::persistence(&self.path, err.to_string())
    }
}

impl HistoryStore for CsvHistoryStore {
    fn location(&self) -> &Path {
        &self.path
    }

    fn save(&self, history: &[Calculation]) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        // header written by hand so an empty history still gets one
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(COLUMNS).map_err(|e| self.error(e))?;
        for calculation in history {
            writer.serialize(calculation.to_record()).map_err(|e| self.error(e))?;
        }
        let utf8 = writer.into_inner().map_err(|e| self.error(e.error()))?;
        let text = String::from_utf8(utf8).map_err(|e| self.error(e))?;
        fs::write(&self.path, self.encode(&text)?).map_err(|e| self.error(e))?;

        debug!(
            path = %self.path.display(),
            rows = history.len(),
            encoding = self.encoding.name(),
            "Wrote history file"
        );
        Ok(self.path.clone())
    }

    fn load(&self) -> Result<Option<Vec<Calculation>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|e| self.error(e))?;
        let text = self.decode(&bytes)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());

        let headers = reader.headers().map_err(|e| self.error(e))?;
        if !headers.iter().eq(COLUMNS) {
            return Err(self.error(format!(
                "unexpected header '{}', expected '{}'",
                headers.iter().collect::<Vec<_>>().join(","),
                COLUMNS.join(",")
            )));
        }

        let mut history = Vec::new();
        for row in reader.deserialize::<CalculationRecord>() {
            let record = row.map_err(|e| self.error(e))?;
            history.push(Calculation::from_record(&record)?);
        }

        debug!(path = %self.path.display(), rows = history.len(), "Read history file");
        Ok(Some(history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn calculations() -> Vec<Calculation> {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        vec![
            Calculation::new("subtract", dec!(10), dec!(4), dec!(6), at),
            Calculation::new("divide", dec!(6.000000), dec!(2), dec!(3.000000), at),
        ]
    }

    #[test]
    fn test_save_writes_header_and_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("nested/history.csv"));

        let path = store.save(&calculations()).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "operation,operand1,operand2,result,timestamp");
        assert_eq!(lines[2], "divide,6.000000,2,3.000000,2025-06-01T12:00:00+00:00");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_save_then_load_preserves_order_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("history.csv"));
        store.save(&calculations()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, calculations());
        assert_eq!(loaded[1].operand1().to_string(), "6.000000");
    }

    #[test]
    fn test_latin1_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let latin1 = Encoding::for_label(b"latin-1").unwrap();
        let store = CsvHistoryStore::with_encoding(dir.path().join("history.csv"), latin1);
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let history = vec![Calculation::new("café", dec!(1.5), dec!(2), dec!(3.5), at)];

        let path = store.save(&history).unwrap();
        let bytes = fs::read(path).unwrap();
        // é is the single byte 0xE9 in latin-1
        assert!(bytes.windows(5).any(|w| w == b"caf\xe9,"));
        assert!(String::from_utf8(bytes).is_err());

        assert_eq!(store.load().unwrap(), Some(history));
    }

    #[test]
    fn test_utf16_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let utf16 = Encoding::for_label(b"utf-16").unwrap();
        let store = CsvHistoryStore::with_encoding(dir.path().join("history.csv"), utf16);

        let path = store.save(&calculations()).unwrap();
        let bytes = fs::read(path).unwrap();
        assert_eq!(&bytes[..4], b"o\0p\0");

        assert_eq!(store.load().unwrap(), Some(calculations()));
    }

    #[test]
    fn test_unrepresentable_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ascii = Encoding::for_label(b"ascii").unwrap();
        let store = CsvHistoryStore::with_encoding(dir.path().join("history.csv"), ascii);
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let history = vec![Calculation::new("加", dec!(1), dec!(2), dec!(3), at)];

        let err = store.save(&history).unwrap_err();
        assert!(matches!(err, CalculatorError::Persistence { .. }));
    }

    #[test]
    fn test_rejects_bytes_invalid_for_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, b"operation,operand1,operand2,result,timestamp\n\xff\xfe,1,2,3,x\n").unwrap();

        let err = CsvHistoryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CalculatorError::Persistence { .. }));
    }

    #[test]
    fn test_empty_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("history.csv"));
        store.save(&[]).unwrap();
        assert_eq!(store.load().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("absent.csv"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_rejects_reordered_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "operand1,operation,operand2,result,timestamp\n2,add,3,5,2025-06-01T12:00:00+00:00\n",
        )
        .unwrap();

        let err = CsvHistoryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CalculatorError::Persistence { .. }));
    }

    #[test]
    fn test_rejects_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "operation,operand1,operand2,result,timestamp\nadd,two,3,5,2025-06-01T12:00:00+00:00\n",
        )
        .unwrap();
        assert!(CsvHistoryStore::new(&path).load().is_err());

        fs::write(&path, "operation,operand1,operand2,result,timestamp\nadd,2,3\n").unwrap();
        assert!(CsvHistoryStore::new(&path).load().is_err());
    }
}
