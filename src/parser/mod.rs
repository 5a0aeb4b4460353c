//! Ingestion of delimited text into headers and rows

mod csv;

use std::path::Path;

use tracing::info;

use crate::error::{LookupError, Result};
use crate::model::Row;

pub use self::csv::CsvParser;

/// Output of a successful parse, not yet committed to a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Header labels, without the identifier column
    pub headers: Vec<String>,
    /// Data rows in file order
    pub rows: Vec<Row>,
}

/// Trait for parsing raw file bytes into a table
pub trait Parser: Send + Sync {
    /// Parse raw bytes into headers and rows
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable>;

    /// Check if this parser can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// Factory for choosing a parser based on file extension
pub struct ParserFactory {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    /// Create a new parser factory with all supported parsers
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(CsvParser)],
        }
    }

    /// Get a parser for the given file path
    pub fn get_parser(&self, path: &Path) -> Result<&dyn Parser> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        self.parsers
            .iter()
            .find(|p| p.supports_extension(&ext))
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                LookupError::UnsupportedFormat(
                    path.extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                )
            })
    }

    /// Read and parse a file using the appropriate parser
    pub fn parse_path(&self, path: &Path) -> Result<ParsedTable> {
        let parser = self.get_parser(path)?;
        let bytes = std::fs::read(path)?;
        let table = parser.parse(&bytes)?;
        info!(
            path = %path.display(),
            rows = table.rows.len(),
            columns = table.headers.len(),
            "parsed data file"
        );
        Ok(table)
    }
}

/// Parse raw delimited bytes
pub fn ingest(bytes: &[u8]) -> Result<ParsedTable> {
    CsvParser.parse(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_factory_rejects_unknown_extension() {
        let factory = ParserFactory::new();
        assert!(factory.get_parser(Path::new("items.csv")).is_ok());
        assert!(factory.get_parser(Path::new("ITEMS.TXT")).is_ok());
        let err = factory.get_parser(Path::new("items.xlsx")).err().unwrap();
        assert!(matches!(err, LookupError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn test_parse_path() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,Name\n1,One").unwrap();

        let table = ParserFactory::new().parse_path(file.path()).unwrap();
        assert_eq!(table.headers, vec!["Name".to_string()]);
        assert_eq!(table.rows, vec![Row::new("1", vec!["One".to_string()])]);
    }

    #[test]
    fn test_parse_path_missing_file() {
        let err = ParserFactory::new()
            .parse_path(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, LookupError::Io(_)));
    }
}
