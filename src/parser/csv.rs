//! CSV parser

use crate::error::{LookupError, Result};
use crate::model::Row;

use super::{ParsedTable, Parser};

/// Parser for comma separated files
///
/// Row 0 is the header row; column 0 of every row is the identifier.
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut records = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(LookupError::parse)?;
            // Blank and whitespace-only lines come through as a single empty cell
            if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
                continue;
            }
            records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let mut records = records.into_iter();
        let header_row = records.next().ok_or(LookupError::EmptyFile)?;
        let headers: Vec<String> = header_row.into_iter().skip(1).collect();

        let rows: Vec<Row> = records.filter_map(Row::from_cells).collect();
        if rows.is_empty() {
            return Err(LookupError::EmptyFile);
        }

        Ok(ParsedTable { headers, rows })
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv" | "txt")
    }
}
