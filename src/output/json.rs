//! JSON output format

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use termcolor::WriteColor;

use crate::model::MatchResult;
use crate::scan::ScanState;

use super::OutputFormatter;

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// One document per line
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn write<T: Serialize>(&self, value: &T, writer: &mut dyn WriteColor) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, value)?;
        } else {
            serde_json::to_writer(&mut *writer, value)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonMatch<'a> {
    id: &'a str,
    values: &'a [String],
}

#[derive(Serialize)]
struct JsonResult<'a> {
    count: usize,
    headers: &'a [String],
    matches: Vec<JsonMatch<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum JsonEvent<'a> {
    Detected { value: &'a str },
    State { state: ScanState },
    Error { message: &'a str },
}

impl OutputFormatter for JsonOutput {
    fn render(&self, result: &MatchResult, writer: &mut dyn WriteColor) -> Result<()> {
        let output = JsonResult {
            count: result.len(),
            headers: &result.headers,
            matches: result
                .matches
                .iter()
                .map(|(id, values)| JsonMatch { id, values })
                .collect(),
        };
        self.write(&output, writer)
    }

    fn render_detection(&self, value: &str, writer: &mut dyn WriteColor) -> Result<()> {
        self.write(&JsonEvent::Detected { value }, writer)
    }

    fn render_scan_state(&self, state: ScanState, writer: &mut dyn WriteColor) -> Result<()> {
        self.write(&JsonEvent::State { state }, writer)
    }

    fn render_error(&self, message: &str, writer: &mut dyn WriteColor) -> Result<()> {
        self.write(&JsonEvent::Error { message }, writer)
    }
}
