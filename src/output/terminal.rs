//! Colored terminal output

use std::io::Write;

use anyhow::Result;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::model::MatchResult;
use crate::scan::ScanState;

use super::format::display_value;
use super::OutputFormatter;

/// Terminal output with colors
#[derive(Debug, Default)]
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }

    fn write_list(&self, result: &MatchResult, writer: &mut dyn WriteColor) -> Result<()> {
        for (id, values) in &result.matches {
            writer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
            write!(writer, "{}", id)?;
            writer.reset()?;
            let summary = values.get(1).map(String::as_str).unwrap_or_default();
            writeln!(writer, " - {}", display_value(summary))?;
        }
        Ok(())
    }

    fn write_detail(
        &self,
        result: &MatchResult,
        values: &[String],
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        for (label, value) in result.labelled(values) {
            writer.set_color(ColorSpec::new().set_bold(true))?;
            write!(writer, "{}:", label)?;
            writer.reset()?;
            writeln!(writer, " {}", display_value(value))?;
        }
        Ok(())
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(&self, result: &MatchResult, writer: &mut dyn WriteColor) -> Result<()> {
        if result.is_empty() {
            writer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(writer, "No results found.")?;
            writer.reset()?;
            return Ok(());
        }

        match result.single() {
            Some((_, values)) => self.write_detail(result, values, writer),
            None => self.write_list(result, writer),
        }
    }

    fn render_detection(&self, value: &str, writer: &mut dyn WriteColor) -> Result<()> {
        writer.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(writer, "Barcode detected!")?;
        writer.reset()?;
        writeln!(writer, " {}", value)?;
        Ok(())
    }

    fn render_scan_state(&self, state: ScanState, writer: &mut dyn WriteColor) -> Result<()> {
        match state {
            ScanState::Starting => writeln!(writer, "Scanning for barcodes...")?,
            ScanState::Idle => writeln!(writer, "Scanner stopped.")?,
            ScanState::Active => {}
        }
        Ok(())
    }

    fn render_error(&self, message: &str, writer: &mut dyn WriteColor) -> Result<()> {
        writer.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(writer, "{}", message)?;
        writer.reset()?;
        Ok(())
    }
}
