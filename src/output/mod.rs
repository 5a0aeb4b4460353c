//! Output formatting for lookup results and scanner events

mod format;
mod json;
mod terminal;

use std::io::IsTerminal;

use anyhow::Result;
use termcolor::{ColorChoice, StandardStream, WriteColor};

use crate::config::OutputFormat;
use crate::model::MatchResult;
use crate::scan::ScanState;

pub use format::display_value;
pub use json::JsonOutput;
pub use terminal::TerminalOutput;

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Render a search result
    fn render(&self, result: &MatchResult, writer: &mut dyn WriteColor) -> Result<()>;

    /// Announce a scanned code, ahead of its lookup result
    fn render_detection(&self, value: &str, writer: &mut dyn WriteColor) -> Result<()>;

    /// Announce a scanner state change
    fn render_scan_state(&self, state: ScanState, writer: &mut dyn WriteColor) -> Result<()>;

    /// Report an error that does not end the session
    fn render_error(&self, message: &str, writer: &mut dyn WriteColor) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new()),
            OutputFormat::Json => Box::new(JsonOutput::new()),
        }
    }

    /// Like [`create`](Self::create), with one JSON document per line for streams
    pub fn create_streaming(format: OutputFormat) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new()),
            OutputFormat::Json => Box::new(JsonOutput::compact()),
        }
    }
}

/// Standard output, colored only when attached to a terminal
pub fn stdout() -> StandardStream {
    let choice = if std::io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Render a search result to stdout
pub fn render_to_stdout(result: &MatchResult, format: OutputFormat) -> Result<()> {
    let formatter = OutputFactory::create(format);
    let mut stdout = stdout();
    formatter.render(result, &mut stdout)
}
