//! Output formatting: text or JSON.

use std::io::{self, Write};

use crate::cli::OutputFormat;

/// Render `data` in the chosen format. `text_fn` builds the human view.
pub fn render<T: serde::Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(&T) -> String,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(text_fn(data)),
        OutputFormat::Json => serde_json::to_string_pretty(data),
        OutputFormat::JsonCompact => serde_json::to_string(data),
    }
}

/// Print to stdout, ignoring broken pipes.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
