use std::io::Write;

use owo_colors::OwoColorize;
use paperhead_core::{ExtractedRecord, NOT_FOUND, ParseError};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the three extracted fields.
pub fn print_record(
    w: &mut dyn Write,
    record: &ExtractedRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "Extracted Metadata:".bold())?;
    } else {
        writeln!(w, "Extracted Metadata:")?;
    }
    print_field(w, "Title", &record.title, color)?;
    print_field(w, "Authors", &record.authors, color)?;
    print_field(w, "Year of Publication", &record.year, color)?;
    Ok(())
}

fn print_field(w: &mut dyn Write, label: &str, value: &str, color: ColorMode) -> std::io::Result<()> {
    if !color.enabled() {
        return writeln!(w, "  {}: {}", label, value);
    }
    if value == NOT_FOUND {
        writeln!(w, "  {}: {}", label.bold(), value.dimmed())
    } else {
        writeln!(w, "  {}: {}", label.bold(), value)
    }
}

/// Report a TEI parse failure; the record that follows is all "Not Found".
pub fn print_parse_error(
    w: &mut dyn Write,
    err: &ParseError,
    color: ColorMode,
) -> std::io::Result<()> {
    let msg = format!("Failed to parse the XML returned by GROBID: {}", err);
    if color.enabled() {
        writeln!(w, "{}", msg.yellow())
    } else {
        writeln!(w, "{}", msg)
    }
}
