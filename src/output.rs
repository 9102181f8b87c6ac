//! Output formatting for scan results

use crate::scan::ScanResult;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print a scan summary: matched records, the term frequency table,
/// and a warning when shard fetches failed.
pub fn print_scan_result(result: &ScanResult, limit: usize, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);

    let total_occurrences: u64 = result.counts.values().sum();

    stdout.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(
        stdout,
        "{} matching records, {} occurrences",
        result.counts.len(),
        total_occurrences
    )?;
    stdout.reset()?;

    if result.failed_shards > 0 {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(
            stdout,
            "warning: {} shard(s) could not be fetched and were skipped",
            result.failed_shards
        )?;
        stdout.reset()?;
    }

    // Records sorted by count descending, id ascending for stable output
    let mut records: Vec<_> = result.counts.iter().collect();
    records.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));

    for (id, count) in records.iter().take(limit) {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(stdout, "{id}")?;
        stdout.reset()?;
        writeln!(stdout, "  {count}")?;
    }

    if records.len() > limit {
        writeln!(stdout, "... and {} more", records.len() - limit)?;
    }

    if !result.term_frequency.is_empty() {
        writeln!(stdout)?;
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(stdout, "Top terms")?;
        stdout.reset()?;
        for entry in &result.term_frequency {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(stdout, "{}", entry.term)?;
            stdout.reset()?;
            writeln!(stdout, "  {}", entry.count)?;
        }
    }

    Ok(())
}
