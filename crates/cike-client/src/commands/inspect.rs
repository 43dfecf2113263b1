//! The `inspect` command: list the entries of an exported calendar file.

use std::io::Write;
use std::path::Path;

use cike_providers::{IcsEntry, read_calendar_file};

use crate::error::ClientResult;

/// Prints the entries of `path`, decoration removed and ends inclusive.
pub async fn run(path: &Path, json: bool) -> ClientResult<()> {
    let entries = read_calendar_file(path).await?;
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &entries)?;
        writeln!(out)?;
    } else {
        for entry in &entries {
            writeln!(out, "{}", entry_line(entry))?;
        }
        writeln!(out, "{} entries in {}", entries.len(), path.display())?;
    }
    Ok(())
}

fn entry_line(entry: &IcsEntry) -> String {
    let when = if entry.end == entry.start {
        entry.start.to_string()
    } else {
        format!("{} .. {}", entry.start, entry.end)
    };
    let mut line = format!("{:<34} {:<8} {}", when, entry.source.as_str(), entry.title);
    if !entry.location.is_empty() {
        line.push_str(&format!(" @ {}", entry.location));
    }
    line
}
