use std::io::Write;

use harload_core::api::{entry_to_request, load_entries, CliError, Entry, TranslateError};

use super::cli::ValidateArgs;

/// An entry that cannot be replayed.
#[derive(Debug, Clone)]
pub struct Rejected {
    /// Position in the archive, starting at 1.
    pub index: usize,
    pub method: String,
    pub url: String,
    pub error: TranslateError,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub total: usize,
    pub rejected: Vec<Rejected>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn render(&self, har: &str, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            out,
            "{har}: {} entries, {} replayable",
            self.total,
            self.total - self.rejected.len()
        )?;
        for r in &self.rejected {
            writeln!(out, "  #{} {} {}: {}", r.index, r.method, r.url, r.error)?;
        }
        Ok(())
    }
}

/// Translates every entry the way a worker would, collecting the failures.
pub fn validate_entries(entries: &[Entry]) -> ValidationReport {
    let rejected = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            entry_to_request(entry, false).err().map(|error| Rejected {
                index: i + 1,
                method: entry.method().to_string(),
                url: entry.url().to_string(),
                error,
            })
        })
        .collect();
    ValidationReport {
        total: entries.len(),
        rejected,
    }
}

pub fn handle_validate(args: ValidateArgs) -> Result<i32, CliError> {
    let har = args.har.display().to_string();
    let entries = load_entries(&args.har)?;
    let report = validate_entries(&entries);
    report.render(&har, &mut std::io::stdout().lock())?;
    Ok(if report.is_clean() { 0 } else { 1 })
}
