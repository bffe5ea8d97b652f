use std::path::Path;

use crate::config::types::has_separator;
use crate::types::{BenchError, TrialRecord};

pub const HEADER: &str = "URL,Speed,Run,Duration (s)";

/// Render records as comma-separated rows under [`HEADER`], in append order.
///
/// Rows are joined with `\n` and the last row has no trailing newline.
/// Fields are not escaped, so a URL or speed label containing a separator is
/// rejected instead of producing a misaligned row.
pub fn render(records: &[TrialRecord]) -> Result<String, BenchError> {
    let mut out = String::from(HEADER);
    out.push('\n');

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        for field in [&record.url, &record.speed] {
            if has_separator(field) {
                return Err(BenchError::Report(format!(
                    "field contains a separator: {field:?}"
                )));
            }
        }
        rows.push(format!(
            "{},{},{},{}",
            record.url, record.speed, record.run, record.duration_secs
        ));
    }
    out.push_str(&rows.join("\n"));
    Ok(out)
}

/// Write the report to `path`, replacing any existing file.
pub fn write(path: &Path, records: &[TrialRecord]) -> Result<(), BenchError> {
    let contents = render(records)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}
