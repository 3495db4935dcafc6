use std::path::Path;

use tracing::debug;

use crate::error::{DsmError, Result};
use crate::models::Record;

/// Parse CSV text with a header row into header-keyed records.
///
/// Keys and values are trimmed. Blank lines are skipped. The first parser
/// error aborts the whole parse; no partial output is returned.
pub fn parse_csv(text: &str) -> Result<Vec<Record>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    check_quotes(text)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| DsmError::Parse(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| DsmError::Parse(e.to_string()))?;
        let row: Record = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    debug!(columns = headers.len(), rows = rows.len(), "parsed csv");
    Ok(rows)
}

/// Reject quoting the csv reader would otherwise repair silently: a quoted
/// field left open at end of input, or text after a closing quote.
fn check_quotes(text: &str) -> Result<()> {
    let mut chars = text.chars().peekable();
    let mut line = 1;
    let mut opened_on = 0;
    let mut in_quotes = false;
    let mut at_field_start = true;

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        if !in_quotes {
            match c {
                '"' if at_field_start => {
                    in_quotes = true;
                    opened_on = line;
                }
                ',' | '\r' | '\n' => at_field_start = true,
                _ => at_field_start = false,
            }
            continue;
        }
        if c != '"' {
            continue;
        }
        if chars.peek() == Some(&'"') {
            chars.next();
            continue;
        }
        in_quotes = false;
        at_field_start = false;
        while matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        }
        match chars.peek() {
            None | Some(',' | '\r' | '\n') => {}
            Some(_) => {
                return Err(DsmError::Parse(format!(
                    "line {line}: trailing text after quoted field"
                )))
            }
        }
    }

    if in_quotes {
        return Err(DsmError::Parse(format!(
            "line {opened_on}: quoted field unterminated"
        )));
    }
    Ok(())
}

/// Read a CSV file from disk and parse it with [`parse_csv`].
pub fn read_csv_file(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path)?;
    parse_csv(&text).map_err(|e| match e {
        DsmError::Parse(msg) => DsmError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Column names from the first non-blank line. Tolerates malformed bodies.
pub fn headers_of(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(first) = text.lines().find(|l| !l.trim().is_empty()) else {
        return Vec::new();
    };
    // naive split; header rows rarely quote commas
    first
        .split(',')
        .map(|piece| {
            let s = piece.trim();
            let s = s.strip_prefix('"').unwrap_or(s);
            s.strip_suffix('"').unwrap_or(s).to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}
