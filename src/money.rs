use std::sync::OnceLock;

use regex::Regex;

fn non_numeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9.\-]").expect("valid money pattern"))
}

/// Best-effort money parsing for messy exports: "$1,234.56" -> 1234.56.
///
/// Everything except digits, `.` and `-` is discarded. Anything that does not
/// then parse as one finite decimal is 0. Never fails.
pub fn parse_money(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    let cleaned = non_numeric().replace_all(s, "");
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}
