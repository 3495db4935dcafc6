use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DsmError, Result};
use crate::models::Opportunity;

pub const CSV_COLUMNS: &[&str] = &[
    "ro_number",
    "ro_date",
    "advisor",
    "customer_name",
    "phone",
    "email",
    "declined_total",
    "line_count",
    "top_categories",
];

pub const CALLBACK_CSV: &str = "callback_list.csv";
pub const REPORT_HTML: &str = "report.html";
pub const META_JSON: &str = "meta.json";

/// Rows beyond this are left out of the HTML report (the CSV has everything).
pub const HTML_ROW_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub dealer_name: String,
    pub generated_at: String,
}

#[derive(Debug, Clone)]
pub struct RunFiles {
    pub run_dir: PathBuf,
    pub callback_csv: PathBuf,
    pub report_html: PathBuf,
    pub meta_json: PathBuf,
}

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Filesystem-safe run directory name, e.g. `2024-05-01T12-30-00-000Z`.
pub fn run_dir_name(now: DateTime<Utc>) -> String {
    timestamp(now).replace([':', '.'], "-")
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn opportunities_to_csv(rows: &[Opportunity]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(CSV_COLUMNS)?;
    for r in rows {
        let fields = [
            r.ro_number.clone(),
            r.ro_date.clone(),
            r.advisor.clone().unwrap_or_default(),
            r.customer_name.clone().unwrap_or_default(),
            r.phone.clone().unwrap_or_default(),
            r.email.clone().unwrap_or_default(),
            format!("{:.2}", r.declined_total),
            r.line_count.to_string(),
            r.top_categories.clone(),
        ];
        wtr.write_record(fields.iter().map(|f| normalize_newlines(f)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| DsmError::Other(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| DsmError::Other(e.to_string()))
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn opt(s: &Option<String>) -> String {
    esc(s.as_deref().unwrap_or(""))
}

pub fn opportunities_to_html(rows: &[Opportunity], meta: &RunMeta) -> String {
    let body = rows
        .iter()
        .take(HTML_ROW_LIMIT)
        .map(|r| {
            format!(
                "<tr>
  <td><code>{}</code></td>
  <td>{}</td>
  <td>{}</td>
  <td>{}</td>
  <td>{}</td>
  <td>{}</td>
  <td>${:.2}</td>
  <td>{}</td>
  <td>{}</td>
</tr>",
                esc(&r.ro_number),
                esc(&r.ro_date),
                opt(&r.advisor),
                opt(&r.customer_name),
                opt(&r.phone),
                opt(&r.email),
                r.declined_total,
                r.line_count,
                esc(&r.top_categories),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let truncated = if rows.len() > HTML_ROW_LIMIT {
        format!(
            "\n  <p>Showing the top {HTML_ROW_LIMIT} of {} opportunities. See {CALLBACK_CSV} for the full list.</p>",
            rows.len()
        )
    } else {
        String::new()
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Declined Service Miner Report</title>
  <style>
    body {{ font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; margin: 24px; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; }}
    th {{ background: #f6f6f6; text-align: left; }}
    code {{ background: #f1f1f1; padding: 2px 4px; }}
  </style>
</head>
<body>
  <h2>Declined Service Miner</h2>
  <p><strong>Dealer:</strong> {dealer}</p>
  <p><strong>Generated:</strong> <code>{generated}</code></p>

  <h3>Top opportunities</h3>
  <table>
    <thead>
      <tr>
        <th>RO #</th>
        <th>Date</th>
        <th>Advisor</th>
        <th>Customer</th>
        <th>Phone</th>
        <th>Email</th>
        <th>Declined $</th>
        <th>Lines</th>
        <th>Categories</th>
      </tr>
    </thead>
    <tbody>
      {body}
    </tbody>
  </table>{truncated}

  <p style="color:#666; font-size: 12px; margin-top: 16px">
    Generated locally. Handle customer data carefully.
  </p>
</body>
</html>
"#,
        dealer = esc(&meta.dealer_name),
        generated = esc(&meta.generated_at),
    )
}

// ---------------------------------------------------------------------------
// Run directory
// ---------------------------------------------------------------------------

pub fn write_run_files(dir: &Path, rows: &[Opportunity], dealer_name: &str) -> Result<RunFiles> {
    std::fs::create_dir_all(dir)?;
    let meta = RunMeta {
        dealer_name: dealer_name.to_string(),
        generated_at: timestamp(Utc::now()),
    };

    let files = RunFiles {
        run_dir: dir.to_path_buf(),
        callback_csv: dir.join(CALLBACK_CSV),
        report_html: dir.join(REPORT_HTML),
        meta_json: dir.join(META_JSON),
    };
    std::fs::write(&files.callback_csv, opportunities_to_csv(rows)?)?;
    std::fs::write(&files.report_html, opportunities_to_html(rows, &meta))?;
    let json = serde_json::to_string_pretty(&meta)?;
    std::fs::write(&files.meta_json, format!("{json}\n"))?;

    info!(dir = %dir.display(), rows = rows.len(), "wrote run files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_input::parse_csv;

    fn opp(number: &str, total: f64) -> Opportunity {
        Opportunity {
            ro_number: number.to_string(),
            ro_date: "2024-01-01".to_string(),
            advisor: None,
            customer_name: Some("Ann".to_string()),
            phone: None,
            email: Some("ann@example.com".to_string()),
            declined_total: total,
            line_count: 2,
            top_categories: "Brakes; Tires".to_string(),
        }
    }

    fn meta() -> RunMeta {
        RunMeta {
            dealer_name: "Main St <Motors>".to_string(),
            generated_at: "2024-05-01T12:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_csv_header_and_formatting() {
        let csv = opportunities_to_csv(&[opp("R1", 175.0)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "R1,2024-01-01,,Ann,,ann@example.com,175.00,2,Brakes; Tires"
        );
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_csv_quotes_special_characters() {
        let mut o = opp("R1", 10.0);
        o.customer_name = Some("Smith, \"Bud\"".to_string());
        o.advisor = Some("line\r\nbreak".to_string());
        let csv = opportunities_to_csv(&[o]).unwrap();
        assert!(csv.contains("\"Smith, \"\"Bud\"\"\""));
        assert!(csv.contains("\"line\nbreak\""));
        assert!(!csv.contains('\r'));
    }

    #[test]
    fn test_csv_round_trip() {
        let mut tricky = opp("R2", 12.345);
        tricky.customer_name = Some("O'Neil, \"Jr\"\nSecond line".to_string());
        let rows = vec![opp("R1", 175.0), tricky];
        let parsed = parse_csv(&opportunities_to_csv(&rows).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        for (orig, back) in rows.iter().zip(&parsed) {
            assert_eq!(back["ro_number"], orig.ro_number);
            assert_eq!(back["ro_date"], orig.ro_date);
            assert_eq!(back["advisor"], orig.advisor.clone().unwrap_or_default());
            assert_eq!(back["customer_name"], orig.customer_name.clone().unwrap_or_default());
            assert_eq!(back["email"], orig.email.clone().unwrap_or_default());
            assert_eq!(back["declined_total"], format!("{:.2}", orig.declined_total));
            assert_eq!(back["line_count"], orig.line_count.to_string());
            assert_eq!(back["top_categories"], orig.top_categories);
        }
    }

    #[test]
    fn test_html_escapes_and_formats() {
        let mut o = opp("R<1>", 99.5);
        o.top_categories = "A&B".to_string();
        let html = opportunities_to_html(&[o], &meta());
        assert!(html.contains("Main St &lt;Motors&gt;"));
        assert!(html.contains("<code>R&lt;1&gt;</code>"));
        assert!(html.contains("A&amp;B"));
        assert!(html.contains("<td>$99.50</td>"));
    }

    #[test]
    fn test_html_caps_rows() {
        let rows: Vec<Opportunity> = (0..HTML_ROW_LIMIT + 5)
            .map(|i| opp(&format!("R{i}"), 10.0))
            .collect();
        let html = opportunities_to_html(&rows, &meta());
        assert_eq!(html.matches("<tr>\n  <td><code>").count(), HTML_ROW_LIMIT);
        assert!(html.contains("top 500 of 505"));
    }

    #[test]
    fn test_run_dir_name() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:30:05.123Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(run_dir_name(now), "2024-05-01T12-30-05-123Z");
    }

    #[test]
    fn test_write_run_files() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("runs").join("one");
        let files = write_run_files(&run_dir, &[opp("R1", 5.0)], "Main St").unwrap();
        assert!(files.callback_csv.exists());
        assert!(files.report_html.exists());
        let meta: RunMeta =
            serde_json::from_str(&std::fs::read_to_string(&files.meta_json).unwrap()).unwrap();
        assert_eq!(meta.dealer_name, "Main St");
        assert!(meta.generated_at.ends_with('Z'));
        let raw = std::fs::read_to_string(&files.meta_json).unwrap();
        assert!(raw.contains("\"dealerName\""));
    }
}
