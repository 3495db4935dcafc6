use std::path::{Path, PathBuf};

use chrono::Utc;
use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::analyzer::{analyze_records, summarize};
use crate::csv_input::read_csv_file;
use crate::db;
use crate::error::{DsmError, Result};
use crate::export::{run_dir_name, write_run_files};
use crate::fmt::{ellipsize, money, or_dash};
use crate::mapping::{apply_mapping, missing_required, MappingKind};
use crate::models::{Dealer, Opportunity, Record};
use crate::settings::{get_data_dir, load_settings};

use super::open_db;

pub struct AnalyzeArgs {
    pub ro_csv: Option<String>,
    pub lines_csv: Option<String>,
    pub combined_csv: Option<String>,
    pub dealer: Option<String>,
    pub out_dir: Option<String>,
    pub top: Option<usize>,
}

/// Re-key rows with the dealer's saved mapping of `kind`, if there is one.
fn remap(
    ctx: Option<&(Connection, Dealer)>,
    kind: MappingKind,
    rows: Vec<Record>,
) -> Result<Vec<Record>> {
    let Some((conn, dealer)) = ctx else {
        return Ok(rows);
    };
    let Some(mapping) = db::get_mapping(conn, dealer.id, kind)? else {
        return Ok(rows);
    };
    let missing = missing_required(&mapping, kind.required());
    if !missing.is_empty() {
        return Err(DsmError::MissingFields(missing));
    }
    info!(dealer = %dealer.name, kind = kind.key(), fields = mapping.len(), "applying saved mapping");
    Ok(apply_mapping(&rows, &mapping))
}

fn load(path: &str) -> Result<Vec<Record>> {
    let rows = read_csv_file(Path::new(path))?;
    info!(path, rows = rows.len(), "read csv");
    Ok(rows)
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let ctx = match &args.dealer {
        Some(name) => {
            let conn = open_db()?;
            let dealer = db::find_dealer(&conn, name)?;
            Some((conn, dealer))
        }
        None => None,
    };

    let (ro_records, line_records) = match (&args.combined_csv, &args.ro_csv, &args.lines_csv) {
        (Some(path), _, _) => {
            let rows = remap(ctx.as_ref(), MappingKind::Combined, load(path)?)?;
            (rows.clone(), rows)
        }
        (None, Some(ro), Some(lines)) => (
            remap(ctx.as_ref(), MappingKind::Ro, load(ro)?)?,
            remap(ctx.as_ref(), MappingKind::Lines, load(lines)?)?,
        ),
        _ => {
            return Err(DsmError::Other(
                "either --combined-csv or both --ro-csv and --lines-csv are required".to_string(),
            ))
        }
    };

    let rows = analyze_records(&ro_records, &line_records);
    let summary = summarize(&rows);
    if rows.is_empty() {
        warn!(ros = ro_records.len(), lines = line_records.len(), "no opportunities found");
    }

    let run_dir = match (&args.out_dir, &ctx) {
        (Some(dir), _) => PathBuf::from(dir),
        (None, Some((_, dealer))) => get_data_dir()
            .join("dealers")
            .join(db::dealer_slug(dealer))
            .join("runs")
            .join(run_dir_name(Utc::now())),
        (None, None) => PathBuf::from("out"),
    };
    let dealer_name = ctx.as_ref().map(|(_, d)| d.name.as_str()).unwrap_or("");
    let files = write_run_files(&run_dir, &rows, dealer_name)?;

    if let Some((conn, dealer)) = &ctx {
        let run_id = db::record_run(conn, dealer.id, &files.run_dir, &summary)?;
        info!(run_id, dealer = %dealer.name, "recorded run");
    }

    let top = args.top.unwrap_or_else(|| load_settings().default_top);
    print_table(&rows, top, ctx.as_ref())?;

    println!("Wrote: {}", files.callback_csv.display());
    println!("Wrote: {}", files.report_html.display());
    println!("Wrote: {}", files.meta_json.display());
    println!("Rows: {}", summary.row_count);
    println!("Declined total: {}", money(summary.declined_total).green().bold());
    Ok(())
}

fn print_table(rows: &[Opportunity], top: usize, ctx: Option<&(Connection, Dealer)>) -> Result<()> {
    if rows.is_empty() || top == 0 {
        return Ok(());
    }

    let mut header = vec!["#", "RO #", "Date", "Customer", "Phone", "Declined", "Lines", "Categories"];
    if ctx.is_some() {
        header.push("Outcome");
    }
    let mut table = Table::new();
    table.set_header(header);

    for (rank, r) in rows.iter().take(top).enumerate() {
        let mut cells = vec![
            Cell::new(rank + 1),
            Cell::new(&r.ro_number),
            Cell::new(&r.ro_date),
            Cell::new(or_dash(r.customer_name.as_deref())),
            Cell::new(or_dash(r.phone.as_deref())),
            Cell::new(money(r.declined_total)),
            Cell::new(r.line_count),
            Cell::new(ellipsize(&r.top_categories, 40)),
        ];
        if let Some((conn, dealer)) = ctx {
            let status = db::get_outcome(conn, dealer.id, &r.ro_number)?.map(|o| o.status);
            cells.push(Cell::new(or_dash(status.as_deref())));
        }
        table.add_row(cells);
    }

    let shown = top.min(rows.len());
    println!("Top {shown} of {} opportunities\n{table}", rows.len());
    Ok(())
}
