use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::csv_input::headers_of;
use crate::db;
use crate::error::Result;
use crate::mapping::{missing_required, parse_pairs, Mapping, MappingKind};

use super::open_db;

pub fn headers(file: &str) -> Result<()> {
    let text = std::fs::read_to_string(Path::new(file))?;
    let headers = headers_of(&text);
    if headers.is_empty() {
        println!("No header row found in {file}");
        return Ok(());
    }
    for (i, h) in headers.iter().enumerate() {
        println!("{:>3}  {h}", i + 1);
    }
    Ok(())
}

pub fn set(dealer: &str, kind: &str, pairs: &[String]) -> Result<()> {
    let kind: MappingKind = kind.parse()?;
    let mapping = parse_pairs(kind, pairs)?;
    let conn = open_db()?;
    let dealer = db::find_dealer(&conn, dealer)?;
    let saved = db::set_mapping(&conn, dealer.id, kind, &mapping)?.unwrap_or_default();
    println!("Saved {kind} mapping for {}", dealer.name);
    print_mapping(kind, &saved);
    Ok(())
}

pub fn show(dealer: &str, kind: &str) -> Result<()> {
    let kind: MappingKind = kind.parse()?;
    let conn = open_db()?;
    let dealer = db::find_dealer(&conn, dealer)?;
    match db::get_mapping(&conn, dealer.id, kind)? {
        Some(mapping) => print_mapping(kind, &mapping),
        None => println!("No {kind} mapping saved for {}; canonical headers are expected.", dealer.name),
    }
    Ok(())
}

fn print_mapping(kind: MappingKind, mapping: &Mapping) {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Source header", "Required"]);
    let required = kind.required();
    for field in kind.fields() {
        let source = mapping.get(field).map(String::as_str).unwrap_or("");
        table.add_row(vec![
            Cell::new(field),
            Cell::new(source),
            Cell::new(if required.contains(&field) { "yes" } else { "" }),
        ]);
    }
    println!("{table}");

    let missing = missing_required(mapping, required);
    if !missing.is_empty() {
        println!("{} {}", "Missing required:".red().bold(), missing.join(", "));
    }
}
