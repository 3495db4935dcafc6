use comfy_table::{Cell, Table};

use crate::db;
use crate::error::Result;
use crate::fmt::money;

use super::open_db;

pub fn list(dealer: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let dealer_id = match dealer {
        Some(name) => Some(db::find_dealer(&conn, name)?.id),
        None => None,
    };
    let runs = db::list_runs(&conn, dealer_id)?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Dealer", "Created", "Rows", "Declined", "Directory"]);
    for r in runs {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(r.dealer_name),
            Cell::new(r.created_at),
            Cell::new(r.row_count),
            Cell::new(money(r.declined_total)),
            Cell::new(r.run_dir),
        ]);
    }
    println!("Runs\n{table}");
    Ok(())
}
