use comfy_table::{Cell, Table};

use crate::db;
use crate::error::Result;

use super::open_db;

pub fn add(name: &str) -> Result<()> {
    let conn = open_db()?;
    let dealer = db::create_dealer(&conn, name)?;
    println!("Added dealer: {} (id {})", dealer.name, dealer.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let dealers = db::list_dealers(&conn)?;
    if dealers.is_empty() {
        println!("No dealers yet. Add one with `dsm dealers add <name>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Created"]);
    for d in dealers {
        table.add_row(vec![Cell::new(d.id), Cell::new(d.name), Cell::new(d.created_at)]);
    }
    println!("Dealers\n{table}");
    Ok(())
}
