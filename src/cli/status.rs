use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
        };

        println!();
        println!("Dealers:    {}", count("dealers")?);
        println!("Outcomes:   {}", count("outcomes")?);
        println!("Mappings:   {}", count("mappings")?);
        println!("Runs:       {}", count("runs")?);
    } else {
        println!();
        println!("Database not found. Run `dsm init` to set up.");
    }

    Ok(())
}
