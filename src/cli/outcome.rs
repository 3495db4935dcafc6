use chrono::NaiveDate;

use crate::db::{self, OutcomeUpdate};
use crate::error::{DsmError, Result};
use crate::fmt::or_dash;
use crate::models::Outcome;

use super::open_db;

fn validate_date(raw: &str) -> Result<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| DsmError::InvalidDate(raw.to_string()))
}

pub fn set(
    dealer: &str,
    ro_number: &str,
    status: &str,
    notes: Option<&str>,
    next_follow_up: Option<&str>,
) -> Result<()> {
    let status = status.trim();
    if status.is_empty() {
        return Err(DsmError::Other("Outcome status is required".to_string()));
    }
    let next_follow_up = next_follow_up.map(validate_date).transpose()?;

    let conn = open_db()?;
    let dealer = db::find_dealer(&conn, dealer)?;
    let outcome = db::upsert_outcome(
        &conn,
        &OutcomeUpdate {
            dealer_id: dealer.id,
            ro_number: ro_number.trim(),
            status,
            notes,
            next_follow_up: next_follow_up.as_deref(),
        },
    )?;
    print_outcome(&outcome);
    Ok(())
}

pub fn get(dealer: &str, ro_number: &str) -> Result<()> {
    let conn = open_db()?;
    let dealer = db::find_dealer(&conn, dealer)?;
    match db::get_outcome(&conn, dealer.id, ro_number.trim())? {
        Some(outcome) => print_outcome(&outcome),
        None => println!("No outcome recorded for RO {}", ro_number.trim()),
    }
    Ok(())
}

fn print_outcome(o: &Outcome) {
    println!("RO:             {}", o.ro_number);
    println!("Status:         {}", o.status);
    println!("Notes:          {}", or_dash(o.notes.as_deref()));
    println!("Next follow-up: {}", or_dash(o.next_follow_up.as_deref()));
    println!("Updated:        {}", o.updated_at);
}
