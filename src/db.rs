use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use crate::analyzer::RunSummary;
use crate::error::{DsmError, Result};
use crate::export::timestamp;
use crate::mapping::{Mapping, MappingKind};
use crate::models::{Dealer, Outcome, RunRecord};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dealers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dealer_id INTEGER NOT NULL,
    ro_number TEXT NOT NULL,
    status TEXT NOT NULL,
    notes TEXT,
    next_follow_up TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (dealer_id) REFERENCES dealers(id)
);

CREATE INDEX IF NOT EXISTS idx_outcomes_dealer_ro ON outcomes(dealer_id, ro_number);

CREATE TABLE IF NOT EXISTS mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dealer_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    mapping_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (dealer_id) REFERENCES dealers(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_dealer_kind ON mappings(dealer_id, kind);

CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dealer_id INTEGER NOT NULL,
    run_dir TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    declined_total REAL NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (dealer_id) REFERENCES dealers(id)
);
";

fn now() -> String {
    timestamp(Utc::now())
}

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dealers
// ---------------------------------------------------------------------------

fn row_to_dealer(row: &rusqlite::Row) -> rusqlite::Result<Dealer> {
    Ok(Dealer {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub fn list_dealers(conn: &Connection) -> Result<Vec<Dealer>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM dealers ORDER BY name")?;
    let rows = stmt
        .query_map([], row_to_dealer)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_dealer(conn: &Connection, name: &str) -> Result<Dealer> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DsmError::InvalidDealerName);
    }
    let created_at = now();
    conn.execute(
        "INSERT INTO dealers (name, created_at) VALUES (?1, ?2)",
        rusqlite::params![name, created_at],
    )?;
    Ok(Dealer {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        created_at,
    })
}

pub fn find_dealer(conn: &Connection, name: &str) -> Result<Dealer> {
    conn.query_row(
        "SELECT id, name, created_at FROM dealers WHERE name = ?1",
        [name.trim()],
        row_to_dealer,
    )
    .optional()?
    .ok_or_else(|| DsmError::UnknownDealer(name.trim().to_string()))
}

/// Directory-safe form of a dealer name: lowercase ASCII alphanumerics and dashes.
pub fn dealer_slug(dealer: &Dealer) -> String {
    let mut slug = String::new();
    for c in dealer.name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        format!("dealer-{}", dealer.id)
    } else {
        slug.to_string()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

fn row_to_outcome(row: &rusqlite::Row) -> rusqlite::Result<Outcome> {
    Ok(Outcome {
        id: row.get(0)?,
        dealer_id: row.get(1)?,
        ro_number: row.get(2)?,
        status: row.get(3)?,
        notes: row.get(4)?,
        next_follow_up: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn get_outcome(conn: &Connection, dealer_id: i64, ro_number: &str) -> Result<Option<Outcome>> {
    let outcome = conn
        .query_row(
            "SELECT id, dealer_id, ro_number, status, notes, next_follow_up, created_at, updated_at \
             FROM outcomes WHERE dealer_id = ?1 AND ro_number = ?2 ORDER BY id DESC LIMIT 1",
            rusqlite::params![dealer_id, ro_number],
            row_to_outcome,
        )
        .optional()?;
    Ok(outcome)
}

pub struct OutcomeUpdate<'a> {
    pub dealer_id: i64,
    pub ro_number: &'a str,
    pub status: &'a str,
    pub notes: Option<&'a str>,
    pub next_follow_up: Option<&'a str>,
}

pub fn upsert_outcome(conn: &Connection, update: &OutcomeUpdate) -> Result<Outcome> {
    let ts = now();
    match get_outcome(conn, update.dealer_id, update.ro_number)? {
        Some(existing) => {
            conn.execute(
                "UPDATE outcomes SET status = ?1, notes = ?2, next_follow_up = ?3, updated_at = ?4 WHERE id = ?5",
                rusqlite::params![update.status, update.notes, update.next_follow_up, ts, existing.id],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO outcomes (dealer_id, ro_number, status, notes, next_follow_up, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![
                    update.dealer_id,
                    update.ro_number,
                    update.status,
                    update.notes,
                    update.next_follow_up,
                    ts,
                ],
            )?;
        }
    }
    get_outcome(conn, update.dealer_id, update.ro_number)?
        .ok_or_else(|| DsmError::Other(format!("outcome for {} was not saved", update.ro_number)))
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

/// Stored mapping for a dealer, or `None` when absent or unreadable.
pub fn get_mapping(conn: &Connection, dealer_id: i64, kind: MappingKind) -> Result<Option<Mapping>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT mapping_json FROM mappings WHERE dealer_id = ?1 AND kind = ?2",
            rusqlite::params![dealer_id, kind.key()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(json) = json else {
        return Ok(None);
    };
    match serde_json::from_str(&json) {
        Ok(mapping) => Ok(Some(mapping)),
        Err(e) => {
            warn!(dealer_id, kind = kind.key(), error = %e, "ignoring unreadable stored mapping");
            Ok(None)
        }
    }
}

pub fn set_mapping(
    conn: &Connection,
    dealer_id: i64,
    kind: MappingKind,
    mapping: &Mapping,
) -> Result<Option<Mapping>> {
    let ts = now();
    let json = serde_json::to_string(mapping)?;
    conn.execute(
        "INSERT INTO mappings (dealer_id, kind, mapping_json, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) \
         ON CONFLICT(dealer_id, kind) DO UPDATE SET mapping_json = excluded.mapping_json, updated_at = excluded.updated_at",
        rusqlite::params![dealer_id, kind.key(), json, ts],
    )?;
    get_mapping(conn, dealer_id, kind)
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

pub fn record_run(conn: &Connection, dealer_id: i64, run_dir: &Path, summary: &RunSummary) -> Result<i64> {
    conn.execute(
        "INSERT INTO runs (dealer_id, run_dir, row_count, declined_total, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            dealer_id,
            run_dir.to_string_lossy().to_string(),
            summary.row_count as i64,
            summary.declined_total,
            now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_runs(conn: &Connection, dealer_id: Option<i64>) -> Result<Vec<RunRecord>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, d.name, r.run_dir, r.row_count, r.declined_total, r.created_at \
         FROM runs r JOIN dealers d ON r.dealer_id = d.id \
         WHERE ?1 IS NULL OR r.dealer_id = ?1 \
         ORDER BY r.created_at DESC, r.id DESC",
    )?;
    let rows = stmt
        .query_map([dealer_id], |row| {
            Ok(RunRecord {
                id: row.get(0)?,
                dealer_name: row.get(1)?,
                run_dir: row.get(2)?,
                row_count: row.get(3)?,
                declined_total: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
