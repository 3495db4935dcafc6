use std::path::PathBuf;

use tracing::info;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{create_layout, load_settings, save_settings, shellexpand_path, DB_FILE};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    create_layout(&resolved)?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    info!(data_dir = %resolved.display(), "initialized");

    println!("Initialized dsm at {}", resolved.display());
    Ok(())
}
