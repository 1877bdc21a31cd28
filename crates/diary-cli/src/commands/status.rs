//! Status command handler

use anyhow::Result;

use diary_core::Store;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let config = store.config();
    let entries = store.count()?;
    let database_size = store.database_size()?;
    let prefs = store.load_preferences()?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "database": config.sqlite_path(),
                    "database_size": database_size,
                    "entries": entries,
                    "search_url": config.search_url,
                    "preferences": prefs,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", entries);
        }
        OutputFormat::Human => {
            println!("Food Diary Status");
            println!("=================");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.sqlite_path().display());
            println!("  Size:     {:.1} KB", database_size as f64 / 1024.0);
            println!("  Entries:  {}", entries);
            println!();
            println!("Place search:");
            println!("  Proxy: {}", config.search_url);
            println!();
            println!("Preferences:");
            println!("  Theme: {} ({})", prefs.theme, prefs.theme.name());
            println!("  Font:  {}", prefs.font);
            println!("  Color: {}", prefs.color);
        }
    }

    Ok(())
}
