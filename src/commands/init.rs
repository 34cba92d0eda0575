use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{DATA_DIR, DB_FILE};
use crate::db::Database;
use crate::models::Role;

/// Creates `.ouvidoria/` with an empty database, optionally with a first admin.
pub fn run(path: &Path, admin: Option<(&str, &str)>) -> Result<()> {
    let data_dir = path.join(DATA_DIR);
    let existed = data_dir.exists();

    if !existed {
        fs::create_dir_all(&data_dir).context("Failed to create .ouvidoria directory")?;
    }

    let db = Database::open(&data_dir.join(DB_FILE))?;
    if existed {
        println!("Already initialized at {}", path.display());
    } else {
        println!("Created {}", data_dir.display());
    }

    if let Some((email, name)) = admin {
        if db.find_user_by_email(email)?.is_some() {
            println!("User {} already exists", email);
        } else {
            db.create_user(email, name, Role::Admin)?;
            println!("Created admin {}", email);
        }
    }

    if !existed {
        println!("\nNext steps:");
        println!("  ouvidoria category add \"Reclamação\"              # Add a category");
        println!("  ouvidoria create \"Title\" --category \"Reclamação\" # File a ticket");
    }

    Ok(())
}
