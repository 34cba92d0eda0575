use anyhow::{bail, Result};

use crate::db::Database;

pub fn add(db: &Database, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Type name cannot be empty");
    }
    if db.get_type_by_name(name)?.is_some() {
        bail!("Type '{}' already exists", name);
    }

    let id = db.create_type(name)?;
    println!("Created type #{}: {}", id, name);
    Ok(())
}

pub fn list(db: &Database) -> Result<()> {
    let types = db.list_types()?;

    if types.is_empty() {
        println!("No types found.");
        return Ok(());
    }

    for kind in types {
        println!("#{:<4} {}", kind.id, kind.name);
    }
    Ok(())
}
