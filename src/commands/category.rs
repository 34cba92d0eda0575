use anyhow::{bail, Result};

use crate::db::Database;
use crate::report::UNKNOWN_CATEGORY;

pub fn add(db: &Database, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Category name cannot be empty");
    }
    if db.get_category_by_name(name)?.is_some() {
        bail!("Category '{}' already exists", name);
    }

    let id = db.create_category(name)?;
    println!("Created category #{}: {}", id, name);
    Ok(())
}

pub fn list(db: &Database) -> Result<()> {
    let categories = db.list_categories()?;

    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }

    for category in categories {
        println!("#{:<4} {}", category.id, category.name);
    }
    Ok(())
}

pub fn delete(db: &Database, name: &str) -> Result<()> {
    let category = match db.get_category_by_name(name)? {
        Some(c) => c,
        None => bail!("Category '{}' not found", name),
    };

    db.delete_category(category.id)?;
    println!("Deleted category '{}'", category.name);
    println!("Existing tickets will be reported under \"{}\".", UNKNOWN_CATEGORY);
    Ok(())
}
