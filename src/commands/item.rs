use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::db::Database;

pub fn add(db: &Database, name: &str, category: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Item name cannot be empty");
    }
    let category = match db.get_category_by_name(category)? {
        Some(c) => c,
        None => bail!("Category '{}' not found", category),
    };
    if db.get_item_by_name(name)?.is_some() {
        bail!("Item '{}' already exists", name);
    }

    let id = db.create_item(name, category.id)?;
    println!("Created item #{}: {} ({})", id, name, category.name);
    Ok(())
}

pub fn list(db: &Database, category: Option<&str>) -> Result<()> {
    let category_id = match category {
        Some(name) => match db.get_category_by_name(name)? {
            Some(c) => Some(c.id),
            None => bail!("Category '{}' not found", name),
        },
        None => None,
    };
    let items = db.list_items(category_id)?;

    if items.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    let names: HashMap<i64, String> = db
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    for item in items {
        let category = names.get(&item.category_id).map(String::as_str).unwrap_or("?");
        println!("#{:<4} {:<30} {}", item.id, item.name, category);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        db.create_category("Sugestão").unwrap();
        (db, dir)
    }

    #[test]
    fn test_add_item() {
        let (db, _dir) = setup_test_db();
        add(&db, " Infraestrutura ", "Sugestão").unwrap();
        let item = db.get_item_by_name("Infraestrutura").unwrap().unwrap();
        let cat = db.get_category_by_name("Sugestão").unwrap().unwrap();
        assert_eq!(item.category_id, cat.id);
    }

    #[test]
    fn test_add_item_unknown_category() {
        let (db, _dir) = setup_test_db();
        let result = add(&db, "Sistema", "Nope");
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_add_item_duplicate() {
        let (db, _dir) = setup_test_db();
        add(&db, "Sistema", "Sugestão").unwrap();
        assert!(add(&db, "Sistema", "Sugestão").is_err());
    }

    #[test]
    fn test_list_items() {
        let (db, _dir) = setup_test_db();
        assert!(list(&db, None).is_ok());
        add(&db, "Sistema", "Sugestão").unwrap();
        assert!(list(&db, Some("Sugestão")).is_ok());
        assert!(list(&db, Some("Nope")).is_err());
    }
}
