use anyhow::{anyhow, bail, Result};

use crate::db::Database;
use crate::models::Role;

pub fn add(db: &Database, email: &str, name: &str, role: &str, phone: Option<&str>) -> Result<()> {
    let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
    let email = email.trim();
    if !email.contains('@') {
        bail!("Invalid email '{}'", email);
    }
    if db.find_user_by_email(email)?.is_some() {
        bail!("User {} already exists", email);
    }

    let id = db.create_user_with_phone(email, name, role, phone)?;
    println!("Created {} #{}: {} <{}>", role.as_str(), id, name, email);
    Ok(())
}
