use anyhow::{bail, Result};
use tracing::info;

use crate::db::Database;
use crate::models::NewTicket;

/// What a requester fills in when filing a ticket.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketForm<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub item: Option<&'a str>,
    pub kind: Option<&'a str>,
}

/// Files a new ticket under an existing category. The caller, when given,
/// is recorded as the requester.
pub fn run(db: &Database, caller: Option<&str>, form: &TicketForm<'_>) -> Result<String> {
    if form.title.trim().is_empty() {
        bail!("Title cannot be empty");
    }

    let category = match db.get_category_by_name(form.category)? {
        Some(c) => c,
        None => bail!(
            "Category '{}' not found. Use 'ouvidoria category list' to see categories",
            form.category
        ),
    };

    let item_id = match form.item {
        Some(name) => match db.get_item_by_name(name)? {
            Some(item) if item.category_id == category.id => Some(item.id),
            Some(_) => bail!("Item '{}' does not belong to category '{}'", name, category.name),
            None => bail!("Item '{}' not found", name),
        },
        None => None,
    };

    let type_id = match form.kind {
        Some(name) => match db.get_type_by_name(name)? {
            Some(kind) => Some(kind.id),
            None => bail!("Type '{}' not found", name),
        },
        None => None,
    };

    let requester_id = match caller {
        Some(email) => match db.find_user_by_email(email)? {
            Some(user) => Some(user.id),
            None => bail!("Unknown user {}", email),
        },
        None => None,
    };

    let id = db.insert_ticket(&NewTicket {
        item_id,
        type_id,
        requester_id,
        ..NewTicket::filed(form.title, form.description, category.id)
    })?;
    info!(ticket_id = %id, category = %category.name, requester = ?requester_id, "ticket filed");
    println!("Filed ticket {} under {}", id, category.name);
    Ok(id)
}
