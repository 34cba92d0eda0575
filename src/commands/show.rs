use anyhow::{bail, Result};

use crate::db::Database;
use crate::report::UNKNOWN_CATEGORY;

pub fn run(db: &Database, id: &str) -> Result<()> {
    let ticket = match db.get_ticket(id)? {
        Some(t) => t,
        None => bail!("Ticket {} not found", id),
    };
    let category = db
        .find_categories_by_ids(&[ticket.category_id])?
        .into_iter()
        .next()
        .map(|c| c.name)
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

    println!("Ticket {}: {}", ticket.id, ticket.title);
    println!("Category: {}", category);
    if let Some(item) = ticket.item_id.map(|id| db.get_item(id)).transpose()?.flatten() {
        println!("Item: {}", item.name);
    }
    if let Some(kind) = ticket.type_id.map(|id| db.get_type(id)).transpose()?.flatten() {
        println!("Type: {}", kind.name);
    }
    if let Some(user) = ticket.requester_id.map(|id| db.get_user(id)).transpose()?.flatten() {
        match &user.phone {
            Some(phone) => println!("Requester: {} <{}> {}", user.name, user.email, phone),
            None => println!("Requester: {} <{}>", user.name, user.email),
        }
    }
    println!("Status: {}", ticket.status);
    println!("Created: {}", ticket.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", ticket.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(finished) = ticket.finished_at {
        println!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(desc) = &ticket.description {
        if !desc.is_empty() {
            println!("\nDescription:");
            for line in desc.lines() {
                println!("  {}", line);
            }
        }
    }

    let messages = db.get_messages(id)?;
    if !messages.is_empty() {
        println!("\nMessages:");
        for message in messages {
            println!(
                "  [{}] {}",
                message.created_at.format("%Y-%m-%d %H:%M"),
                message.title
            );
            if let Some(text) = message.text {
                for line in text.lines() {
                    println!("    {}", line);
                }
            }
        }
    }

    let notifications = db.list_notifications(id)?;
    if !notifications.is_empty() {
        println!("\nNotifications:");
        for entry in notifications {
            println!(
                "  [{}] {}",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.kind.as_str()
            );
        }
    }

    Ok(())
}
