use anyhow::{anyhow, Result};
use std::collections::HashMap;

use crate::db::Database;
use crate::models::Status;
use crate::report::UNKNOWN_CATEGORY;

pub fn run(db: &Database, status: Option<&str>) -> Result<()> {
    let filter = status
        .filter(|s| !s.eq_ignore_ascii_case("all"))
        .map(|s| s.parse::<Status>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let tickets = db.list_tickets(filter)?;

    if tickets.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }

    let mut ids: Vec<i64> = tickets.iter().map(|t| t.category_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let names: HashMap<i64, String> = db
        .find_categories_by_ids(&ids)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    for ticket in tickets {
        let status_display = format!("[{}]", ticket.status);
        let category = names
            .get(&ticket.category_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CATEGORY);
        println!(
            "{} {:15} {:<40} {:<20} {}",
            short_id(&ticket.id),
            status_display,
            truncate(&ticket.title, 40),
            truncate(category, 20),
            ticket.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}
