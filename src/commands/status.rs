use anyhow::{anyhow, Result};

use crate::api::{apply_status_update, authenticate, StatusUpdate};
use crate::db::Database;
use crate::models::Status;
use crate::notify::OutboxNotifier;

/// Moves a ticket to a new status on behalf of `caller`, leaving a message
/// when one is given.
pub fn run(
    db: &Database,
    caller: Option<&str>,
    id: &str,
    status: &str,
    title: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    let status: Status = status.parse().map_err(|e: String| anyhow!(e))?;
    let user = authenticate(db, caller)?;
    let update = StatusUpdate {
        title: title
            .map(String::from)
            .unwrap_or_else(|| format!("Status changed to {}", status)),
        message: message.map(String::from),
        status,
    };

    let notifier = OutboxNotifier::new(db);
    let change = apply_status_update(db, &notifier, &user, id, &update)?;

    println!("Ticket {} is now {}", change.ticket_id, change.status);
    if let Some(finished) = change.finished_at {
        println!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}
