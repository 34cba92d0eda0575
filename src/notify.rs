use anyhow::Result;
use tracing::info;

use crate::db::Database;
use crate::models::NotificationKind;

/// Hand-off point to whatever delivers "ticket updated" / "ticket finished" mail.
pub trait Notifier {
    fn notify(&self, ticket_id: &str, kind: NotificationKind) -> Result<()>;
}

/// Queues notifications in the database outbox for an external mailer.
pub struct OutboxNotifier<'a> {
    db: &'a Database,
}

impl<'a> OutboxNotifier<'a> {
    pub fn new(db: &'a Database) -> Self {
        OutboxNotifier { db }
    }
}

impl Notifier for OutboxNotifier<'_> {
    fn notify(&self, ticket_id: &str, kind: NotificationKind) -> Result<()> {
        let entry = self.db.record_notification(ticket_id, kind)?;
        info!(ticket_id, kind = kind.as_str(), outbox_id = entry, "notification queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_outbox_notifier_records_entry() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let cat = db.create_category("A").unwrap();
        let id = db.create_ticket("T", None, cat).unwrap();

        OutboxNotifier::new(&db)
            .notify(&id, NotificationKind::Finish)
            .unwrap();

        let entries = db.list_notifications(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, NotificationKind::Finish);
    }

    #[test]
    fn test_outbox_notifier_unknown_ticket_fails() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        assert!(OutboxNotifier::new(&db)
            .notify("missing", NotificationKind::Update)
            .is_err());
    }
}
