use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};

use crate::db::Database;
use crate::models::{Category, Item, Status, Ticket, TicketType};

#[derive(Serialize, Deserialize)]
pub struct ExportedTicket {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub item: Option<String>,
    pub kind: Option<String>,
    pub requester: Option<ExportedRequester>,
    pub status: Status,
    pub messages: Vec<ExportedMessage>,
    pub created_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ExportedRequester {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ExportedMessage {
    pub title: String,
    pub text: Option<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
    pub types: Vec<TicketType>,
    pub tickets: Vec<ExportedTicket>,
}

/// Id to name lookups shared by every exported ticket.
struct Names {
    categories: HashMap<i64, String>,
    items: HashMap<i64, String>,
    types: HashMap<i64, String>,
}

fn export_ticket(db: &Database, ticket: &Ticket, names: &Names) -> Result<ExportedTicket> {
    let messages = db.get_messages(&ticket.id)?;
    let requester = match ticket.requester_id {
        Some(id) => db.get_user(id)?.map(|u| ExportedRequester {
            name: u.name,
            email: u.email,
            phone: u.phone,
        }),
        None => None,
    };

    Ok(ExportedTicket {
        id: ticket.id.clone(),
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        category: names.categories.get(&ticket.category_id).cloned(),
        item: ticket.item_id.and_then(|id| names.items.get(&id).cloned()),
        kind: ticket.type_id.and_then(|id| names.types.get(&id).cloned()),
        requester,
        status: ticket.status,
        messages: messages
            .into_iter()
            .map(|m| ExportedMessage {
                title: m.title,
                text: m.text,
                created_at: m.created_at.to_rfc3339(),
            })
            .collect(),
        created_at: ticket.created_at.to_rfc3339(),
        updated_at: ticket.updated_at.to_rfc3339(),
        finished_at: ticket.finished_at.map(|dt| dt.to_rfc3339()),
    })
}

fn build(db: &Database) -> Result<ExportData> {
    let categories = db.list_categories()?;
    let items = db.list_items(None)?;
    let types = db.list_types()?;
    let names = Names {
        categories: categories.iter().map(|c| (c.id, c.name.clone())).collect(),
        items: items.iter().map(|i| (i.id, i.name.clone())).collect(),
        types: types.iter().map(|t| (t.id, t.name.clone())).collect(),
    };

    let tickets = db
        .list_tickets(None)?
        .iter()
        .map(|t| export_ticket(db, t, &names))
        .collect::<Result<Vec<_>>>()?;

    Ok(ExportData {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        categories,
        items,
        types,
        tickets,
    })
}

pub fn run_json(db: &Database, output_path: Option<&str>) -> Result<()> {
    let data = build(db)?;
    let json = serde_json::to_string_pretty(&data)?;

    match output_path {
        Some(path) => {
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!("Exported {} tickets to {}", data.tickets.len(), path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTicket, Role};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_build_empty() {
        let (db, _dir) = setup_test_db();
        let data = build(&db).unwrap();
        assert_eq!(data.version, 1);
        assert!(data.tickets.is_empty());
    }

    #[test]
    fn test_export_ticket_with_messages() {
        let (db, _dir) = setup_test_db();
        let cat = db.create_category("Sugestão").unwrap();
        let staff = db.create_user("ana@uni.br", "Ana", Role::Staff).unwrap();
        let id = db.create_ticket("More benches", Some("Near block B"), cat).unwrap();
        db.add_message(&id, staff, "Forwarded", None).unwrap();
        db.update_status(&id, Status::Done).unwrap();

        let data = build(&db).unwrap();
        let ticket = &data.tickets[0];
        assert_eq!(ticket.category.as_deref(), Some("Sugestão"));
        assert_eq!(ticket.status, Status::Done);
        assert_eq!(ticket.messages.len(), 1);
        assert!(ticket.finished_at.is_some());
    }

    #[test]
    fn test_export_taxonomy_and_requester() {
        let (db, _dir) = setup_test_db();
        let cat = db.create_category("Reclamação").unwrap();
        let item = db.create_item("Atendimento", cat).unwrap();
        let kind = db.create_type("Normal").unwrap();
        let student = db
            .create_user_with_phone("ana.costa@uni.br", "Ana Costa", Role::Student, Some("(62) 99999-4444"))
            .unwrap();
        db.insert_ticket(&NewTicket {
            item_id: Some(item),
            type_id: Some(kind),
            requester_id: Some(student),
            ..NewTicket::filed("Rude clerk", None, cat)
        })
        .unwrap();

        let data = build(&db).unwrap();
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.types.len(), 1);
        let ticket = &data.tickets[0];
        assert_eq!(ticket.item.as_deref(), Some("Atendimento"));
        assert_eq!(ticket.kind.as_deref(), Some("Normal"));
        let requester = ticket.requester.as_ref().unwrap();
        assert_eq!(requester.email, "ana.costa@uni.br");
        assert_eq!(requester.phone.as_deref(), Some("(62) 99999-4444"));
    }

    #[test]
    fn test_export_orphan_ticket() {
        let (db, _dir) = setup_test_db();
        let cat = db.create_category("Sugestão").unwrap();
        db.create_ticket("Orphan", None, cat).unwrap();
        db.delete_category(cat).unwrap();

        let data = build(&db).unwrap();
        assert!(data.tickets[0].category.is_none());
    }

    #[test]
    fn test_run_json_to_file() {
        let (db, dir) = setup_test_db();
        let cat = db.create_category("Elogio").unwrap();
        db.create_ticket("Thanks", None, cat).unwrap();

        let path = dir.path().join("out.json");
        run_json(&db, path.to_str()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: ExportData = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.tickets.len(), 1);
        assert_eq!(parsed.tickets[0].status, Status::Waiting);
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_export_keeps_every_ticket(n in 0usize..12) {
            let (db, _dir) = setup_test_db();
            let cat = db.create_category("Dúvida").unwrap();
            for i in 0..n {
                db.create_ticket(&format!("Q{}", i), None, cat).unwrap();
            }
            prop_assert_eq!(build(&db).unwrap().tickets.len(), n);
        }
    }
}
