use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    Category, Item, Message, NewTicket, NotificationKind, OutboxEntry, Role, Status, StatusChange,
    Ticket, TicketType, User,
};
use crate::report::{DateRange, TicketRow, TimestampAxis};

const SCHEMA_VERSION: i32 = 2;

const TICKET_COLUMNS: &str = "id, title, description, category_id, item_id, type_id, requester_id, \
     status, created_at, updated_at, finished_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "migrating schema");
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    phone TEXT,
                    role TEXT NOT NULL DEFAULT 'student'
                );

                CREATE TABLE IF NOT EXISTS items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    category_id INTEGER NOT NULL,
                    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS types (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );

                -- No foreign key on category_id, item_id or type_id: tickets outlive their taxonomy
                CREATE TABLE IF NOT EXISTS tickets (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    category_id INTEGER NOT NULL,
                    item_id INTEGER,
                    type_id INTEGER,
                    requester_id INTEGER REFERENCES users(id),
                    status TEXT NOT NULL DEFAULT 'WAITING',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    finished_at TEXT
                );

                CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id TEXT NOT NULL,
                    user_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    text TEXT,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE,
                    FOREIGN KEY (user_id) REFERENCES users(id)
                );

                -- Outbox for the mail collaborator
                CREATE TABLE IF NOT EXISTS notifications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_tickets_created ON tickets(created_at);
                CREATE INDEX IF NOT EXISTS idx_tickets_finished ON tickets(finished_at);
                CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
                CREATE INDEX IF NOT EXISTS idx_messages_ticket ON messages(ticket_id);
                CREATE INDEX IF NOT EXISTS idx_notifications_ticket ON notifications(ticket_id);
                CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_id);
                "#,
            )?;

            // Migration: taxonomy, requester and phone columns if upgrading from v1
            for alter in [
                "ALTER TABLE tickets ADD COLUMN item_id INTEGER",
                "ALTER TABLE tickets ADD COLUMN type_id INTEGER",
                "ALTER TABLE tickets ADD COLUMN requester_id INTEGER REFERENCES users(id)",
                "ALTER TABLE users ADD COLUMN phone TEXT",
            ] {
                let _ = self.conn.execute(alter, []);
            }

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    // Categories
    pub fn create_category(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?1)", [name])
            .with_context(|| format!("Failed to create category '{}'", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE name = ?1",
                [name],
                |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn find_categories_by_ids(&self, ids: &[i64]) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name FROM categories WHERE id IN ({}) ORDER BY id",
            placeholders
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let categories = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn delete_category(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // Items
    pub fn create_item(&self, name: &str, category_id: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO items (name, category_id) VALUES (?1, ?2)",
                params![name, category_id],
            )
            .with_context(|| format!("Failed to create item '{}'", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_item(&self, id: i64) -> Result<Option<Item>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, name, category_id FROM items WHERE id = ?1",
                [id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn get_item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, name, category_id FROM items WHERE name = ?1",
                [name],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn list_items(&self, category_id: Option<i64>) -> Result<Vec<Item>> {
        let mut sql = String::from("SELECT id, name, category_id FROM items");
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(id) = category_id {
            sql.push_str(" WHERE category_id = ?1");
            params_vec.push(Box::new(id));
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let items = stmt
            .query_map(params_refs.as_slice(), item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // Types
    pub fn create_type(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO types (name) VALUES (?1)", [name])
            .with_context(|| format!("Failed to create type '{}'", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_type(&self, id: i64) -> Result<Option<TicketType>> {
        let kind = self
            .conn
            .query_row("SELECT id, name FROM types WHERE id = ?1", [id], |row| {
                Ok(TicketType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(kind)
    }

    pub fn get_type_by_name(&self, name: &str) -> Result<Option<TicketType>> {
        let kind = self
            .conn
            .query_row("SELECT id, name FROM types WHERE name = ?1", [name], |row| {
                Ok(TicketType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(kind)
    }

    pub fn list_types(&self) -> Result<Vec<TicketType>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM types ORDER BY id")?;
        let types = stmt
            .query_map([], |row| {
                Ok(TicketType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(types)
    }

    // Users
    pub fn create_user(&self, email: &str, name: &str, role: Role) -> Result<i64> {
        self.create_user_with_phone(email, name, role, None)
    }

    pub fn create_user_with_phone(
        &self,
        email: &str,
        name: &str,
        role: Role,
        phone: Option<&str>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO users (email, name, phone, role) VALUES (?1, ?2, ?3, ?4)",
                params![email, name, phone, role],
            )
            .with_context(|| format!("Failed to create user '{}'", email))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, phone, role FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, phone, role FROM users WHERE email = ?1",
                [email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    // Tickets
    pub fn create_ticket(
        &self,
        title: &str,
        description: Option<&str>,
        category_id: i64,
    ) -> Result<String> {
        self.insert_ticket(&NewTicket::filed(title, description, category_id))
    }

    /// Inserts a ticket with its full history. A completion time earlier than
    /// the creation time is rejected.
    pub fn insert_ticket(&self, ticket: &NewTicket) -> Result<String> {
        if let Some(finished) = ticket.finished_at {
            if finished < ticket.created_at {
                bail!(
                    "Completion time {} is before creation time {}",
                    format_datetime(finished),
                    format_datetime(ticket.created_at)
                );
            }
        }

        let id = Uuid::new_v4().to_string();
        let created = format_datetime(ticket.created_at);
        self.conn.execute(
            "INSERT INTO tickets (id, title, description, category_id, item_id, type_id, requester_id, status, created_at, updated_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10)",
            params![
                id,
                ticket.title,
                ticket.description,
                ticket.category_id,
                ticket.item_id,
                ticket.type_id,
                ticket.requester_id,
                ticket.status,
                created,
                ticket.finished_at.map(format_datetime),
            ],
        )?;
        Ok(id)
    }

    pub fn get_ticket(&self, id: &str) -> Result<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS);
        let ticket = self
            .conn
            .query_row(&sql, [id], ticket_from_row)
            .optional()?;
        Ok(ticket)
    }

    pub fn list_tickets(&self, status_filter: Option<Status>) -> Result<Vec<Ticket>> {
        let mut sql = format!("SELECT {} FROM tickets", TICKET_COLUMNS);
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = status_filter {
            sql.push_str(" WHERE status = ?1");
            params_vec.push(Box::new(status));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let tickets = stmt
            .query_map(params_refs.as_slice(), ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tickets)
    }

    /// Tickets created inside `range`, oldest first.
    pub fn fetch_tickets(&self, range: Option<&DateRange>) -> Result<Vec<Ticket>> {
        let mut sql = format!("SELECT {} FROM tickets", TICKET_COLUMNS);
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        push_range_conditions("created_at", range, &mut conditions, &mut params_vec);

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let tickets = stmt
            .query_map(params_refs.as_slice(), ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tickets)
    }

    /// Rows for the aggregator, with category names resolved.
    ///
    /// Unlike [`Database::fetch_tickets`] this never fails on a bad timestamp:
    /// unreadable values come back as `None` so the aggregator can skip them.
    pub fn fetch_report_rows(
        &self,
        range: Option<&DateRange>,
        axis: TimestampAxis,
    ) -> Result<Vec<TicketRow>> {
        let column = match axis {
            TimestampAxis::Created => "t.created_at",
            TimestampAxis::Completed => "t.finished_at",
        };
        let mut sql = String::from(
            "SELECT t.id, c.name, t.created_at, t.finished_at FROM tickets t LEFT JOIN categories c ON c.id = t.category_id",
        );
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
        push_range_conditions(column, range, &mut conditions, &mut params_vec);

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY t.created_at ASC, t.rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                let id: String = row.get(0)?;
                let created: Option<String> = row.get(2)?;
                let finished: Option<String> = row.get(3)?;
                Ok(TicketRow {
                    category: row.get(1)?,
                    created_at: created.and_then(|s| parse_lenient(&id, "created_at", &s)),
                    finished_at: finished.and_then(|s| parse_lenient(&id, "finished_at", &s)),
                    id,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sets a ticket's status in one conditional statement.
    ///
    /// `finished_at` is stamped only on the edge into DONE: a DONE ticket that
    /// already carries a completion time keeps it, and leaving DONE never
    /// clears it. Returns `None` when the ticket does not exist.
    pub fn update_status(&self, id: &str, status: Status) -> Result<Option<StatusChange>> {
        apply_status(&self.conn, id, status)
    }

    /// Applies a status change and stores the staff note in one transaction.
    /// Nothing is written when the ticket does not exist.
    pub fn update_status_with_message(
        &self,
        id: &str,
        status: Status,
        note: Option<StaffNote<'_>>,
    ) -> Result<Option<StatusChange>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(change) = apply_status(&tx, id, status)? else {
            return Ok(None);
        };
        if let Some(note) = note {
            insert_message(&tx, id, note.user_id, note.title, note.text)?;
        }
        tx.commit()?;
        Ok(Some(change))
    }

    // Messages
    pub fn add_message(
        &self,
        ticket_id: &str,
        user_id: i64,
        title: &str,
        text: Option<&str>,
    ) -> Result<i64> {
        insert_message(&self.conn, ticket_id, user_id, title, text)
    }

    pub fn get_messages(&self, ticket_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ticket_id, user_id, title, text, created_at FROM messages WHERE ticket_id = ?1 ORDER BY id",
        )?;
        let messages = stmt
            .query_map([ticket_id], |row| {
                Ok(Message {
                    id: row.get(0)?,
                    ticket_id: row.get(1)?,
                    user_id: row.get(2)?,
                    title: row.get(3)?,
                    text: row.get(4)?,
                    created_at: datetime_column(row, 5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    // Notification outbox
    pub fn record_notification(&self, ticket_id: &str, kind: NotificationKind) -> Result<i64> {
        let now = format_datetime(Utc::now());
        self.conn.execute(
            "INSERT INTO notifications (ticket_id, kind, created_at) VALUES (?1, ?2, ?3)",
            params![ticket_id, kind.as_str(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_notifications(&self, ticket_id: &str) -> Result<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ticket_id, kind, created_at FROM notifications WHERE ticket_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map([ticket_id], |row| {
                let kind: String = row.get(2)?;
                Ok(OutboxEntry {
                    id: row.get(0)?,
                    ticket_id: row.get(1)?,
                    kind: kind.parse::<NotificationKind>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
                    })?,
                    created_at: datetime_column(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.execute(sql, [])?)
    }
}

/// Message written alongside a status change.
#[derive(Debug, Clone, Copy)]
pub struct StaffNote<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub text: Option<&'a str>,
}

// One UPDATE ... RETURNING, so concurrent DONE saves cannot both stamp.
fn apply_status(conn: &Connection, id: &str, status: Status) -> Result<Option<StatusChange>> {
    let now = format_datetime(Utc::now());
    let change = conn
        .query_row(
            r#"
            UPDATE tickets SET
                finished_at = CASE
                    WHEN ?1 = 'DONE' AND (status != 'DONE' OR finished_at IS NULL)
                        THEN MAX(?2, created_at)
                    ELSE finished_at
                END,
                status = ?1,
                updated_at = ?2
            WHERE id = ?3
            RETURNING id, status, finished_at
            "#,
            params![status, now, id],
            |row| {
                Ok(StatusChange {
                    ticket_id: row.get(0)?,
                    status: row.get(1)?,
                    finished_at: optional_datetime_column(row, 2)?,
                })
            },
        )
        .optional()?;
    Ok(change)
}

fn insert_message(
    conn: &Connection,
    ticket_id: &str,
    user_id: i64,
    title: &str,
    text: Option<&str>,
) -> Result<i64> {
    let now = format_datetime(Utc::now());
    conn.execute(
        "INSERT INTO messages (ticket_id, user_id, title, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ticket_id, user_id, title, text, now],
    )?;
    Ok(conn.last_insert_rowid())
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
        item_id: row.get(4)?,
        type_id: row.get(5)?,
        requester_id: row.get(6)?,
        status: row.get(7)?,
        created_at: datetime_column(row, 8)?,
        updated_at: datetime_column(row, 9)?,
        finished_at: optional_datetime_column(row, 10)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        role: row.get(4)?,
    })
}

fn push_range_conditions(
    column: &str,
    range: Option<&DateRange>,
    conditions: &mut Vec<String>,
    params_vec: &mut Vec<Box<dyn ToSql>>,
) {
    let Some(range) = range else {
        return;
    };
    if let Some(start) = range.start() {
        conditions.push(format!("{} >= ?", column));
        params_vec.push(Box::new(format_datetime(start)));
    }
    if let Some(end) = range.end() {
        conditions.push(format!("{} <= ?", column));
        params_vec.push(Box::new(format_datetime(end)));
    }
}

/// Fixed-width UTC form, so text order matches time order.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

fn parse_lenient(ticket_id: &str, column: &str, raw: &str) -> Option<DateTime<Utc>> {
    match parse_datetime(raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!(ticket_id, column, value = raw, error = %e, "unreadable timestamp");
            None
        }
    }
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse_datetime(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
