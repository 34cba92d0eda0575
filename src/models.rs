use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a ticket. Staff may move a ticket between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "PROCEEDING", alias = "PROCEDING")]
    Proceeding,
    #[serde(rename = "NOT_PROCEEDING", alias = "NOT_PROCEDING")]
    NotProceeding,
    #[serde(rename = "DONE")]
    Done,
}

pub const ALL_STATUSES: [Status; 5] = [
    Status::Waiting,
    Status::InProgress,
    Status::Proceeding,
    Status::NotProceeding,
    Status::Done,
];

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Waiting => "WAITING",
            Status::InProgress => "IN_PROGRESS",
            Status::Proceeding => "PROCEEDING",
            Status::NotProceeding => "NOT_PROCEEDING",
            Status::Done => "DONE",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Status::Done)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "WAITING" => Ok(Status::Waiting),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "PROCEEDING" | "PROCEDING" => Ok(Status::Proceeding),
            "NOT_PROCEEDING" | "NOT_PROCEDING" => Ok(Status::NotProceeding),
            "DONE" => Ok(Status::Done),
            _ => Err(format!(
                "Invalid status '{}'. Must be one of: {}",
                s,
                ALL_STATUSES
                    .iter()
                    .map(|st| st.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Staff and admins may triage tickets.
    pub fn can_triage(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(format!(
                "Invalid role '{}'. Must be one of: student, staff, admin",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub item_id: Option<i64>,
    pub type_id: Option<i64>,
    /// User who filed the ticket; `None` for anonymous or imported tickets.
    pub requester_id: Option<i64>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Subject within a category, e.g. "Infraestrutura" under "Sugestão".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
}

/// Priority label such as "Urgente" or "Baixa Prioridade".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub ticket_id: String,
    pub user_id: i64,
    pub title: String,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a ticket with an explicit history (seeding, imports).
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub item_id: Option<i64>,
    pub type_id: Option<i64>,
    pub requester_id: Option<i64>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl NewTicket {
    /// A WAITING ticket filed now, with no item, type or requester.
    pub fn filed(title: &str, description: Option<&str>, category_id: i64) -> Self {
        NewTicket {
            title: title.to_string(),
            description: description.map(String::from),
            category_id,
            item_id: None,
            type_id: None,
            requester_id: None,
            status: Status::Waiting,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Outcome of a status update as committed by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub ticket_id: String,
    pub status: Status,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Finish,
    Update,
}

impl NotificationKind {
    /// "finish" exactly when the ticket moved to DONE.
    pub fn for_status(status: Status) -> Self {
        if status.is_done() {
            NotificationKind::Finish
        } else {
            NotificationKind::Update
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Finish => "finish",
            NotificationKind::Update => "update",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finish" => Ok(NotificationKind::Finish),
            "update" => Ok(NotificationKind::Update),
            _ => Err(format!("Invalid notification kind '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub ticket_id: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}
