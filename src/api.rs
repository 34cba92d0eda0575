//! Request handlers for the reporting and status-update endpoints.
//!
//! Handlers take an explicitly injected [`Database`] and return an
//! [`ApiResponse`] (status code plus JSON body) that any HTTP layer can relay.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::db::{Database, StaffNote};
use crate::error::ServiceError;
use crate::models::{NotificationKind, Role, Status, StatusChange, User};
use crate::notify::Notifier;
use crate::report::{build_report, DateRange, ReportData, ReportType};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Body of a staff status update.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub title: String,
    pub message: Option<String>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn respond(operation: &str, result: Result<Value, ServiceError>) -> ApiResponse {
    match result {
        Ok(body) => ApiResponse { status: 200, body },
        Err(err) => {
            if let ServiceError::Internal(cause) = &err {
                error!(operation, error = %format!("{:#}", cause), "request failed");
            } else {
                debug!(operation, status = err.status_code(), error = %err, "request rejected");
            }
            ApiResponse {
                status: err.status_code(),
                body: err.to_body(),
            }
        }
    }
}

/// Resolves the caller's identity against the users table.
pub fn authenticate(db: &Database, caller: Option<&str>) -> Result<User, ServiceError> {
    let email = caller
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(ServiceError::AuthenticationRequired)?;
    db.find_user_by_email(email)?
        .ok_or(ServiceError::AuthenticationRequired)
}

/// Builds one report for internal callers that already hold a typed request.
pub fn generate_report(
    db: &Database,
    kind: ReportType,
    range: &DateRange,
) -> anyhow::Result<ReportData> {
    let rows = db
        .fetch_report_rows(Some(range), kind.filter_axis())
        .with_context(|| format!("Failed to fetch rows for {} report", kind))?;
    Ok(build_report(kind, &rows, Some(range)))
}

pub fn handle_report_request(db: &Database, caller: Option<&str>, query: &ReportQuery) -> ApiResponse {
    respond("report", run_report(db, caller, query))
}

fn run_report(db: &Database, caller: Option<&str>, query: &ReportQuery) -> Result<Value, ServiceError> {
    let user = authenticate(db, caller)?;
    if user.role != Role::Admin {
        return Err(ServiceError::AuthorizationDenied(
            "reports are restricted to administrators".to_string(),
        ));
    }

    let kind: ReportType = query.report_type.as_deref().unwrap_or_default().parse()?;
    let range = DateRange::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    debug!(report = %kind, start = ?range.start(), end = ?range.end(), "building report");

    let data = generate_report(db, kind, &range)?;
    if data.is_empty() {
        debug!(report = %kind, "no tickets in range");
    } else {
        debug!(report = %kind, rows = data.len(), "report built");
    }
    let body = serde_json::to_value(&data).context("Failed to serialize report")?;
    Ok(json!({ "data": body }))
}

pub fn handle_status_update(
    db: &Database,
    notifier: &dyn Notifier,
    caller: Option<&str>,
    ticket_id: &str,
    body: &str,
) -> ApiResponse {
    respond(
        "status_update",
        run_status_update(db, notifier, caller, ticket_id, body),
    )
}

fn run_status_update(
    db: &Database,
    notifier: &dyn Notifier,
    caller: Option<&str>,
    ticket_id: &str,
    body: &str,
) -> Result<Value, ServiceError> {
    let user = authenticate(db, caller)?;
    let update: StatusUpdate = serde_json::from_str(body)?;
    apply_status_update(db, notifier, &user, ticket_id, &update)?;
    Ok(json!({ "message": "updated" }))
}

/// Stores the optional staff message, applies the status and dispatches
/// exactly one notification once the write has committed.
pub fn apply_status_update(
    db: &Database,
    notifier: &dyn Notifier,
    user: &User,
    ticket_id: &str,
    update: &StatusUpdate,
) -> Result<StatusChange, ServiceError> {
    if !user.role.can_triage() {
        return Err(ServiceError::AuthorizationDenied(
            "only staff can update tickets".to_string(),
        ));
    }
    if update.title.trim().is_empty() {
        return Err(ServiceError::Validation("title must not be empty".to_string()));
    }
    let note = update
        .message
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|text| StaffNote {
            user_id: user.id,
            title: &update.title,
            text: Some(text),
        });

    let change = db
        .update_status_with_message(ticket_id, update.status, note)?
        .ok_or_else(|| ServiceError::NotFound(format!("Ticket {}", ticket_id)))?;
    info!(
        ticket_id,
        status = %change.status,
        finished_at = ?change.finished_at,
        by = %user.email,
        "status updated"
    );

    let kind = NotificationKind::for_status(change.status);
    if let Err(e) = notifier.notify(ticket_id, kind) {
        warn!(
            ticket_id,
            kind = kind.as_str(),
            error = %format!("{:#}", e),
            "notification dispatch failed"
        );
    }

    Ok(change)
}
