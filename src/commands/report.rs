use anyhow::{bail, Result};
use std::io::{self, Write};

use crate::api::{handle_report_request, ReportQuery};
use crate::db::Database;

/// Runs the report endpoint locally and prints its JSON body.
pub fn run(
    db: &Database,
    caller: Option<&str>,
    kind: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let query = ReportQuery {
        report_type: Some(kind.to_string()),
        start_date: start.map(String::from),
        end_date: end.map(String::from),
    };
    let response = handle_report_request(db, caller, &query);

    if !response.is_success() {
        let message = response.body["error"].as_str().unwrap_or("request failed");
        bail!("{} ({})", message, response.status);
    }

    let json = serde_json::to_string_pretty(&response.body)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}
