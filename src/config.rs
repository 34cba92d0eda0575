use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::db::Database;

pub const DATA_DIR: &str = ".ouvidoria";
pub const DB_FILE: &str = "tickets.db";

/// Runtime settings resolved from flags, environment and the working tree.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// Email of the user the command acts as.
    pub actor: Option<String>,
}

impl Config {
    /// An explicit database path wins; otherwise `.ouvidoria/` is searched
    /// for from the current directory upward.
    pub fn resolve(db_override: Option<PathBuf>, actor: Option<String>) -> Result<Self> {
        let db_path = match db_override {
            Some(path) => path,
            None => {
                let cwd = env::current_dir()?;
                find_data_dir(&cwd)?.join(DB_FILE)
            }
        };
        Ok(Config {
            db_path,
            actor: actor.filter(|a| !a.trim().is_empty()),
        })
    }

    pub fn open_db(&self) -> Result<Database> {
        Database::open(&self.db_path)
            .with_context(|| format!("Failed to open database at {}", self.db_path.display()))
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

pub fn find_data_dir(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(DATA_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not an ouvidoria workspace (or any parent). Run 'ouvidoria init' first.");
        }
    }
}
