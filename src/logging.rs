use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "OUVIDORIA_LOG";

fn default_directive(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("ouvidoria={}", level)
}

/// Installs the global subscriber. Logs go to stderr so stdout stays clean
/// for report and export output.
pub fn init(json: bool, verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
