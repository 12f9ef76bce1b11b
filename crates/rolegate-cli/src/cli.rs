use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rolegate")]
#[command(about = "Rolegate CLI: query access decisions against a policy snapshot")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Policy service base URL (overrides config file and ROLEGATE_URL env var)
    #[arg(short, long, global = true, env = "ROLEGATE_URL")]
    pub url: Option<String>,

    /// Snapshot path relative to the base URL
    #[arg(long, global = true)]
    pub path: Option<String>,

    /// Bearer token sent with the snapshot request
    #[arg(short, long, global = true, env = "ROLEGATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log filter (e.g. info, rolegate=debug). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a user holds a role or permission
    Check(CheckArgs),
    /// Evaluate a role list (supports the "?" and "@" sentinels)
    Roles(RolesArgs),
    /// Show statistics for the loaded snapshot
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Username to check
    #[arg(long)]
    pub user: String,
    /// Role or permission name
    #[arg(long)]
    pub item: String,
    /// Rule parameter as key=value (value parsed as JSON when possible)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,
}

#[derive(clap::Args)]
pub struct RolesArgs {
    /// Username to check
    #[arg(long, default_value = "", conflicts_with = "guest")]
    pub user: String,
    /// Check as an unauthenticated actor
    #[arg(long)]
    pub guest: bool,
    /// Check as a superuser
    #[arg(long, conflicts_with = "guest")]
    pub superuser: bool,
    /// Set the allow flag to false
    #[arg(long)]
    pub deny: bool,
    /// Role names, tried in order
    #[arg(long = "role")]
    pub roles: Vec<String>,
    /// Rule parameter as key=value (value parsed as JSON when possible)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// List every item with its type, rule and parents
    #[arg(long)]
    pub items: bool,
    /// List the direct assignments of one user
    #[arg(long)]
    pub user: Option<String>,
}

/// Parses `key=value`. The value is read as JSON if it parses, otherwise as
/// a plain string.
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{raw}': expected key=value"))?;
    if key.is_empty() {
        return Err(format!("invalid parameter '{raw}': empty key"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
