use anyhow::Result;
use rolegate::RbacEngine;
use serde_json::json;

use crate::cli::{CheckArgs, OutputFormat};
use crate::output::{print_denied, print_json, print_success};

/// Returns whether access was granted.
pub async fn check(engine: &RbacEngine, args: &CheckArgs, format: OutputFormat) -> Result<bool> {
    let params = super::to_params(&args.params);
    let granted = engine.check_access(&args.user, &args.item, &params).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "user": args.user,
            "item": args.item,
            "params": params,
            "granted": granted,
        })),
        OutputFormat::Text if granted => {
            print_success(&format!("granted: {} holds {}", args.user, args.item));
        }
        OutputFormat::Text => {
            print_denied(&format!("denied: {} does not hold {}", args.user, args.item));
        }
    }

    Ok(granted)
}
