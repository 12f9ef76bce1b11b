use anyhow::Result;
use rolegate::{Actor, CheckAccessOptions, RbacEngine};
use serde_json::json;

use crate::cli::{OutputFormat, RolesArgs};
use crate::output::{print_denied, print_json, print_success};

fn actor_from(args: &RolesArgs) -> Actor {
    if args.guest {
        Actor::guest()
    } else if args.superuser {
        Actor::superuser(&args.user)
    } else {
        Actor::user(&args.user)
    }
}

/// Returns whether the role list matched.
pub async fn roles(engine: &RbacEngine, args: &RolesArgs, format: OutputFormat) -> Result<bool> {
    if !args.guest && args.user.is_empty() {
        anyhow::bail!("--user is required unless --guest is set");
    }

    let actor = actor_from(args);
    let options = CheckAccessOptions::new()
        .with_roles(args.roles.iter().cloned())
        .with_allow(!args.deny)
        .with_params(super::to_params(&args.params));

    let granted = engine.check(&actor, &options).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "user": actor.username(),
            "guest": actor.is_guest(),
            "superuser": actor.is_superuser(),
            "roles": args.roles,
            "allow": options.allow,
            "granted": granted,
        })),
        OutputFormat::Text => {
            let who = if actor.is_guest() { "guest" } else { actor.username() };
            let roles = if args.roles.is_empty() {
                "(any)".to_string()
            } else {
                args.roles.join(", ")
            };
            if granted {
                print_success(&format!("granted: {who} matches [{roles}]"));
            } else {
                print_denied(&format!("denied: {who} does not match [{roles}]"));
            }
        }
    }

    Ok(granted)
}
