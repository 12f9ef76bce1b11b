use anyhow::{Context, Result};
use colored::Colorize;
use rolegate::{PolicyState, RbacEngine};
use serde_json::json;

use crate::cli::{InspectArgs, OutputFormat};
use crate::output::{print_json, print_key_values, print_table};

pub async fn inspect(engine: &RbacEngine, args: &InspectArgs, format: OutputFormat) -> Result<()> {
    engine.load().await.context("Failed to load policy snapshot")?;
    let state = engine
        .snapshot()
        .context("Policy snapshot was not published")?;
    let stats = state.stats();

    if matches!(format, OutputFormat::Json) {
        let mut out = json!({
            "status": engine.status().to_string(),
            "version": stats.version,
            "items": stats.items,
            "roles": stats.roles,
            "permissions": stats.permissions,
            "rules": stats.rules,
            "actors": stats.actors,
            "assignments": stats.assignments,
        });
        if args.items {
            out["itemList"] = json!(item_rows(&state)
                .into_iter()
                .map(|[name, kind, rule, parents]| json!({
                    "name": name,
                    "type": kind,
                    "rule": rule,
                    "parents": parents,
                }))
                .collect::<Vec<_>>());
        }
        if let Some(user) = &args.user {
            out["userAssignments"] = json!(state
                .assignments()
                .assignments_for(user)
                .into_iter()
                .map(|a| a.item_name)
                .collect::<Vec<_>>());
        }
        print_json(&out);
        return Ok(());
    }

    println!("{}: {}", "Status".cyan(), engine.status());
    print_key_values([
        ("Items", stats.items.to_string()),
        ("Roles", stats.roles.to_string()),
        ("Permissions", stats.permissions.to_string()),
        ("Rules", stats.rules.to_string()),
        ("Actors", stats.actors.to_string()),
        ("Assignments", stats.assignments.to_string()),
    ]);

    if args.items {
        print_table(["Name", "Type", "Rule", "Parents"], item_rows(&state));
    }

    if let Some(user) = &args.user {
        println!("{}: {}", "Assignments for".cyan(), user);
        let rows = state
            .assignments()
            .assignments_for(user)
            .into_iter()
            .map(|a| {
                let kind = state
                    .graph()
                    .get_item(&a.item_name)
                    .map_or_else(|| "unknown".to_string(), |item| item.kind().to_string());
                [a.item_name, kind]
            })
            .collect();
        print_table(["Item", "Type"], rows);
    }

    Ok(())
}

fn item_rows(state: &PolicyState) -> Vec<[String; 4]> {
    state
        .graph()
        .items()
        .map(|item| {
            let parents: Vec<&str> = state
                .graph()
                .get_parents(item.name())
                .into_iter()
                .map(|p| p.name())
                .collect();
            [
                item.name().to_string(),
                item.kind().to_string(),
                item.rule_name().unwrap_or("-").to_string(),
                if parents.is_empty() {
                    "-".to_string()
                } else {
                    parents.join(", ")
                },
            ]
        })
        .collect()
}
