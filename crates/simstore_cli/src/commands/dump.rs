//! Dump command implementation.

use super::load_snapshot;
use serde_json::{json, Value};
use simstore_core::{Record, Snapshot};
use std::path::Path;

/// Runs the dump command.
pub fn run(
    path: &Path,
    store: &str,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(path)?;
    let records = collect(&snapshot, store, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            println!("Store {store}: {} records", records.len());
            for record in &records {
                println!("  {}", serde_json::to_string(record)?);
            }
        }
    }

    Ok(())
}

/// Returns up to `limit` records of a data or user store as JSON values.
pub fn collect(
    snapshot: &Snapshot,
    store: &str,
    limit: Option<usize>,
) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let code = store.to_lowercase();
    let limit = limit.unwrap_or(usize::MAX);
    let stores = &snapshot.stores;

    if let Ok(data) = stores.data_store(&code) {
        return Ok(data
            .records()
            .take(limit)
            .map(|r| {
                json!({
                    "id": r.id(),
                    "type": r.type_tag(),
                    "depth": r.depth(),
                    "parent": r.parent(),
                    "children": r.children(),
                    "properties": r.properties(),
                    "references": r.references(),
                })
            })
            .collect());
    }

    let users = stores.user_store(&code)?;
    Ok(users
        .users()
        .take(limit)
        .map(|u| {
            json!({
                "id": u.id(),
                "type": u.type_tag(),
                "username": u.username(),
                "firstName": u.first_name(),
                "lastName": u.last_name(),
                "groups": u.groups(),
                "properties": u.properties(),
                "references": u.references(),
            })
        })
        .collect())
}
