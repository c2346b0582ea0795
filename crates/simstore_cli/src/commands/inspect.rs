//! Inspect command implementation.

use super::load_snapshot;
use serde::Serialize;
use simstore_core::store::RecordStore;
use simstore_core::Snapshot;
use std::path::Path;

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Storage directory.
    pub path: String,
    /// Data record sequence counter.
    pub data_record_sequence: u64,
    /// User sequence counter.
    pub user_sequence: u64,
    /// Group sequence counter.
    pub user_group_sequence: u64,
    /// Number of data records across all stores.
    pub data_record_count: usize,
    /// Number of users across all stores.
    pub user_count: usize,
    /// Number of groups across all stores.
    pub group_count: usize,
    /// Number of project-level values.
    pub project_value_count: usize,
    /// Per-store statistics (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stores: Option<Vec<StoreStats>>,
}

/// Statistics for a single store.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    /// Store kind (data, user).
    pub kind: &'static str,
    /// Qualified store code.
    pub code: String,
    /// Number of records.
    pub record_count: usize,
    /// Number of unique index entries.
    pub unique_entries: usize,
    /// Number of groups (user stores only).
    pub group_count: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_stores: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(path)?;
    let result = summarize(path, &snapshot, show_stores);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects counters and statistics from a snapshot.
pub fn summarize(path: &Path, snapshot: &Snapshot, show_stores: bool) -> InspectResult {
    let stores = &snapshot.stores;
    let mut stats = Vec::new();
    for store in stores.data_stores() {
        stats.push(StoreStats {
            kind: "data",
            code: store.code().to_string(),
            record_count: store.len(),
            unique_entries: store.unique().len(),
            group_count: 0,
        });
    }
    for store in stores.user_stores() {
        stats.push(StoreStats {
            kind: "user",
            code: store.code().to_string(),
            record_count: store.len(),
            unique_entries: store.unique().len(),
            group_count: store.groups().count(),
        });
    }

    let count = |kind: &str| {
        stats
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.record_count)
            .sum::<usize>()
    };

    InspectResult {
        path: path.display().to_string(),
        data_record_sequence: snapshot.data_record_sequence,
        user_sequence: snapshot.user_sequence,
        user_group_sequence: snapshot.user_group_sequence,
        data_record_count: count("data"),
        user_count: count("user"),
        group_count: stats.iter().map(|s| s.group_count).sum(),
        project_value_count: stores.project_values().count(),
        stores: show_stores.then_some(stats),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("simstore Snapshot Inspection");
    println!("============================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Sequences:");
    println!("  Data records: {}", result.data_record_sequence);
    println!("  Users:        {}", result.user_sequence);
    println!("  Groups:       {}", result.user_group_sequence);
    println!();
    println!("Contents:");
    println!("  Data records:   {}", result.data_record_count);
    println!("  Users:          {}", result.user_count);
    println!("  Groups:         {}", result.group_count);
    println!("  Project values: {}", result.project_value_count);

    if let Some(stores) = &result.stores {
        println!();
        println!("Stores:");
        for store in stores {
            println!(
                "  [{}] {}: {} records, {} unique entries, {} groups",
                store.kind, store.code, store.record_count, store.unique_entries, store.group_count
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts() {
        let json = br#"{
            "dataRecordSequence": 2,
            "userSequence": 1,
            "userGroupSequence": 1,
            "stores": {
                "data": {"acme-blog": {"acme/blog/posts": {"records": {
                    "1.1": {"id": "1.1", "typeTag": "DataRecord", "depth": 1},
                    "2.1": {"id": "2.1", "typeTag": "DataRecord", "depth": 1}
                }}}},
                "user": {"acme-blog": {"acme/blog/authors": {
                    "records": {"1.1": {"id": "1.1", "typeTag": "User", "username": "jdoe"}},
                    "groups": {"1.1": {"id": "1.1", "name": "Staff", "typeTag": "Group"}}
                }}},
                "project": {"acme-blog": {"acme/blog/tagline": "hi"}}
            }
        }"#;
        let snapshot = Snapshot::from_slice(json).unwrap();
        let result = summarize(Path::new("/tmp/sim"), &snapshot, true);

        assert_eq!(result.data_record_count, 2);
        assert_eq!(result.user_count, 1);
        assert_eq!(result.group_count, 1);
        assert_eq!(result.project_value_count, 1);
        let stores = result.stores.unwrap();
        assert_eq!(stores[0].code, "acme/blog/posts");
        assert_eq!(stores[1].kind, "user");
    }
}
