//! Verify command implementation.

use super::load_snapshot;
use simstore_core::integrity::{self, IntegrityIssue, IssueKind};
use std::collections::BTreeMap;
use std::path::Path;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying snapshot at {:?}", path);
    println!();

    let snapshot = load_snapshot(path)?;
    let issues = integrity::verify(&snapshot);
    print_result(&issues);

    println!();
    if issues.is_empty() {
        println!("✓ Snapshot verification passed");
        Ok(())
    } else {
        println!("✗ Snapshot verification failed");
        Err("Verification failed".into())
    }
}

fn print_result(issues: &[IntegrityIssue]) {
    let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for issue in issues {
        *by_kind.entry(issue.kind.to_string()).or_default() += 1;
    }

    println!("  Issues found: {}", issues.len());
    for (kind, count) in &by_kind {
        println!("    {kind}: {count}");
    }
    for issue in issues {
        let severity = match issue.kind {
            IssueKind::Sequence => "WARN",
            _ => "ERROR",
        };
        println!("    {severity}: {issue}");
    }
}
