//! Output rendering for the CLI.

use std::path::Path;

use serde::Serialize;

use crate::Result;
use crate::fsio;
use crate::migrator::GcSummary;
use crate::outcome::MigrationResult;
use crate::plan::{ActionKind, Plan};

use super::Ctx;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Serialize `value` to `path` atomically, with a trailing newline.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    fsio::atomic_write(path, &bytes)?;
    Ok(())
}

pub(crate) fn plan_summary(ctx: &Ctx, plan: &Plan, out: &Path) -> Result<()> {
    if ctx.json {
        return print_json(plan);
    }
    if ctx.quiet {
        return Ok(());
    }

    println!(
        "planned {} actions against target {}",
        plan.actions.len(),
        plan.header.target
    );
    for (label, kind) in [
        ("skip", ActionKind::Skip),
        ("upgrade", ActionKind::StandardUpgrade),
        ("downgrade", ActionKind::StandardDowngrade),
        ("merge", ActionKind::ThreeWayMerge),
        ("quarantine", ActionKind::Quarantine),
    ] {
        let count = plan.count_of(kind);
        if count > 0 {
            println!("  {label}: {count}");
        }
    }
    println!("plan written to {}", out.display());
    Ok(())
}

pub(crate) fn result_summary(ctx: &Ctx, result: &MigrationResult, out: &Path) -> Result<()> {
    if ctx.json {
        return print_json(result);
    }
    if ctx.quiet {
        return Ok(());
    }

    let summary = &result.summary;
    println!(
        "{}: {} processed, {} succeeded, {} failed, {} skipped ({} ms)",
        summary.status,
        summary.processed,
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.duration_ms
    );
    for failure in &result.failures {
        println!(
            "  failed {}: {:?}: {}",
            failure.identifier, failure.record.reason, failure.record.details
        );
    }
    println!("result written to {}", out.display());
    Ok(())
}

pub(crate) fn gc_summary(ctx: &Ctx, summary: &GcSummary) -> Result<()> {
    if ctx.json {
        let payload = serde_json::json!({
            "documents": summary.documents.len(),
            "deleted": summary.deleted(),
            "kept": summary.kept(),
            "unverifiable": summary.unverifiable(),
        });
        return print_json(&payload);
    }
    if ctx.quiet {
        return Ok(());
    }

    println!(
        "gc: {} snapshots deleted, {} kept, {} unverifiable across {} documents",
        summary.deleted(),
        summary.kept(),
        summary.unverifiable(),
        summary.documents.len()
    );
    for (path, report) in &summary.documents {
        for (snapshot, reason) in &report.unverifiable {
            println!(
                "  unverifiable {} (of {}): {reason}",
                snapshot.display(),
                path.display()
            );
        }
    }
    Ok(())
}
