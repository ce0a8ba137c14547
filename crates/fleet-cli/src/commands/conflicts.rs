//! Conflicts command implementation

use std::path::Path;

use colored::Colorize;
use fleet_core::ConflictKind;
use fleet_core::conflict::{detect_async, ensure_clean};

use crate::context::{Context, resolve_root};
use crate::error::Result;

/// Preview merging `source` into `target` in one repository.
pub async fn run_conflicts(
    ctx: &Context,
    repo: &Path,
    source: &str,
    target: &str,
    strict: bool,
) -> Result<()> {
    let repo = resolve_root(repo)?;
    let preview = detect_async(&repo, source, target).await?;
    let report = &preview.report;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else if report.is_clean() {
        let kind = if preview.fast_forward {
            "fast-forward"
        } else {
            "clean merge"
        };
        println!(
            "{} merging {} into {}: {kind}",
            "+".green(),
            source.cyan(),
            target.cyan()
        );
    } else {
        println!(
            "{} merging {} into {}: {} conflicting {} ({})",
            "!".red(),
            source.cyan(),
            target.cyan(),
            report.entries.len(),
            if report.entries.len() == 1 { "file" } else { "files" },
            report.overall_difficulty.to_string().bold()
        );
        for entry in &report.entries {
            let kind = match entry.kind {
                ConflictKind::Content => "content",
                ConflictKind::Delete => "delete",
                ConflictKind::Rename => "rename",
                ConflictKind::Binary => "binary",
            };
            println!("  {} {}", format!("{kind:<8}").yellow(), entry.path);
        }
    }

    if strict {
        ensure_clean(&preview)?;
    }
    Ok(())
}
