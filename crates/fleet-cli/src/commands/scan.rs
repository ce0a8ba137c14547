//! Scan command implementation

use std::path::Path;

use colored::Colorize;

use crate::context::{Context, resolve_root};
use crate::error::Result;

/// List the repositories a bulk command would touch.
pub fn run_scan(ctx: &Context, root: &Path) -> Result<()> {
    let root = resolve_root(root)?;
    let handles = ctx.scan(&root)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&handles)?);
        return Ok(());
    }

    if handles.is_empty() {
        println!("{}", "No repositories found".dimmed());
        return Ok(());
    }
    for handle in &handles {
        if handle.is_submodule {
            println!("  {} {}", handle.relative_path.cyan(), "(submodule)".dimmed());
        } else {
            println!("  {}", handle.relative_path.cyan());
        }
    }
    println!();
    println!("{} repositories under {}", handles.len(), root.display());
    Ok(())
}
