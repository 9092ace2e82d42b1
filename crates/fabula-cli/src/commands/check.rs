//! Validate a world file and report diagnostics.

use std::path::Path;

use colored::Colorize;
use fabula_script::validate_world;

use super::{CommandResult, load_world};

/// Run the check.
pub fn run(path: &Path) -> CommandResult {
    let world = load_world(path)?;
    let issues = validate_world(&world);

    if issues.is_empty() {
        println!(
            "{} {} checks out: no issues.",
            "ok:".green().bold(),
            world.meta.name
        );
        return Ok(());
    }

    let mut errors = 0;
    for issue in &issues {
        // The issue's Display already carries its error/warning level.
        if issue.is_error {
            errors += 1;
            println!("{}", issue.to_string().red());
        } else {
            println!("{}", issue.to_string().yellow());
        }
    }
    println!(
        "{} issue(s): {errors} error(s), {} warning(s)",
        issues.len(),
        issues.len() - errors
    );

    if errors > 0 {
        return Err(format!("{errors} validation error(s)").into());
    }
    Ok(())
}
