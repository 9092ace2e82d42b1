//! CLI subcommands.

pub mod check;
pub mod init;
pub mod play;

use std::error::Error;
use std::path::Path;

use fabula_core::World;

/// Shared result type for subcommands.
pub type CommandResult = Result<(), Box<dyn Error>>;

/// Load a world file.
pub fn load_world(path: &Path) -> Result<World, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let world = World::from_json(&json)
        .map_err(|e| format!("cannot parse {}: {e}", path.display()))?;
    Ok(world)
}
