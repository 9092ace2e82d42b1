//! Play a world file in the terminal.

use std::io::{BufRead, Write as _};
use std::path::Path;

use colored::Colorize;

use fabula_core::SideEffectRequest;
use fabula_engine::{EngineConfig, GameEngine, Narration};
use fabula_script::validate_world;

use super::{CommandResult, load_world};

/// Run the interactive session.
pub fn run(path: &Path, seed: u64) -> CommandResult {
    let world = load_world(path)?;

    let errors: Vec<String> = validate_world(&world)
        .into_iter()
        .filter(|i| i.is_error)
        .map(|i| i.to_string())
        .collect();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{}", error.red());
        }
        return Err(format!("{} validation error(s); fix the world first", errors.len()).into());
    }

    println!("{}", world.meta.name.bold());
    if !world.meta.description.is_empty() {
        println!("{}", world.meta.description.dimmed());
    }
    println!();

    let mut engine = GameEngine::new(world, EngineConfig::default().with_seed(seed));
    render(&engine.opening());

    let stdin = std::io::stdin();
    loop {
        print!("{} ", ">".cyan());
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "q" | "exit" | "salir") {
            println!("Farewell.");
            break;
        }

        match engine.apply_command(input) {
            Ok(narration) => render(&narration),
            Err(failure) => println!("{}", failure.to_string().yellow()),
        }
    }

    Ok(())
}

fn render(narration: &Narration) {
    for line in &narration.lines {
        println!("{line}");
    }
    for effect in &narration.effects {
        match effect {
            SideEffectRequest::PlaySound { cue } => {
                println!("{}", format!("[sound: {cue}]").dimmed());
            }
            SideEffectRequest::StartConversation { npc } => {
                println!("{}", format!("[conversation with {npc}]").dimmed());
            }
            SideEffectRequest::UpdateMap => println!("{}", "[map updated]".dimmed()),
            SideEffectRequest::RequestSave => println!("{}", "[save requested]".dimmed()),
            SideEffectRequest::RequestLoad => println!("{}", "[load requested]".dimmed()),
            SideEffectRequest::ShowMessage { .. } | SideEffectRequest::Teleport { .. } => {}
        }
    }
}
