//! Room and entity description lines.

use fabula_core::state::ObjectLocation;
use fabula_core::{GameState, World};

/// Whether the player can see: the room is lit, or a burning light source
/// is at hand or in the room.
pub(crate) fn can_see(world: &World, state: &GameState) -> bool {
    let Some(room) = world.room(&state.current_room) else {
        return true;
    };
    if !room.dark {
        return true;
    }
    state.lit.iter().any(|id| {
        matches!(
            state.object_location(id),
            ObjectLocation::Inventory
        ) || state.object_location(id) == ObjectLocation::Room(state.current_room.clone())
    })
}

/// The full `look` description of the current room.
pub(crate) fn room_lines(world: &World, state: &GameState) -> Vec<String> {
    let Some(room) = world.room(&state.current_room) else {
        return vec!["You are nowhere at all.".to_string()];
    };

    if !can_see(world, state) {
        return vec!["It is pitch dark. You cannot see a thing.".to_string()];
    }

    let mut lines = vec![room.name.clone()];
    if !room.description.is_empty() {
        lines.push(room.description.clone());
    }

    for npc_id in state.npcs_in_room(&room.id) {
        let name = world.npc_name(&npc_id);
        match state.npc_state(&npc_id) {
            Some(ns) if ns.alive => lines.push(format!("{name} is here.")),
            Some(_) => lines.push(format!("The corpse of {name} lies here.")),
            None => {}
        }
    }

    for object_id in state.objects_in_room(&room.id) {
        lines.push(format!("You see {} here.", world.object_name(&object_id)));
    }

    let exits: Vec<String> = room.exits.iter().map(|e| e.direction.to_string()).collect();
    if !exits.is_empty() {
        lines.push(format!("Exits: {}.", exits.join(", ")));
    }

    lines
}
