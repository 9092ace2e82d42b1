//! Read-only projections over `GameState` for the host's UI panels.

use fabula_core::{GameState, ObjectId, QuestId, QuestStage, RoomId, World};

/// One inventory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// The object.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Whether the object is equipped.
    pub equipped: bool,
    /// Whether the object is a burning light source.
    pub lit: bool,
}

/// The stats panel.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsView {
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Gold carried.
    pub gold: i64,
    /// Hunger bar (0.0..=1.0).
    pub hunger: f32,
    /// Thirst bar (0.0..=1.0).
    pub thirst: f32,
    /// Rest bar (0.0..=1.0).
    pub rest: f32,
    /// Current room.
    pub room: RoomId,
    /// Current room's display name.
    pub room_name: String,
    /// Hour of the in-world day.
    pub hour: u32,
}

/// One quest-log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestView {
    /// The quest.
    pub id: QuestId,
    /// Display name.
    pub name: String,
    /// Log text.
    pub description: String,
    /// Current stage.
    pub stage: QuestStage,
}

/// The inventory panel, in stable order.
pub fn inventory(world: &World, state: &GameState) -> Vec<InventoryEntry> {
    state
        .carried()
        .into_iter()
        .map(|id| InventoryEntry {
            name: world.object_name(&id).to_string(),
            equipped: state.player.equipment.is_equipped(&id),
            lit: state.lit.contains(&id),
            id,
        })
        .collect()
}

/// The stats panel.
pub fn stats(world: &World, state: &GameState) -> StatsView {
    StatsView {
        health: state.player.health,
        max_health: state.player.combatant.max_health,
        mana: state.player.mana,
        max_mana: state.player.combatant.max_mana,
        gold: state.player.gold,
        hunger: state.player.needs.hunger,
        thirst: state.player.needs.thirst,
        rest: state.player.needs.rest,
        room: state.current_room.clone(),
        room_name: world
            .room(&state.current_room)
            .map_or_else(String::new, |r| r.name.clone()),
        hour: state.clock.hour_of_day(),
    }
}

/// The quest log: every quest the player has touched, started first.
pub fn quest_log(world: &World, state: &GameState) -> Vec<QuestView> {
    let mut entries: Vec<QuestView> = world
        .quests()
        .filter_map(|quest| {
            let stage = state.quest_stage(&quest.id);
            (stage != QuestStage::NotStarted).then(|| QuestView {
                id: quest.id.clone(),
                name: quest.name.clone(),
                description: quest.description.clone(),
                stage,
            })
        })
        .collect();
    entries.sort_by_key(|q| q.stage == QuestStage::Completed);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::state::ObjectLocation;
    use fabula_core::{EquipSlot, Object, ObjectKind, Quest, Room, WorldMeta};

    fn view_world() -> World {
        let mut world = World::new(WorldMeta::new("Test"), "hall");
        world.add_room(Room::new("hall", "the Hall")).unwrap();
        world
            .add_object(
                Object::new("sword", "iron sword").with_kind(ObjectKind::Weapon { damage: 4 }),
                ObjectLocation::Inventory,
            )
            .unwrap();
        world
            .add_quest(Quest::new("rescue", "Rescue the miller").with_description("Find her."))
            .unwrap();
        world
    }

    #[test]
    fn inventory_marks_equipped_items() {
        let world = view_world();
        let mut state = GameState::new_game(&world);
        state
            .player
            .equipment
            .equip(EquipSlot::Weapon, "sword".into());

        let entries = inventory(&world, &state);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "iron sword");
        assert!(entries[0].equipped);
    }

    #[test]
    fn quest_log_hides_untouched_quests() {
        let world = view_world();
        let mut state = GameState::new_game(&world);
        assert!(quest_log(&world, &state).is_empty());

        state.set_quest_stage("rescue".into(), QuestStage::Active);
        let log = quest_log(&world, &state);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].stage, QuestStage::Active);
    }

    #[test]
    fn stats_reflect_the_player() {
        let world = view_world();
        let mut state = GameState::new_game(&world);
        state.player.gold = 12;
        let view = stats(&world, &state);
        assert_eq!(view.gold, 12);
        assert_eq!(view.room_name, "the Hall");
        assert_eq!(view.hour, 8);
    }
}
