//! The immutable authored world: rooms, doors, objects, NPCs, quests,
//! script graphs, and the dictionary.
//!
//! A world loads once per play session and is read-only during play; the
//! authoring tools are the only writers. All cross-references are ids
//! resolved through the lookup tables here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::combatant::Combatant;
use crate::dictionary::{Dictionary, NounRef};
use crate::error::{CoreError, CoreResult};
use crate::ids::{DoorId, GraphId, NpcId, ObjectId, QuestId, RoomId};
use crate::npc::Npc;
use crate::object::Object;
use crate::quest::Quest;
use crate::room::{Door, Room};
use crate::script::ScriptGraph;
use crate::state::ObjectLocation;

/// Metadata about the world itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMeta {
    /// Stable identity assigned by the editor.
    pub id: Uuid,
    /// Title of the adventure.
    pub name: String,
    /// Blurb shown in the player's world picker.
    pub description: String,
    /// Author credits.
    pub authors: Vec<String>,
    /// World-file schema version.
    pub schema_version: u32,
    /// When the world was created.
    pub created_at: DateTime<Utc>,
    /// When the world was last edited.
    pub updated_at: DateTime<Utc>,
}

impl WorldMeta {
    /// Create metadata with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            authors: Vec::new(),
            schema_version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The authored content of one adventure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    /// World metadata.
    pub meta: WorldMeta,
    rooms: BTreeMap<RoomId, Room>,
    doors: BTreeMap<DoorId, Door>,
    objects: BTreeMap<ObjectId, Object>,
    npcs: BTreeMap<NpcId, Npc>,
    quests: BTreeMap<QuestId, Quest>,
    graphs: Vec<ScriptGraph>,
    dictionary: Dictionary,
    placements: BTreeMap<ObjectId, ObjectLocation>,
    start_room: RoomId,
    player: Combatant,
    starting_gold: i64,
}

impl World {
    /// Create an empty world whose playthroughs begin in `start_room`.
    ///
    /// The start room must be added before play; the graph validator
    /// reports it if missing.
    pub fn new(meta: WorldMeta, start_room: impl Into<RoomId>) -> Self {
        Self {
            meta,
            rooms: BTreeMap::new(),
            doors: BTreeMap::new(),
            objects: BTreeMap::new(),
            npcs: BTreeMap::new(),
            quests: BTreeMap::new(),
            graphs: Vec::new(),
            dictionary: Dictionary::bilingual(),
            placements: BTreeMap::new(),
            start_room: start_room.into(),
            player: Combatant::average(),
            starting_gold: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Authoring
    // -----------------------------------------------------------------------

    /// Add a room.
    pub fn add_room(&mut self, room: Room) -> CoreResult<()> {
        if self.rooms.contains_key(&room.id) {
            return Err(CoreError::DuplicateId(room.id.to_string()));
        }
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    /// Add a door. Its name becomes a noun alias.
    pub fn add_door(&mut self, door: Door) -> CoreResult<()> {
        if self.doors.contains_key(&door.id) {
            return Err(CoreError::DuplicateId(door.id.to_string()));
        }
        self.dictionary
            .register_noun(&door.name, NounRef::Door(door.id.clone()));
        self.doors.insert(door.id.clone(), door);
        Ok(())
    }

    /// Add an object at its initial location. Its aliases join the
    /// dictionary's noun table.
    pub fn add_object(&mut self, object: Object, location: ObjectLocation) -> CoreResult<()> {
        if self.objects.contains_key(&object.id) {
            return Err(CoreError::DuplicateId(object.id.to_string()));
        }
        for alias in &object.aliases {
            self.dictionary
                .register_noun(alias, NounRef::Object(object.id.clone()));
        }
        self.placements.insert(object.id.clone(), location);
        self.objects.insert(object.id.clone(), object);
        Ok(())
    }

    /// Add an NPC. Its aliases join the noun table and its carried
    /// objects are placed on it.
    pub fn add_npc(&mut self, npc: Npc) -> CoreResult<()> {
        if self.npcs.contains_key(&npc.id) {
            return Err(CoreError::DuplicateId(npc.id.to_string()));
        }
        for alias in &npc.aliases {
            self.dictionary
                .register_noun(alias, NounRef::Npc(npc.id.clone()));
        }
        for object in &npc.inventory {
            self.placements
                .insert(object.clone(), ObjectLocation::Npc(npc.id.clone()));
        }
        self.npcs.insert(npc.id.clone(), npc);
        Ok(())
    }

    /// Add a quest.
    pub fn add_quest(&mut self, quest: Quest) -> CoreResult<()> {
        if self.quests.contains_key(&quest.id) {
            return Err(CoreError::DuplicateId(quest.id.to_string()));
        }
        self.quests.insert(quest.id.clone(), quest);
        Ok(())
    }

    /// Add a script graph.
    pub fn add_graph(&mut self, graph: ScriptGraph) {
        self.graphs.push(graph);
    }

    /// Set the player's starting capability.
    pub fn set_player(&mut self, combatant: Combatant) {
        self.player = combatant;
    }

    /// Set the player's starting gold.
    pub fn set_starting_gold(&mut self, gold: i64) {
        self.starting_gold = gold;
    }

    /// The dictionary, mutably, for author extensions.
    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// The room playthroughs start in.
    pub fn start_room(&self) -> &RoomId {
        &self.start_room
    }

    /// The player's starting capability.
    pub fn player_combatant(&self) -> &Combatant {
        &self.player
    }

    /// The player's starting gold.
    pub fn starting_gold(&self) -> i64 {
        self.starting_gold
    }

    /// Look up a room.
    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Look up a door.
    pub fn door(&self, id: &DoorId) -> Option<&Door> {
        self.doors.get(id)
    }

    /// Look up an object.
    pub fn object(&self, id: &ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    /// Look up an NPC.
    pub fn npc(&self, id: &NpcId) -> Option<&Npc> {
        self.npcs.get(id)
    }

    /// Look up a quest.
    pub fn quest(&self, id: &QuestId) -> Option<&Quest> {
        self.quests.get(id)
    }

    /// Look up a script graph.
    pub fn graph(&self, id: &GraphId) -> Option<&ScriptGraph> {
        self.graphs.iter().find(|g| &g.id == id)
    }

    /// All rooms, in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// All doors, in id order.
    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.values()
    }

    /// All objects, in id order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    /// All NPCs, in id order.
    pub fn npcs(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }

    /// All quests, in id order.
    pub fn quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests.values()
    }

    /// All script graphs, in author order.
    pub fn graphs(&self) -> &[ScriptGraph] {
        &self.graphs
    }

    /// The dictionary.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Initial object placements.
    pub fn placements(&self) -> &BTreeMap<ObjectId, ObjectLocation> {
        &self.placements
    }

    /// Display name for an object id, falling back to the raw id.
    pub fn object_name<'a>(&'a self, id: &'a ObjectId) -> &'a str {
        self.object(id).map_or(id.as_str(), |o| o.name.as_str())
    }

    /// Display name for an NPC id, falling back to the raw id.
    pub fn npc_name<'a>(&'a self, id: &'a NpcId) -> &'a str {
        self.npc(id).map_or(id.as_str(), |n| n.name.as_str())
    }

    /// Display name for a door id, falling back to the raw id.
    pub fn door_name<'a>(&'a self, id: &'a DoorId) -> &'a str {
        self.door(id).map_or(id.as_str(), |d| d.name.as_str())
    }

    // -----------------------------------------------------------------------
    // World files
    // -----------------------------------------------------------------------

    /// Serialize the world to pretty JSON (the world-file format).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a world from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Exit;

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut world = World::new(WorldMeta::new("Test"), "hall");
        world.add_room(Room::new("hall", "the Hall")).unwrap();
        assert!(matches!(
            world.add_room(Room::new("hall", "another Hall")),
            Err(CoreError::DuplicateId(_))
        ));
    }

    #[test]
    fn adding_an_object_registers_its_aliases() {
        let mut world = World::new(WorldMeta::new("Test"), "hall");
        world.add_room(Room::new("hall", "the Hall")).unwrap();
        world
            .add_object(
                Object::new("torch", "Torch").with_alias("antorcha"),
                ObjectLocation::Room(RoomId::new("hall")),
            )
            .unwrap();

        let refs = world.dictionary().noun("torch");
        assert_eq!(refs, &[NounRef::Object(ObjectId::new("torch"))]);
        assert_eq!(world.dictionary().noun("antorcha").len(), 1);
    }

    #[test]
    fn npc_inventory_is_placed_on_the_npc() {
        let mut world = World::new(WorldMeta::new("Test"), "hall");
        world.add_room(Room::new("hall", "the Hall")).unwrap();
        world
            .add_npc(Npc::new("guard", "Guard", "hall").carrying(vec![ObjectId::new("sword")]))
            .unwrap();
        assert_eq!(
            world.placements().get(&ObjectId::new("sword")),
            Some(&ObjectLocation::Npc(NpcId::new("guard")))
        );
    }

    #[test]
    fn exit_lookup_through_world() {
        let mut world = World::new(WorldMeta::new("Test"), "hall");
        world
            .add_room(
                Room::new("hall", "the Hall")
                    .with_exit(Exit::new(crate::dictionary::Direction::North, "tower")),
            )
            .unwrap();
        world.add_room(Room::new("tower", "the Tower")).unwrap();

        let hall = world.room(&RoomId::new("hall")).unwrap();
        assert!(hall.exit(crate::dictionary::Direction::North).is_some());
    }
}
