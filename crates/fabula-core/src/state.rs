//! The mutable runtime snapshot of one playthrough.
//!
//! `GameState` is owned exclusively by the orchestrator; every other
//! component receives a reference for the duration of one resolution pass.
//! Everything here serializes, and nothing the core needs survives outside
//! it — a freshly deserialized state resumes cleanly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::dictionary::NounRef;
use crate::flags::FlagValue;
use crate::ids::{DoorId, GraphId, NodeId, NpcId, ObjectId, QuestId, RoomId};
use crate::npc::NpcMood;
use crate::object::EquipSlot;
use crate::quest::QuestStage;
use crate::session::Session;
use crate::world::World;

/// Where an object currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectLocation {
    /// Lying in a room.
    Room(RoomId),
    /// In the player's inventory.
    Inventory,
    /// Carried by an NPC (lootable once the NPC is dead).
    Npc(NpcId),
    /// Inside a container object.
    Container(ObjectId),
    /// Removed from play or not yet introduced.
    Nowhere,
}

/// Runtime state of a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorState {
    /// Whether the door is open.
    pub open: bool,
    /// Whether the door is locked.
    pub locked: bool,
}

/// Runtime state of an NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcState {
    /// The room the NPC is in.
    pub room: RoomId,
    /// Current disposition.
    pub mood: NpcMood,
    /// Whether the NPC is alive.
    pub alive: bool,
    /// Current health (meaningful only for combat-capable NPCs).
    pub health: i32,
    /// Current mana.
    pub mana: i32,
    /// Position within the NPC's patrol route.
    #[serde(default)]
    pub patrol_index: usize,
    /// The NPC's gold, for merchants with a finite purse.
    #[serde(default)]
    pub gold: Option<i64>,
}

/// Basic survival needs, each a 0.0..=1.0 bar where 1.0 is sated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    /// Hunger bar.
    pub hunger: f32,
    /// Thirst bar.
    pub thirst: f32,
    /// Rest bar.
    pub rest: f32,
}

impl Needs {
    /// All needs fully satisfied.
    pub fn full() -> Self {
        Self {
            hunger: 1.0,
            thirst: 1.0,
            rest: 1.0,
        }
    }

    /// Read a need level.
    pub fn get(&self, kind: NeedKind) -> f32 {
        match kind {
            NeedKind::Hunger => self.hunger,
            NeedKind::Thirst => self.thirst,
            NeedKind::Rest => self.rest,
        }
    }

    /// Lower a need, clamping at 0.0.
    pub fn decay(&mut self, kind: NeedKind, amount: f32) {
        let level = self.level_mut(kind);
        *level = (*level - amount).max(0.0);
    }

    /// Raise a need, clamping at 1.0.
    pub fn satisfy(&mut self, kind: NeedKind, amount: f32) {
        let level = self.level_mut(kind);
        *level = (*level + amount).min(1.0);
    }

    fn level_mut(&mut self, kind: NeedKind) -> &mut f32 {
        match kind {
            NeedKind::Hunger => &mut self.hunger,
            NeedKind::Thirst => &mut self.thirst,
            NeedKind::Rest => &mut self.rest,
        }
    }
}

impl Default for Needs {
    fn default() -> Self {
        Self::full()
    }
}

/// The tracked need categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    /// Hunger, restored by eating.
    Hunger,
    /// Thirst, restored by drinking.
    Thirst,
    /// Rest, restored by waiting.
    Rest,
}

impl NeedKind {
    /// All need kinds, in decay order.
    pub const ALL: [Self; 3] = [Self::Hunger, Self::Thirst, Self::Rest];
}

impl fmt::Display for NeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hunger => write!(f, "hunger"),
            Self::Thirst => write!(f, "thirst"),
            Self::Rest => write!(f, "rest"),
        }
    }
}

/// What the player has equipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Main-hand weapon.
    pub weapon: Option<ObjectId>,
    /// Worn armor.
    pub armor: Option<ObjectId>,
    /// Off-hand shield.
    pub shield: Option<ObjectId>,
}

impl Equipment {
    /// The object in a slot.
    pub fn in_slot(&self, slot: EquipSlot) -> Option<&ObjectId> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
            EquipSlot::Shield => self.shield.as_ref(),
        }
    }

    /// Put an object in a slot, returning what was there.
    pub fn equip(&mut self, slot: EquipSlot, object: ObjectId) -> Option<ObjectId> {
        let target = match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
            EquipSlot::Shield => &mut self.shield,
        };
        target.replace(object)
    }

    /// Empty a slot, returning what was there.
    pub fn unequip(&mut self, slot: EquipSlot) -> Option<ObjectId> {
        match slot {
            EquipSlot::Weapon => self.weapon.take(),
            EquipSlot::Armor => self.armor.take(),
            EquipSlot::Shield => self.shield.take(),
        }
    }

    /// Whether the object is equipped in any slot.
    pub fn is_equipped(&self, object: &ObjectId) -> bool {
        [&self.weapon, &self.armor, &self.shield]
            .into_iter()
            .any(|slot| slot.as_ref() == Some(object))
    }
}

/// The player's runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Combat capability (base stats).
    pub combatant: Combatant,
    /// Current health.
    pub health: i32,
    /// Current mana.
    pub mana: i32,
    /// Gold carried.
    pub gold: i64,
    /// Equipped objects.
    pub equipment: Equipment,
    /// Survival needs.
    pub needs: Needs,
}

impl PlayerState {
    /// A fresh player with the given capability, at full vitals.
    pub fn new(combatant: Combatant) -> Self {
        Self {
            health: combatant.max_health,
            mana: combatant.max_mana,
            gold: 0,
            equipment: Equipment::default(),
            needs: Needs::full(),
            combatant,
        }
    }
}

/// Game-time bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    /// Monotonic tick counter; one tick per `advance_turn`.
    pub tick: u64,
    /// In-world minutes that pass per tick.
    pub minutes_per_tick: u32,
    /// Hour of day the playthrough started at.
    pub start_hour: u32,
}

impl GameClock {
    /// A clock starting at 8:00 with ten-minute ticks.
    pub fn new() -> Self {
        Self {
            tick: 0,
            minutes_per_tick: 10,
            start_hour: 8,
        }
    }

    /// Advance by one tick, returning the new tick number.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Current hour of the in-world day (0..24).
    pub fn hour_of_day(&self) -> u32 {
        let minutes = self.tick * u64::from(self.minutes_per_tick);
        ((u64::from(self.start_hour) + minutes / 60) % 24) as u32
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A delayed script continuation pending in game time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedScript {
    /// The graph holding the delay node.
    pub graph: GraphId,
    /// The delay node whose outgoing edges resume.
    pub node: NodeId,
    /// Ticks remaining before resumption.
    pub remaining: u32,
}

/// The complete mutable snapshot of one playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The room the player is in.
    pub current_room: RoomId,
    /// The player.
    pub player: PlayerState,
    /// Author-defined boolean/integer registers.
    pub flags: BTreeMap<String, FlagValue>,
    /// Door runtime states.
    pub doors: BTreeMap<DoorId, DoorState>,
    /// NPC runtime states.
    pub npcs: BTreeMap<NpcId, NpcState>,
    /// Where every object currently is.
    pub locations: BTreeMap<ObjectId, ObjectLocation>,
    /// Quest progress.
    pub quests: BTreeMap<QuestId, QuestStage>,
    /// Light sources currently burning.
    pub lit: BTreeSet<ObjectId>,
    /// The active combat or trade session, if any.
    pub session: Option<Session>,
    /// Delayed script continuations.
    pub pending: Vec<DelayedScript>,
    /// Game-time bookkeeping.
    pub clock: GameClock,
    /// Antecedent for pronoun resolution; cleared on room change.
    pub last_referent: Option<NounRef>,
}

impl GameState {
    /// Build the starting state for a world.
    pub fn new_game(world: &World) -> Self {
        let doors = world
            .doors()
            .map(|d| {
                (
                    d.id.clone(),
                    DoorState {
                        open: d.open,
                        locked: d.locked,
                    },
                )
            })
            .collect();

        let npcs = world
            .npcs()
            .map(|n| {
                let (health, mana) = n
                    .combatant
                    .as_ref()
                    .map_or((1, 0), |c| (c.max_health, c.max_mana));
                (
                    n.id.clone(),
                    NpcState {
                        room: n.room.clone(),
                        mood: n.mood,
                        alive: true,
                        health,
                        mana,
                        patrol_index: 0,
                        gold: n.merchant.as_ref().and_then(|m| m.gold),
                    },
                )
            })
            .collect();

        let mut player = PlayerState::new(world.player_combatant().clone());
        player.gold = world.starting_gold();

        Self {
            current_room: world.start_room().clone(),
            player,
            flags: BTreeMap::new(),
            doors,
            npcs,
            locations: world.placements().clone(),
            quests: BTreeMap::new(),
            lit: BTreeSet::new(),
            session: None,
            pending: Vec::new(),
            clock: GameClock::new(),
            last_referent: None,
        }
    }

    // -----------------------------------------------------------------------
    // Flags and counters
    // -----------------------------------------------------------------------

    /// Set a flag.
    pub fn set_flag(&mut self, key: impl Into<String>, value: FlagValue) {
        self.flags.insert(key.into(), value);
    }

    /// Read a flag.
    pub fn flag(&self, key: &str) -> Option<FlagValue> {
        self.flags.get(key).copied()
    }

    /// Read a flag as a boolean; missing flags are false.
    pub fn flag_bool(&self, key: &str) -> bool {
        self.flag(key).is_some_and(FlagValue::as_bool)
    }

    /// Read a counter; missing counters are 0.
    pub fn counter(&self, key: &str) -> i64 {
        self.flag(key).map_or(0, FlagValue::as_int)
    }

    /// Add a delta to a counter.
    pub fn adjust_counter(&mut self, key: impl Into<String>, delta: i64) {
        let key = key.into();
        let value = self.counter(&key) + delta;
        self.flags.insert(key, FlagValue::Int(value));
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Where an object is; unknown objects are nowhere.
    pub fn object_location(&self, object: &ObjectId) -> ObjectLocation {
        self.locations
            .get(object)
            .cloned()
            .unwrap_or(ObjectLocation::Nowhere)
    }

    /// Move an object. Unequips and extinguishes it when it leaves the
    /// player's hands.
    pub fn move_object(&mut self, object: &ObjectId, to: ObjectLocation) {
        if to != ObjectLocation::Inventory {
            if self.player.equipment.is_equipped(object) {
                let eq = &mut self.player.equipment;
                for slot in [EquipSlot::Weapon, EquipSlot::Armor, EquipSlot::Shield] {
                    if eq.in_slot(slot) == Some(object) {
                        eq.unequip(slot);
                    }
                }
            }
            self.lit.remove(object);
        }
        self.locations.insert(object.clone(), to);
    }

    /// Whether the player carries the object.
    pub fn in_inventory(&self, object: &ObjectId) -> bool {
        self.object_location(object) == ObjectLocation::Inventory
    }

    /// Ids of all carried objects, in stable order.
    pub fn carried(&self) -> Vec<ObjectId> {
        self.locations
            .iter()
            .filter(|(_, loc)| **loc == ObjectLocation::Inventory)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of objects lying in a room, in stable order.
    pub fn objects_in_room(&self, room: &RoomId) -> Vec<ObjectId> {
        self.locations
            .iter()
            .filter(|(_, loc)| matches!(loc, ObjectLocation::Room(r) if r == room))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of objects carried by an NPC, in stable order.
    pub fn objects_on_npc(&self, npc: &NpcId) -> Vec<ObjectId> {
        self.locations
            .iter()
            .filter(|(_, loc)| matches!(loc, ObjectLocation::Npc(n) if n == npc))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of objects inside a container, in stable order.
    pub fn objects_in_container(&self, container: &ObjectId) -> Vec<ObjectId> {
        self.locations
            .iter()
            .filter(|(_, loc)| matches!(loc, ObjectLocation::Container(c) if c == container))
            .map(|(id, _)| id.clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // NPCs, doors, quests
    // -----------------------------------------------------------------------

    /// An NPC's runtime state.
    pub fn npc_state(&self, npc: &NpcId) -> Option<&NpcState> {
        self.npcs.get(npc)
    }

    /// An NPC's runtime state, mutably.
    pub fn npc_state_mut(&mut self, npc: &NpcId) -> Option<&mut NpcState> {
        self.npcs.get_mut(npc)
    }

    /// Ids of NPCs currently in a room, in stable order.
    pub fn npcs_in_room(&self, room: &RoomId) -> Vec<NpcId> {
        self.npcs
            .iter()
            .filter(|(_, s)| &s.room == room)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// A door's runtime state.
    pub fn door_state(&self, door: &DoorId) -> Option<DoorState> {
        self.doors.get(door).copied()
    }

    /// A door's runtime state, mutably.
    pub fn door_state_mut(&mut self, door: &DoorId) -> Option<&mut DoorState> {
        self.doors.get_mut(door)
    }

    /// A quest's stage; unknown quests are not started.
    pub fn quest_stage(&self, quest: &QuestId) -> QuestStage {
        self.quests.get(quest).copied().unwrap_or_default()
    }

    /// Set a quest's stage.
    pub fn set_quest_stage(&mut self, quest: QuestId, stage: QuestStage) {
        self.quests.insert(quest, stage);
    }

    // -----------------------------------------------------------------------
    // Delayed scripts
    // -----------------------------------------------------------------------

    /// Schedule a delayed continuation.
    pub fn schedule_delay(&mut self, graph: GraphId, node: NodeId, ticks: u32) {
        self.pending.push(DelayedScript {
            graph,
            node,
            remaining: ticks,
        });
    }

    // -----------------------------------------------------------------------
    // Save files
    // -----------------------------------------------------------------------

    /// Serialize the state to JSON for the external save system.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a state from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
