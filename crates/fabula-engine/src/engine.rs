//! The command orchestrator.
//!
//! `GameEngine` owns the world and the game state, serializes every entry
//! point (player command, combat action, trade action, timer tick), and
//! routes all resulting events through the bus into the script
//! interpreter. One command is fully resolved — including every cascading
//! script dispatch — before the next is accepted.

use rand::SeedableRng;
use rand::rngs::StdRng;

use fabula_core::state::ObjectLocation;
use fabula_core::{
    Command, ConsumableEffect, EquipSlot, GameEvent, GameState, NounRef, NpcId, ObjectId,
    ObjectKind, Resolution, Session, SideEffectRequest, Verb, World,
};
use fabula_mechanics::combat::{self, AttackKind, PlayerAction};
use fabula_mechanics::trade;
use fabula_mechanics::MechanicsError;
use fabula_core::{CombatLogEntry, CombatantRef};
use fabula_parser::{ParseFailure, is_visible, parse};
use fabula_script::Interpreter;

use crate::bus;
use crate::config::EngineConfig;
use crate::describe;
use crate::narration::Narration;
use crate::turn;
use crate::views::{self, InventoryEntry, QuestView, StatsView};

/// The simulation facade the host talks to.
pub struct GameEngine {
    world: World,
    state: GameState,
    interpreter: Interpreter,
    rng: StdRng,
    config: EngineConfig,
}

impl GameEngine {
    /// Start a new playthrough of a world.
    pub fn new(world: World, config: EngineConfig) -> Self {
        let state = GameState::new_game(&world);
        Self::resume(world, state, config)
    }

    /// Resume a playthrough from a restored state snapshot.
    ///
    /// The engine keeps no transient state of its own beyond the random
    /// source, so a freshly deserialized `GameState` picks up exactly
    /// where it left off.
    pub fn resume(world: World, state: GameState, config: EngineConfig) -> Self {
        Self {
            interpreter: Interpreter::new(config.max_cascade_depth),
            rng: StdRng::seed_from_u64(config.seed),
            world,
            state,
            config,
        }
    }

    /// The authored world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The current game state (read-only; the engine is the sole mutator).
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Extract the state for the external save system.
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// The inventory panel.
    pub fn inventory_view(&self) -> Vec<InventoryEntry> {
        views::inventory(&self.world, &self.state)
    }

    /// The stats panel.
    pub fn stats_view(&self) -> StatsView {
        views::stats(&self.world, &self.state)
    }

    /// The quest log.
    pub fn quest_log(&self) -> Vec<QuestView> {
        views::quest_log(&self.world, &self.state)
    }

    /// An opening description of the starting room.
    pub fn opening(&self) -> Narration {
        let mut narration = Narration::new();
        for line in describe::room_lines(&self.world, &self.state) {
            narration.push(line);
        }
        narration
    }

    /// Resolve one line of player input.
    ///
    /// Parse failures are returned to the caller with the state untouched;
    /// every other rejection (acting out of turn, buying beyond the purse)
    /// comes back as a narration line, also with the state untouched.
    pub fn apply_command(&mut self, input: &str) -> Result<Narration, ParseFailure> {
        let command = parse(input, &self.world, &self.state)?;

        // The parser resolved the phrase; remember it for "it"/"lo".
        if let Some(referent) = command.direct_ref().or_else(|| command.indirect_ref())
            && matches!(referent, NounRef::Object(_) | NounRef::Npc(_))
        {
            self.state.last_referent = Some(referent.clone());
        }

        let mut narration = Narration::new();
        let events = self.execute(&command, &mut narration);
        bus::run(
            &self.world,
            &mut self.state,
            &self.interpreter,
            &mut self.rng,
            &mut narration,
            events,
            Vec::new(),
        );

        if narration.is_empty() {
            narration.push("Nothing happens.");
        }
        Ok(narration)
    }

    /// Advance game time by one tick (the external clock's entry point).
    pub fn advance_turn(&mut self) -> Narration {
        turn::advance(
            &self.world,
            &mut self.state,
            &self.interpreter,
            &mut self.rng,
            &self.config,
        )
    }

    // -----------------------------------------------------------------------
    // Command dispatch
    // -----------------------------------------------------------------------

    fn execute(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        if combat::in_combat(&self.state) && !allowed_in_combat(command.verb) {
            narration.push("No time for that — you are in a fight!");
            return Vec::new();
        }

        match command.verb {
            Verb::Go => self.do_go(command, narration),
            Verb::Look => self.do_look(command, narration),
            Verb::Inventory => self.do_inventory(narration),
            Verb::Take => self.do_take(command, narration),
            Verb::Drop => self.do_drop(command, narration),
            Verb::Use => self.do_use(command, narration),
            Verb::Combine => self.do_combine(command, narration),
            Verb::Open => self.do_open(command, narration),
            Verb::Close => self.do_close(command, narration),
            Verb::Lock => self.do_lock(command, narration),
            Verb::Unlock => self.do_unlock(command, narration),
            Verb::Equip => self.do_equip(command, narration),
            Verb::Unequip => self.do_unequip(command, narration),
            Verb::Attack => self.do_attack(command, AttackKind::Physical, narration),
            Verb::Cast => self.do_attack(command, AttackKind::Magic, narration),
            Verb::Defend => self.do_combat_stance(PlayerAction::Defend, narration),
            Verb::Flee => self.do_combat_stance(PlayerAction::Flee, narration),
            Verb::Eat | Verb::Drink => self.do_consume(command, narration),
            Verb::Light => self.do_light(command, narration),
            Verb::Extinguish => self.do_extinguish(command, narration),
            Verb::Talk => self.do_talk(command, narration),
            Verb::Say => self.do_say(command, narration),
            Verb::Buy => self.do_buy(command, narration),
            Verb::Sell => self.do_sell(command, narration),
            Verb::Save => {
                narration.effects.push(SideEffectRequest::RequestSave);
                narration.push("Game save requested.");
                Vec::new()
            }
            Verb::Load => {
                narration.effects.push(SideEffectRequest::RequestLoad);
                narration.push("Load requested.");
                Vec::new()
            }
            Verb::Help => {
                self.do_help(narration);
                Vec::new()
            }
            Verb::Quests => {
                self.do_quests(narration);
                Vec::new()
            }
            Verb::Wait => {
                narration.push("Time passes.");
                let ticked = self.advance_turn();
                narration.merge(ticked);
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Movement and looking
    // -----------------------------------------------------------------------

    fn do_go(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(direction) = command.direction else {
            narration.push("You can't go that way.");
            return Vec::new();
        };
        let Some(room) = self.world.room(&self.state.current_room) else {
            narration.push("You are nowhere at all.");
            return Vec::new();
        };
        let Some(exit) = room.exit(direction) else {
            narration.push(format!("You can't go {direction} from here."));
            return Vec::new();
        };
        let destination = exit.to.clone();
        let door = exit.door.clone();

        let mut events = Vec::new();
        if let Some(door_id) = door
            && let Some(door_state) = self.state.door_state(&door_id)
            && !door_state.open
        {
            let name = self.world.door_name(&door_id).to_string();
            if door_state.locked {
                narration.push(format!("The {name} is locked."));
                return events;
            }
            if let Some(ds) = self.state.door_state_mut(&door_id) {
                ds.open = true;
            }
            narration.push(format!("(first opening the {name})"));
            events.push(GameEvent::DoorOpened { door: door_id });
        }

        // Walking out of a shop ends the session.
        events.extend(trade::close_trade(&mut self.state));

        events.push(GameEvent::RoomExited {
            room: self.state.current_room.clone(),
        });
        self.state.current_room = destination.clone();
        self.state.last_referent = None;
        for line in describe::room_lines(&self.world, &self.state) {
            narration.push(line);
        }
        narration.effects.push(SideEffectRequest::UpdateMap);
        events.push(GameEvent::RoomEntered { room: destination });
        events
    }

    fn do_look(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let target = command.direct.as_ref().or(command.indirect.as_ref());
        let Some(phrase) = target else {
            for line in describe::room_lines(&self.world, &self.state) {
                narration.push(line);
            }
            return Vec::new();
        };

        match &phrase.resolution {
            Resolution::Literal => {
                narration.push(format!("You see no {} here.", phrase.text));
            }
            Resolution::Resolved(referent) => {
                if !is_visible(&self.world, &self.state, referent) {
                    narration.push("You don't see that here.");
                    return Vec::new();
                }
                self.describe_target(referent, narration);
            }
        }
        Vec::new()
    }

    fn describe_target(&self, referent: &NounRef, narration: &mut Narration) {
        match referent {
            NounRef::Object(id) => {
                let Some(object) = self.world.object(id) else {
                    narration.push("You don't see that here.");
                    return;
                };
                if object.description.is_empty() {
                    narration.push(format!("You see nothing special about the {}.", object.name));
                } else {
                    narration.push(object.description.clone());
                }
                if self.state.lit.contains(id) {
                    narration.push("It is burning steadily.".to_string());
                }
                if object.kind == ObjectKind::Container {
                    let contents = self.state.objects_in_container(id);
                    if contents.is_empty() {
                        narration.push(format!("The {} is empty.", object.name));
                    } else {
                        narration.push(format!("The {} contains:", object.name));
                        for inner in contents {
                            narration.push(format!("  {}", self.world.object_name(&inner)));
                        }
                    }
                }
            }
            NounRef::Npc(id) => {
                let Some(npc) = self.world.npc(id) else {
                    narration.push("You don't see that here.");
                    return;
                };
                if npc.description.is_empty() {
                    narration.push(format!("It's {}.", npc.name));
                } else {
                    narration.push(npc.description.clone());
                }
                if let Some(ns) = self.state.npc_state(id)
                    && !ns.alive
                {
                    narration.push(format!("{} is dead.", npc.name));
                    let loot = self.state.objects_on_npc(id);
                    for object in loot {
                        narration.push(format!(
                            "The corpse still holds {}.",
                            self.world.object_name(&object)
                        ));
                    }
                }
            }
            NounRef::Door(id) => {
                let name = self.world.door_name(id);
                match self.state.door_state(id) {
                    Some(ds) if ds.open => narration.push(format!("The {name} stands open.")),
                    Some(ds) if ds.locked => narration.push(format!("The {name} is locked.")),
                    Some(_) => narration.push(format!("The {name} is closed.")),
                    None => narration.push(format!("It's the {name}.")),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    fn do_inventory(&self, narration: &mut Narration) -> Vec<GameEvent> {
        let entries = views::inventory(&self.world, &self.state);
        if entries.is_empty() {
            narration.push("You are carrying nothing.");
            return Vec::new();
        }
        narration.push("You are carrying:");
        for entry in entries {
            let mut line = format!("  {}", entry.name);
            if entry.equipped {
                line.push_str(" (equipped)");
            }
            if entry.lit {
                line.push_str(" (burning)");
            }
            narration.push(line);
        }
        Vec::new()
    }

    fn do_take(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        if !is_visible(&self.world, &self.state, &NounRef::Object(object.clone())) {
            narration.push("You don't see that here.");
            return Vec::new();
        }
        match self.state.object_location(&object) {
            ObjectLocation::Inventory => {
                narration.push("You already have it.");
                Vec::new()
            }
            ObjectLocation::Nowhere => {
                // Visible but placed nowhere: shop stock.
                narration.push("You'll have to buy that.");
                Vec::new()
            }
            _ => {
                let name = self.world.object_name(&object).to_string();
                if !self.world.object(&object).is_some_and(|o| o.portable) {
                    narration.push(format!("The {name} won't budge."));
                    return Vec::new();
                }
                self.state.move_object(&object, ObjectLocation::Inventory);
                narration.push(format!("You take the {name}."));
                vec![GameEvent::ItemTaken { object }]
            }
        }
    }

    fn do_drop(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        if !self.state.in_inventory(&object) {
            narration.push("You don't have that.");
            return Vec::new();
        }
        let name = self.world.object_name(&object).to_string();
        self.state
            .move_object(&object, ObjectLocation::Room(self.state.current_room.clone()));
        narration.push(format!("You drop the {name}."));
        vec![GameEvent::ItemDropped { object }]
    }

    // -----------------------------------------------------------------------
    // Using and combining
    // -----------------------------------------------------------------------

    fn do_use(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        if !is_visible(&self.world, &self.state, &NounRef::Object(object.clone())) {
            narration.push("You don't see that here.");
            return Vec::new();
        }

        // "use key on door" is an unlock attempt.
        if let Some(NounRef::Door(door)) = command.indirect_ref() {
            return self.use_key_on_door(&object, &door.clone(), narration);
        }

        // Using a carried consumable consumes it.
        if self.state.in_inventory(&object)
            && matches!(
                self.world.object(&object).map(|o| &o.kind),
                Some(ObjectKind::Consumable { .. })
            )
        {
            if combat::in_combat(&self.state) {
                return self.combat_action(PlayerAction::UseItem { object }, narration);
            }
            return self.consume(&object, narration);
        }

        let target = match command.indirect_ref() {
            Some(NounRef::Object(target)) => Some(target.clone()),
            _ => None,
        };
        // No default narration: authored graphs supply the outcome, and
        // the orchestrator falls back if nothing answers.
        vec![GameEvent::ItemUsed { object, target }]
    }

    fn use_key_on_door(
        &mut self,
        object: &ObjectId,
        door_id: &fabula_core::DoorId,
        narration: &mut Narration,
    ) -> Vec<GameEvent> {
        let name = self.world.door_name(door_id).to_string();
        let Some(door) = self.world.door(door_id) else {
            narration.push("You don't see that here.");
            return Vec::new();
        };
        let Some(door_state) = self.state.door_state(door_id) else {
            narration.push("You don't see that here.");
            return Vec::new();
        };
        if !door_state.locked {
            narration.push(format!("The {name} isn't locked."));
            return Vec::new();
        }
        if door.key.as_ref() != Some(object) || !self.state.in_inventory(object) {
            narration.push("It doesn't fit.");
            return Vec::new();
        }
        if let Some(ds) = self.state.door_state_mut(door_id) {
            ds.locked = false;
        }
        narration.push(format!("You unlock the {name}."));
        vec![GameEvent::DoorUnlocked {
            door: door_id.clone(),
        }]
    }

    fn do_combine(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let first = match command.direct_ref() {
            Some(NounRef::Object(id)) => id.clone(),
            _ => {
                narration.push("Combine what?");
                return Vec::new();
            }
        };
        let second = match command.indirect_ref() {
            Some(NounRef::Object(id)) => id.clone(),
            _ => {
                narration.push("Combine it with what?");
                return Vec::new();
            }
        };
        if !self.state.in_inventory(&first) || !self.state.in_inventory(&second) {
            narration.push("You need both in hand to do that.");
            return Vec::new();
        }
        // Combination recipes live in the script graphs.
        vec![GameEvent::ItemUsed {
            object: first,
            target: Some(second),
        }]
    }

    // -----------------------------------------------------------------------
    // Doors
    // -----------------------------------------------------------------------

    fn resolve_door(&self, command: &Command, narration: &mut Narration) -> Option<fabula_core::DoorId> {
        match command.direct_ref().or_else(|| command.indirect_ref()) {
            Some(NounRef::Door(id)) => {
                let id = id.clone();
                if is_visible(&self.world, &self.state, &NounRef::Door(id.clone())) {
                    Some(id)
                } else {
                    narration.push("You don't see that here.");
                    None
                }
            }
            _ => {
                narration.push("You can't do that to it.");
                None
            }
        }
    }

    fn do_open(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        // Opening a container just reveals what is inside; only doors
        // carry an open/closed state.
        if let Some(NounRef::Object(object)) = command.direct_ref().or_else(|| command.indirect_ref())
            && self
                .world
                .object(object)
                .is_some_and(|o| o.kind == ObjectKind::Container)
        {
            if is_visible(&self.world, &self.state, &NounRef::Object(object.clone())) {
                self.describe_target(&NounRef::Object(object.clone()), narration);
            } else {
                narration.push("You don't see that here.");
            }
            return Vec::new();
        }

        let Some(door) = self.resolve_door(command, narration) else {
            return Vec::new();
        };
        let name = self.world.door_name(&door).to_string();
        match self.state.door_state(&door) {
            Some(ds) if ds.open => {
                narration.push(format!("The {name} is already open."));
                Vec::new()
            }
            Some(ds) if ds.locked => {
                narration.push(format!("The {name} is locked."));
                Vec::new()
            }
            Some(_) => {
                if let Some(ds) = self.state.door_state_mut(&door) {
                    ds.open = true;
                }
                narration.push(format!("You open the {name}."));
                vec![GameEvent::DoorOpened { door }]
            }
            None => {
                narration.push("You don't see that here.");
                Vec::new()
            }
        }
    }

    fn do_close(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(door) = self.resolve_door(command, narration) else {
            return Vec::new();
        };
        let name = self.world.door_name(&door).to_string();
        match self.state.door_state(&door) {
            Some(ds) if !ds.open => {
                narration.push(format!("The {name} is already closed."));
            }
            Some(_) => {
                if let Some(ds) = self.state.door_state_mut(&door) {
                    ds.open = false;
                }
                narration.push(format!("You close the {name}."));
            }
            None => narration.push("You don't see that here."),
        }
        Vec::new()
    }

    fn do_unlock(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(door_id) = self.resolve_door(command, narration) else {
            return Vec::new();
        };
        let name = self.world.door_name(&door_id).to_string();
        let Some(door_state) = self.state.door_state(&door_id) else {
            narration.push("You don't see that here.");
            return Vec::new();
        };
        if !door_state.locked {
            narration.push(format!("The {name} isn't locked."));
            return Vec::new();
        }
        let key = self.world.door(&door_id).and_then(|d| d.key.clone());
        match key {
            Some(key) if self.state.in_inventory(&key) => {
                if let Some(ds) = self.state.door_state_mut(&door_id) {
                    ds.locked = false;
                }
                narration.push(format!("You unlock the {name}."));
                vec![GameEvent::DoorUnlocked { door: door_id }]
            }
            Some(_) => {
                narration.push("You don't have the key.");
                Vec::new()
            }
            None => {
                narration.push(format!("The {name} has no keyhole."));
                Vec::new()
            }
        }
    }

    fn do_lock(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(door_id) = self.resolve_door(command, narration) else {
            return Vec::new();
        };
        let name = self.world.door_name(&door_id).to_string();
        let Some(door_state) = self.state.door_state(&door_id) else {
            narration.push("You don't see that here.");
            return Vec::new();
        };
        if door_state.open {
            narration.push(format!("Close the {name} first."));
            return Vec::new();
        }
        if door_state.locked {
            narration.push(format!("The {name} is already locked."));
            return Vec::new();
        }
        let key = self.world.door(&door_id).and_then(|d| d.key.clone());
        match key {
            Some(key) if self.state.in_inventory(&key) => {
                if let Some(ds) = self.state.door_state_mut(&door_id) {
                    ds.locked = true;
                }
                narration.push(format!("You lock the {name}."));
            }
            Some(_) => narration.push("You don't have the key.".to_string()),
            None => narration.push(format!("The {name} has no keyhole.")),
        }
        Vec::new()
    }

    // -----------------------------------------------------------------------
    // Equipment
    // -----------------------------------------------------------------------

    fn do_equip(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        if !self.state.in_inventory(&object) {
            narration.push("You don't have that.");
            return Vec::new();
        }
        let Some(item) = self.world.object(&object) else {
            narration.push("You don't have that.");
            return Vec::new();
        };
        let Some(slot) = item.equip_slot() else {
            narration.push(format!("You can't equip the {}.", item.name));
            return Vec::new();
        };
        let verb = match slot {
            EquipSlot::Weapon => "wield",
            EquipSlot::Armor => "put on",
            EquipSlot::Shield => "raise",
        };
        let name = item.name.clone();
        if let Some(previous) = self.state.player.equipment.equip(slot, object) {
            narration.push(format!(
                "You set aside the {}.",
                self.world.object_name(&previous)
            ));
        }
        narration.push(format!("You {verb} the {name}."));
        Vec::new()
    }

    fn do_unequip(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        let equipment = &mut self.state.player.equipment;
        let slot = [EquipSlot::Weapon, EquipSlot::Armor, EquipSlot::Shield]
            .into_iter()
            .find(|slot| equipment.in_slot(*slot) == Some(&object));
        match slot {
            Some(slot) => {
                equipment.unequip(slot);
                narration.push(format!(
                    "You put away the {}.",
                    self.world.object_name(&object)
                ));
            }
            None => narration.push("You're not using that."),
        }
        Vec::new()
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    fn do_attack(
        &mut self,
        command: &Command,
        kind: AttackKind,
        narration: &mut Narration,
    ) -> Vec<GameEvent> {
        let target = match command.direct_ref().or_else(|| command.indirect_ref()) {
            Some(NounRef::Npc(id)) => Some(id.clone()),
            Some(_) => {
                narration.push("You can't fight that.");
                return Vec::new();
            }
            None => None,
        };

        if combat::in_combat(&self.state) {
            return self.combat_action(PlayerAction::Attack { kind, target }, narration);
        }

        let Some(npc) = target else {
            narration.push("Attack what?");
            return Vec::new();
        };
        if self
            .state
            .npc_state(&npc)
            .is_none_or(|n| n.room != self.state.current_room)
        {
            narration.push("They are not here.");
            return Vec::new();
        }

        match combat::start_combat(&self.world, &mut self.state, &npc, &mut self.rng) {
            Ok(report) => {
                narration.push(format!(
                    "You square off against {}!",
                    self.world.npc_name(&npc)
                ));
                self.narrate_combat(&report.log, narration);
                let mut events = report.events;
                // Whoever won initiative may already act.
                events.extend(self.run_npc_turns(narration));
                events
            }
            Err(error) => {
                narration.push(rejection_line(&self.world, &error));
                Vec::new()
            }
        }
    }

    fn do_combat_stance(
        &mut self,
        action: PlayerAction,
        narration: &mut Narration,
    ) -> Vec<GameEvent> {
        if !combat::in_combat(&self.state) {
            narration.push("There is no fight here.");
            return Vec::new();
        }
        self.combat_action(action, narration)
    }

    /// Run one player combat action, then let the NPCs answer.
    fn combat_action(&mut self, action: PlayerAction, narration: &mut Narration) -> Vec<GameEvent> {
        match combat::player_action(
            &self.world,
            &mut self.state,
            &action,
            self.config.flee_base_chance,
            &mut self.rng,
        ) {
            Ok(report) => {
                self.narrate_combat(&report.log, narration);
                self.narrate_outcome(&report.events, narration);
                let mut events = report.events;
                events.extend(self.run_npc_turns(narration));
                events
            }
            Err(error) => {
                narration.push(rejection_line(&self.world, &error));
                Vec::new()
            }
        }
    }

    fn run_npc_turns(&mut self, narration: &mut Narration) -> Vec<GameEvent> {
        match combat::npc_turns(&self.world, &mut self.state, &mut self.rng) {
            Ok(report) => {
                self.narrate_combat(&report.log, narration);
                self.narrate_outcome(&report.events, narration);
                report.events
            }
            Err(error) => {
                narration.push(rejection_line(&self.world, &error));
                Vec::new()
            }
        }
    }

    fn narrate_combat(&self, log: &[CombatLogEntry], narration: &mut Narration) {
        for entry in log {
            match entry {
                CombatLogEntry::Initiative { .. } => {}
                CombatLogEntry::Attack {
                    attacker,
                    defender,
                    magic,
                    hit,
                    critical,
                    fumble,
                    blocked,
                    damage,
                    ..
                } => {
                    let player_attacks = matches!(attacker, CombatantRef::Player);
                    let a = self.combatant_name(attacker);
                    let d = self.combatant_name(defender);
                    let line = if *blocked && player_attacks {
                        format!("{d} shrugs off your spell with a flare of warding light.")
                    } else if *blocked {
                        format!("You shrug off {a}'s spell with a flare of warding light.")
                    } else if *fumble && player_attacks {
                        "You fumble badly.".to_string()
                    } else if *fumble {
                        format!("{a} fumbles badly.")
                    } else if player_attacks {
                        match (critical, hit, magic) {
                            (true, _, _) => {
                                format!("A devastating blow! You strike {d} for {damage} damage.")
                            }
                            (_, true, true) => {
                                format!("Your bolt of force sears {d} for {damage} damage.")
                            }
                            (_, true, false) => format!("You hit {d} for {damage} damage."),
                            _ => format!("You miss {d}."),
                        }
                    } else {
                        match (critical, hit, magic) {
                            (true, _, _) => {
                                format!("{a} lands a crushing blow for {damage} damage!")
                            }
                            (_, true, true) => {
                                format!("{a} scorches you with a spell for {damage} damage.")
                            }
                            (_, true, false) => format!("{a} hits you for {damage} damage."),
                            _ => format!("{a} misses you."),
                        }
                    };
                    narration.push(capitalize(&line));
                }
                CombatLogEntry::Defend { who } => {
                    narration.push(capitalize(&format!(
                        "{} takes a defensive stance.",
                        self.combatant_name(who)
                    )));
                }
                CombatLogEntry::FleeAttempt { success, .. } => {
                    if *success {
                        narration.push("You break away and run!");
                    } else {
                        narration.push("You try to flee, but the way is blocked!");
                    }
                }
                CombatLogEntry::ItemUsed { who, object } => {
                    narration.push(capitalize(&format!(
                        "{} uses the {}.",
                        self.combatant_name(who),
                        self.world.object_name(object)
                    )));
                }
            }
        }
    }

    fn narrate_outcome(&self, events: &[GameEvent], narration: &mut Narration) {
        for event in events {
            match event {
                GameEvent::NpcDied { npc } => {
                    narration.push(format!("{} falls dead.", self.world.npc_name(npc)));
                }
                GameEvent::CombatWon { .. } => narration.push("The fight is over. You won."),
                GameEvent::CombatLost => narration.push("Everything goes dark..."),
                _ => {}
            }
        }
    }

    fn combatant_name(&self, who: &CombatantRef) -> String {
        match who {
            CombatantRef::Player => "you".to_string(),
            CombatantRef::Npc(id) => self.world.npc_name(id).to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Consumables and light
    // -----------------------------------------------------------------------

    fn do_consume(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        if combat::in_combat(&self.state) {
            return self.combat_action(PlayerAction::UseItem { object }, narration);
        }
        self.consume(&object, narration)
    }

    fn consume(&mut self, object: &ObjectId, narration: &mut Narration) -> Vec<GameEvent> {
        if !self.state.in_inventory(object) {
            narration.push("You don't have that.");
            return Vec::new();
        }
        let Some(item) = self.world.object(object) else {
            narration.push("You don't have that.");
            return Vec::new();
        };
        let ObjectKind::Consumable { effect } = item.kind.clone() else {
            narration.push(format!("The {} is not fit to swallow.", item.name));
            return Vec::new();
        };
        let name = item.name.clone();

        match effect {
            ConsumableEffect::Heal(amount) => {
                let max = self.state.player.combatant.max_health;
                self.state.player.health = (self.state.player.health + amount).min(max);
                narration.push(format!("You consume the {name}. You feel restored."));
            }
            ConsumableEffect::RestoreMana(amount) => {
                let max = self.state.player.combatant.max_mana;
                self.state.player.mana = (self.state.player.mana + amount).min(max);
                narration.push(format!("You consume the {name}. Power hums in your veins."));
            }
            ConsumableEffect::Satisfy { need, amount } => {
                self.state.player.needs.satisfy(need, amount);
                narration.push(format!("You consume the {name}. That hit the spot."));
            }
        }
        self.state.move_object(object, ObjectLocation::Nowhere);
        vec![GameEvent::ItemUsed {
            object: object.clone(),
            target: None,
        }]
    }

    fn do_light(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        if !is_visible(&self.world, &self.state, &NounRef::Object(object.clone())) {
            narration.push("You don't see that here.");
            return Vec::new();
        }
        let name = self.world.object_name(&object).to_string();
        if !matches!(
            self.world.object(&object).map(|o| &o.kind),
            Some(ObjectKind::LightSource)
        ) {
            narration.push(format!("The {name} won't burn."));
            return Vec::new();
        }
        if !self.state.lit.insert(object) {
            narration.push(format!("The {name} is already lit."));
            return Vec::new();
        }
        narration.push(format!("You light the {name}."));
        // A newly lit room is worth seeing.
        if self.world.room(&self.state.current_room).is_some_and(|r| r.dark) {
            for line in describe::room_lines(&self.world, &self.state) {
                narration.push(line);
            }
        }
        Vec::new()
    }

    fn do_extinguish(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        let name = self.world.object_name(&object).to_string();
        if self.state.lit.remove(&object) {
            narration.push(format!("You put out the {name}."));
        } else {
            narration.push(format!("The {name} isn't lit."));
        }
        Vec::new()
    }

    // -----------------------------------------------------------------------
    // Talking and trading
    // -----------------------------------------------------------------------

    fn do_talk(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let npc = match command.direct_ref().or_else(|| command.indirect_ref()) {
            Some(NounRef::Npc(id)) => id.clone(),
            _ => {
                narration.push("Talk to whom?");
                return Vec::new();
            }
        };
        let Some(ns) = self.state.npc_state(&npc) else {
            narration.push("They are not here.");
            return Vec::new();
        };
        if ns.room != self.state.current_room {
            narration.push("They are not here.");
            return Vec::new();
        }
        if !ns.alive {
            narration.push("The dead don't answer.");
            return Vec::new();
        }
        narration
            .effects
            .push(SideEffectRequest::StartConversation { npc: npc.clone() });
        vec![GameEvent::Conversation { npc }]
    }

    fn do_say(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(phrase) = &command.direct else {
            narration.push("Say what?");
            return Vec::new();
        };
        let words = phrase.text.clone();
        narration.push(format!("\"{words}\", you say."));
        vec![GameEvent::Custom { label: words }]
    }

    fn merchant_here(&self, command: &Command) -> Result<NpcId, String> {
        if let Some(NounRef::Npc(id)) = command.indirect_ref() {
            return Ok(id.clone());
        }
        let merchants: Vec<NpcId> = self
            .state
            .npcs_in_room(&self.state.current_room)
            .into_iter()
            .filter(|id| {
                self.state.npc_state(id).is_some_and(|n| n.alive)
                    && self.world.npc(id).is_some_and(|n| n.merchant.is_some())
            })
            .collect();
        match merchants.as_slice() {
            [only] => Ok(only.clone()),
            [] => Err("There is no one here to trade with.".to_string()),
            _ => Err("Trade with whom?".to_string()),
        }
    }

    fn ensure_trade_open(
        &mut self,
        command: &Command,
        narration: &mut Narration,
    ) -> Option<Vec<GameEvent>> {
        if trade::in_trade(&self.state) {
            return Some(Vec::new());
        }
        let npc = match self.merchant_here(command) {
            Ok(npc) => npc,
            Err(line) => {
                narration.push(line);
                return None;
            }
        };
        match trade::open_trade(&self.world, &mut self.state, &npc) {
            Ok(events) => {
                narration.push(format!(
                    "{} shows you the wares.",
                    self.world.npc_name(&npc)
                ));
                Some(events)
            }
            Err(error) => {
                narration.push(rejection_line(&self.world, &error));
                None
            }
        }
    }

    fn do_buy(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        let Some(mut events) = self.ensure_trade_open(command, narration) else {
            return Vec::new();
        };

        let name = self.world.object_name(&object).to_string();
        match trade::buy(&self.world, &mut self.state, &object) {
            Ok(bought) => {
                let price = self
                    .world
                    .object(&object)
                    .zip(trade_session(&self.state))
                    .map(|(item, session)| trade::sell_price(item, session.sell_multiplier));
                match price {
                    Some(price) => narration.push(format!("You buy the {name} for {price} gold.")),
                    None => narration.push(format!("You buy the {name}.")),
                }
                events.extend(bought);
                events
            }
            Err(MechanicsError::InsufficientFunds { needed, .. }) => {
                narration.push(format!("You can't afford the {name} ({needed} gold)."));
                if let Some(session) = trade_session(&self.state) {
                    events.push(GameEvent::TradeFailed {
                        npc: session.npc.clone(),
                        object,
                    });
                }
                events
            }
            Err(error) => {
                narration.push(rejection_line(&self.world, &error));
                events
            }
        }
    }

    fn do_sell(&mut self, command: &Command, narration: &mut Narration) -> Vec<GameEvent> {
        let Some(object) = self.require_object(command, narration) else {
            return Vec::new();
        };
        let Some(mut events) = self.ensure_trade_open(command, narration) else {
            return Vec::new();
        };

        let name = self.world.object_name(&object).to_string();
        match trade::sell(&self.world, &mut self.state, &object) {
            Ok(sold) => {
                let price = self
                    .world
                    .object(&object)
                    .zip(trade_session(&self.state))
                    .map(|(item, session)| trade::buy_price(item, session.buy_multiplier));
                match price {
                    Some(price) => narration.push(format!("You sell the {name} for {price} gold.")),
                    None => narration.push(format!("You sell the {name}.")),
                }
                events.extend(sold);
                events
            }
            Err(MechanicsError::InsufficientFunds { .. }) => {
                narration.push("The merchant can't afford that.".to_string());
                if let Some(session) = trade_session(&self.state) {
                    events.push(GameEvent::TradeFailed {
                        npc: session.npc.clone(),
                        object,
                    });
                }
                events
            }
            Err(error) => {
                narration.push(rejection_line(&self.world, &error));
                events
            }
        }
    }

    // -----------------------------------------------------------------------
    // Meta commands
    // -----------------------------------------------------------------------

    fn do_help(&self, narration: &mut Narration) {
        narration.push("Commands (English and Spanish forms both work):");
        narration.push("  movement: north, south, east, west, up, down; go <dir>");
        narration.push("  look [target], inventory, take <item>, drop <item>");
        narration.push("  use <item> [on <target>], combine <item> with <item>");
        narration.push("  open/close/lock/unlock <door>, equip/unequip <item>");
        narration.push("  attack <npc>, cast <npc>, defend, flee");
        narration.push("  eat/drink <item>, light/extinguish <item>");
        narration.push("  talk to <npc>, say <word>, buy <item>, sell <item>");
        narration.push("  quests, save, load, wait, help");
    }

    fn do_quests(&self, narration: &mut Narration) {
        let log = views::quest_log(&self.world, &self.state);
        if log.is_empty() {
            narration.push("You have no quests.");
            return;
        }
        narration.push("Your quests:");
        for quest in log {
            let stage = match quest.stage {
                fabula_core::QuestStage::Active => "active",
                fabula_core::QuestStage::Completed => "done",
                fabula_core::QuestStage::NotStarted => "unknown",
            };
            narration.push(format!("  {} ({stage}): {}", quest.name, quest.description));
        }
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    /// The direct (or indirect) object id, narrating the failure cases.
    fn require_object(&self, command: &Command, narration: &mut Narration) -> Option<ObjectId> {
        let phrase = command.direct.as_ref().or(command.indirect.as_ref());
        match phrase {
            None => {
                narration.push(format!("{} what?", capitalize(&command.verb.to_string())));
                None
            }
            Some(phrase) => match &phrase.resolution {
                Resolution::Resolved(NounRef::Object(id)) => Some(id.clone()),
                Resolution::Resolved(_) => {
                    narration.push("You can't do that to it.");
                    None
                }
                Resolution::Literal => {
                    narration.push(format!("You see no {} here.", phrase.text));
                    None
                }
            },
        }
    }
}

/// The open trade session, if any.
fn trade_session(state: &GameState) -> Option<&fabula_core::TradeSession> {
    match &state.session {
        Some(Session::Trade(session)) => Some(session),
        _ => None,
    }
}

/// Verbs that stay available while fighting.
fn allowed_in_combat(verb: Verb) -> bool {
    matches!(
        verb,
        Verb::Attack
            | Verb::Cast
            | Verb::Defend
            | Verb::Flee
            | Verb::Use
            | Verb::Eat
            | Verb::Drink
            | Verb::Look
            | Verb::Inventory
            | Verb::Help
            | Verb::Quests
            | Verb::Save
            | Verb::Load
    )
}

/// Turn a resolver rejection into a narration line. State is unchanged in
/// every one of these cases.
fn rejection_line(world: &World, error: &MechanicsError) -> String {
    match error {
        MechanicsError::CombatAlreadyActive => "You are already fighting!".to_string(),
        MechanicsError::NotInCombat => "There is no fight here.".to_string(),
        MechanicsError::OutOfTurn => "It is not your turn.".to_string(),
        MechanicsError::TradeDuringCombat => "No time to haggle in a fight!".to_string(),
        MechanicsError::NoTradeOpen => "No shop is open.".to_string(),
        MechanicsError::NotAMerchant(npc) => {
            format!("{} has nothing to sell.", world.npc_name(npc))
        }
        MechanicsError::NotACombatant(npc) => {
            format!("You can't fight {}.", world.npc_name(npc))
        }
        MechanicsError::UnknownNpc(_) => "They are not here.".to_string(),
        MechanicsError::NpcDead(npc) => format!("{} is dead.", world.npc_name(npc)),
        MechanicsError::InsufficientFunds { .. } => "Not enough gold.".to_string(),
        MechanicsError::InsufficientMana { .. } => {
            "You don't have the mana for that.".to_string()
        }
        MechanicsError::NotInStock(object) => {
            format!("The {} is not for sale.", world.object_name(object))
        }
        MechanicsError::NotCarried(object) => {
            format!("You don't have the {}.", world.object_name(object))
        }
        MechanicsError::NotConsumable(object) => {
            format!("The {} is not fit to swallow.", world.object_name(object))
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
