//! The turn-based combat resolver.
//!
//! Combat is a state machine over a `CombatSession` stored in `GameState`:
//! initiative orders the combatants, the player and NPCs alternate turns,
//! and resolution (victory, defeat, flight) destroys the session and
//! writes vitals back to the world state. All randomness flows through the
//! injected `StdRng`.

use rand::rngs::StdRng;

use fabula_core::state::ObjectLocation;
use fabula_core::{
    Combatant, CombatLogEntry, CombatOutcome, CombatPhase, CombatSession, CombatantRef,
    ConsumableEffect, GameEvent, GameState, NpcId, NpcMood, ObjectId, ObjectKind, Session,
    Vitals, World,
};

use crate::dice::{d20, percent};
use crate::error::{MechanicsError, MechanicsResult};
use crate::trade;

/// Damage of an unarmed strike before modifiers.
pub const UNARMED_DAMAGE: i32 = 1;

/// Defense bonus while defending.
pub const DEFEND_BONUS: i32 = 4;

/// Default base chance (percent) that a flee attempt succeeds.
pub const DEFAULT_FLEE_BASE: i32 = 50;

/// How an attack is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    /// A weapon or unarmed strike: d20 + strength modifier.
    Physical,
    /// A spell: d20 + intelligence modifier, blockable by magic defense.
    Magic,
}

/// An action the player can take on their combat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    /// Attack an NPC; without a target, the first standing enemy.
    Attack {
        /// How the attack is delivered.
        kind: AttackKind,
        /// The target, if the player named one.
        target: Option<NpcId>,
    },
    /// Take a defensive stance until the next turn.
    Defend,
    /// Attempt to escape the fight.
    Flee,
    /// Consume an item; this skips the attack but still ends the turn.
    UseItem {
        /// The consumable.
        object: ObjectId,
    },
}

/// What one resolver call did: the domain events to route through the
/// script interpreter, plus the combat-log entries appended during the
/// call (the orchestrator narrates from these — they survive even when
/// the session is destroyed on resolution).
#[derive(Debug, Clone, Default)]
pub struct CombatReport {
    /// Events raised, in order, after the mutations they describe.
    pub events: Vec<GameEvent>,
    /// Log entries recorded during this call.
    pub log: Vec<CombatLogEntry>,
}

/// The d20-independent core of attack resolution.
///
/// A natural 20 always hits and doubles the base damage, whatever the
/// modifiers; a natural 1 always misses, even when the arithmetic total
/// would clear the defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackResolution {
    /// The raw d20 roll.
    pub roll: u32,
    /// Roll plus modifier.
    pub total: i32,
    /// Whether the attack lands.
    pub hit: bool,
    /// Natural 20.
    pub critical: bool,
    /// Natural 1.
    pub fumble: bool,
    /// Damage dealt (0 on a miss).
    pub damage: i32,
}

/// Resolve an attack roll against a defense value.
pub fn resolve_roll(roll: u32, modifier: i32, defense: i32, base_damage: i32) -> AttackResolution {
    let critical = roll == 20;
    let fumble = roll == 1;
    let total = roll as i32 + modifier;
    let hit = critical || (!fumble && total >= defense);
    let damage = if critical {
        base_damage * 2
    } else if hit {
        base_damage
    } else {
        0
    };
    AttackResolution {
        roll,
        total,
        hit,
        critical,
        fumble,
        damage,
    }
}

/// Attempt to block an incoming magic hit with the defender's
/// magic-defense ability.
///
/// The ability triggers only if the defender can pay its mana cost; an
/// underfunded defender skips it and normal defense already applied.
pub fn magic_block(defender: &Combatant, vitals: &mut Vitals) -> bool {
    match &defender.magic_defense {
        Some(ability) if vitals.mana >= ability.mana_cost => {
            vitals.mana -= ability.mana_cost;
            true
        }
        _ => false,
    }
}

/// Start combat against a target NPC.
///
/// Rejects a second combat (`CombatAlreadyActive`). An open trade session
/// is implicitly closed first (its `ShopClosed` event precedes
/// `CombatStarted`). Hostile combat-capable NPCs in the room join the
/// fight. Initiative: 1d20 + dexterity modifier, ties broken by the
/// higher raw roll, then by input order with the player first.
pub fn start_combat(
    world: &World,
    state: &mut GameState,
    target: &NpcId,
    rng: &mut StdRng,
) -> MechanicsResult<CombatReport> {
    if matches!(state.session, Some(Session::Combat(_))) {
        return Err(MechanicsError::CombatAlreadyActive);
    }
    let npc = world
        .npc(target)
        .ok_or_else(|| MechanicsError::UnknownNpc(target.clone()))?;
    let npc_state = state
        .npc_state(target)
        .ok_or_else(|| MechanicsError::UnknownNpc(target.clone()))?;
    if !npc_state.alive {
        return Err(MechanicsError::NpcDead(target.clone()));
    }
    if npc.combatant.is_none() {
        return Err(MechanicsError::NotACombatant(target.clone()));
    }

    let mut events = Vec::new();

    // Trade and combat are mutually exclusive; combat displaces the shop.
    if matches!(state.session, Some(Session::Trade(_))) {
        events.extend(trade::close_trade(state));
    }

    // The target plus every hostile combat-capable NPC in the room.
    let mut foes: Vec<NpcId> = vec![target.clone()];
    for id in state.npcs_in_room(&state.current_room) {
        if id != *target
            && state
                .npc_state(&id)
                .is_some_and(|n| n.alive && n.mood == NpcMood::Hostile)
            && world.npc(&id).is_some_and(|n| n.combatant.is_some())
        {
            foes.push(id);
        }
    }

    if let Some(ns) = state.npc_state_mut(target) {
        ns.mood = NpcMood::Hostile;
    }

    // Roll initiative in input order: player first, then NPCs.
    struct Rolled {
        who: CombatantRef,
        vitals: Vitals,
        roll: u32,
        total: i32,
        index: usize,
    }

    let mut rolled = Vec::new();
    let player_roll = d20(rng);
    rolled.push(Rolled {
        who: CombatantRef::Player,
        vitals: Vitals::new(state.player.health, state.player.mana),
        roll: player_roll,
        total: player_roll as i32 + state.player.combatant.dexterity_mod(),
        index: 0,
    });
    for (i, id) in foes.iter().enumerate() {
        let dex_mod = world
            .npc(id)
            .and_then(|n| n.combatant.as_ref())
            .map_or(0, Combatant::dexterity_mod);
        let (health, mana) = state
            .npc_state(id)
            .map_or((1, 0), |n| (n.health, n.mana));
        let roll = d20(rng);
        rolled.push(Rolled {
            who: CombatantRef::Npc(id.clone()),
            vitals: Vitals::new(health, mana),
            roll,
            total: roll as i32 + dex_mod,
            index: i + 1,
        });
    }

    let mut session = CombatSession {
        order: Vec::new(),
        vitals: Vec::new(),
        turn: 0,
        round: 1,
        phase: CombatPhase::PlayerTurn,
        log: Vec::new(),
    };
    for r in &rolled {
        session.log_entry(CombatLogEntry::Initiative {
            who: r.who.clone(),
            roll: r.roll,
            total: r.total,
        });
    }

    rolled.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then(b.roll.cmp(&a.roll))
            .then(a.index.cmp(&b.index))
    });
    for r in rolled {
        session.order.push(r.who);
        session.vitals.push(r.vitals);
    }
    session.phase = phase_for(session.current());

    let log = session.log.clone();
    state.session = Some(Session::Combat(session));
    events.push(GameEvent::CombatStarted {
        npc: target.clone(),
    });
    Ok(CombatReport { events, log })
}

/// Resolve the player's combat action.
///
/// Rejects actions outside the player's turn (`OutOfTurn`) and with no
/// combat running (`NotInCombat`); rejections leave state unchanged.
pub fn player_action(
    world: &World,
    state: &mut GameState,
    action: &PlayerAction,
    flee_base: i32,
    rng: &mut StdRng,
) -> MechanicsResult<CombatReport> {
    match &state.session {
        Some(Session::Combat(session)) => {
            if session.phase != CombatPhase::PlayerTurn {
                return Err(MechanicsError::OutOfTurn);
            }
        }
        _ => return Err(MechanicsError::NotInCombat),
    }

    let Some(Session::Combat(mut session)) = state.session.take() else {
        return Err(MechanicsError::NotInCombat);
    };
    let log_start = session.log.len();

    match run_player_action(world, state, &mut session, action, flee_base, rng) {
        Ok(events) => {
            let log = session.log[log_start..].to_vec();
            settle(state, session);
            Ok(CombatReport { events, log })
        }
        Err(e) => {
            state.session = Some(Session::Combat(session));
            Err(e)
        }
    }
}

/// Run NPC turns until the player's turn comes around or combat ends.
///
/// A no-op when no combat is active or it is the player's turn.
pub fn npc_turns(
    world: &World,
    state: &mut GameState,
    rng: &mut StdRng,
) -> MechanicsResult<CombatReport> {
    match &state.session {
        Some(Session::Combat(session)) if session.phase == CombatPhase::NpcTurn => {}
        _ => return Ok(CombatReport::default()),
    }
    let Some(Session::Combat(mut session)) = state.session.take() else {
        return Ok(CombatReport::default());
    };
    let log_start = session.log.len();

    let mut events = Vec::new();
    while session.phase == CombatPhase::NpcTurn {
        let CombatantRef::Npc(npc_id) = session.current().clone() else {
            session.phase = CombatPhase::PlayerTurn;
            break;
        };

        let attacker_idx = session.turn;
        let player_idx = session.player_index();
        let stats = world
            .npc(&npc_id)
            .and_then(|n| n.combatant.as_ref())
            .cloned();

        if let Some(stats) = stats {
            // Prefer magic when the mind outclasses the arm and the mana
            // is there; otherwise swing.
            let kind = if stats.intelligence_mod() > stats.strength_mod()
                && session.vitals[attacker_idx].mana >= stats.spell_cost
            {
                AttackKind::Magic
            } else {
                AttackKind::Physical
            };
            perform_attack(
                world,
                state,
                &mut session,
                attacker_idx,
                player_idx,
                kind,
                rng,
                &mut events,
            );
        }

        if session.vitals[player_idx].is_down() {
            session.phase = CombatPhase::Ended(CombatOutcome::Defeat);
            events.push(GameEvent::CombatLost);
            break;
        }

        advance(&mut session);
    }

    let log = session.log[log_start..].to_vec();
    settle(state, session);
    Ok(CombatReport { events, log })
}

/// Whether a combat session is currently active.
pub fn in_combat(state: &GameState) -> bool {
    matches!(state.session, Some(Session::Combat(_)))
}

fn run_player_action(
    world: &World,
    state: &mut GameState,
    session: &mut CombatSession,
    action: &PlayerAction,
    flee_base: i32,
    rng: &mut StdRng,
) -> MechanicsResult<Vec<GameEvent>> {
    let mut events = Vec::new();
    let player_idx = session.player_index();

    match action {
        PlayerAction::Attack { kind, target } => {
            let defender_idx = match target {
                Some(npc) => {
                    let idx = session
                        .npc_index(npc)
                        .ok_or_else(|| MechanicsError::UnknownNpc(npc.clone()))?;
                    if session.vitals[idx].is_down() {
                        return Err(MechanicsError::NpcDead(npc.clone()));
                    }
                    idx
                }
                None => *session
                    .standing_npcs()
                    .first()
                    .ok_or(MechanicsError::NotInCombat)?,
            };

            if *kind == AttackKind::Magic {
                let cost = state.player.combatant.spell_cost;
                let available = session.vitals[player_idx].mana;
                if available < cost {
                    return Err(MechanicsError::InsufficientMana {
                        needed: cost,
                        available,
                    });
                }
            }

            let defender_ref = session.order[defender_idx].clone();
            perform_attack(
                world,
                state,
                session,
                player_idx,
                defender_idx,
                *kind,
                rng,
                &mut events,
            );

            if session.standing_npcs().is_empty() {
                session.phase = CombatPhase::Ended(CombatOutcome::Victory);
                if let CombatantRef::Npc(npc) = defender_ref {
                    events.push(GameEvent::CombatWon { npc });
                }
            } else {
                advance(session);
            }
        }
        PlayerAction::Defend => {
            session.vitals[player_idx].defending = true;
            session.log_entry(CombatLogEntry::Defend {
                who: CombatantRef::Player,
            });
            advance(session);
        }
        PlayerAction::Flee => {
            let player_dex = state.player.combatant.dexterity_mod();
            let best_enemy_dex = session
                .standing_npcs()
                .into_iter()
                .filter_map(|i| match &session.order[i] {
                    CombatantRef::Npc(id) => world
                        .npc(id)
                        .and_then(|n| n.combatant.as_ref())
                        .map(Combatant::dexterity_mod),
                    CombatantRef::Player => None,
                })
                .max()
                .unwrap_or(0);
            let chance = (flee_base + 5 * (player_dex - best_enemy_dex)).clamp(5, 95) as u32;
            let success = percent(chance, rng);
            session.log_entry(CombatLogEntry::FleeAttempt { chance, success });

            if success {
                session.phase = CombatPhase::Ended(CombatOutcome::Fled);
                if let Some(CombatantRef::Npc(npc)) = session
                    .standing_npcs()
                    .first()
                    .map(|i| session.order[*i].clone())
                {
                    events.push(GameEvent::CombatFled { npc });
                }
            } else {
                // A failed escape still costs the turn.
                advance(session);
            }
        }
        PlayerAction::UseItem { object } => {
            if !state.in_inventory(object) {
                return Err(MechanicsError::NotCarried(object.clone()));
            }
            let item = world
                .object(object)
                .ok_or_else(|| MechanicsError::NotCarried(object.clone()))?;
            let ObjectKind::Consumable { effect } = item.kind.clone() else {
                return Err(MechanicsError::NotConsumable(object.clone()));
            };

            match effect {
                ConsumableEffect::Heal(amount) => {
                    let max = state.player.combatant.max_health;
                    let vitals = &mut session.vitals[player_idx];
                    vitals.health = (vitals.health + amount).min(max);
                }
                ConsumableEffect::RestoreMana(amount) => {
                    let max = state.player.combatant.max_mana;
                    let vitals = &mut session.vitals[player_idx];
                    vitals.mana = (vitals.mana + amount).min(max);
                }
                ConsumableEffect::Satisfy { need, amount } => {
                    state.player.needs.satisfy(need, amount);
                }
            }
            state.move_object(object, ObjectLocation::Nowhere);
            session.log_entry(CombatLogEntry::ItemUsed {
                who: CombatantRef::Player,
                object: object.clone(),
            });
            events.push(GameEvent::ItemUsed {
                object: object.clone(),
                target: None,
            });
            advance(session);
        }
    }

    Ok(events)
}

/// Resolve one attack between two combatants in the session.
#[allow(clippy::too_many_arguments)]
fn perform_attack(
    world: &World,
    state: &mut GameState,
    session: &mut CombatSession,
    attacker_idx: usize,
    defender_idx: usize,
    kind: AttackKind,
    rng: &mut StdRng,
    events: &mut Vec<GameEvent>,
) {
    let attacker_ref = session.order[attacker_idx].clone();
    let defender_ref = session.order[defender_idx].clone();
    let Some(attacker) = stats_of(world, state, &attacker_ref) else {
        return;
    };
    let defender = stats_of(world, state, &defender_ref).unwrap_or_else(Combatant::average);

    let (modifier, base_damage) = match kind {
        AttackKind::Physical => (
            attacker.strength_mod(),
            physical_damage(world, state, &attacker_ref, &attacker),
        ),
        AttackKind::Magic => (
            attacker.intelligence_mod(),
            (attacker.spell_power + attacker.intelligence_mod()).max(1),
        ),
    };

    if kind == AttackKind::Magic {
        session.vitals[attacker_idx].mana -= attacker.spell_cost;
    }

    let defense = defense_of(world, state, session, defender_idx);
    let roll = d20(rng);
    let resolution = resolve_roll(roll, modifier, defense, base_damage);

    let mut damage = resolution.damage;
    let mut blocked = false;
    if kind == AttackKind::Magic && resolution.hit {
        blocked = magic_block(&defender, &mut session.vitals[defender_idx]);
        if blocked {
            damage = 0;
        }
    }

    session.vitals[defender_idx].health -= damage;
    session.log_entry(CombatLogEntry::Attack {
        attacker: attacker_ref,
        defender: defender_ref.clone(),
        magic: kind == AttackKind::Magic,
        roll: resolution.roll,
        total: resolution.total,
        defense,
        hit: resolution.hit && !blocked,
        critical: resolution.critical,
        fumble: resolution.fumble,
        blocked,
        damage,
    });

    if session.vitals[defender_idx].is_down()
        && let CombatantRef::Npc(npc) = &defender_ref
    {
        // The fallen NPC becomes a lootable container: its carried objects
        // stay on the corpse and open up to `take`.
        if let Some(ns) = state.npc_state_mut(npc) {
            ns.alive = false;
        }
        events.push(GameEvent::NpcDied { npc: npc.clone() });
    }
}

/// End the turn and hand control to whoever is next.
fn advance(session: &mut CombatSession) {
    session.advance_turn();
    session.phase = phase_for(session.current());
}

fn phase_for(current: &CombatantRef) -> CombatPhase {
    match current {
        CombatantRef::Player => CombatPhase::PlayerTurn,
        CombatantRef::Npc(_) => CombatPhase::NpcTurn,
    }
}

/// Put the session back if still running, or write vitals through and
/// destroy it on resolution.
fn settle(state: &mut GameState, session: CombatSession) {
    if let CombatPhase::Ended(_) = session.phase {
        for (i, who) in session.order.iter().enumerate() {
            let vitals = &session.vitals[i];
            match who {
                CombatantRef::Player => {
                    state.player.health = vitals.health.max(0);
                    state.player.mana = vitals.mana.max(0);
                }
                CombatantRef::Npc(id) => {
                    if let Some(ns) = state.npc_state_mut(id) {
                        ns.health = vitals.health.max(0);
                        ns.mana = vitals.mana.max(0);
                        if vitals.is_down() {
                            ns.alive = false;
                        }
                    }
                }
            }
        }
        state.session = None;
    } else {
        state.session = Some(Session::Combat(session));
    }
}

fn stats_of(world: &World, state: &GameState, who: &CombatantRef) -> Option<Combatant> {
    match who {
        CombatantRef::Player => Some(state.player.combatant.clone()),
        CombatantRef::Npc(id) => world.npc(id).and_then(|n| n.combatant.clone()),
    }
}

/// Physical base damage: best available weapon plus strength modifier,
/// never below 1.
fn physical_damage(
    world: &World,
    state: &GameState,
    who: &CombatantRef,
    stats: &Combatant,
) -> i32 {
    let weapon_damage = match who {
        CombatantRef::Player => state
            .player
            .equipment
            .weapon
            .as_ref()
            .and_then(|id| world.object(id))
            .and_then(|o| match o.kind {
                ObjectKind::Weapon { damage } => Some(damage),
                _ => None,
            })
            .unwrap_or(UNARMED_DAMAGE),
        CombatantRef::Npc(id) => state
            .objects_on_npc(id)
            .iter()
            .filter_map(|obj| world.object(obj))
            .filter_map(|o| match o.kind {
                ObjectKind::Weapon { damage } => Some(damage),
                _ => None,
            })
            .max()
            .unwrap_or(UNARMED_DAMAGE),
    };
    (weapon_damage + stats.strength_mod()).max(1)
}

/// Effective defense: base plus equipment, plus the defend-stance bonus.
fn defense_of(world: &World, state: &GameState, session: &CombatSession, idx: usize) -> i32 {
    let mut defense = match &session.order[idx] {
        CombatantRef::Player => {
            let mut d = state.player.combatant.base_defense;
            for slot in [&state.player.equipment.armor, &state.player.equipment.shield] {
                if let Some(id) = slot
                    && let Some(object) = world.object(id)
                {
                    d += object.defense_bonus();
                }
            }
            d
        }
        CombatantRef::Npc(id) => world
            .npc(id)
            .and_then(|n| n.combatant.as_ref())
            .map_or(10, |c| c.base_defense),
    };
    if session.vitals[idx].defending {
        defense += DEFEND_BONUS;
    }
    defense
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use fabula_core::{MagicDefense, MerchantConfig, Npc, Room, WorldMeta};

    fn brawler(strength: i32, health: i32) -> Combatant {
        Combatant {
            max_health: health,
            strength,
            ..Combatant::average()
        }
    }

    fn arena_world() -> World {
        let mut world = World::new(WorldMeta::new("Arena"), "pit");
        world.add_room(Room::new("pit", "the Pit")).unwrap();
        world
            .add_npc(
                Npc::new("rat", "giant rat", "pit")
                    .with_mood(NpcMood::Hostile)
                    .with_combatant(Combatant {
                        max_health: 3,
                        strength: 4,
                        dexterity: 6,
                        base_defense: 2,
                        ..Combatant::average()
                    }),
            )
            .unwrap();
        world.set_player(brawler(18, 200));
        world
    }

    #[test]
    fn natural_twenty_always_hits_for_double_damage() {
        // Hopeless odds: modifier -5 against defense 40.
        let r = resolve_roll(20, -5, 40, 6);
        assert!(r.hit);
        assert!(r.critical);
        assert_eq!(r.damage, 12);
    }

    #[test]
    fn natural_one_always_misses() {
        // A sure thing arithmetically: 1 + 30 against defense 5.
        let r = resolve_roll(1, 30, 5, 6);
        assert!(!r.hit);
        assert!(r.fumble);
        assert_eq!(r.damage, 0);
    }

    #[test]
    fn ordinary_rolls_compare_against_defense() {
        assert!(resolve_roll(12, 3, 15, 4).hit);
        assert!(!resolve_roll(11, 3, 15, 4).hit);
        assert_eq!(resolve_roll(12, 3, 15, 4).damage, 4);
    }

    #[test]
    fn magic_block_requires_affordable_mana() {
        let defender = Combatant {
            magic_defense: Some(MagicDefense { mana_cost: 8 }),
            ..Combatant::average()
        };

        // Insufficient mana: the ability is skipped and mana untouched.
        let mut vitals = Vitals::new(10, 5);
        assert!(!magic_block(&defender, &mut vitals));
        assert_eq!(vitals.mana, 5);

        // Sufficient mana: blocked, cost paid.
        let mut vitals = Vitals::new(10, 10);
        assert!(magic_block(&defender, &mut vitals));
        assert_eq!(vitals.mana, 2);
    }

    #[test]
    fn starting_a_second_combat_is_rejected() {
        let world = arena_world();
        let mut state = GameState::new_game(&world);
        let mut rng = StdRng::seed_from_u64(1);

        start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();
        let err = start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap_err();
        assert_eq!(err, MechanicsError::CombatAlreadyActive);
    }

    #[test]
    fn initiative_is_deterministic_under_a_seed() {
        let world = arena_world();

        let order = |seed: u64| {
            let mut state = GameState::new_game(&world);
            let mut rng = StdRng::seed_from_u64(seed);
            start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();
            match state.session {
                Some(Session::Combat(s)) => s.order,
                _ => panic!("combat should be active"),
            }
        };

        assert_eq!(order(123), order(123));
        assert_eq!(order(7), order(7));
    }

    #[test]
    fn out_of_turn_action_is_rejected() {
        let world = arena_world();
        let mut state = GameState::new_game(&world);
        let mut rng = StdRng::seed_from_u64(1);
        start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();

        if let Some(Session::Combat(session)) = &mut state.session {
            session.phase = CombatPhase::NpcTurn;
        }
        let err = player_action(
            &world,
            &mut state,
            &PlayerAction::Defend,
            DEFAULT_FLEE_BASE,
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(err, MechanicsError::OutOfTurn);
    }

    #[test]
    fn combat_runs_to_victory_and_leaves_a_corpse() {
        let world = arena_world();
        let mut state = GameState::new_game(&world);
        let mut rng = StdRng::seed_from_u64(11);

        start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();
        let mut all_events = Vec::new();
        for _ in 0..200 {
            if !in_combat(&state) {
                break;
            }
            if let Some(Session::Combat(s)) = &state.session
                && s.phase == CombatPhase::PlayerTurn
            {
                let report = player_action(
                    &world,
                    &mut state,
                    &PlayerAction::Attack {
                        kind: AttackKind::Physical,
                        target: None,
                    },
                    DEFAULT_FLEE_BASE,
                    &mut rng,
                )
                .unwrap();
                all_events.extend(report.events);
            }
            all_events.extend(npc_turns(&world, &mut state, &mut rng).unwrap().events);
        }

        assert!(!in_combat(&state));
        assert!(all_events.iter().any(|e| matches!(e, GameEvent::NpcDied { .. })));
        assert!(all_events.iter().any(|e| matches!(e, GameEvent::CombatWon { .. })));
        assert!(!state.npc_state(&"rat".into()).unwrap().alive);
    }

    #[test]
    fn fleeing_eventually_ends_combat_without_loot() {
        let world = arena_world();
        let mut state = GameState::new_game(&world);
        let mut rng = StdRng::seed_from_u64(3);

        start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();
        let mut fled = false;
        for _ in 0..200 {
            if !in_combat(&state) {
                break;
            }
            if let Some(Session::Combat(s)) = &state.session
                && s.phase == CombatPhase::PlayerTurn
            {
                let report = player_action(
                    &world,
                    &mut state,
                    &PlayerAction::Flee,
                    DEFAULT_FLEE_BASE,
                    &mut rng,
                )
                .unwrap();
                if report.events.iter().any(|e| matches!(e, GameEvent::CombatFled { .. })) {
                    fled = true;
                    break;
                }
            }
            npc_turns(&world, &mut state, &mut rng).unwrap();
        }

        assert!(fled);
        assert!(!in_combat(&state));
        // The rat survived; nothing became lootable.
        assert!(state.npc_state(&"rat".into()).unwrap().alive);
    }

    #[test]
    fn magic_attack_without_mana_is_rejected_and_consumes_nothing() {
        let world = arena_world();
        let mut state = GameState::new_game(&world);
        state.player.mana = 0;
        let mut rng = StdRng::seed_from_u64(1);

        start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();
        let before = state.clone();

        // Force the player's turn so the rejection under test is mana.
        if let Some(Session::Combat(session)) = &mut state.session {
            session.phase = CombatPhase::PlayerTurn;
        }
        let err = player_action(
            &world,
            &mut state,
            &PlayerAction::Attack {
                kind: AttackKind::Magic,
                target: None,
            },
            DEFAULT_FLEE_BASE,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, MechanicsError::InsufficientMana { .. }));

        // State unchanged apart from the forced phase.
        if let (Some(Session::Combat(a)), Some(Session::Combat(b))) =
            (&state.session, &before.session)
        {
            assert_eq!(a.vitals, b.vitals);
            assert_eq!(a.turn, b.turn);
        }
    }

    #[test]
    fn starting_combat_closes_an_open_shop_first() {
        let mut world = arena_world();
        world
            .add_npc(
                Npc::new("pedlar", "pedlar", "pit").with_merchant(MerchantConfig::default()),
            )
            .unwrap();

        let mut state = GameState::new_game(&world);
        let mut rng = StdRng::seed_from_u64(1);
        trade::open_trade(&world, &mut state, &"pedlar".into()).unwrap();
        assert!(matches!(state.session, Some(Session::Trade(_))));

        let report = start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();
        assert!(matches!(state.session, Some(Session::Combat(_))));
        let kinds: Vec<_> = report.events.iter().map(GameEvent::kind).collect();
        let shop_close = kinds
            .iter()
            .position(|k| *k == fabula_core::EventKind::ShopClose)
            .unwrap();
        let combat_start = kinds
            .iter()
            .position(|k| *k == fabula_core::EventKind::CombatStart)
            .unwrap();
        assert!(shop_close < combat_start);
    }

    #[test]
    fn mid_combat_state_round_trips_through_serde() {
        let world = arena_world();
        let mut state = GameState::new_game(&world);
        let mut rng = StdRng::seed_from_u64(42);
        start_combat(&world, &mut state, &"rat".into(), &mut rng).unwrap();

        let json = state.to_json().unwrap();
        let restored = GameState::from_json(&json).unwrap();
        assert_eq!(state, restored);

        let (Some(Session::Combat(a)), Some(Session::Combat(b))) =
            (&state.session, &restored.session)
        else {
            panic!("both states should hold a combat session");
        };
        assert_eq!(a.turn, b.turn);
        assert_eq!(a.vitals, b.vitals);
        assert_eq!(a.order, b.order);
    }
}
