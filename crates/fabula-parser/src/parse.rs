//! The command parser: tokens → normalized `Command`.
//!
//! Resolution is scope-aware: a phrase naming several entities picks the
//! one that is visible (current room, inventory, open stock, lootable
//! corpse); two visible matches are ambiguous and bounce back to the
//! orchestrator for disambiguation.

use strsim::jaro_winkler;

use fabula_core::state::ObjectLocation;
use fabula_core::{
    Command, Dictionary, GameState, NounPhrase, NounRef, ObjectId, Preposition, Resolution,
    Session, Verb, World,
};

use crate::error::{ParseFailure, ParseResult};
use crate::lexer::tokenize;

/// Minimum similarity for a "did you mean" verb suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Maximum container nesting considered during visibility checks.
const MAX_CONTAINER_DEPTH: u32 = 4;

/// Parse one line of player input against the world's dictionary.
///
/// The game state supplies visibility for object resolution and the
/// pronoun antecedent; it is not mutated here.
pub fn parse(input: &str, world: &World, state: &GameState) -> ParseResult<Command> {
    let dictionary = world.dictionary();
    let tokens = tokenize(input, dictionary);

    let Some(first) = tokens.first() else {
        return Err(ParseFailure::UnknownVerb {
            input: input.trim().to_string(),
            suggestion: None,
        });
    };

    // A bare direction is movement.
    if let Some(direction) = dictionary.direction(first) {
        return Ok(Command::movement(direction));
    }

    let Some(verb) = dictionary.verb(first) else {
        return Err(ParseFailure::UnknownVerb {
            input: input.trim().to_string(),
            suggestion: suggest_verb(first, dictionary),
        });
    };

    let mut rest: &[String] = &tokens[1..];

    match verb {
        Verb::Go => {
            let Some(target) = rest.first() else {
                return Err(ParseFailure::MissingObject { verb });
            };
            if let Some(direction) = dictionary.direction(target) {
                return Ok(Command::movement(direction));
            }
            let direct = resolve_phrase(rest, verb, world, state)?;
            return Ok(Command {
                direct,
                ..Command::bare(verb)
            });
        }
        Verb::Take => {
            // "pick up the key" — the particle is not a direction here.
            if rest.len() > 1 && rest[0] == "up" {
                rest = &rest[1..];
            }
        }
        Verb::Say => {
            // Spoken words stay literal; they are matched by custom-event
            // triggers, not the noun table.
            if rest.is_empty() {
                return Err(ParseFailure::MissingObject { verb });
            }
            return Ok(Command {
                direct: Some(NounPhrase {
                    text: rest.join(" "),
                    resolution: Resolution::Literal,
                }),
                ..Command::bare(verb)
            });
        }
        _ => {}
    }

    // Split at the first preposition; the indirect phrase runs to the next
    // preposition (a trailing "about ..." topic is left to the scripts).
    let (direct_tokens, preposition, indirect_tokens) = split_on_preposition(rest, dictionary);

    let direct = resolve_phrase(direct_tokens, verb, world, state)?;
    let indirect = resolve_phrase(indirect_tokens, verb, world, state)?;

    if requires_object(verb) && direct.is_none() && indirect.is_none() {
        return Err(ParseFailure::MissingObject { verb });
    }

    Ok(Command {
        verb,
        direction: None,
        direct,
        preposition,
        indirect,
    })
}

/// Split tokens at the first preposition.
fn split_on_preposition<'a>(
    tokens: &'a [String],
    dictionary: &Dictionary,
) -> (&'a [String], Option<Preposition>, &'a [String]) {
    for (i, token) in tokens.iter().enumerate() {
        if let Some(prep) = dictionary.preposition(token) {
            let after = &tokens[i + 1..];
            let end = after
                .iter()
                .position(|t| dictionary.preposition(t).is_some())
                .unwrap_or(after.len());
            return (&tokens[..i], Some(prep), &after[..end]);
        }
    }
    (tokens, None, &[])
}

/// Resolve an object phrase. Empty phrases resolve to nothing.
fn resolve_phrase(
    tokens: &[String],
    verb: Verb,
    world: &World,
    state: &GameState,
) -> ParseResult<Option<NounPhrase>> {
    if tokens.is_empty() {
        return Ok(None);
    }

    let dictionary = world.dictionary();

    // Pronouns resolve to the last referenced entity.
    if tokens.len() == 1 && dictionary.is_pronoun(&tokens[0]) {
        return match &state.last_referent {
            Some(referent) => Ok(Some(NounPhrase {
                text: tokens[0].clone(),
                resolution: Resolution::Resolved(referent.clone()),
            })),
            None => Err(ParseFailure::MissingObject { verb }),
        };
    }

    let phrase = tokens.join(" ");
    let candidates = dictionary.noun(&phrase);

    let visible: Vec<&NounRef> = candidates
        .iter()
        .filter(|r| is_visible(world, state, r))
        .collect();

    let resolution = match visible.as_slice() {
        [only] => Resolution::Resolved((*only).clone()),
        [] => {
            // Nothing in scope: a unique world-wide match still resolves
            // (location checks happen downstream); otherwise the phrase is
            // kept as a literal candidate for authored content.
            match candidates {
                [only] => Resolution::Resolved(only.clone()),
                _ => Resolution::Literal,
            }
        }
        many => {
            return Err(ParseFailure::Ambiguous {
                phrase,
                candidates: many.iter().map(|r| display_name(world, r)).collect(),
            });
        }
    };

    Ok(Some(NounPhrase {
        text: phrase,
        resolution,
    }))
}

/// Whether a referent is in scope for the player right now: in the room,
/// carried, inside a visible container, on a lootable corpse, or offered
/// by the open shop.
pub fn is_visible(world: &World, state: &GameState, referent: &NounRef) -> bool {
    match referent {
        NounRef::Object(id) => object_visible(world, state, id, 0),
        NounRef::Npc(id) => state
            .npc_state(id)
            .is_some_and(|n| n.room == state.current_room),
        NounRef::Door(id) => world.room(&state.current_room).is_some_and(|room| {
            room.exits.iter().any(|e| e.door.as_ref() == Some(id))
        }),
    }
}

fn object_visible(world: &World, state: &GameState, id: &ObjectId, depth: u32) -> bool {
    if depth > MAX_CONTAINER_DEPTH {
        return false;
    }
    match state.object_location(id) {
        ObjectLocation::Inventory => true,
        ObjectLocation::Room(room) => room == state.current_room,
        ObjectLocation::Npc(npc) => {
            // A corpse acts as a lootable container; a living NPC's
            // belongings are out of reach.
            state
                .npc_state(&npc)
                .is_some_and(|n| n.room == state.current_room && !n.alive)
        }
        ObjectLocation::Container(container) => {
            object_visible(world, state, &container, depth + 1)
        }
        ObjectLocation::Nowhere => match &state.session {
            Some(Session::Trade(trade)) => trade.stock.contains(id),
            _ => false,
        },
    }
}

fn display_name(world: &World, referent: &NounRef) -> String {
    match referent {
        NounRef::Object(id) => world.object_name(id).to_string(),
        NounRef::Npc(id) => world.npc_name(id).to_string(),
        NounRef::Door(id) => world.door_name(id).to_string(),
    }
}

fn suggest_verb(token: &str, dictionary: &Dictionary) -> Option<String> {
    dictionary
        .verb_aliases()
        .map(|alias| (alias, jaro_winkler(token, alias)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(alias, _)| alias.to_string())
}

/// Verbs that make no sense without an object.
fn requires_object(verb: Verb) -> bool {
    matches!(
        verb,
        Verb::Take
            | Verb::Drop
            | Verb::Use
            | Verb::Combine
            | Verb::Open
            | Verb::Close
            | Verb::Lock
            | Verb::Unlock
            | Verb::Equip
            | Verb::Unequip
            | Verb::Eat
            | Verb::Drink
            | Verb::Light
            | Verb::Extinguish
            | Verb::Talk
            | Verb::Say
            | Verb::Buy
            | Verb::Sell
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::{
        Direction, GameState, Npc, Object, Room, World, WorldMeta,
    };

    fn test_world() -> World {
        let mut world = World::new(WorldMeta::new("Test"), "cellar");
        world.add_room(Room::new("cellar", "the Cellar")).unwrap();
        world.add_room(Room::new("attic", "the Attic")).unwrap();
        world
            .add_object(
                Object::new("golden-key", "golden key").with_alias("key"),
                ObjectLocation::Room("cellar".into()),
            )
            .unwrap();
        world
            .add_object(
                Object::new("rusty-key", "rusty key").with_alias("key"),
                ObjectLocation::Room("attic".into()),
            )
            .unwrap();
        world
            .add_object(
                Object::new("torch", "torch").with_alias("antorcha"),
                ObjectLocation::Room("cellar".into()),
            )
            .unwrap();
        world
            .add_npc(Npc::new("guard", "town guard", "cellar"))
            .unwrap();
        world
    }

    #[test]
    fn bare_direction_is_movement() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("north", &world, &state).unwrap();
        assert_eq!(cmd.direction, Some(Direction::North));

        let cmd = parse("norte", &world, &state).unwrap();
        assert_eq!(cmd.direction, Some(Direction::North));
    }

    #[test]
    fn unknown_verb_fails_with_suggestion() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let err = parse("tkae key", &world, &state).unwrap_err();
        match err {
            ParseFailure::UnknownVerb { input, .. } => assert_eq!(input, "tkae key"),
            other => panic!("expected UnknownVerb, got {other:?}"),
        }

        let err = parse("atack guard", &world, &state).unwrap_err();
        match err {
            ParseFailure::UnknownVerb { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("attack"));
            }
            other => panic!("expected UnknownVerb, got {other:?}"),
        }
    }

    #[test]
    fn alias_in_scope_resolves_uniquely() {
        let world = test_world();
        let state = GameState::new_game(&world);
        // Only the golden key is in the cellar, so the shared alias is
        // unambiguous here.
        let cmd = parse("take key", &world, &state).unwrap();
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("golden-key")))
        );
    }

    #[test]
    fn two_matches_in_scope_are_ambiguous() {
        let world = test_world();
        let mut state = GameState::new_game(&world);
        // Bring the rusty key into the same room.
        state.move_object(&ObjectId::new("rusty-key"), ObjectLocation::Inventory);

        let err = parse("take key", &world, &state).unwrap_err();
        match err {
            ParseFailure::Ambiguous { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates.contains(&"golden key".to_string()));
                assert!(candidates.contains(&"rusty key".to_string()));
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn spanish_command_with_accents() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("coge la antorcha", &world, &state).unwrap();
        assert_eq!(cmd.verb, Verb::Take);
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("torch")))
        );
    }

    #[test]
    fn preposition_splits_direct_and_indirect() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("use torch on guard", &world, &state).unwrap();
        assert_eq!(cmd.verb, Verb::Use);
        assert_eq!(cmd.preposition, Some(Preposition::On));
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("torch")))
        );
        assert_eq!(cmd.indirect_ref(), Some(&NounRef::Npc("guard".into())));
    }

    #[test]
    fn talk_to_npc() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("talk to guard", &world, &state).unwrap();
        assert_eq!(cmd.verb, Verb::Talk);
        assert!(cmd.direct.is_none());
        assert_eq!(cmd.indirect_ref(), Some(&NounRef::Npc("guard".into())));
    }

    #[test]
    fn pronoun_resolves_to_last_referent() {
        let world = test_world();
        let mut state = GameState::new_game(&world);
        state.last_referent = Some(NounRef::Object(ObjectId::new("torch")));

        let cmd = parse("take it", &world, &state).unwrap();
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("torch")))
        );

        let cmd = parse("coge lo", &world, &state).unwrap();
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("torch")))
        );
    }

    #[test]
    fn pronoun_without_antecedent_fails() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let err = parse("take it", &world, &state).unwrap_err();
        assert!(matches!(err, ParseFailure::MissingObject { verb: Verb::Take }));
    }

    #[test]
    fn unresolved_phrase_stays_literal() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("examine gargoyle", &world, &state).unwrap();
        let phrase = cmd.direct.unwrap();
        assert_eq!(phrase.text, "gargoyle");
        assert_eq!(phrase.resolution, Resolution::Literal);
    }

    #[test]
    fn missing_object_for_object_verbs() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let err = parse("take", &world, &state).unwrap_err();
        assert!(matches!(err, ParseFailure::MissingObject { verb: Verb::Take }));
    }

    #[test]
    fn pick_up_strips_the_particle() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("pick up the torch", &world, &state).unwrap();
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("torch")))
        );
    }

    #[test]
    fn say_keeps_words_literal() {
        let world = test_world();
        let state = GameState::new_game(&world);
        let cmd = parse("say open sesame", &world, &state).unwrap();
        assert_eq!(cmd.verb, Verb::Say);
        let phrase = cmd.direct.unwrap();
        assert_eq!(phrase.text, "open sesame");
        assert_eq!(phrase.resolution, Resolution::Literal);
    }

    #[test]
    fn out_of_scope_unique_match_still_resolves() {
        let world = test_world();
        let state = GameState::new_game(&world);
        // The rusty key is in the attic; "rusty key" is unique world-wide.
        let cmd = parse("take rusty key", &world, &state).unwrap();
        assert_eq!(
            cmd.direct_ref(),
            Some(&NounRef::Object(ObjectId::new("rusty-key")))
        );
    }
}
