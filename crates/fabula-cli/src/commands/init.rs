//! Write a small sample world file.

use std::path::Path;

use colored::Colorize;

use fabula_core::state::ObjectLocation;
use fabula_core::script::{Action, Node, NodeKind, ScriptGraph};
use fabula_core::{
    Combatant, ConsumableEffect, Direction, Door, EventKind, EventScope, Exit, MerchantConfig,
    NeedKind, Npc, NpcMood, Object, ObjectKind, Quest, Room, World, WorldMeta,
};

use super::CommandResult;

/// Build and write the sample world.
pub fn run(path: &Path) -> CommandResult {
    let world = sample_world()?;
    std::fs::write(path, world.to_json()?)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    println!(
        "{} wrote \"{}\" to {}",
        "ok:".green().bold(),
        world.meta.name,
        path.display()
    );
    println!("Try: fabula play {}", path.display());
    Ok(())
}

/// A compact adventure touching every engine feature: a dark cellar, a
/// locked gate, a merchant, a brawler, and a scripted welcome.
fn sample_world() -> Result<World, Box<dyn std::error::Error>> {
    let mut meta = WorldMeta::new("The Wayside Inn");
    meta.description = "A one-room-at-a-time tour of the engine.".to_string();
    meta.authors.push("Fabula".to_string());

    let mut world = World::new(meta, "taproom");

    world.add_room(
        Room::new("taproom", "the Taproom")
            .with_description("Smoke curls over long oak tables.")
            .with_exit(Exit::new(Direction::Down, "cellar"))
            .with_exit(Exit::new(Direction::North, "road").with_door("front-door")),
    )?;
    world.add_room(
        Room::new("cellar", "the Cellar")
            .with_description("Barrels line the walls.")
            .with_darkness()
            .with_exit(Exit::new(Direction::Up, "taproom")),
    )?;
    world.add_room(
        Room::new("road", "the North Road")
            .with_description("Cart ruts stretch toward the hills.")
            .with_exit(Exit::new(Direction::South, "taproom").with_door("front-door")),
    )?;
    world.add_door(Door::new("front-door", "front door").locked_with_key("brass-key"))?;

    world.add_object(
        Object::new("candle", "tallow candle")
            .with_alias("candle")
            .with_kind(ObjectKind::LightSource),
        ObjectLocation::Room("taproom".into()),
    )?;
    world.add_object(
        Object::new("brass-key", "brass key").with_alias("key"),
        ObjectLocation::Room("cellar".into()),
    )?;
    world.add_object(
        Object::new("stew", "bowl of stew")
            .with_alias("stew")
            .with_price(3)
            .with_kind(ObjectKind::Consumable {
                effect: ConsumableEffect::Satisfy {
                    need: NeedKind::Hunger,
                    amount: 0.6,
                },
            }),
        ObjectLocation::Nowhere,
    )?;
    world.add_object(
        Object::new("cudgel", "oak cudgel")
            .with_alias("cudgel")
            .with_price(10)
            .with_kind(ObjectKind::Weapon { damage: 3 }),
        ObjectLocation::Nowhere,
    )?;

    world.add_npc(
        Npc::new("keeper", "innkeeper", "taproom")
            .with_description("She polishes a mug that is already clean.")
            .with_merchant(MerchantConfig {
                stock: vec!["stew".into(), "cudgel".into()],
                ..MerchantConfig::default()
            }),
    )?;
    world.add_npc(
        Npc::new("rat", "cellar rat", "cellar")
            .with_mood(NpcMood::Hostile)
            .with_combatant(Combatant {
                max_health: 4,
                strength: 5,
                base_defense: 5,
                ..Combatant::average()
            }),
    )?;

    world.add_quest(
        Quest::new("vermin", "Vermin in the Cellar")
            .with_description("The innkeeper would pay to see the rat gone."),
    )?;

    world.add_graph(
        ScriptGraph::new("welcome", "welcome")
            .with_node(
                Node::new(
                    "arrive",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Room("taproom".into()),
                    },
                )
                .with_next(vec!["greet".into()]),
            )
            .with_node(Node::new(
                "greet",
                NodeKind::Action(Action::ShowMessage {
                    text: "The innkeeper nods as you come in.".to_string(),
                }),
            )),
    );
    world.add_graph(
        ScriptGraph::new("rat-dead", "rat dead")
            .with_node(
                Node::new(
                    "death",
                    NodeKind::Trigger {
                        event: EventKind::NpcDeath,
                        scope: EventScope::Npc("rat".into()),
                    },
                )
                .with_next(vec!["quest".into()]),
            )
            .with_node(
                Node::new(
                    "quest",
                    NodeKind::Action(Action::CompleteQuest {
                        quest: "vermin".into(),
                    }),
                )
                .with_next(vec!["reward".into()]),
            )
            .with_node(Node::new(
                "reward",
                NodeKind::Action(Action::GiveGold { amount: 10 }),
            )),
    );

    world.set_starting_gold(15);
    Ok(world)
}
