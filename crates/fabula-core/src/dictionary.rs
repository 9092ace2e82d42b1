//! The per-world dictionary: alias tables the parser resolves against.
//!
//! A dictionary maps surface forms (many-to-one) onto canonical verbs,
//! directions, prepositions, and noun references. Worlds ship with the
//! built-in English and Spanish tables and extend them with their own
//! entity aliases; nothing in the engine is hardcoded per locale.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{DoorId, NpcId, ObjectId};

/// A canonical verb the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    /// Move in a direction.
    Go,
    /// Describe the room or examine a target.
    Look,
    /// List carried objects.
    Inventory,
    /// Pick up an object.
    Take,
    /// Put down a carried object.
    Drop,
    /// Use an object, optionally on a target.
    Use,
    /// Combine two objects.
    Combine,
    /// Open a door or container.
    Open,
    /// Close a door or container.
    Close,
    /// Lock a door.
    Lock,
    /// Unlock a door.
    Unlock,
    /// Equip a weapon, armor, or shield.
    Equip,
    /// Remove an equipped object.
    Unequip,
    /// Attack an NPC (starts or continues combat).
    Attack,
    /// Cast a magic attack.
    Cast,
    /// Take a defensive stance for the turn.
    Defend,
    /// Attempt to escape combat.
    Flee,
    /// Eat a consumable.
    Eat,
    /// Drink a consumable.
    Drink,
    /// Light a light source.
    Light,
    /// Extinguish a light source.
    Extinguish,
    /// Talk to an NPC.
    Talk,
    /// Speak a word or phrase aloud.
    Say,
    /// Buy an object from a merchant.
    Buy,
    /// Sell an object to a merchant.
    Sell,
    /// Ask the host to save the game.
    Save,
    /// Ask the host to load a save.
    Load,
    /// Show command help.
    Help,
    /// Show the quest log.
    Quests,
    /// Let a turn pass.
    Wait,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Go => "go",
            Self::Look => "look",
            Self::Inventory => "inventory",
            Self::Take => "take",
            Self::Drop => "drop",
            Self::Use => "use",
            Self::Combine => "combine",
            Self::Open => "open",
            Self::Close => "close",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Equip => "equip",
            Self::Unequip => "unequip",
            Self::Attack => "attack",
            Self::Cast => "cast",
            Self::Defend => "defend",
            Self::Flee => "flee",
            Self::Eat => "eat",
            Self::Drink => "drink",
            Self::Light => "light",
            Self::Extinguish => "extinguish",
            Self::Talk => "talk",
            Self::Say => "say",
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Save => "save",
            Self::Load => "load",
            Self::Help => "help",
            Self::Quests => "quests",
            Self::Wait => "wait",
        };
        write!(f, "{name}")
    }
}

/// A direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// North.
    North,
    /// South.
    South,
    /// East.
    East,
    /// West.
    West,
    /// Up.
    Up,
    /// Down.
    Down,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
        };
        write!(f, "{name}")
    }
}

/// A preposition splitting a command into direct and indirect parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preposition {
    /// "with" / "con".
    With,
    /// "on" / "sobre".
    On,
    /// "in" / "en".
    In,
    /// "to" / "a".
    To,
    /// "at".
    At,
    /// "from" / "de".
    From,
    /// "about" / "acerca".
    About,
}

/// A reference to a nameable entity, as stored in the noun table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NounRef {
    /// An object.
    Object(ObjectId),
    /// An NPC.
    Npc(NpcId),
    /// A door.
    Door(DoorId),
}

/// The alias tables for one world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    verbs: HashMap<String, Verb>,
    nouns: HashMap<String, Vec<NounRef>>,
    directions: HashMap<String, Direction>,
    prepositions: HashMap<String, Preposition>,
    pronouns: HashSet<String>,
    stopwords: HashSet<String>,
}

impl Dictionary {
    /// An empty dictionary with no entries at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize a surface form: lowercase and fold acute accents.
    ///
    /// `ñ` is a distinct letter in Spanish and is deliberately not folded.
    pub fn normalize(s: &str) -> String {
        s.to_lowercase()
            .chars()
            .map(|c| match c {
                'á' | 'à' | 'ä' | 'â' => 'a',
                'é' | 'è' | 'ë' | 'ê' => 'e',
                'í' | 'ì' | 'ï' | 'î' => 'i',
                'ó' | 'ò' | 'ö' | 'ô' => 'o',
                'ú' | 'ù' | 'ü' | 'û' => 'u',
                other => other,
            })
            .collect()
    }

    /// The built-in English tables.
    pub fn english() -> Self {
        let mut d = Self::empty();
        for (verb, aliases) in ENGLISH_VERBS {
            for alias in *aliases {
                d.register_verb(alias, *verb);
            }
        }
        for (dir, aliases) in ENGLISH_DIRECTIONS {
            for alias in *aliases {
                d.register_direction(alias, *dir);
            }
        }
        for (prep, aliases) in ENGLISH_PREPOSITIONS {
            for alias in *aliases {
                d.register_preposition(alias, *prep);
            }
        }
        d.register_pronoun("it");
        for word in ["the", "a", "an", "some", "my"] {
            d.register_stopword(word);
        }
        d
    }

    /// The built-in Spanish tables.
    pub fn spanish() -> Self {
        let mut d = Self::empty();
        for (verb, aliases) in SPANISH_VERBS {
            for alias in *aliases {
                d.register_verb(alias, *verb);
            }
        }
        for (dir, aliases) in SPANISH_DIRECTIONS {
            for alias in *aliases {
                d.register_direction(alias, *dir);
            }
        }
        for (prep, aliases) in SPANISH_PREPOSITIONS {
            for alias in *aliases {
                d.register_preposition(alias, *prep);
            }
        }
        d.register_pronoun("lo");
        for word in ["el", "la", "los", "las", "un", "una", "unos", "unas", "al", "del"] {
            d.register_stopword(word);
        }
        d
    }

    /// English and Spanish tables merged.
    pub fn bilingual() -> Self {
        let mut d = Self::english();
        d.merge(Self::spanish());
        d
    }

    /// Merge another dictionary into this one.
    pub fn merge(&mut self, other: Self) {
        self.verbs.extend(other.verbs);
        for (alias, refs) in other.nouns {
            let entry = self.nouns.entry(alias).or_default();
            for r in refs {
                if !entry.contains(&r) {
                    entry.push(r);
                }
            }
        }
        self.directions.extend(other.directions);
        self.prepositions.extend(other.prepositions);
        self.pronouns.extend(other.pronouns);
        self.stopwords.extend(other.stopwords);
    }

    /// Register a verb alias.
    pub fn register_verb(&mut self, alias: &str, verb: Verb) {
        self.verbs.insert(Self::normalize(alias), verb);
    }

    /// Register a noun alias. Aliases are many-to-one: the same surface
    /// form may name several entities, which the parser disambiguates by
    /// scope. Each word of a multi-word alias also matches on its own, so
    /// "town guard" answers to "guard"; stopwords are skipped since they
    /// never survive tokenization.
    pub fn register_noun(&mut self, alias: &str, target: NounRef) {
        let normalized = Self::normalize(alias);
        for word in normalized.split_whitespace() {
            if word != normalized && !self.stopwords.contains(word) {
                self.insert_noun(word.to_string(), target.clone());
            }
        }
        self.insert_noun(normalized, target);
    }

    fn insert_noun(&mut self, key: String, target: NounRef) {
        let entry = self.nouns.entry(key).or_default();
        if !entry.contains(&target) {
            entry.push(target);
        }
    }

    /// Register a direction alias.
    pub fn register_direction(&mut self, alias: &str, direction: Direction) {
        self.directions.insert(Self::normalize(alias), direction);
    }

    /// Register a preposition alias.
    pub fn register_preposition(&mut self, alias: &str, preposition: Preposition) {
        self.prepositions
            .insert(Self::normalize(alias), preposition);
    }

    /// Register a pronoun ("it", "lo").
    pub fn register_pronoun(&mut self, alias: &str) {
        self.pronouns.insert(Self::normalize(alias));
    }

    /// Register a stopword dropped during tokenization.
    pub fn register_stopword(&mut self, alias: &str) {
        self.stopwords.insert(Self::normalize(alias));
    }

    /// Look up a verb by normalized alias.
    pub fn verb(&self, token: &str) -> Option<Verb> {
        self.verbs.get(token).copied()
    }

    /// Look up the noun references for a normalized alias.
    pub fn noun(&self, phrase: &str) -> &[NounRef] {
        self.nouns.get(phrase).map_or(&[], Vec::as_slice)
    }

    /// Look up a direction by normalized alias.
    pub fn direction(&self, token: &str) -> Option<Direction> {
        self.directions.get(token).copied()
    }

    /// Look up a preposition by normalized alias.
    pub fn preposition(&self, token: &str) -> Option<Preposition> {
        self.prepositions.get(token).copied()
    }

    /// Whether the token is a pronoun.
    pub fn is_pronoun(&self, token: &str) -> bool {
        self.pronouns.contains(token)
    }

    /// Whether the token is a stopword.
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// All registered noun aliases, for fuzzy suggestions.
    pub fn noun_aliases(&self) -> impl Iterator<Item = &str> {
        self.nouns.keys().map(String::as_str)
    }

    /// All registered verb aliases, for fuzzy suggestions.
    pub fn verb_aliases(&self) -> impl Iterator<Item = &str> {
        self.verbs.keys().map(String::as_str)
    }
}

const ENGLISH_VERBS: &[(Verb, &[&str])] = &[
    (Verb::Go, &["go", "walk", "move", "head", "travel"]),
    (Verb::Look, &["look", "l", "examine", "x", "inspect"]),
    (Verb::Inventory, &["inventory", "inv", "i", "items"]),
    (Verb::Take, &["take", "get", "grab", "pick"]),
    (Verb::Drop, &["drop", "discard"]),
    (Verb::Use, &["use", "apply", "activate"]),
    (Verb::Combine, &["combine", "mix"]),
    (Verb::Open, &["open"]),
    (Verb::Close, &["close", "shut"]),
    (Verb::Lock, &["lock"]),
    (Verb::Unlock, &["unlock"]),
    (Verb::Equip, &["equip", "wield", "wear", "don"]),
    (Verb::Unequip, &["unequip", "doff"]),
    (Verb::Attack, &["attack", "hit", "fight", "kill", "strike"]),
    (Verb::Cast, &["cast", "zap"]),
    (Verb::Defend, &["defend", "block", "parry"]),
    (Verb::Flee, &["flee", "escape", "retreat"]),
    (Verb::Eat, &["eat"]),
    (Verb::Drink, &["drink", "quaff"]),
    (Verb::Light, &["light", "ignite"]),
    (Verb::Extinguish, &["extinguish", "douse", "snuff"]),
    (Verb::Talk, &["talk", "speak", "chat", "ask"]),
    (Verb::Say, &["say", "shout", "utter"]),
    (Verb::Buy, &["buy", "purchase"]),
    (Verb::Sell, &["sell"]),
    (Verb::Save, &["save"]),
    (Verb::Load, &["load", "restore"]),
    (Verb::Help, &["help", "?", "commands"]),
    (Verb::Quests, &["quests", "quest", "journal"]),
    (Verb::Wait, &["wait", "z"]),
];

const ENGLISH_DIRECTIONS: &[(Direction, &[&str])] = &[
    (Direction::North, &["north", "n"]),
    (Direction::South, &["south", "s"]),
    (Direction::East, &["east", "e"]),
    (Direction::West, &["west", "w"]),
    (Direction::Up, &["up", "u"]),
    (Direction::Down, &["down", "d"]),
];

const ENGLISH_PREPOSITIONS: &[(Preposition, &[&str])] = &[
    (Preposition::With, &["with"]),
    (Preposition::On, &["on", "onto"]),
    (Preposition::In, &["in", "into", "inside"]),
    (Preposition::To, &["to"]),
    (Preposition::At, &["at"]),
    (Preposition::From, &["from"]),
    (Preposition::About, &["about"]),
];

const SPANISH_VERBS: &[(Verb, &[&str])] = &[
    (Verb::Go, &["ir", "ve", "anda", "camina", "avanza"]),
    (Verb::Look, &["mirar", "mira", "m", "examinar", "examina", "observa"]),
    (Verb::Inventory, &["inventario"]),
    (Verb::Take, &["coger", "coge", "tomar", "toma", "agarra", "recoge"]),
    (Verb::Drop, &["soltar", "suelta", "tirar", "tira", "deja"]),
    (Verb::Use, &["usar", "usa", "utiliza"]),
    (Verb::Combine, &["combinar", "combina", "mezcla"]),
    (Verb::Open, &["abrir", "abre"]),
    (Verb::Close, &["cerrar", "cierra"]),
    (Verb::Lock, &["bloquear", "bloquea"]),
    (Verb::Unlock, &["desbloquear", "desbloquea"]),
    (Verb::Equip, &["equipar", "equipa", "viste"]),
    (Verb::Unequip, &["desequipar", "desequipa", "quita"]),
    (Verb::Attack, &["atacar", "ataca", "golpea", "pelea", "mata"]),
    (Verb::Cast, &["lanzar", "lanza", "conjura"]),
    (Verb::Defend, &["defender", "defiende", "para"]),
    (Verb::Flee, &["huir", "huye", "escapa"]),
    (Verb::Eat, &["comer", "come"]),
    (Verb::Drink, &["beber", "bebe"]),
    (Verb::Light, &["encender", "enciende"]),
    (Verb::Extinguish, &["apagar", "apaga"]),
    (Verb::Talk, &["hablar", "habla", "charla", "pregunta"]),
    (Verb::Say, &["decir", "di", "grita"]),
    (Verb::Buy, &["comprar", "compra"]),
    (Verb::Sell, &["vender", "vende"]),
    (Verb::Save, &["guardar", "guarda"]),
    (Verb::Load, &["cargar", "carga"]),
    (Verb::Help, &["ayuda"]),
    (Verb::Quests, &["misiones", "mision", "diario"]),
    (Verb::Wait, &["esperar", "espera"]),
];

const SPANISH_DIRECTIONS: &[(Direction, &[&str])] = &[
    (Direction::North, &["norte"]),
    (Direction::South, &["sur"]),
    (Direction::East, &["este"]),
    (Direction::West, &["oeste", "o"]),
    (Direction::Up, &["arriba", "sube"]),
    (Direction::Down, &["abajo", "baja"]),
];

const SPANISH_PREPOSITIONS: &[(Preposition, &[&str])] = &[
    (Preposition::With, &["con"]),
    (Preposition::On, &["sobre"]),
    (Preposition::In, &["en", "dentro"]),
    (Preposition::To, &["a", "hacia"]),
    (Preposition::From, &["de", "desde"]),
    (Preposition::About, &["acerca"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_accents_but_not_enye() {
        assert_eq!(Dictionary::normalize("Cantó"), "canto");
        assert_eq!(Dictionary::normalize("BAÚL"), "baul");
        assert_eq!(Dictionary::normalize("niño"), "niño");
    }

    #[test]
    fn english_verb_aliases_share_a_canonical_verb() {
        let d = Dictionary::english();
        assert_eq!(d.verb("take"), Some(Verb::Take));
        assert_eq!(d.verb("grab"), Some(Verb::Take));
        assert_eq!(d.verb("get"), Some(Verb::Take));
        assert_eq!(d.verb("dance"), None);
    }

    #[test]
    fn spanish_accented_alias_resolves() {
        let d = Dictionary::spanish();
        // Registration normalizes, so the accented surface form works once
        // the lexer has folded it.
        assert_eq!(d.verb(&Dictionary::normalize("Mirá")), Some(Verb::Look));
        assert_eq!(d.verb("mision"), Some(Verb::Quests));
    }

    #[test]
    fn bilingual_merges_both_tables() {
        let d = Dictionary::bilingual();
        assert_eq!(d.verb("take"), Some(Verb::Take));
        assert_eq!(d.verb("coge"), Some(Verb::Take));
        assert_eq!(d.direction("norte"), Some(Direction::North));
        assert_eq!(d.direction("n"), Some(Direction::North));
        assert!(d.is_pronoun("it"));
        assert!(d.is_pronoun("lo"));
    }

    #[test]
    fn multi_word_aliases_answer_to_each_word() {
        let mut d = Dictionary::english();
        d.register_noun("town guard", NounRef::Npc(NpcId::new("guard")));
        assert_eq!(d.noun("town guard").len(), 1);
        assert_eq!(d.noun("guard").len(), 1);
        assert_eq!(d.noun("town").len(), 1);
        // Stopwords inside an alias are not registered on their own.
        d.register_noun("bust of a king", NounRef::Object(ObjectId::new("bust")));
        assert_eq!(d.noun("bust").len(), 1);
        assert!(d.noun("a").is_empty());
    }

    #[test]
    fn noun_aliases_are_many_to_one() {
        let mut d = Dictionary::empty();
        d.register_noun("key", NounRef::Object(ObjectId::new("golden-key")));
        d.register_noun("key", NounRef::Object(ObjectId::new("rusty-key")));
        d.register_noun("key", NounRef::Object(ObjectId::new("golden-key")));
        assert_eq!(d.noun("key").len(), 2);
        assert!(d.noun("sword").is_empty());
    }

    #[test]
    fn direction_opposites() {
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::Up.opposite(), Direction::Down);
    }
}
