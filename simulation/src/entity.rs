//! Entity types
//!
//! Every object in the world is an `Object`: the shared capability data
//! (position, inventory with health, removed flag) plus a `Kind` carrying the
//! per-variant state machine. The variant set is closed.

use serde::Deserialize;
use std::fmt;

use crate::components::{Achievements, ArmorTier, Direction, Inventory, Position};
use crate::config::{GameConfig, MaterialSet};

// ============================================================================
// Identity
// ============================================================================

/// Slot index in the entity table. Slot 0 is the sentinel and never names
/// an entity; slots are never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const SENTINEL: EntityId = EntityId(0);

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Player,
    Cow,
    Pig,
    Sheep,
    Camel,
    Penguin,
    Moose,
    BrownBear,
    PolarBear,
    Zombie,
    Skeleton,
    Raider,
    Arrow,
    Plant,
    Fence,
}

impl Species {
    pub fn name(&self) -> &'static str {
        match self {
            Species::Player => "player",
            Species::Cow => "cow",
            Species::Pig => "pig",
            Species::Sheep => "sheep",
            Species::Camel => "camel",
            Species::Penguin => "penguin",
            Species::Moose => "moose",
            Species::BrownBear => "brown_bear",
            Species::PolarBear => "polar_bear",
            Species::Zombie => "zombie",
            Species::Skeleton => "skeleton",
            Species::Raider => "raider",
            Species::Arrow => "arrow",
            Species::Plant => "plant",
            Species::Fence => "fence",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Object
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Assigned by `SpatialWorld::add`
    pub id: EntityId,
    pub pos: Position,
    pub inventory: Inventory,
    pub removed: bool,
    pub kind: Kind,
}

impl Object {
    pub fn new(pos: Position, inventory: Inventory, kind: Kind) -> Self {
        Self {
            id: EntityId::SENTINEL,
            pos,
            inventory,
            removed: false,
            kind,
        }
    }

    pub fn player(pos: Position, config: &GameConfig) -> Self {
        let inventory = Inventory::from_items(&config.items);
        let player = Player::new(inventory.health(), &config.achievements);
        Self::new(pos, inventory, Kind::Player(player))
    }

    pub fn arrow(pos: Position, facing: Direction) -> Self {
        Self::new(pos, Inventory::with_health(0), Kind::Arrow(Arrow { facing }))
    }

    /// Build a fresh instance of `species` from its rule table entry.
    /// Returns `None` for species that cannot be spawned this way.
    pub fn spawn(species: Species, pos: Position, config: &GameConfig) -> Option<Self> {
        let table = &config.species;
        let (health, kind) = match species {
            Species::Player | Species::Arrow => return None,
            Species::Zombie => (table.zombie.health, Kind::Zombie(Zombie::default())),
            Species::Skeleton => (table.skeleton.health, Kind::Skeleton(Skeleton::default())),
            Species::Raider => (table.raider.health, Kind::Raider(Raider::default())),
            Species::Plant => (table.plant.health, Kind::Plant(Plant::default())),
            Species::Fence => (0, Kind::Fence),
            other => {
                if let Some(rules) = config.friendly(other) {
                    let mob = FriendlyMob {
                        species: other,
                        sosa: rules.sosa,
                        antsy: rules.antsy,
                        food_value: rules.food_value,
                        last_dir: None,
                    };
                    (rules.health, Kind::Friendly(mob))
                } else {
                    let rules = config.neutral(other)?;
                    let mob = NeutralMob {
                        species: other,
                        sosa: rules.sosa,
                        antsy: rules.antsy,
                        damage: rules.damage,
                        cooldown: rules.cooldown,
                        cur_cooldown: 0,
                        pursuit_distance: rules.pursuit_distance,
                        pursuit_long_axis: rules.pursuit_long_axis,
                        food_value: rules.food_value,
                        last_dir: None,
                        angry: false,
                    };
                    (rules.health, Kind::Neutral(mob))
                }
            }
        };
        Some(Self::new(pos, Inventory::with_health(health), kind))
    }

    pub fn species(&self) -> Species {
        self.kind.species()
    }

    pub fn health(&self) -> i32 {
        self.inventory.health()
    }

    pub fn set_health(&mut self, value: i32) {
        self.inventory.set_health(value);
    }

    pub fn distance(&self, target: Position) -> i32 {
        self.pos.distance(target)
    }

    pub fn toward(&self, target: Position, long_axis: bool) -> Direction {
        self.pos.toward(target, long_axis)
    }

    pub fn walkable<'c>(&self, config: &'c GameConfig) -> &'c MaterialSet {
        match self.kind {
            Kind::Player(_) => config.player_walkable_set(),
            Kind::Arrow(_) => config.arrow_walkable_set(),
            _ => config.walkable(),
        }
    }

    /// Apply damage. Players reduce it through their armor tier; neutral
    /// mobs turn angry.
    pub fn take_damage(&mut self, amount: i32) {
        let amount = match &mut self.kind {
            Kind::Player(player) => match player.armor {
                Some(tier) => tier.absorb(amount),
                None => amount,
            },
            Kind::Neutral(mob) => {
                mob.angry = true;
                amount
            }
            _ => amount,
        };
        let health = self.health();
        self.set_health(health - amount);
    }

    /// The player's hook into whatever it faces
    pub fn on_interact(&mut self, damage: i32, config: &GameConfig) -> Interaction {
        let species = self.species();
        match &mut self.kind {
            Kind::Plant(plant) => {
                if plant.ripe(config.species.plant.ripe_after) {
                    plant.grown = 0;
                    Interaction::Harvest {
                        food: config.species.plant.food_value,
                    }
                } else {
                    Interaction::Nothing
                }
            }
            Kind::Fence => Interaction::Pickup { item: "fence" },
            Kind::Friendly(FriendlyMob { food_value, .. })
            | Kind::Neutral(NeutralMob { food_value, .. }) => {
                let food = *food_value;
                self.take_damage(damage);
                Interaction::Strike {
                    kill: (self.health() <= 0).then(|| KillReward {
                        achievement: format!("eat_{species}"),
                        food,
                    }),
                }
            }
            Kind::Zombie(_) | Kind::Skeleton(_) | Kind::Raider(_) => {
                self.take_damage(damage);
                Interaction::Strike {
                    kill: (self.health() <= 0).then(|| KillReward {
                        achievement: format!("defeat_{species}"),
                        food: 0,
                    }),
                }
            }
            Kind::Player(_) | Kind::Arrow(_) => Interaction::Nothing,
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            Kind::Player(player) => Some(player),
            _ => None,
        }
    }
}

/// What an interaction did to its target
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Nothing,
    Harvest { food: i32 },
    Pickup { item: &'static str },
    Strike { kill: Option<KillReward> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillReward {
    pub achievement: String,
    pub food: i32,
}

// ============================================================================
// Variants
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Player(Player),
    Friendly(FriendlyMob),
    Neutral(NeutralMob),
    Zombie(Zombie),
    Skeleton(Skeleton),
    Raider(Raider),
    Arrow(Arrow),
    Plant(Plant),
    Fence,
}

impl Kind {
    pub fn species(&self) -> Species {
        match self {
            Kind::Player(_) => Species::Player,
            Kind::Friendly(mob) => mob.species,
            Kind::Neutral(mob) => mob.species,
            Kind::Zombie(_) => Species::Zombie,
            Kind::Skeleton(_) => Species::Skeleton,
            Kind::Raider(_) => Species::Raider,
            Kind::Arrow(_) => Species::Arrow,
            Kind::Plant(_) => Species::Plant,
            Kind::Fence => Species::Fence,
        }
    }

    /// Any mob variant; plants take damage from these when adjacent
    pub fn is_mob(&self) -> bool {
        matches!(
            self,
            Kind::Friendly(_) | Kind::Neutral(_) | Kind::Zombie(_) | Kind::Skeleton(_) | Kind::Raider(_)
        )
    }
}

/// Player per-tick action
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Noop,
    Move(Direction),
    Interact,
    Sleep,
    Place(String),
    Craft(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub facing: Direction,
    pub sleeping: bool,
    pub action: Action,
    pub achievements: Achievements,
    pub armor: Option<ArmorTier>,
    pub hunger: f32,
    pub thirst: f32,
    pub fatigue: f32,
    pub recover: f32,
    pub last_health: i32,
}

impl Player {
    pub fn new(health: i32, achievements: &[String]) -> Self {
        Self {
            facing: Direction::DOWN,
            sleeping: false,
            action: Action::Noop,
            achievements: Achievements::from_names(achievements),
            armor: None,
            hunger: 0.0,
            thirst: 0.0,
            fatigue: 0.0,
            recover: 0.0,
            last_health: health,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FriendlyMob {
    pub species: Species,
    pub sosa: f64,
    pub antsy: f64,
    pub food_value: i32,
    pub last_dir: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeutralMob {
    pub species: Species,
    pub sosa: f64,
    pub antsy: f64,
    pub damage: i32,
    pub cooldown: u32,
    pub cur_cooldown: u32,
    pub pursuit_distance: i32,
    pub pursuit_long_axis: f64,
    pub food_value: i32,
    pub last_dir: Option<Direction>,
    pub angry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Zombie {
    pub cooldown: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Skeleton {
    pub reload: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Raider {
    pub cooldown: u32,
    /// Counts down after a theft; the raider leaves when it reaches 1
    pub satisfied: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrow {
    pub facing: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Plant {
    pub grown: u32,
}

impl Plant {
    pub fn ripe(&self, ripe_after: u32) -> bool {
        self.grown > ripe_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::standard().unwrap()
    }

    fn player_with_armor(armor: Option<ArmorTier>) -> Object {
        let config = config();
        let mut player = Object::player(Position::new(0, 0), &config);
        player.set_health(20);
        if let Kind::Player(state) = &mut player.kind {
            state.armor = armor;
        }
        player
    }

    #[test]
    fn test_player_damage_by_armor() {
        let cases = [
            (None, 10),
            (Some(ArmorTier::Iron), 15),
            (Some(ArmorTier::Diamond), 19),
            (Some(ArmorTier::Magic), 19),
        ];
        for (armor, expected) in cases {
            let mut player = player_with_armor(armor);
            player.take_damage(10);
            assert_eq!(player.health(), expected, "armor {:?}", armor);
        }
    }

    #[test]
    fn test_neutral_turns_angry_on_damage() {
        let config = config();
        let mut moose = Object::spawn(Species::Moose, Position::new(1, 1), &config).unwrap();
        moose.take_damage(1);
        match &moose.kind {
            Kind::Neutral(mob) => assert!(mob.angry),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_interact_unripe_plant_does_nothing() {
        let config = config();
        let mut plant = Object::spawn(Species::Plant, Position::new(0, 0), &config).unwrap();
        assert_eq!(plant.on_interact(5, &config), Interaction::Nothing);

        if let Kind::Plant(state) = &mut plant.kind {
            state.grown = config.species.plant.ripe_after + 1;
        }
        assert_eq!(
            plant.on_interact(5, &config),
            Interaction::Harvest {
                food: config.species.plant.food_value
            }
        );
        assert_eq!(plant.kind, Kind::Plant(Plant { grown: 0 }));
    }

    #[test]
    fn test_lethal_strike_rewards() {
        let config = config();
        let mut cow = Object::spawn(Species::Cow, Position::new(0, 0), &config).unwrap();
        match cow.on_interact(10, &config) {
            Interaction::Strike { kill: Some(reward) } => {
                assert_eq!(reward.achievement, "eat_cow");
                assert_eq!(reward.food, 6);
            }
            other => panic!("unexpected interaction {:?}", other),
        }

        let mut zombie = Object::spawn(Species::Zombie, Position::new(0, 0), &config).unwrap();
        assert_eq!(zombie.on_interact(1, &config), Interaction::Strike { kill: None });
    }

    #[test]
    fn test_spawn_rejects_player_and_arrow() {
        let config = config();
        assert!(Object::spawn(Species::Player, Position::new(0, 0), &config).is_none());
        assert!(Object::spawn(Species::Arrow, Position::new(0, 0), &config).is_none());
    }
}
