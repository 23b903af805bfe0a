//! Rule tables
//!
//! Everything gameplay reads from data lives here: materials, items, recipe
//! tables, species parameters and spawn rules. A `GameConfig` is assembled
//! once, validated, and then only ever borrowed.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::components::ArmorTier;
use crate::entity::Species;
use crate::error::ConfigError;

/// Set of material names an entity may stand on
pub type MaterialSet = BTreeSet<String>;

/// Standard rule set shipped with the crate
const STANDARD_RULES: &str = include_str!("../data/standard.json");

// ============================================================================
// Top level
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub world: WorldSettings,
    pub materials: Vec<MaterialDef>,
    /// Extra materials the player may enter (on top of the walkable ones)
    #[serde(default)]
    pub player_walkable: Vec<String>,
    /// Extra materials arrows fly over
    #[serde(default)]
    pub arrow_walkable: Vec<String>,
    /// Materials that kill the player on entry
    #[serde(default)]
    pub hazards: Vec<String>,
    /// Crafting stations; arrows knock these down to `path_material`
    #[serde(default)]
    pub stations: Vec<String>,
    pub path_material: String,
    pub items: BTreeMap<String, ItemDef>,
    pub achievements: Vec<String>,
    #[serde(default)]
    pub collect: BTreeMap<String, CollectRecipe>,
    #[serde(default)]
    pub place: BTreeMap<String, PlaceRecipe>,
    #[serde(default)]
    pub craft: BTreeMap<String, CraftRecipe>,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    pub needs: NeedsSettings,
    pub species: SpeciesTable,
    #[serde(default)]
    pub spawns: Vec<SpawnRule>,
    #[serde(skip)]
    walkable: WalkableSets,
}

#[derive(Debug, Clone, Default)]
struct WalkableSets {
    default: MaterialSet,
    player: MaterialSet,
    arrow: MaterialSet,
}

impl GameConfig {
    /// The rule set embedded in the crate
    pub fn standard() -> Result<Self, ConfigError> {
        Self::from_json(STANDARD_RULES)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.resolve_walkable();
        Ok(config)
    }

    fn resolve_walkable(&mut self) {
        let default: MaterialSet = self
            .materials
            .iter()
            .filter(|m| m.walkable)
            .map(|m| m.name.clone())
            .collect();
        let mut player = default.clone();
        player.extend(self.player_walkable.iter().cloned());
        let mut arrow = default.clone();
        arrow.extend(self.arrow_walkable.iter().cloned());
        self.walkable = WalkableSets {
            default,
            player,
            arrow,
        };
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.world;
        if w.width == 0 || w.height == 0 {
            return Err(ConfigError::InvalidWorld("area must be non-empty"));
        }
        if w.chunk_width == 0 || w.chunk_height == 0 {
            return Err(ConfigError::InvalidWorld("chunk size must be non-zero"));
        }
        if w.balance_interval == 0 {
            return Err(ConfigError::InvalidWorld("balance interval must be non-zero"));
        }
        if self.materials.len() >= u16::MAX as usize {
            return Err(ConfigError::InvalidWorld("too many materials"));
        }
        if !self.items.contains_key(crate::components::HEALTH) {
            return Err(ConfigError::UnknownItem {
                context: "item table".to_string(),
                item: crate::components::HEALTH.to_string(),
            });
        }

        for (material, recipe) in &self.collect {
            let context = format!("collect recipe `{material}`");
            self.check_items(&context, recipe.require.keys())?;
            self.check_items(&context, recipe.consume.keys())?;
            self.check_items(&context, recipe.receive.keys())?;
        }
        for (name, recipe) in &self.place {
            self.check_items(&format!("place recipe `{name}`"), recipe.uses.keys())?;
        }
        for (name, recipe) in &self.craft {
            let context = format!("craft recipe `{name}`");
            self.check_items(&context, recipe.uses.keys())?;
            if recipe.armor.is_none() {
                self.check_items(&context, std::iter::once(name))?;
            }
        }
        self.check_items("weapon table", self.weapons.iter().map(|w| &w.item))?;
        self.check_items("raider theft order", self.species.raider.theft_order.iter())?;

        for rule in &self.spawns {
            if !self.can_spawn(rule.species) {
                return Err(ConfigError::UnknownSpecies(rule.species.name().to_string()));
            }
        }
        Ok(())
    }

    fn check_items<'a>(
        &self,
        context: &str,
        names: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), ConfigError> {
        for name in names {
            if !self.items.contains_key(name) {
                return Err(ConfigError::UnknownItem {
                    context: context.to_string(),
                    item: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether the balancer (or a generator) can construct this species
    pub fn can_spawn(&self, species: Species) -> bool {
        match species {
            Species::Zombie | Species::Skeleton | Species::Raider | Species::Plant | Species::Fence => {
                true
            }
            Species::Player | Species::Arrow => false,
            other => self.friendly(other).is_some() || self.neutral(other).is_some(),
        }
    }

    pub fn friendly(&self, species: Species) -> Option<&FriendlySpec> {
        self.species.friendly.iter().find(|s| s.species == species)
    }

    pub fn neutral(&self, species: Species) -> Option<&NeutralSpec> {
        self.species.neutral.iter().find(|s| s.species == species)
    }

    /// Walkable materials for mobs and static objects
    pub fn walkable(&self) -> &MaterialSet {
        &self.walkable.default
    }

    pub fn player_walkable_set(&self) -> &MaterialSet {
        &self.walkable.player
    }

    pub fn arrow_walkable_set(&self) -> &MaterialSet {
        &self.walkable.arrow
    }

    pub fn is_hazard(&self, material: &str) -> bool {
        self.hazards.iter().any(|h| h == material)
    }

    pub fn is_station(&self, material: &str) -> bool {
        self.stations.iter().any(|s| s == material)
    }

    pub fn item_max(&self, name: &str) -> i32 {
        self.items.get(name).map(|def| def.max).unwrap_or(i32::MAX)
    }
}

// ============================================================================
// World
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WorldSettings {
    pub width: u32,
    pub height: u32,
    pub chunk_width: u32,
    pub chunk_height: u32,
    /// Entities at or beyond this L1 distance from the player are frozen
    pub update_radius: i32,
    /// Balancer runs on every tick divisible by this
    pub balance_interval: u64,
    /// Ticks per half period of the daylight curve
    pub day_length: u32,
    /// Night-only spawn rules are disabled at or above this daylight
    pub night_threshold: f32,
    /// Sensing radius for crafting stations
    pub craft_distance: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDef {
    pub name: String,
    pub walkable: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ItemDef {
    #[serde(default)]
    pub initial: i32,
    pub max: i32,
}

// ============================================================================
// Recipes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CollectRecipe {
    #[serde(default)]
    pub require: BTreeMap<String, i32>,
    #[serde(default)]
    pub consume: BTreeMap<String, i32>,
    #[serde(default)]
    pub receive: BTreeMap<String, i32>,
    /// Material left behind once collected
    pub leaves: String,
    #[serde(default = "always")]
    pub probability: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceRecipe {
    #[serde(default)]
    pub uses: BTreeMap<String, i32>,
    /// Materials the target cell must hold
    pub on: Vec<String>,
    pub target: PlaceTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceTarget {
    /// Overwrite the cell with the recipe's own name as material
    Material,
    /// Spawn a static or flora object
    Object(Species),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CraftRecipe {
    /// Materials that must be within `craft_distance`
    #[serde(default)]
    pub nearby: Vec<String>,
    #[serde(default)]
    pub uses: BTreeMap<String, i32>,
    #[serde(default = "one")]
    pub gives: i32,
    /// Armor recipes unlock a tier instead of granting an item
    #[serde(default)]
    pub armor: Option<ArmorTier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Weapon {
    pub item: String,
    pub damage: i32,
}

fn always() -> f64 {
    1.0
}

fn one() -> i32 {
    1
}

// ============================================================================
// Player needs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NeedsSettings {
    pub hunger_limit: f32,
    pub thirst_limit: f32,
    pub fatigue_limit: f32,
    pub rest_limit: f32,
    pub recover_limit: f32,
    pub degen_limit: f32,
    pub base_damage: i32,
}

// ============================================================================
// Species parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesTable {
    pub friendly: Vec<FriendlySpec>,
    pub neutral: Vec<NeutralSpec>,
    pub zombie: ZombieSpec,
    pub skeleton: SkeletonSpec,
    pub raider: RaiderSpec,
    pub arrow: ArrowSpec,
    pub plant: PlantSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendlySpec {
    pub species: Species,
    pub health: i32,
    /// Probability of repeating the previous heading
    pub sosa: f64,
    /// Probability of moving at all on a tick
    pub antsy: f64,
    pub food_value: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NeutralSpec {
    pub species: Species,
    pub health: i32,
    pub sosa: f64,
    pub antsy: f64,
    pub damage: i32,
    pub cooldown: u32,
    pub pursuit_distance: i32,
    pub pursuit_long_axis: f64,
    pub food_value: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZombieSpec {
    pub health: i32,
    pub sense_radius: i32,
    pub chase_probability: f64,
    pub long_axis: f64,
    pub damage: i32,
    pub sleeping_damage: i32,
    pub cooldown: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkeletonSpec {
    pub health: i32,
    pub retreat_distance: i32,
    pub retreat_long_axis: f64,
    pub shoot_distance: i32,
    pub shoot_probability: f64,
    pub approach_distance: i32,
    pub approach_probability: f64,
    pub approach_long_axis: f64,
    pub wander_probability: f64,
    pub reload: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RaiderSpec {
    pub health: i32,
    pub cooldown: u32,
    pub pursuit_distance: i32,
    pub chase_probability: f64,
    pub long_axis: f64,
    pub wander_probability: f64,
    /// Items tried in order; the first non-zero one is taken
    pub theft_order: Vec<String>,
    pub satisfied_duration: u32,
    pub no_bluff_damage: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrowSpec {
    pub damage: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlantSpec {
    pub health: i32,
    pub ripe_after: u32,
    pub food_value: i32,
}

// ============================================================================
// Spawn rules
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnRule {
    pub species: Species,
    pub habitat: Vec<String>,
    pub spawn_distance: i32,
    pub despawn_distance: i32,
    pub spawn_probability: f64,
    pub despawn_probability: f64,
    pub target: TargetRule,
}

/// Target population range for one chunk
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TargetRule {
    pub min: f64,
    pub max: f64,
    /// Below this habitat area the minimum drops to zero
    #[serde(default)]
    pub min_area: usize,
    /// Disabled entirely (target 0..0) in daylight
    #[serde(default)]
    pub night_only: bool,
    /// Adds the current daylight to the maximum
    #[serde(default)]
    pub daylight_bonus: bool,
    /// Below `min_area` the maximum drops to zero as well
    #[serde(default)]
    pub area_gates_max: bool,
}

impl TargetRule {
    /// `(target_min, target_max)` for a chunk holding `count` live instances
    /// and `area` habitat cells. The standard rules only read the area.
    pub fn evaluate(&self, _count: usize, area: usize, daylight: f32, night_threshold: f32) -> (f64, f64) {
        if self.night_only && daylight >= night_threshold {
            return (0.0, 0.0);
        }
        if self.area_gates_max && area < self.min_area {
            return (0.0, 0.0);
        }
        let min = if area < self.min_area { 0.0 } else { self.min };
        let max = if self.daylight_bonus {
            self.max + daylight as f64
        } else {
            self.max
        };
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rules_load() {
        let config = GameConfig::standard().unwrap();
        assert!(config.walkable().contains("grass"));
        assert!(!config.walkable().contains("lava"));
        assert!(config.player_walkable_set().contains("lava"));
        assert!(config.arrow_walkable_set().contains("water"));
        assert!(config.friendly(Species::Cow).is_some());
        assert!(config.neutral(Species::Moose).is_some());
        assert!(config.is_station("table"));
    }

    #[test]
    fn test_unknown_item_rejected() {
        let mut raw: serde_json::Value = serde_json::from_str(STANDARD_RULES).unwrap();
        raw["craft"]["wood_pickaxe"]["uses"]["unobtainium"] = serde_json::json!(1);
        let err = GameConfig::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownItem { .. }));
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let mut raw: serde_json::Value = serde_json::from_str(STANDARD_RULES).unwrap();
        raw["world"]["chunk_width"] = serde_json::json!(0);
        let err = GameConfig::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorld(_)));
    }

    #[test]
    fn test_target_rule_night_only() {
        let rule = TargetRule {
            min: 1.0,
            max: 3.0,
            min_area: 30,
            night_only: true,
            daylight_bonus: false,
            area_gates_max: false,
        };
        assert_eq!(rule.evaluate(0, 100, 0.9, 0.3), (0.0, 0.0));
        assert_eq!(rule.evaluate(0, 100, 0.1, 0.3), (1.0, 3.0));
        assert_eq!(rule.evaluate(0, 10, 0.1, 0.3), (0.0, 3.0));
    }

    #[test]
    fn test_standard_zombie_target() {
        let config = GameConfig::standard().unwrap();
        let rule = config.spawns.iter().find(|r| r.species == Species::Zombie).unwrap();
        // Night: more than 30 habitat cells hold exactly one zombie
        assert_eq!(rule.target.evaluate(0, 30, 0.1, 0.3), (0.0, 0.0));
        assert_eq!(rule.target.evaluate(0, 31, 0.1, 0.3), (1.0, 1.0));
        assert_eq!(rule.target.evaluate(3, 100, 0.1, 0.3), (1.0, 1.0));
        assert_eq!(rule.target.evaluate(0, 10, 0.1, 0.3), (0.0, 0.0));
        // Day
        assert_eq!(rule.target.evaluate(0, 100, 0.9, 0.3), (0.0, 0.0));
    }

    #[test]
    fn test_target_rule_daylight_bonus() {
        let rule = TargetRule {
            min: 1.0,
            max: 1.5,
            min_area: 30,
            night_only: false,
            daylight_bonus: true,
            area_gates_max: false,
        };
        let (_, max) = rule.evaluate(0, 40, 0.5, 0.3);
        assert!((max - 2.0).abs() < 1e-6);
    }
}
