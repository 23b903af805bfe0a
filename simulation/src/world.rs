//! Simulation World - main orchestrator
//!
//! Owns the spatial world, the shared random stream and the rules, and runs
//! ticks: advance daylight, update every active entity once, balance every
//! Nth tick.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

use crate::components::{DayCycle, Position};
use crate::config::GameConfig;
use crate::entity::{Action, EntityId, Kind, Object, Player, Species};
use crate::error::WorldError;
use crate::spatial::SpatialWorld;
use crate::systems::{self, TickContext};

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub daylight: f32,
    /// Entities whose update ran
    pub updated: usize,
    pub spawned: usize,
    pub despawned: usize,
    pub player_health: i32,
}

#[derive(Debug, Clone)]
pub struct SimulationWorld {
    world: SpatialWorld,
    rng: ChaCha8Rng,
    config: GameConfig,
    calendar: DayCycle,
    player: EntityId,
}

impl SimulationWorld {
    /// Build a world and start the first episode with `seed`
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, WorldError> {
        let mut sim = Self {
            world: SpatialWorld::from_config(&config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            calendar: DayCycle::default(),
            player: EntityId::SENTINEL,
        };
        sim.reset(seed)?;
        Ok(sim)
    }

    /// Start a new episode: reseed, clear the world, place the player at the
    /// centre. Terrain is left empty for the caller to paint.
    pub fn reset(&mut self, seed: u64) -> Result<(), WorldError> {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.world.reset();
        self.calendar = DayCycle::default();
        self.world.daylight = self.calendar.daylight(self.config.world.day_length);
        let (w, h) = self.world.area();
        let center = Position::new((w / 2) as i32, (h / 2) as i32);
        self.player = self.world.add(Object::player(center, &self.config))?;
        debug!(seed, player = %self.player, %center, "episode reset");
        Ok(())
    }

    /// Run one tick with the player's chosen action
    pub fn step(&mut self, action: Action) -> Result<TickReport, WorldError> {
        self.calendar.advance();
        self.world.daylight = self.calendar.daylight(self.config.world.day_length);
        if let Some(Object { kind: Kind::Player(player), .. }) = self.world.object_mut(self.player) {
            player.action = action;
        }

        let radius = self.config.world.update_radius;
        let balance_interval = self.config.world.balance_interval;
        let tick = self.calendar.tick;
        // Entities added during this tick wait for the next one
        let ids = self.world.live_ids();
        let mut ctx = TickContext {
            world: &mut self.world,
            rng: &mut self.rng,
            config: &self.config,
            player: self.player,
        };

        let mut updated = 0;
        for id in ids {
            let Some(player_pos) = ctx.player_pos() else {
                break;
            };
            let active = ctx
                .world
                .live(id)
                .is_some_and(|object| object.distance(player_pos) < radius);
            if active {
                systems::update_entity(&mut ctx, id)?;
                updated += 1;
            }
        }

        let balance = if tick % balance_interval == 0 {
            systems::balance_system(&mut ctx)?
        } else {
            systems::BalanceOutcome::default()
        };

        Ok(TickReport {
            tick,
            daylight: self.world.daylight,
            updated,
            spawned: balance.spawned,
            despawned: balance.despawned,
            player_health: self.player_health(),
        })
    }

    pub fn world(&self) -> &SpatialWorld {
        &self.world
    }

    /// Direct access for terrain painting and scripted setups
    pub fn world_mut(&mut self) -> &mut SpatialWorld {
        &mut self.world
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.calendar.tick
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player_object(&self) -> Option<&Object> {
        self.world.object(self.player)
    }

    pub fn player(&self) -> Option<&Player> {
        self.player_object().and_then(Object::as_player)
    }

    pub fn player_health(&self) -> i32 {
        self.player_object().map_or(0, Object::health)
    }

    pub fn is_over(&self) -> bool {
        self.player_health() <= 0
    }

    /// Live entities per species
    pub fn population(&self) -> BTreeMap<Species, usize> {
        let mut counts = BTreeMap::new();
        for object in self.world.objects() {
            *counts.entry(object.species()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Direction;
    use crate::spatial::Rect;

    fn grass_world(seed: u64) -> SimulationWorld {
        let mut sim = SimulationWorld::new(GameConfig::standard().unwrap(), seed).unwrap();
        let (w, h) = sim.world().area();
        for pos in (Rect { xmin: 0, xmax: w as i32, ymin: 0, ymax: h as i32 }).cells() {
            sim.world_mut().set_material(pos, "grass").unwrap();
        }
        sim
    }

    #[test]
    fn test_reset_places_player_at_center() {
        let sim = grass_world(1);
        assert_eq!(sim.player_object().unwrap().pos, Position::new(32, 32));
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.population().get(&Species::Player), Some(&1));
    }

    #[test]
    fn test_step_moves_player() {
        let mut sim = grass_world(1);
        let report = sim.step(Action::Move(Direction::UP)).unwrap();
        assert_eq!(report.tick, 1);
        assert!(report.updated >= 1);
        assert_eq!(sim.player_object().unwrap().pos, Position::new(32, 31));
    }

    #[test]
    fn test_far_entities_frozen() {
        let mut sim = grass_world(1);
        let cow = Object::spawn(Species::Cow, Position::new(0, 0), sim.config()).unwrap();
        let cow = sim.world_mut().add(cow).unwrap();
        for _ in 0..9 {
            sim.step(Action::Noop).unwrap();
        }
        assert_eq!(sim.world().object(cow).unwrap().pos, Position::new(0, 0));
    }

    #[test]
    fn test_arrow_near_player_advances() {
        let mut sim = grass_world(1);
        let arrow = sim
            .world_mut()
            .add(Object::arrow(Position::new(30, 30), Direction::LEFT))
            .unwrap();
        sim.step(Action::Noop).unwrap();
        assert_eq!(sim.world().object(arrow).unwrap().pos, Position::new(29, 30));
    }

    #[test]
    fn test_reset_restarts_episode() {
        let mut sim = grass_world(1);
        for _ in 0..12 {
            sim.step(Action::Noop).unwrap();
        }
        sim.reset(2).unwrap();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.world().objects().count(), 1);
        assert_eq!(sim.world().material_at(Position::new(0, 0)), None);
    }

    #[test]
    fn test_entity_added_mid_tick_waits() {
        let mut sim = grass_world(1);
        let player = sim.player_id();
        sim.world_mut().object_mut(player).unwrap().inventory.set("sapling", 1);
        sim.step(Action::Place("plant".to_string())).unwrap();

        let plant = sim.world().occupant_at(Position::new(32, 33)).unwrap();
        let grown = |sim: &SimulationWorld| match &sim.world().object(plant).unwrap().kind {
            Kind::Plant(plant) => plant.grown,
            other => panic!("unexpected kind {:?}", other),
        };
        assert_eq!(grown(&sim), 0);

        sim.step(Action::Noop).unwrap();
        assert_eq!(grown(&sim), 1);
    }
}
