//! Entity systems - per-variant update logic run each tick
//!
//! Each variant's state is cloned out of the world, advanced against the
//! world by id, and written back. World mutations made during an update are
//! immediately visible to every later update in the same tick.

pub mod balance;
pub mod fauna;
pub mod flora;
pub mod hostile;
pub mod player;
pub mod projectile;

pub use balance::{balance_system, BalanceOutcome};

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::components::{Direction, Position};
use crate::config::GameConfig;
use crate::entity::{EntityId, Kind};
use crate::error::WorldError;
use crate::spatial::SpatialWorld;

/// Everything an update may touch
pub struct TickContext<'a> {
    pub world: &'a mut SpatialWorld,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a GameConfig,
    pub player: EntityId,
}

impl<'a> TickContext<'a> {
    pub fn pos(&self, id: EntityId) -> Option<Position> {
        self.world.live(id).map(|object| object.pos)
    }

    pub fn player_pos(&self) -> Option<Position> {
        self.pos(self.player)
    }

    pub fn player_sleeping(&self) -> bool {
        self.world
            .live(self.player)
            .and_then(|object| object.as_player())
            .is_some_and(|player| player.sleeping)
    }

    /// Bernoulli draw from the shared stream
    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability
    }

    pub fn random_dir(&mut self) -> Direction {
        Direction::random(&mut *self.rng)
    }

    pub fn try_move(&mut self, id: EntityId, dir: Direction) -> bool {
        self.world.try_move(id, dir, self.config)
    }

    /// Remove the entity when its health has run out
    pub fn remove_if_dead(&mut self, id: EntityId) -> bool {
        let dead = self.world.live(id).is_some_and(|object| object.health() <= 0);
        if dead {
            self.world.remove(id);
        }
        dead
    }
}

/// Run one entity's update. Removed entities and fences do nothing.
pub fn update_entity(ctx: &mut TickContext, id: EntityId) -> Result<(), WorldError> {
    let kind = match ctx.world.live(id) {
        Some(object) => object.kind.clone(),
        None => return Ok(()),
    };
    let kind = match kind {
        Kind::Player(mut state) => {
            player::update(ctx, id, &mut state)?;
            Kind::Player(state)
        }
        Kind::Friendly(mut state) => {
            fauna::update_friendly(ctx, id, &mut state);
            Kind::Friendly(state)
        }
        Kind::Neutral(mut state) => {
            fauna::update_neutral(ctx, id, &mut state);
            Kind::Neutral(state)
        }
        Kind::Zombie(mut state) => {
            hostile::update_zombie(ctx, id, &mut state);
            Kind::Zombie(state)
        }
        Kind::Skeleton(mut state) => {
            hostile::update_skeleton(ctx, id, &mut state)?;
            Kind::Skeleton(state)
        }
        Kind::Raider(mut state) => {
            hostile::update_raider(ctx, id, &mut state);
            Kind::Raider(state)
        }
        Kind::Arrow(state) => {
            projectile::update_arrow(ctx, id, &state)?;
            Kind::Arrow(state)
        }
        Kind::Plant(mut state) => {
            flora::update_plant(ctx, id, &mut state);
            Kind::Plant(state)
        }
        Kind::Fence => return Ok(()),
    };
    ctx.world.set_kind(id, kind);
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use rand::SeedableRng;

    use super::*;
    use crate::entity::{Object, Species};
    use crate::spatial::Rect;

    /// A grass world with the player at `(10, 10)`
    pub struct Fixture {
        pub world: SpatialWorld,
        pub rng: ChaCha8Rng,
        pub config: GameConfig,
        pub player: EntityId,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_config(GameConfig::standard().unwrap())
        }

        pub fn with_config(config: GameConfig) -> Self {
            let mut world = SpatialWorld::from_config(&config);
            let (w, h) = world.area();
            let all = Rect { xmin: 0, xmax: w as i32, ymin: 0, ymax: h as i32 };
            for pos in all.cells() {
                world.set_material(pos, "grass").unwrap();
            }
            let player = world.add(Object::player(Position::new(10, 10), &config)).unwrap();
            Self {
                world,
                rng: ChaCha8Rng::seed_from_u64(3),
                config,
                player,
            }
        }

        pub fn ctx(&mut self) -> TickContext<'_> {
            TickContext {
                world: &mut self.world,
                rng: &mut self.rng,
                config: &self.config,
                player: self.player,
            }
        }

        pub fn spawn(&mut self, species: Species, pos: Position) -> EntityId {
            let object = Object::spawn(species, pos, &self.config).unwrap();
            self.world.add(object).unwrap()
        }

        /// Turn every unoccupied neighbour of `pos` into stone
        pub fn wall_in(&mut self, pos: Position) {
            for cell in pos.neighbours() {
                if self.world.occupant_at(cell).is_none() {
                    self.world.set_material(cell, "stone").unwrap();
                }
            }
        }

        pub fn update(&mut self, id: EntityId) {
            update_entity(&mut self.ctx(), id).unwrap();
        }

        pub fn player_health(&self) -> i32 {
            self.world.object(self.player).unwrap().health()
        }

        pub fn kind(&self, id: EntityId) -> &Kind {
            &self.world.object(id).unwrap().kind
        }
    }
}
