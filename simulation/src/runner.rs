//! Episode Runner - drives a world with a policy for a number of ticks

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::components::Direction;
use crate::entity::{Action, Species};
use crate::error::WorldError;
use crate::world::SimulationWorld;

/// Chooses the player's action for the coming tick
pub trait Policy {
    fn act(&mut self, world: &SimulationWorld, rng: &mut ChaCha8Rng) -> Action;
}

impl<F> Policy for F
where
    F: FnMut(&SimulationWorld, &mut ChaCha8Rng) -> Action,
{
    fn act(&mut self, world: &SimulationWorld, rng: &mut ChaCha8Rng) -> Action {
        self(world, rng)
    }
}

/// Uniform over moves, interact, sleep and every known recipe. Moves are
/// weighted so the player actually gets around.
pub fn random_policy(world: &SimulationWorld, rng: &mut ChaCha8Rng) -> Action {
    let config = world.config();
    if rng.gen_bool(0.5) {
        return Action::Move(Direction::random(rng));
    }
    let mut actions = vec![Action::Noop, Action::Interact, Action::Interact, Action::Sleep];
    actions.extend(config.place.keys().map(|name| Action::Place(name.clone())));
    actions.extend(config.craft.keys().map(|name| Action::Craft(name.clone())));
    actions.choose(rng).cloned().unwrap_or_default()
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_health: i32,
    pub achievements: Vec<String>,
    pub population: BTreeMap<Species, usize>,
    pub spawned: usize,
    pub despawned: usize,
}

pub struct Runner<P> {
    world: SimulationWorld,
    policy: P,
    rng: ChaCha8Rng,
    verify: bool,
}

impl<P: Policy> Runner<P> {
    /// The policy draws from its own stream so the world's stream only
    /// depends on the actions taken
    pub fn new(world: SimulationWorld, policy: P, policy_seed: u64) -> Self {
        Self {
            world,
            policy,
            rng: ChaCha8Rng::seed_from_u64(policy_seed),
            verify: cfg!(debug_assertions),
        }
    }

    /// Check the world invariants after every tick
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Tick until `max_ticks` have run or the player dies
    pub fn run(&mut self, max_ticks: u64) -> Result<RunSummary, WorldError> {
        let mut ticks = 0;
        let mut spawned = 0;
        let mut despawned = 0;
        while ticks < max_ticks && !self.world.is_over() {
            let action = self.policy.act(&self.world, &mut self.rng);
            let report = self.world.step(action)?;
            if self.verify {
                self.world.world().verify()?;
            }
            spawned += report.spawned;
            despawned += report.despawned;
            ticks += 1;
            if report.spawned + report.despawned > 0 {
                debug!(
                    tick = report.tick,
                    spawned = report.spawned,
                    despawned = report.despawned,
                    "population balanced"
                );
            }
        }

        let achievements = self
            .world
            .player()
            .map(|player| player.achievements.unlocked().map(str::to_string).collect())
            .unwrap_or_default();
        let summary = RunSummary {
            ticks,
            final_health: self.world.player_health(),
            achievements,
            population: self.world.population(),
            spawned,
            despawned,
        };
        info!(
            ticks = summary.ticks,
            health = summary.final_health,
            achievements = summary.achievements.len(),
            "run finished"
        );
        Ok(summary)
    }

    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    pub fn into_world(self) -> SimulationWorld {
        self.world
    }
}
