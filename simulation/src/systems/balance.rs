//! Balance System
//!
//! Holds each species near its target density, chunk by chunk. A pass makes
//! at most one spawn or one despawn per (chunk, spawn rule) pair.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::components::Position;
use crate::config::SpawnRule;
use crate::entity::{EntityId, Object};
use crate::error::WorldError;
use crate::spatial::Rect;
use crate::systems::TickContext;

/// What one balancing pass changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceOutcome {
    pub spawned: usize,
    pub despawned: usize,
}

/// Run every spawn rule over every chunk, x-major
pub fn balance_system(ctx: &mut TickContext) -> Result<BalanceOutcome, WorldError> {
    let mut outcome = BalanceOutcome::default();
    let Some(player_pos) = ctx.player_pos() else {
        return Ok(outcome);
    };
    let config = ctx.config;
    for chunk in ctx.world.chunk_keys() {
        for rule in &config.spawns {
            balance_chunk(ctx, chunk, rule, player_pos, &mut outcome)?;
        }
    }
    Ok(outcome)
}

fn balance_chunk(
    ctx: &mut TickContext,
    chunk: Rect,
    rule: &SpawnRule,
    player_pos: Position,
    outcome: &mut BalanceOutcome,
) -> Result<(), WorldError> {
    let config = ctx.config;
    let members: Vec<(EntityId, Position)> = ctx
        .world
        .chunk_members(chunk)
        .iter()
        .filter_map(|id| ctx.world.live(*id))
        .filter(|object| object.species() == rule.species)
        .map(|object| (object.id, object.pos))
        .collect();

    let mut masks = rule.habitat.iter().map(|material| ctx.world.mask_material(chunk, material));
    let Some(mut habitat) = masks.next() else {
        return Ok(());
    };
    for mask in masks {
        habitat.union(&mask);
    }

    let (min, max) = rule
        .target
        .evaluate(members.len(), habitat.count(), ctx.world.daylight, config.world.night_threshold);
    let count = members.len() as i64;

    if count < min as i64 && ctx.rng.gen::<f64>() < rule.spawn_probability {
        let cells = habitat.positions();
        let Some(&pos) = cells.choose(&mut *ctx.rng) else {
            return Ok(());
        };
        let empty = ctx.world.occupant_at(pos).is_none();
        let away = player_pos.distance(pos) >= rule.spawn_distance;
        if empty && away {
            if let Some(object) = Object::spawn(rule.species, pos, config) {
                let id = ctx.world.add(object)?;
                outcome.spawned += 1;
                debug!(%id, species = %rule.species, %pos, "spawned");
            }
        }
    } else if count > max as i64 && ctx.rng.gen::<f64>() < rule.despawn_probability {
        let Some(&(id, pos)) = members.choose(&mut *ctx.rng) else {
            return Ok(());
        };
        if player_pos.distance(pos) >= rule.despawn_distance {
            ctx.world.remove(id);
            outcome.despawned += 1;
            debug!(%id, species = %rule.species, %pos, "despawned");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, TargetRule};
    use crate::entity::Species;
    use crate::systems::testing::Fixture;

    fn rule(target: TargetRule, spawn_distance: i32, despawn_distance: i32) -> SpawnRule {
        SpawnRule {
            species: Species::Cow,
            habitat: vec!["grass".to_string()],
            spawn_distance,
            despawn_distance,
            spawn_probability: 1.0,
            despawn_probability: 1.0,
            target,
        }
    }

    fn fixture(spawns: Vec<SpawnRule>) -> Fixture {
        let mut config = GameConfig::standard().unwrap();
        config.spawns = spawns;
        Fixture::with_config(config)
    }

    fn cows(fx: &Fixture) -> Vec<Position> {
        fx.world
            .objects()
            .filter(|o| o.species() == Species::Cow)
            .map(|o| o.pos)
            .collect()
    }

    #[test]
    fn test_spawns_up_to_minimum() {
        let target = TargetRule { min: 2.0, max: 5.0, min_area: 0, night_only: false, daylight_bonus: false, area_gates_max: false };
        let mut fx = fixture(vec![rule(target, 4, 4)]);
        for _ in 0..10 {
            balance_system(&mut fx.ctx()).unwrap();
        }
        let chunks = fx.world.chunk_keys();
        for chunk in &chunks {
            let here = cows(&fx).iter().filter(|pos| chunk.contains(**pos)).count();
            assert_eq!(here, 2, "chunk {:?}", chunk);
        }
        for pos in cows(&fx) {
            assert!(pos.distance(Position::new(10, 10)) >= 4);
        }
        fx.world.verify().unwrap();
    }

    #[test]
    fn test_small_habitat_disables_minimum() {
        let target = TargetRule { min: 1.0, max: 5.0, min_area: 1000, night_only: false, daylight_bonus: false, area_gates_max: false };
        let mut fx = fixture(vec![rule(target, 0, 0)]);
        let outcome = balance_system(&mut fx.ctx()).unwrap();
        assert_eq!(outcome, BalanceOutcome::default());
    }

    #[test]
    fn test_despawn_respects_distance() {
        let target = TargetRule { min: 0.0, max: 1.0, min_area: 0, night_only: false, daylight_bonus: false, area_gates_max: false };
        let mut fx = fixture(vec![rule(target, 0, 5)]);
        // Player at (10, 10); chunk (0..12, 0..12)
        let near = [fx.spawn(Species::Cow, Position::new(11, 10)), fx.spawn(Species::Cow, Position::new(8, 9))];
        let far = [fx.spawn(Species::Cow, Position::new(1, 1)), fx.spawn(Species::Cow, Position::new(2, 3))];
        for _ in 0..100 {
            balance_system(&mut fx.ctx()).unwrap();
            for id in near {
                assert!(fx.world.is_live(id));
            }
        }
        for id in far {
            assert!(!fx.world.is_live(id));
        }
    }
}
