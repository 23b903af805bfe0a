//! Hostile System
//!
//! Zombies close in for melee, skeletons kite and shoot, raiders steal.

use tracing::trace;

use crate::components::Direction;
use crate::entity::{EntityId, Object, Raider, Skeleton, Zombie};
use crate::error::WorldError;
use crate::systems::TickContext;

pub fn update_zombie(ctx: &mut TickContext, id: EntityId, zombie: &mut Zombie) {
    if ctx.remove_if_dead(id) {
        return;
    }
    let config = ctx.config;
    let rules = &config.species.zombie;
    let (Some(pos), Some(player_pos)) = (ctx.pos(id), ctx.player_pos()) else {
        return;
    };

    if pos.distance(player_pos) <= rules.sense_radius && ctx.chance(rules.chase_probability) {
        let long_axis = ctx.chance(rules.long_axis);
        ctx.try_move(id, pos.toward(player_pos, long_axis));
    } else {
        let dir = ctx.random_dir();
        ctx.try_move(id, dir);
    }

    let Some(pos) = ctx.pos(id) else {
        return;
    };
    if pos.distance(player_pos) <= 1 {
        if zombie.cooldown > 0 {
            zombie.cooldown -= 1;
        } else {
            let damage = if ctx.player_sleeping() { rules.sleeping_damage } else { rules.damage };
            ctx.world.take_damage(ctx.player, damage);
            zombie.cooldown = rules.cooldown;
            trace!(%id, damage, "zombie attacks");
        }
    }
}

pub fn update_skeleton(ctx: &mut TickContext, id: EntityId, skeleton: &mut Skeleton) -> Result<(), WorldError> {
    if ctx.remove_if_dead(id) {
        return Ok(());
    }
    let config = ctx.config;
    let rules = &config.species.skeleton;
    skeleton.reload = skeleton.reload.saturating_sub(1);
    let (Some(pos), Some(player_pos)) = (ctx.pos(id), ctx.player_pos()) else {
        return Ok(());
    };
    let dist = pos.distance(player_pos);

    if dist <= rules.retreat_distance {
        let long_axis = ctx.chance(rules.retreat_long_axis);
        if ctx.try_move(id, -pos.toward(player_pos, long_axis)) {
            return Ok(());
        }
    }

    if dist <= rules.shoot_distance && ctx.chance(rules.shoot_probability) {
        shoot(ctx, id, skeleton, pos.toward(player_pos, true))?;
    } else if dist <= rules.approach_distance && ctx.chance(rules.approach_probability) {
        let long_axis = ctx.chance(rules.approach_long_axis);
        ctx.try_move(id, pos.toward(player_pos, long_axis));
    } else if ctx.chance(rules.wander_probability) {
        let dir = ctx.random_dir();
        ctx.try_move(id, dir);
    }
    Ok(())
}

/// Loose an arrow into the neighbouring cell, if reloaded and the cell is open
fn shoot(ctx: &mut TickContext, id: EntityId, skeleton: &mut Skeleton, dir: Direction) -> Result<(), WorldError> {
    if skeleton.reload > 0 || dir.is_zero() {
        return Ok(());
    }
    let Some(pos) = ctx.pos(id) else {
        return Ok(());
    };
    let target = pos + dir;
    if ctx.world.is_free(target, ctx.config.arrow_walkable_set()) {
        let arrow = ctx.world.add(Object::arrow(target, dir))?;
        skeleton.reload = ctx.config.species.skeleton.reload;
        trace!(%id, %arrow, %target, "skeleton shoots");
    }
    Ok(())
}

pub fn update_raider(ctx: &mut TickContext, id: EntityId, raider: &mut Raider) {
    if ctx.remove_if_dead(id) {
        return;
    }
    let config = ctx.config;
    let rules = &config.species.raider;

    // After a theft the raider drifts about and then leaves
    if raider.satisfied > 0 {
        if raider.satisfied == 1 {
            ctx.world.remove(id);
            trace!(%id, "raider leaves");
            return;
        }
        raider.satisfied -= 1;
        if ctx.chance(rules.wander_probability) {
            let dir = ctx.random_dir();
            ctx.try_move(id, dir);
        }
        return;
    }

    let (Some(pos), Some(player_pos)) = (ctx.pos(id), ctx.player_pos()) else {
        return;
    };
    if pos.distance(player_pos) <= rules.pursuit_distance && ctx.chance(rules.chase_probability) {
        let long_axis = ctx.chance(rules.long_axis);
        ctx.try_move(id, pos.toward(player_pos, long_axis));
    } else if ctx.chance(rules.wander_probability) {
        let dir = ctx.random_dir();
        ctx.try_move(id, dir);
    }

    let Some(pos) = ctx.pos(id) else {
        return;
    };
    if pos.distance(player_pos) > 1 {
        return;
    }
    if raider.cooldown > 0 {
        raider.cooldown -= 1;
        return;
    }
    raider.cooldown = rules.cooldown;

    let player = ctx.player;
    let Some(target) = ctx.world.object_mut(player) else {
        return;
    };
    let loot = rules
        .theft_order
        .iter()
        .find(|item| target.inventory.get(item) > 0);
    match loot {
        Some(item) => {
            target.inventory.set(item, 0);
            raider.satisfied = rules.satisfied_duration;
            trace!(%id, item = %item, "raider steals");
        }
        None => {
            target.take_damage(rules.no_bluff_damage);
            trace!(%id, damage = rules.no_bluff_damage, "raider finds nothing to steal");
        }
    }
}
