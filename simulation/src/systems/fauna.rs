//! Fauna System
//!
//! Passive wandering for friendly mobs; aggro, pursuit and disengagement for
//! neutral mobs.

use tracing::trace;

use crate::components::Direction;
use crate::entity::{EntityId, FriendlyMob, NeutralMob};
use crate::systems::TickContext;

/// Straight-line-biased random walk shared by both families
fn wander(ctx: &mut TickContext, id: EntityId, sosa: f64, antsy: f64, last_dir: &mut Option<Direction>) {
    if !ctx.chance(antsy) {
        return;
    }
    let dir = match *last_dir {
        Some(previous) if ctx.chance(sosa) => previous,
        _ => ctx.random_dir(),
    };
    ctx.try_move(id, dir);
    *last_dir = Some(dir);
}

pub fn update_friendly(ctx: &mut TickContext, id: EntityId, mob: &mut FriendlyMob) {
    if ctx.remove_if_dead(id) {
        return;
    }
    wander(ctx, id, mob.sosa, mob.antsy, &mut mob.last_dir);
}

pub fn update_neutral(ctx: &mut TickContext, id: EntityId, mob: &mut NeutralMob) {
    if ctx.remove_if_dead(id) {
        return;
    }
    let (Some(pos), Some(player_pos)) = (ctx.pos(id), ctx.player_pos()) else {
        return;
    };
    let dist = pos.distance(player_pos);

    if mob.angry && dist < mob.pursuit_distance {
        let long_axis = ctx.chance(mob.pursuit_long_axis);
        ctx.try_move(id, pos.toward(player_pos, long_axis));
        // Adjacency is judged from where the mob stood before stepping
        if dist <= 1 {
            if mob.cur_cooldown > 0 {
                mob.cur_cooldown -= 1;
            } else {
                let damage = if ctx.player_sleeping() { 2 * mob.damage } else { mob.damage };
                ctx.world.take_damage(ctx.player, damage);
                mob.cur_cooldown = mob.cooldown;
                trace!(%id, species = %mob.species, damage, "neutral mob attacks");
            }
        }
    } else if mob.angry && dist > mob.pursuit_distance {
        mob.angry = false;
        trace!(%id, species = %mob.species, "neutral mob calms down");
    } else {
        wander(ctx, id, mob.sosa, mob.antsy, &mut mob.last_dir);
    }
}
