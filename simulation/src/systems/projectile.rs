//! Projectile System
//!
//! Arrows fly straight until they hit something.

use tracing::trace;

use crate::entity::{Arrow, EntityId};
use crate::error::WorldError;
use crate::systems::TickContext;

pub fn update_arrow(ctx: &mut TickContext, id: EntityId, arrow: &Arrow) -> Result<(), WorldError> {
    let config = ctx.config;
    let Some(pos) = ctx.pos(id) else {
        return Ok(());
    };
    let target = pos + arrow.facing;
    let cell = ctx.world.get_cell(target);

    if let Some(occupant) = cell.occupant {
        ctx.world.take_damage(occupant, config.species.arrow.damage);
        ctx.world.remove(id);
        trace!(%id, %occupant, "arrow hits");
        return Ok(());
    }

    let material = ctx.world.palette().name(cell.material).map(str::to_string);
    match material {
        Some(material) if config.arrow_walkable_set().contains(&material) => {
            ctx.try_move(id, arrow.facing);
        }
        material => {
            ctx.world.remove(id);
            if let Some(material) = material.filter(|m| config.is_station(m)) {
                ctx.world.set_material(target, &config.path_material)?;
                trace!(%id, %target, material = %material, "arrow breaks station");
            }
        }
    }
    Ok(())
}
