//! Flora System
//!
//! Plants grow every tick and get trampled by mobs standing next to them.

use tracing::trace;

use crate::entity::{EntityId, Plant};
use crate::systems::TickContext;

pub fn update_plant(ctx: &mut TickContext, id: EntityId, plant: &mut Plant) {
    plant.grown += 1;
    let Some(pos) = ctx.pos(id) else {
        return;
    };
    let trampled = pos.neighbours().iter().any(|cell| {
        ctx.world
            .occupant_at(*cell)
            .and_then(|occupant| ctx.world.live(occupant))
            .is_some_and(|object| object.kind.is_mob())
    });
    if trampled {
        ctx.world.take_damage(id, 1);
        trace!(%id, "plant trampled");
    }
    ctx.remove_if_dead(id);
}

#[cfg(test)]
mod tests {
    use crate::components::Position;
    use crate::entity::{Kind, Plant, Species};
    use crate::systems::testing::Fixture;

    #[test]
    fn test_plant_grows_and_ripens() {
        let mut fx = Fixture::new();
        let plant = fx.spawn(Species::Plant, Position::new(30, 30));
        let ripe_after = fx.config.species.plant.ripe_after;
        for _ in 0..ripe_after {
            fx.update(plant);
        }
        assert_eq!(fx.kind(plant), &Kind::Plant(Plant { grown: ripe_after }));
        assert!(!Plant { grown: ripe_after }.ripe(ripe_after));
        fx.update(plant);
        assert!(matches!(fx.kind(plant), Kind::Plant(p) if p.ripe(ripe_after)));
    }

    #[test]
    fn test_adjacent_mob_kills_plant() {
        let mut fx = Fixture::new();
        let plant = fx.spawn(Species::Plant, Position::new(30, 30));
        fx.spawn(Species::Zombie, Position::new(30, 31));
        fx.update(plant);
        assert!(!fx.world.is_live(plant));
        assert_eq!(fx.world.occupant_at(Position::new(30, 30)), None);
    }

    #[test]
    fn test_player_does_not_trample() {
        let mut fx = Fixture::new();
        let plant = fx.spawn(Species::Plant, Position::new(11, 10));
        fx.update(plant);
        assert!(fx.world.is_live(plant));
    }
}
