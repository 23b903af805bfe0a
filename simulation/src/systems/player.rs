//! Player System
//!
//! Applies the chosen action, then advances needs, health drift and the
//! inventory clamp. The player's inventory is worked on as a local copy and
//! written back at the end of the update.

use rand::Rng;
use tracing::trace;

use crate::components::{Direction, Inventory, Position};
use crate::config::{GameConfig, PlaceTarget};
use crate::entity::{Action, EntityId, Interaction, Object, Player};
use crate::error::WorldError;
use crate::spatial::Cell;
use crate::systems::TickContext;

const FOOD: &str = "food";
const DRINK: &str = "drink";
const ENERGY: &str = "energy";

pub fn update(ctx: &mut TickContext, id: EntityId, player: &mut Player) -> Result<(), WorldError> {
    let config = ctx.config;
    let (pos, mut inventory) = match ctx.world.live(id) {
        Some(object) => (object.pos, object.inventory.clone()),
        None => return Ok(()),
    };
    let target = pos + player.facing;
    let cell = ctx.world.get_cell(target);

    let mut action = player.action.clone();
    if player.sleeping {
        if inventory.get(ENERGY) < config.item_max(ENERGY) {
            action = Action::Sleep;
        } else {
            player.sleeping = false;
            player.achievements.unlock("wake_up");
        }
    }

    match action {
        Action::Noop => {}
        Action::Move(dir) => walk(ctx, id, player, &mut inventory, dir),
        Action::Interact => match cell.occupant {
            Some(occupant) => strike(ctx, player, &mut inventory, occupant),
            None => collect(ctx, player, &mut inventory, target)?,
        },
        Action::Sleep => {
            if inventory.get(ENERGY) < config.item_max(ENERGY) {
                player.sleeping = true;
            }
        }
        Action::Place(name) => place(ctx, player, &mut inventory, &name, target, cell)?,
        Action::Craft(name) => craft(ctx, player, &mut inventory, &name, pos),
    }

    update_needs(config, player, &mut inventory);
    drift_health(config, player, &mut inventory);
    inventory.clamp(&config.items);
    // Runs after the clamp so it sees the final health
    if inventory.health() < player.last_health {
        player.sleeping = false;
    }
    player.last_health = inventory.health();

    if let Some(object) = ctx.world.object_mut(id) {
        object.inventory = inventory;
    }
    Ok(())
}

fn walk(ctx: &mut TickContext, id: EntityId, player: &mut Player, inventory: &mut Inventory, dir: Direction) {
    player.facing = dir;
    ctx.try_move(id, dir);
    let standing_on = ctx
        .pos(id)
        .and_then(|pos| ctx.world.material_at(pos))
        .is_some_and(|material| ctx.config.is_hazard(material));
    if standing_on {
        inventory.set_health(0);
        trace!(%id, "player walked into a hazard");
    }
}

/// Best owned weapon, never below the bare-hand damage
fn weapon_damage(config: &GameConfig, inventory: &Inventory) -> i32 {
    config
        .weapons
        .iter()
        .filter(|weapon| inventory.get(&weapon.item) > 0)
        .map(|weapon| weapon.damage)
        .fold(config.needs.base_damage, i32::max)
}

fn strike(ctx: &mut TickContext, player: &mut Player, inventory: &mut Inventory, occupant: EntityId) {
    let config = ctx.config;
    let damage = weapon_damage(config, inventory);
    let interaction = match ctx.world.object_mut(occupant) {
        Some(object) if !object.removed => object.on_interact(damage, config),
        _ => return,
    };
    match interaction {
        Interaction::Nothing => {}
        Interaction::Harvest { food } => {
            inventory.add(FOOD, food);
            player.achievements.unlock("eat_plant");
        }
        Interaction::Pickup { item } => {
            ctx.world.remove(occupant);
            inventory.add(item, 1);
            player.achievements.unlock(&format!("collect_{item}"));
        }
        Interaction::Strike { kill: None } => {}
        Interaction::Strike { kill: Some(reward) } => {
            player.achievements.unlock(&reward.achievement);
            if reward.food > 0 {
                inventory.add(FOOD, reward.food);
                player.hunger = 0.0;
            }
            trace!(%occupant, achievement = %reward.achievement, "player kills");
        }
    }
}

fn collect(ctx: &mut TickContext, player: &mut Player, inventory: &mut Inventory, target: Position) -> Result<(), WorldError> {
    let config = ctx.config;
    let Some(recipe) = ctx.world.material_at(target).and_then(|m| config.collect.get(m)) else {
        return Ok(());
    };
    if !inventory.has_all(&recipe.require) {
        return Ok(());
    }
    if recipe.receive.contains_key(DRINK) {
        player.thirst = 0.0;
    }
    inventory.consume(&recipe.consume);
    ctx.world.set_material(target, &recipe.leaves)?;
    if ctx.rng.gen::<f64>() <= recipe.probability {
        for (item, amount) in &recipe.receive {
            inventory.add(item, *amount);
            player.achievements.unlock(&format!("collect_{item}"));
        }
    }
    Ok(())
}

fn place(
    ctx: &mut TickContext,
    player: &mut Player,
    inventory: &mut Inventory,
    name: &str,
    target: Position,
    cell: Cell,
) -> Result<(), WorldError> {
    let config = ctx.config;
    let Some(recipe) = config.place.get(name) else {
        return Ok(());
    };
    if cell.occupant.is_some() {
        return Ok(());
    }
    let allowed = ctx
        .world
        .palette()
        .name(cell.material)
        .is_some_and(|material| recipe.on.iter().any(|m| m == material));
    if !allowed || !inventory.has_all(&recipe.uses) {
        return Ok(());
    }
    let object = match recipe.target {
        PlaceTarget::Material => None,
        PlaceTarget::Object(species) => match Object::spawn(species, target, config) {
            Some(object) => Some(object),
            None => return Ok(()),
        },
    };
    inventory.consume(&recipe.uses);
    match object {
        Some(object) => {
            ctx.world.add(object)?;
        }
        None => ctx.world.set_material(target, name)?,
    }
    player.achievements.unlock(&format!("place_{name}"));
    Ok(())
}

fn craft(ctx: &mut TickContext, player: &mut Player, inventory: &mut Inventory, name: &str, pos: Position) {
    let config = ctx.config;
    let Some(recipe) = config.craft.get(name) else {
        return;
    };
    let nearby = ctx.world.nearby(pos, config.world.craft_distance);
    if !recipe.nearby.iter().all(|m| nearby.materials.contains(m)) {
        return;
    }
    if !inventory.has_all(&recipe.uses) {
        return;
    }
    inventory.consume(&recipe.uses);
    match recipe.armor {
        Some(tier) => player.armor = Some(player.armor.map_or(tier, |current| current.max(tier))),
        None => inventory.add(name, recipe.gives),
    }
    player.achievements.unlock(&format!("make_{name}"));
}

/// Hunger, thirst and fatigue accumulate; crossing a limit moves a counter
fn update_needs(config: &GameConfig, player: &mut Player, inventory: &mut Inventory) {
    let needs = &config.needs;
    let rate = if player.sleeping { 0.5 } else { 1.0 };

    player.hunger += rate;
    if player.hunger > needs.hunger_limit {
        player.hunger = 0.0;
        inventory.add(FOOD, -1);
    }
    player.thirst += rate;
    if player.thirst > needs.thirst_limit {
        player.thirst = 0.0;
        inventory.add(DRINK, -1);
    }

    if player.sleeping {
        player.fatigue = (player.fatigue - 1.0).min(0.0);
    } else {
        player.fatigue += 1.0;
    }
    if player.fatigue < needs.rest_limit {
        player.fatigue = 0.0;
        inventory.add(ENERGY, 1);
    }
    if player.fatigue > needs.fatigue_limit {
        player.fatigue = 0.0;
        inventory.add(ENERGY, -1);
    }
}

fn drift_health(config: &GameConfig, player: &mut Player, inventory: &mut Inventory) {
    let needs = &config.needs;
    let fed = inventory.get(FOOD) > 0 && inventory.get(DRINK) > 0;
    let rested = inventory.get(ENERGY) > 0 || player.sleeping;
    if fed && rested {
        player.recover += if player.sleeping { 2.0 } else { 1.0 };
    } else {
        player.recover -= if player.sleeping { 0.5 } else { 1.0 };
    }
    if player.recover > needs.recover_limit {
        player.recover = 0.0;
        inventory.set_health(inventory.health() + 1);
    }
    if player.recover < needs.degen_limit {
        player.recover = 0.0;
        inventory.set_health(inventory.health() - 1);
    }
}
