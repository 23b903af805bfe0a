//! Demo terrain
//!
//! A fixed biome layout with seeded scatter, painted through the public
//! `set_material` path like any other generator. Meant for the binary and
//! the integration tests, not for gameplay quality.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::components::Position;
use crate::error::WorldError;
use crate::spatial::{Rect, SpatialWorld};

/// Paint the whole world. The area around the centre is always open grass.
pub fn paint_demo(world: &mut SpatialWorld, seed: u64) -> Result<(), WorldError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (w, h) = world.area();
    let (w, h) = (w as i32, h as i32);
    let center = Position::new(w / 2, h / 2);
    let all = Rect { xmin: 0, xmax: w, ymin: 0, ymax: h };

    for pos in all.cells() {
        let material = pick(pos, center, (w, h), &mut rng);
        world.set_material(pos, material)?;
    }
    Ok(())
}

fn pick(pos: Position, center: Position, (w, h): (i32, i32), rng: &mut ChaCha8Rng) -> &'static str {
    let roll: f64 = rng.gen();
    if pos.distance(center) <= 4 {
        return "grass";
    }

    // Mountain range along the east edge
    if pos.x >= w * 3 / 4 {
        return match roll {
            r if r < 0.25 => "path",
            r if r < 0.31 => "coal",
            r if r < 0.34 => "iron",
            r if r < 0.345 => "diamond",
            r if r < 0.355 => "lava",
            _ => "stone",
        };
    }

    // Polar strip to the north, desert to the south
    if pos.y < h / 8 {
        return if roll < 0.05 { "ice" } else { "snow" };
    }
    if pos.y >= h * 7 / 8 {
        return if roll < 0.02 { "water" } else { "sand" };
    }

    // Lake in the west with a beach
    let lake = Position::new(w / 5, h / 2);
    let dx = pos.x - lake.x;
    let dy = pos.y - lake.y;
    let r2 = dx * dx + dy * dy;
    let radius = (w.min(h) / 8).max(2);
    if r2 <= radius * radius {
        return "water";
    }
    if r2 <= (radius + 2) * (radius + 2) {
        return "sand";
    }

    if roll < 0.12 {
        "tree"
    } else {
        "grass"
    }
}
