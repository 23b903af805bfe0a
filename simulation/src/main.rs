//! TileWorld Simulation Benchmark
//!
//! Runs a random-policy episode on the demo terrain and reports timing.

use simulation::{random_policy, terrain, GameConfig, Runner, SimulationWorld};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const SEED: u64 = 7;
const TICKS: u64 = 10_000;

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("TileWorld simulation engine starting...");

    let config = GameConfig::standard()?;
    let mut world = SimulationWorld::new(config, SEED)?;
    terrain::paint_demo(world.world_mut(), SEED)?;
    let (w, h) = world.world().area();
    info!("Painted {}x{} demo terrain", w, h);

    info!("Running up to {} ticks...", TICKS);
    let start = std::time::Instant::now();
    let mut runner = Runner::new(world, random_policy, SEED);
    let summary = runner.run(TICKS)?;
    let elapsed = start.elapsed();

    info!(
        "Run complete: {:?} total, {:?} per tick, {} ticks, final health {}",
        elapsed,
        elapsed / summary.ticks.max(1) as u32,
        summary.ticks,
        summary.final_health
    );
    info!(
        "Balancer spawned {} and despawned {} entities",
        summary.spawned, summary.despawned
    );
    for (species, count) in &summary.population {
        info!("  {}: {}", species, count);
    }
    info!("Achievements: {}", summary.achievements.join(", "));

    Ok(())
}
