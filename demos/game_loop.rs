use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tickflow::{routine, steps, ManualHost, SchedulerBuilder, Signal};

static SPAWNED: AtomicU32 = AtomicU32::new(0);

/// Spawns an enemy every 500ms of game time, five times
#[routine(key = "spawner")]
fn spawner() -> impl Iterator<Item = Signal> + Send {
    (0..5).map(|_| {
        let wave = SPAWNED.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[SPAWNER] Enemy #{} spawned", wave);
        Signal::wait_secs(0.5)
    })
}

/// Skipped unless the config turns it on
#[routine(key = "debug_overlay", enabled = "${app.debug_overlay:false}")]
fn debug_overlay() -> steps::Script {
    steps::script().run(|| println!("[OVERLAY] Should not appear with the default config"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🎮 Running a 60 FPS loop with a 50 Hz physics step...\n");

    let scheduler = SchedulerBuilder::new()
        .register_all()
        .register("banner", || {
            steps::script()
                .run(|| println!("[BANNER] Level 1"))
                .wait(Duration::from_secs(1))
                .run(|| println!("[BANNER] Fight!"))
        })
        .register("gravity", || {
            steps::from_fn(10.0_f64, |height| {
                *height -= 0.5;
                if *height <= 0.0 {
                    println!("[GRAVITY] Landed");
                    return Some(Signal::End);
                }
                Some(Signal::Continue)
            })
        })
        .build()?;

    let mut host = ManualHost::new();
    scheduler.attach(&mut host);

    scheduler.start_if_not_running("spawner")?;
    scheduler.start_if_not_running("banner")?;
    scheduler.start_physics_if_not_running("gravity")?;

    let frame = Duration::from_micros(16_667);
    let fixed = Duration::from_millis(20);
    let mut physics_debt = Duration::ZERO;
    let started = Instant::now();

    // three seconds of simulated game time
    for _ in 0..180 {
        host.frame(frame);
        physics_debt += frame;
        while physics_debt >= fixed {
            host.fixed_step(fixed);
            physics_debt -= fixed;
        }
    }

    println!("\n📊 RESULTS after 180 frames:");
    println!("   Enemies spawned: {} (expected 5)", SPAWNED.load(Ordering::SeqCst));
    println!("   Still running: {:?}", scheduler.running_keys(tickflow::Lane::Tick));
    println!("   Wall time: {:?}", started.elapsed());

    scheduler.shutdown();
    Ok(())
}
