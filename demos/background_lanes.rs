use std::time::Duration;
use tickflow::{steps, Lane, SchedulerBuilder, Signal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🧵 Thread and task lanes run without any host ticks...\n");

    let scheduler = SchedulerBuilder::new()
        .register("autosave", || {
            (1..=3).map(|n| {
                println!("[AUTOSAVE] Slot {} written on {:?}", n, std::thread::current().name());
                Signal::wait_millis(200)
            })
        })
        .register("asset_stream", || {
            (1..=4).map(|chunk| {
                println!("[STREAM] Chunk {}/4 loaded", chunk);
                Signal::wait_millis(100)
            })
        })
        .register("heartbeat", || {
            std::iter::repeat_with(|| {
                println!("[HEARTBEAT] alive");
                Signal::wait_millis(150)
            })
        })
        .register("bad_mod", || {
            steps::script()
                .wait(Duration::from_millis(50))
                .run(|| panic!("mod script crashed"))
        })
        .build()?;

    scheduler.start_on_thread("autosave")?;
    scheduler.start_on_task("asset_stream")?;
    scheduler.start_on_task("heartbeat")?;
    scheduler.start_on_thread("bad_mod")?;

    if let Some(failure) = scheduler.wait_failure(Duration::from_secs(1)) {
        println!("\n⚠️  {}\n", failure);
    }

    std::thread::sleep(Duration::from_millis(800));
    println!("\n⏹  Stopping heartbeat (still running: {})", scheduler.is_running_on("heartbeat", Lane::Task));
    scheduler.stop("heartbeat");

    println!("✅ Lanes left: threads={:?} tasks={:?}",
        scheduler.running_keys(Lane::Thread),
        scheduler.running_keys(Lane::Task));

    scheduler.shutdown();
    Ok(())
}
