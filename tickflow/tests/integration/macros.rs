//! `#[routine]` auto-registration and file configuration.

use crate::common::{init_tracing, wait_until, Journal};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tickflow::{routine, steps, Lane, SchedulerBuilder, SchedulerError, Signal};
use tempfile::NamedTempFile;

static HEARTBEATS: AtomicUsize = AtomicUsize::new(0);

#[routine(key = "macro-heartbeat")]
fn heartbeat() -> impl Iterator<Item = Signal> + Send {
    (0..3).map(|_| {
        HEARTBEATS.fetch_add(1, Ordering::SeqCst);
        Signal::Continue
    })
}

#[routine(key = "macro-disabled", enabled = false)]
fn disabled() -> steps::Script {
    steps::script().run(|| panic!("disabled routine must not be registered"))
}

#[routine(key = "macro-configured", enabled = "${app.configured_enabled:true}")]
fn configured() -> steps::Script {
    steps::script().end()
}

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn register_all_collects_enabled_routines() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().register_all().build().unwrap();

    assert!(scheduler.is_registered("macro-heartbeat"));
    assert!(scheduler.is_registered("macro-configured"));
    assert!(!scheduler.is_registered("macro-disabled"));

    let before = HEARTBEATS.load(Ordering::SeqCst);
    scheduler.start_if_not_running("macro-heartbeat").unwrap();
    scheduler.tick(Duration::from_millis(16));
    scheduler.tick(Duration::from_millis(16));
    assert_eq!(HEARTBEATS.load(Ordering::SeqCst) - before, 3);
    scheduler.tick(Duration::from_millis(16));
    assert!(!scheduler.is_running("macro-heartbeat"));
}

#[test]
fn routines_are_not_registered_without_register_all() {
    init_tracing();
    let scheduler = SchedulerBuilder::new().build().unwrap();
    assert!(!scheduler.is_registered("macro-heartbeat"));
    assert!(matches!(
        scheduler.start_if_not_running("macro-heartbeat"),
        Err(SchedulerError::NotFound(_))
    ));
}

#[test]
fn toml_config_drives_enabled_flags_and_lane_settings() {
    init_tracing();
    let file = toml_file(
        r#"
[scheduler]
thread_name_prefix = "game-lane"
task_worker_threads = 1

[app]
configured_enabled = false
"#,
    );

    let journal = Journal::new();
    let j = journal.clone();
    let scheduler = SchedulerBuilder::with_toml(file.path().to_str().unwrap())
        .unwrap()
        .register_all()
        .register("whoami", move || {
            let j = j.clone();
            steps::script().run(move || {
                j.push(std::thread::current().name().unwrap_or("unnamed"));
            })
        })
        .build()
        .unwrap();

    assert_eq!(scheduler.config().thread_name_prefix, "game-lane");
    assert_eq!(scheduler.config().task_worker_threads, 1);
    assert!(!scheduler.is_registered("macro-configured"));
    assert!(scheduler.is_registered("macro-heartbeat"));

    scheduler.start_on_thread("whoami").unwrap();
    wait_until(Duration::from_secs(5), "named thread lane", || {
        !scheduler.is_running_on("whoami", Lane::Thread)
    });
    assert_eq!(journal.entries(), vec!["game-lane-whoami"]);
}

#[test]
fn yaml_config_is_supported() {
    init_tracing();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "scheduler:\n  task_thread_name: yaml-pool\napp:\n  configured_enabled: true").unwrap();

    let scheduler = SchedulerBuilder::with_yaml(file.path().to_str().unwrap())
        .unwrap()
        .register_all()
        .build()
        .unwrap();

    assert_eq!(scheduler.config().task_thread_name, "yaml-pool");
    assert!(scheduler.is_registered("macro-configured"));
}

#[test]
fn malformed_scheduler_table_fails_the_build() {
    init_tracing();
    let file = toml_file("[scheduler]\ntask_worker_threads = \"lots\"\n");
    let result = SchedulerBuilder::with_toml(file.path().to_str().unwrap())
        .unwrap()
        .build();
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[test]
fn missing_config_file_is_an_error() {
    init_tracing();
    let result = SchedulerBuilder::with_toml("/definitely/not/here.toml");
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}
