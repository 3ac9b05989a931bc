//! Thread and task lanes.

use crate::common::{every, forever, init_tracing, wait_until, Counter, Journal};
use std::time::{Duration, Instant};
use tickflow::{steps, Lane, Scheduler, SchedulerBuilder, Signal};

const PATIENCE: Duration = Duration::from_secs(5);

fn scheduler() -> Scheduler {
    init_tracing();
    SchedulerBuilder::new().build().unwrap()
}

#[test]
fn thread_lane_runs_to_completion_and_cleans_up() {
    let scheduler = scheduler();
    let journal = Journal::new();
    let j = journal.clone();
    scheduler.register("worker", move || {
        let (a, b) = (j.clone(), j.clone());
        steps::script()
            .run(move || a.push("start"))
            .wait(Duration::from_millis(20))
            .run(move || b.push("done"))
    });

    assert!(scheduler.start_on_thread("worker").unwrap());
    assert!(scheduler.is_running_on("worker", Lane::Thread));

    wait_until(PATIENCE, "thread lane to finish", || !scheduler.is_running("worker"));
    assert_eq!(journal.entries(), vec!["start", "done"]);
    assert!(scheduler.running_keys(Lane::Thread).is_empty());
}

#[test]
fn task_lane_runs_to_completion_and_cleans_up() {
    let scheduler = scheduler();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("job", move || {
        let c = c.clone();
        (0..5).map(move |_| {
            c.bump();
            Signal::wait_millis(2)
        })
    });

    assert!(scheduler.start_on_task("job").unwrap());
    wait_until(PATIENCE, "task lane to finish", || !scheduler.is_running("job"));
    assert_eq!(counter.get(), 5);
}

#[test]
fn lanes_do_not_depend_on_ticks() {
    let scheduler = scheduler();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("pulse", move || every(c.clone(), Duration::from_millis(1)));

    scheduler.start_on_thread("pulse").unwrap();
    wait_until(PATIENCE, "several pulses without ticking", || counter.get() >= 3);
    assert!(scheduler.stop("pulse"));
}

#[test]
fn lanes_are_single_flight_per_key() {
    let scheduler = scheduler();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("busy", move || every(c.clone(), Duration::from_millis(5)));

    assert!(scheduler.start_on_thread("busy").unwrap());
    assert!(!scheduler.start_on_thread("busy").unwrap());
    assert!(scheduler.start_on_task("busy").unwrap());
    assert!(!scheduler.start_on_task("busy").unwrap());

    scheduler.stop("busy");
    assert!(!scheduler.is_running("busy"));
}

#[test]
fn stop_cancels_a_waiting_thread_lane_promptly() {
    let scheduler = scheduler();
    let journal = Journal::new();
    let j = journal.clone();
    scheduler.register("sleeper", move || {
        let j = j.clone();
        steps::script()
            .wait(Duration::from_secs(60))
            .run(move || j.push("woke"))
    });

    scheduler.start_on_thread("sleeper").unwrap();
    let started = Instant::now();
    assert!(scheduler.stop_lane("sleeper", Lane::Thread));

    assert!(started.elapsed() < PATIENCE);
    assert!(!scheduler.is_running("sleeper"));
    assert!(journal.entries().is_empty());
}

#[test]
fn stop_cancels_a_waiting_task_lane_promptly() {
    let scheduler = scheduler();
    let journal = Journal::new();
    let j = journal.clone();
    scheduler.register("sleeper", move || {
        let j = j.clone();
        steps::script()
            .wait(Duration::from_secs(60))
            .run(move || j.push("woke"))
    });

    scheduler.start_on_task("sleeper").unwrap();
    let started = Instant::now();
    assert!(scheduler.stop_lane("sleeper", Lane::Task));

    assert!(started.elapsed() < PATIENCE);
    assert!(!scheduler.is_running("sleeper"));
    assert!(journal.entries().is_empty());
}

#[test]
fn stop_cancels_a_busy_lane_at_its_next_checkpoint() {
    let scheduler = scheduler();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("spinner", move || forever(c.clone()));

    scheduler.start_on_thread("spinner").unwrap();
    scheduler.start_on_task("spinner").unwrap();
    wait_until(PATIENCE, "spinner to spin", || counter.get() > 10);

    assert!(scheduler.stop("spinner"));
    let after_stop = counter.get();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(counter.get(), after_stop);
}

#[test]
fn thread_and_tick_lanes_are_independent() {
    let scheduler = scheduler();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("dual", move || every(c.clone(), Duration::from_millis(5)));

    assert!(scheduler.start_on_thread("dual").unwrap());
    assert!(scheduler.start_if_not_running("dual").unwrap());
    assert!(scheduler.is_running_on("dual", Lane::Thread));
    assert!(scheduler.is_running_on("dual", Lane::Tick));

    assert!(scheduler.stop_lane("dual", Lane::Thread));
    assert!(!scheduler.is_running_on("dual", Lane::Thread));
    assert!(scheduler.is_running_on("dual", Lane::Tick));
    assert!(scheduler.is_running("dual"));

    assert!(scheduler.stop_lane("dual", Lane::Tick));
    assert!(!scheduler.is_running("dual"));
}

#[test]
fn a_lane_may_stop_itself() {
    let scheduler = scheduler();
    let counter = Counter::new();
    for (key, lane) in [("self-thread", Lane::Thread), ("self-task", Lane::Task)] {
        let handle = scheduler.clone();
        let c = counter.clone();
        scheduler.register(key, move || {
            let handle = handle.clone();
            let c = c.clone();
            std::iter::repeat_with(move || {
                c.bump();
                handle.stop_lane(key, lane);
                Signal::Continue
            })
        });
        scheduler.start(key, lane).unwrap();
    }

    wait_until(PATIENCE, "self-stopping lanes to exit", || {
        !scheduler.is_running("self-thread") && !scheduler.is_running("self-task")
    });
    // each lane ran exactly one step before noticing its own cancellation
    assert_eq!(counter.get(), 2);
}

#[test]
fn restarting_after_stop_does_not_lose_the_new_run() {
    let scheduler = scheduler();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("cycle", move || every(c.clone(), Duration::from_millis(1)));

    for _ in 0..5 {
        assert!(scheduler.start_on_thread("cycle").unwrap());
        assert!(scheduler.stop_lane("cycle", Lane::Thread));
    }
    assert!(scheduler.start_on_thread("cycle").unwrap());
    // an earlier run retiring late must not remove the current entry
    std::thread::sleep(Duration::from_millis(20));
    assert!(scheduler.is_running_on("cycle", Lane::Thread));
    scheduler.stop("cycle");
}

#[test]
fn task_lane_can_use_a_caller_supplied_runtime() {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let scheduler = SchedulerBuilder::new()
        .with_runtime(runtime.handle().clone())
        .build()
        .unwrap();

    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("external", move || every(c.clone(), Duration::from_millis(1)));

    scheduler.start_on_task("external").unwrap();
    wait_until(PATIENCE, "task on the external runtime", || counter.get() >= 3);
    assert!(scheduler.stop("external"));

    scheduler.shutdown();
    // the caller's runtime is still usable
    assert_eq!(runtime.block_on(async { 7 }), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stopping_from_async_code_does_not_stall_the_runtime() {
    init_tracing();
    let scheduler = SchedulerBuilder::new()
        .with_runtime(tokio::runtime::Handle::current())
        .build()
        .unwrap();
    let counter = Counter::new();
    let c = counter.clone();
    scheduler.register("async-stop", move || every(c.clone(), Duration::from_millis(1)));

    scheduler.start_on_task("async-stop").unwrap();
    while counter.get() < 3 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(scheduler.stop("async-stop"));
    assert!(!scheduler.is_running("async-stop"));
    scheduler.shutdown();
}

#[test]
fn thread_lane_accepts_keys_with_nul_bytes() {
    let scheduler = scheduler();
    let journal = Journal::new();
    let j = journal.clone();
    scheduler.register("bad\0key", move || {
        let j = j.clone();
        steps::script().run(move || {
            j.push(std::thread::current().name().unwrap_or("unnamed"));
        })
    });

    assert!(scheduler.start_on_thread("bad\0key").unwrap());
    wait_until(PATIENCE, "nul-keyed lane to finish", || !scheduler.is_running("bad\0key"));
    assert_eq!(journal.entries(), vec!["tickflow-lane-badkey"]);
}

#[test]
fn task_lane_is_retired_when_its_runtime_goes_away() {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let scheduler = SchedulerBuilder::new()
        .with_runtime(runtime.handle().clone())
        .build()
        .unwrap();
    scheduler.register("sleeper", || {
        steps::script().wait(Duration::from_secs(60)).end()
    });

    assert!(scheduler.start_on_task("sleeper").unwrap());
    assert!(scheduler.is_running_on("sleeper", Lane::Task));

    drop(runtime);
    wait_until(PATIENCE, "dropped task lane to be retired", || {
        !scheduler.is_running_on("sleeper", Lane::Task)
    });
    assert!(scheduler.running_keys(Lane::Task).is_empty());
    assert!(!scheduler.stop("sleeper"));
}
