mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use support::BridgeCapture;
use tongsim_lite::{AsyncLoop, LogLevel, LoopError, TaskError, TaskState};

fn started_loop(name: &str) -> (AsyncLoop, Arc<BridgeCapture>) {
    let capture = Arc::new(BridgeCapture::new());
    let event_loop = AsyncLoop::new(name, capture.clone(), LogLevel::Debug);
    event_loop.start(Duration::from_secs(1)).expect("loop should start");
    (event_loop, capture)
}

fn wait_until_stopped(event_loop: &AsyncLoop, bound: Duration) -> bool {
    let deadline = Instant::now() + bound;
    while event_loop.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    !event_loop.is_running()
}

#[test]
fn starting_twice_is_rejected() {
    let (event_loop, _capture) = started_loop("twice");
    let err = event_loop.start(Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, LoopError::AlreadyRunning { .. }));
    assert!(event_loop.is_running());
    event_loop.stop(Duration::from_secs(1));
}

#[test]
fn stop_without_start_is_a_no_op() {
    let event_loop = AsyncLoop::new("idle", Arc::new(BridgeCapture::new()), LogLevel::Debug);
    event_loop.stop(Duration::from_millis(10));
    event_loop.stop(Duration::from_millis(10));
    assert!(!event_loop.is_running());
    assert!(event_loop.thread_id().is_none());
}

#[test]
fn spawn_requires_a_running_loop() {
    let event_loop = AsyncLoop::new("cold", Arc::new(BridgeCapture::new()), LogLevel::Debug);
    let err = event_loop
        .spawn(async { Ok::<_, String>(1) }, "early")
        .unwrap_err();
    assert!(matches!(err, LoopError::NotRunning { .. }));
}

#[test]
fn every_task_runs_on_the_loop_thread() {
    let (event_loop, _capture) = started_loop("affinity");
    let loop_thread = event_loop.thread_id().unwrap();
    assert_ne!(loop_thread, thread::current().id());
    assert!(!event_loop.is_loop_thread());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            event_loop
                .spawn(
                    async move {
                        tokio::time::sleep(Duration::from_millis(i % 3)).await;
                        Ok::<_, String>(thread::current().id())
                    },
                    &format!("worker-{}", i),
                )
                .unwrap()
        })
        .collect();

    let seen: HashSet<_> = handles
        .into_iter()
        .map(|h| h.wait(Some(Duration::from_secs(2))).unwrap())
        .collect();
    assert_eq!(seen.len(), 1);
    assert!(seen.contains(&loop_thread));
    event_loop.stop(Duration::from_secs(1));
}

#[test]
fn task_value_and_error_come_back_unchanged() {
    let (event_loop, _capture) = started_loop("values");
    let value = event_loop
        .spawn(async { Ok::<_, String>(vec![1, 2, 3]) }, "ok")
        .unwrap()
        .wait(Some(Duration::from_secs(1)))
        .unwrap();
    assert_eq!(value, vec![1, 2, 3]);

    let err = event_loop
        .spawn(async { Err::<(), _>("bad input".to_string()) }, "fails")
        .unwrap()
        .wait(Some(Duration::from_secs(1)))
        .unwrap_err();
    assert_eq!(err.into_failure().as_deref(), Some("bad input"));
}

#[test]
fn failure_cancels_siblings_and_ends_the_loop() {
    let (event_loop, capture) = started_loop("cascade");

    let sibling = event_loop
        .spawn(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            },
            "long-sibling",
        )
        .unwrap();
    let failing = event_loop
        .spawn(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<(), _>("sensor offline".to_string())
            },
            "failing",
        )
        .unwrap();

    let started = Instant::now();
    let sibling_err = sibling.wait(Some(Duration::from_secs(2))).unwrap_err();
    assert!(sibling_err.is_cancelled(), "got {:?}", sibling_err);
    assert!(started.elapsed() < Duration::from_secs(2));

    let failing_err = failing.wait(Some(Duration::from_secs(1))).unwrap_err();
    assert!(matches!(failing_err, TaskError::Failed(ref m) if m == "sensor offline"));

    assert!(wait_until_stopped(&event_loop, Duration::from_secs(1)));
    assert!(capture.contains("sensor offline"));

    let err = event_loop
        .spawn(async { Ok::<_, String>(()) }, "after")
        .unwrap_err();
    assert!(matches!(err, LoopError::NotRunning { .. }));
}

#[test]
fn panicking_task_reports_and_ends_the_loop() {
    let (event_loop, capture) = started_loop("panics");
    let handle = event_loop
        .spawn(
            async {
                if true {
                    panic!("kaboom");
                }
                Ok::<(), String>(())
            },
            "panicky",
        )
        .unwrap();

    let err = handle.wait(Some(Duration::from_secs(1))).unwrap_err();
    assert!(matches!(err, TaskError::Panicked(ref m) if m == "kaboom"));
    assert!(wait_until_stopped(&event_loop, Duration::from_secs(1)));
    assert!(capture.contains("panicked: kaboom"));
}

#[test]
fn cancel_tasks_keeps_the_loop_alive() {
    let (event_loop, capture) = started_loop("cancel");
    let sleepers: Vec<_> = (0..3)
        .map(|i| {
            event_loop
                .spawn(
                    async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok::<_, String>(())
                    },
                    &format!("sleeper-{}", i),
                )
                .unwrap()
        })
        .collect();

    // Let the spawn commands reach the scope.
    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    event_loop.cancel_tasks(Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(1));

    for handle in sleepers {
        assert!(handle.wait(Some(Duration::from_millis(200))).unwrap_err().is_cancelled());
    }
    assert!(capture.contains("3 business task(s) cancelled"));
    assert!(event_loop.is_running());

    let after = event_loop
        .spawn(async { Ok::<_, String>("still here") }, "after-cancel")
        .unwrap();
    assert_eq!(after.wait(Some(Duration::from_secs(1))).unwrap(), "still here");
    event_loop.stop(Duration::from_secs(1));
}

#[test]
fn cancel_tasks_on_an_empty_scope_returns_at_once() {
    let (event_loop, capture) = started_loop("empty");
    let started = Instant::now();
    event_loop.cancel_tasks(Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!capture.contains("cancel_tasks timeout"));
    event_loop.stop(Duration::from_secs(1));
}

#[test]
fn cancel_tasks_gives_up_after_its_timeout() {
    let (event_loop, capture) = started_loop("stuck");
    let _blocker = event_loop
        .spawn(
            async {
                // Blocks the loop thread so the cancel request cannot be served.
                thread::sleep(Duration::from_millis(400));
                Ok::<_, String>(())
            },
            "blocker",
        )
        .unwrap();
    thread::sleep(Duration::from_millis(30));

    let started = Instant::now();
    event_loop.cancel_tasks(Duration::from_millis(50));
    assert!(started.elapsed() < Duration::from_millis(350));
    assert!(capture.contains("cancel_tasks timeout."));
    event_loop.stop(Duration::from_secs(2));
}

#[test]
fn stop_cancels_pending_work_within_bound() {
    let (event_loop, capture) = started_loop("stopper");
    let handle = event_loop
        .spawn(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            },
            "long",
        )
        .unwrap();

    let started = Instant::now();
    event_loop.stop(Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!event_loop.is_running());
    assert!(handle.wait(Some(Duration::from_millis(100))).unwrap_err().is_cancelled());
    assert!(!capture.contains("did not exit cleanly"));
}

#[test]
fn stop_detaches_a_thread_that_will_not_exit() {
    let (event_loop, capture) = started_loop("wedged");
    let _blocker = event_loop
        .spawn(
            async {
                thread::sleep(Duration::from_millis(400));
                Ok::<_, String>(())
            },
            "wedge",
        )
        .unwrap();
    thread::sleep(Duration::from_millis(30));

    let started = Instant::now();
    event_loop.stop(Duration::from_millis(50));
    assert!(started.elapsed() < Duration::from_millis(350));
    assert!(capture.contains("AsyncLoop 'wedged' did not exit cleanly."));
    assert!(!event_loop.is_running());
    assert!(event_loop.thread_id().is_none());
}

#[test]
fn loop_can_restart_after_stop() {
    let (event_loop, _capture) = started_loop("restart");
    let first = event_loop.thread_id().unwrap();
    event_loop.stop(Duration::from_secs(1));

    event_loop.start(Duration::from_secs(1)).unwrap();
    let second = event_loop.thread_id().unwrap();
    assert_ne!(first, second);
    let value = event_loop
        .spawn(async { Ok::<_, String>(9) }, "again")
        .unwrap()
        .wait(Some(Duration::from_secs(1)))
        .unwrap();
    assert_eq!(value, 9);
}

#[test]
fn snapshot_lists_pending_tasks_in_order() {
    let (event_loop, capture) = started_loop("snapshot");
    for name in ["alpha", "beta"] {
        event_loop
            .spawn(
                async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, String>(())
                },
                name,
            )
            .unwrap();
    }

    let tasks = event_loop.task_snapshot(Duration::from_secs(1));
    let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(tasks.iter().all(|t| t.state == TaskState::Pending));
    assert!(tasks[0].seq < tasks[1].seq);

    event_loop.log_task_list();
    assert!(capture.contains("2 active task(s)"));
    assert!(capture.contains("beta [pending]"));
    event_loop.stop(Duration::from_secs(1));
}

#[test]
fn dropping_the_loop_stops_it() {
    let capture = Arc::new(BridgeCapture::new());
    {
        let event_loop = AsyncLoop::new("dropped", capture.clone(), LogLevel::Debug);
        event_loop.start(Duration::from_secs(1)).unwrap();
    }
    assert!(capture.contains("[AsyncLoop dropped] dropped, attempting cleanup."));
    assert!(capture.contains("[AsyncLoop dropped] stopped."));
}

#[test]
fn start_timeout_leaves_the_loop_restartable() {
    let capture = Arc::new(BridgeCapture::new());
    let event_loop = AsyncLoop::new("impatient", capture.clone(), LogLevel::Debug);

    let err = event_loop.start(Duration::ZERO).unwrap_err();
    assert!(matches!(err, LoopError::StartTimeout { ref name } if name == "impatient"));
    assert!(!event_loop.is_running());
    assert!(event_loop.thread_id().is_none());
    assert!(capture.contains("abandoning start"));
    assert!(matches!(
        event_loop.spawn(async { Ok::<_, String>(()) }, "orphan"),
        Err(LoopError::NotRunning { .. })
    ));

    event_loop.start(Duration::from_secs(1)).unwrap();
    let value = event_loop
        .spawn(async { Ok::<_, String>(7) }, "after retry")
        .unwrap()
        .wait(Some(Duration::from_secs(1)))
        .unwrap();
    assert_eq!(value, 7);
    event_loop.stop(Duration::from_secs(1));
}
