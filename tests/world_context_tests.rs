mod support;

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use support::{fake_context, fast_settings, BridgeCapture, DropRecorder, FakeConnector, Journal};
use tongsim_lite::{
    ConnectError, ConnectionError, ContextError, LogLevel, LoopError, TaskError, TongSim, WorldContext,
};

#[derive(Debug, PartialEq)]
enum MotionError {
    OutOfReach(u32),
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::OutOfReach(d) => write!(f, "target {}cm out of reach", d),
        }
    }
}

fn wait_for_loop_exit(ctx: &WorldContext) {
    let deadline = Instant::now() + Duration::from_secs(1);
    while ctx.event_loop().is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn sync_run_returns_the_work_value() {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    let value = ctx
        .sync_run(|_conn| async { Ok::<_, Infallible>(42) }, Some(Duration::from_secs(1)))
        .unwrap();
    assert_eq!(value, 42);
}

#[test]
fn connection_is_established_on_the_loop_thread() {
    let (ctx, connector, journal, _capture) = fake_context(LogLevel::Warn);
    let connect_thread = connector.connect_thread.lock().unwrap().unwrap();
    assert_eq!(Some(connect_thread), ctx.event_loop().thread_id());
    assert_ne!(connect_thread, thread::current().id());
    assert_eq!(journal.entries(), vec!["connect"]);
    assert_eq!(ctx.endpoint(), "fake:5726");
    assert_eq!(ctx.uuid().len(), 8);
    assert!(ctx.id().to_string().starts_with(&ctx.uuid()));
}

#[test]
fn work_reaches_the_connection() {
    let (ctx, _connector, journal, _capture) = fake_context(LogLevel::Warn);
    let echoed = ctx
        .sync_run(
            |conn| async move { conn.call("Echo", b"ping".to_vec()).await },
            Some(Duration::from_secs(1)),
        )
        .unwrap();
    assert_eq!(echoed, b"ping".to_vec());
    assert_eq!(journal.entries(), vec!["connect", "call:Echo"]);
}

#[test]
fn work_error_propagates_unchanged() {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    let err = ctx
        .sync_run(
            |_conn| async { Err::<(), _>(MotionError::OutOfReach(120)) },
            Some(Duration::from_secs(1)),
        )
        .unwrap_err();
    assert_eq!(err.into_failure(), Some(MotionError::OutOfReach(120)));
}

#[test]
fn connection_error_propagates_through_sync_run() {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    let err = ctx
        .sync_run(
            |conn| async move { conn.call("fail", Vec::new()).await },
            Some(Duration::from_secs(1)),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ContextError::Task(TaskError::Failed(ConnectionError::Remote(ref m))) if m == "rejected"
    ));
}

#[test]
fn sync_run_times_out_near_its_bound() {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    let started = Instant::now();
    let err = ctx
        .sync_run(
            |_conn| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Infallible>(())
            },
            Some(Duration::from_millis(100)),
        )
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(800));

    // The timed-out work is still scheduled; release must cancel it.
    let started = Instant::now();
    ctx.release();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn sync_run_from_the_loop_thread_would_deadlock() {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    let ctx = Arc::new(ctx);
    let inner = ctx.clone();

    let started = Instant::now();
    let nested = ctx
        .sync_run(
            move |_conn| async move {
                let outcome = inner.sync_run(|_conn| async { Ok::<_, Infallible>(1) }, None);
                Ok::<_, Infallible>(matches!(outcome, Err(ContextError::WouldDeadlock { .. })))
            },
            Some(Duration::from_secs(2)),
        )
        .unwrap();
    assert!(nested);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn failing_async_task_cancels_its_siblings() {
    let (ctx, _connector, _journal, capture) = fake_context(LogLevel::Debug);
    let long = ctx
        .async_task(
            |_conn| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            },
            "B-long",
        )
        .unwrap();
    let failing = ctx
        .async_task(
            |_conn| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err::<(), _>("A failed".to_string())
            },
            "A-failing",
        )
        .unwrap();

    assert!(failing.wait(Some(Duration::from_secs(1))).unwrap_err().into_failure().is_some());
    assert!(long.wait(Some(Duration::from_secs(2))).unwrap_err().is_cancelled());
    assert!(capture.contains("A failed"));

    // The session is gone; later work is refused.
    wait_for_loop_exit(&ctx);
    let err = ctx
        .sync_run(|_conn| async { Ok::<_, Infallible>(()) }, Some(Duration::from_secs(1)))
        .unwrap_err();
    assert!(matches!(err, ContextError::Loop(LoopError::NotRunning { .. })));
}

#[test]
fn release_is_idempotent() {
    let (ctx, connector, _journal, capture) = fake_context(LogLevel::Debug);
    ctx.release();
    ctx.release();
    assert!(ctx.is_released());
    drop(ctx);

    assert_eq!(capture.count("releasing..."), 1);
    assert_eq!(capture.count("release complete."), 1);
    assert_eq!(connector.connection().close_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn release_cancels_tasks_then_closes_then_stops() {
    let (ctx, connector, journal, _capture) = fake_context(LogLevel::Warn);
    let loop_thread = ctx.event_loop().thread_id().unwrap();
    let guard = DropRecorder::new(&journal, "task-cancelled");
    let handle = ctx
        .async_task(
            move |_conn| async move {
                let _guard = guard;
                std::future::pending::<()>().await;
                Ok::<_, Infallible>(())
            },
            "background",
        )
        .unwrap();

    ctx.release();
    assert!(!ctx.event_loop().is_running());
    assert_eq!(journal.entries(), vec!["connect", "task-cancelled", "close"]);
    assert_eq!(*connector.connection().close_thread.lock().unwrap(), Some(loop_thread));
    assert!(handle.wait(Some(Duration::from_millis(100))).unwrap_err().is_cancelled());
}

#[test]
fn release_with_a_sleeping_task_is_bounded() {
    let (ctx, _connector, _journal, capture) = fake_context(LogLevel::Warn);
    let mut handle = ctx
        .async_task(
            |_conn| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Infallible>(())
            },
            "sleepy",
        )
        .unwrap();

    let started = Instant::now();
    ctx.release();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(handle.wait_settled(Duration::from_millis(100)));
    assert!(handle.is_cancelled());
    assert!(!capture.contains("failed to release cleanly"));
}

#[test]
fn work_after_release_is_refused() {
    let (ctx, _connector, _journal, _capture) = fake_context(LogLevel::Warn);
    ctx.release();
    let err = ctx
        .sync_run(|_conn| async { Ok::<_, Infallible>(()) }, None)
        .unwrap_err();
    assert!(matches!(err, ContextError::Loop(LoopError::NotRunning { .. })));
    assert!(ctx.async_task(|_conn| async { Ok::<_, Infallible>(()) }, "late").is_err());
}

#[test]
fn release_after_the_loop_died_logs_and_returns() {
    let (ctx, connector, _journal, capture) = fake_context(LogLevel::Warn);
    let _ = ctx.sync_run(|_conn| async { Err::<(), _>("fatal") }, Some(Duration::from_secs(1)));
    wait_for_loop_exit(&ctx);

    ctx.release();
    assert!(capture.contains("failed to release cleanly"));
    assert_eq!(connector.connection().close_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_connection_surfaces_as_connect_error() {
    let journal = Journal::default();
    let capture = Arc::new(BridgeCapture::new());
    let connector = Arc::new(FakeConnector::failing(&journal));
    let err = WorldContext::new("fake:1", connector, capture.clone(), fast_settings(LogLevel::Warn))
        .unwrap_err();

    match err {
        ConnectError::Connection { endpoint, source } => {
            assert_eq!(endpoint, "fake:1");
            assert!(matches!(source.into_failure(), Some(ConnectionError::Remote(_))));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(capture.contains("connection to fake:1 failed"));
}

#[test]
fn facade_closes_its_context_once() {
    let journal = Journal::default();
    let connector = Arc::new(FakeConnector::new(&journal));
    let sim = TongSim::with_connector(
        "fake:5726",
        connector.clone(),
        Arc::new(BridgeCapture::new()),
        fast_settings(LogLevel::Warn),
    )
    .unwrap();

    let value = sim
        .context()
        .sync_run(|conn| async move { conn.call("Echo", vec![7]).await }, None)
        .unwrap();
    assert_eq!(value, vec![7]);

    sim.close();
    assert!(sim.context().is_released());
    drop(sim);
    assert_eq!(connector.connection().close_calls.load(Ordering::SeqCst), 1);
}
