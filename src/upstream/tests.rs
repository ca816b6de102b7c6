//! Delivery, retry and shutdown behaviour of the upstream hooks.

use std::{
    thread,
    time::{Duration, Instant},
};

use proptest::prelude::*;
use rstest::{fixture, rstest};
use serde_json::Value;

use crate::{
    exit::ExitCoordinator,
    hook::Hook,
    level::LogLevel,
    log_record::LogRecord,
    test_utils::{
        collecting_hook::CollectingSink,
        line_server::{LineServer, StalledServer, unused_addr},
    },
};

use super::{
    BufferedUpstreamHook, OverflowPolicy, RetryInterval, UnbufferedUpstreamHook, UpstreamConfig,
    UpstreamHook, hook_for_endpoint,
};

#[fixture]
fn sink() -> CollectingSink {
    CollectingSink::default()
}

fn test_config(sink: &CollectingSink) -> UpstreamConfig {
    UpstreamConfig::default()
        .with_diagnostics(sink.diagnostics())
        .with_connect_timeout(Duration::from_secs(1))
}

fn messages(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("line is JSON");
            value["message"].as_str().expect("message").to_owned()
        })
        .collect()
}

fn info(message: &str) -> LogRecord {
    LogRecord::new(LogLevel::Info, message)
}

// Larger than the loopback socket buffers, so a write to a collector that
// never reads blocks.
fn oversized() -> LogRecord {
    info(&"x".repeat(24 * 1024 * 1024))
}

fn wait_for(mut done: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

/// Buffered hook whose worker is blocked writing to `server`, with a 200ms
/// exit timeout and a 10s write timeout.
fn stalled_hook(sink: &CollectingSink, server: &StalledServer) -> BufferedUpstreamHook {
    let mut config = test_config(sink).with_exit_timeout(Duration::from_millis(200));
    config.flush_interval = Duration::from_millis(20);
    config.write_timeout = Duration::from_secs(10);
    let hook = BufferedUpstreamHook::new(&server.endpoint(), config).unwrap();
    hook.fire(&oversized());
    assert!(wait_for(|| server.accepted() == 1, Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(200));
    hook
}

#[rstest]
fn buffered_delivers_records_in_order(sink: CollectingSink) {
    let server = LineServer::start();
    let hook = BufferedUpstreamHook::new(&server.endpoint(), test_config(&sink)).unwrap();
    for message in ["one", "two", "three"] {
        hook.fire(&info(message));
    }
    let lines = server.collect(3, Duration::from_secs(3));
    assert_eq!(messages(&lines), ["one", "two", "three"]);
    assert_eq!(server.accepted(), 1);
}

#[rstest]
fn buffered_retries_until_collector_appears(sink: CollectingSink) {
    let addr = unused_addr();
    let retry = RetryInterval::new(Duration::from_millis(100));
    let config = test_config(&sink).with_retry_interval(retry);
    let hook = BufferedUpstreamHook::new(&addr.to_string(), config).unwrap();
    for message in ["a", "b", "c", "d"] {
        hook.fire(&info(message));
    }

    thread::sleep(Duration::from_millis(300));
    let server = LineServer::bind(addr);
    let lines = server.collect(4, Duration::from_secs(3));
    assert_eq!(messages(&lines), ["a", "b", "c", "d"]);
    assert!(sink.count_containing("failed to connect") >= 1);
}

#[rstest]
fn retry_interval_changes_reach_running_worker(sink: CollectingSink) {
    let addr = unused_addr();
    let retry = RetryInterval::new(Duration::from_millis(800));
    let config = test_config(&sink).with_retry_interval(retry.clone());
    let hook = BufferedUpstreamHook::new(&addr.to_string(), config).unwrap();
    hook.fire(&info("late"));
    thread::sleep(Duration::from_millis(300));

    // The current wait keeps its length; every later one uses the new value.
    retry.set(Duration::from_millis(50));
    assert_eq!(hook.retry_interval().get(), Duration::from_millis(50));
    thread::sleep(Duration::from_millis(800));
    let failures = sink.count_containing("failed to connect");
    assert!(failures >= 3, "expected fast retries, saw {failures}");

    let server = LineServer::bind(addr);
    let lines = server.collect(1, Duration::from_secs(2));
    assert_eq!(messages(&lines), ["late"]);
}

#[rstest]
fn shutdown_with_queued_records_is_bounded(sink: CollectingSink) {
    let addr = unused_addr();
    let config = test_config(&sink).with_exit_timeout(Duration::from_secs(3));
    let hook = BufferedUpstreamHook::new(&addr.to_string(), config).unwrap();
    hook.fire(&info("first"));
    hook.fire(&info("second"));

    let start = Instant::now();
    assert!(hook.close());
    assert!(start.elapsed() < Duration::from_millis(3500));
    assert_eq!(sink.count_containing("dropped 2 remaining logs"), 1);
}

#[rstest]
fn exit_chain_is_bounded_by_exit_timeout_when_worker_is_stuck(sink: CollectingSink) {
    let server = StalledServer::start();
    let hook = stalled_hook(&sink, &server);
    let exit = ExitCoordinator::new(sink.diagnostics());
    exit.register(hook.exit_handler());

    let start = Instant::now();
    exit.run();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(150), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");

    let start = Instant::now();
    assert!(!hook.close());
    assert!(start.elapsed() < Duration::from_millis(600));
    assert!(!hook.shutdown_handle().is_closed());
}

#[rstest]
fn stuck_hooks_on_one_chain_wait_one_exit_timeout_each(sink: CollectingSink) {
    let first_server = StalledServer::start();
    let second_server = StalledServer::start();
    let first = stalled_hook(&sink, &first_server);
    let second = stalled_hook(&sink, &second_server);
    let exit = ExitCoordinator::new(sink.diagnostics());
    exit.register(first.exit_handler());
    exit.register(second.exit_handler());

    let start = Instant::now();
    exit.run();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(350), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
    assert!(exit.has_run());
}

#[rstest]
fn at_most_one_dial_after_shutdown(sink: CollectingSink) {
    let addr = unused_addr();
    let hook = BufferedUpstreamHook::new(&addr.to_string(), test_config(&sink)).unwrap();
    hook.fire(&info("stuck"));
    thread::sleep(Duration::from_millis(300));
    let before = sink.count_containing("failed to connect");
    assert!(before >= 1);

    assert!(hook.close());
    let after = sink.count_containing("failed to connect");
    assert!(after - before <= 1, "dials after shutdown: {}", after - before);
    assert!(hook.shutdown_handle().is_closed());
}

#[rstest]
fn final_dial_delivers_queued_records(sink: CollectingSink) {
    let server = LineServer::start();
    let mut config = test_config(&sink);
    config.flush_interval = Duration::from_secs(60);
    let hook = BufferedUpstreamHook::new(&server.endpoint(), config).unwrap();
    hook.fire(&info("x"));
    hook.fire(&info("y"));

    assert!(hook.close());
    let lines = server.collect(2, Duration::from_secs(2));
    assert_eq!(messages(&lines), ["x", "y"]);
}

#[rstest]
fn panic_record_flushes_before_returning(sink: CollectingSink) {
    let server = LineServer::start();
    let mut config = test_config(&sink);
    config.flush_interval = Duration::from_secs(60);
    let hook = BufferedUpstreamHook::new(&server.endpoint(), config).unwrap();
    hook.fire(&info("before"));
    hook.fire(&LogRecord::new(LogLevel::Panic, "fatal state"));

    assert!(hook.shutdown_handle().is_closed());
    let lines = server.collect(2, Duration::from_secs(1));
    assert_eq!(messages(&lines), ["before", "fatal state"]);
}

#[rstest]
fn records_after_shutdown_are_dropped(sink: CollectingSink) {
    let server = LineServer::start();
    let hook = BufferedUpstreamHook::new(&server.endpoint(), test_config(&sink)).unwrap();
    assert!(hook.close());
    hook.fire(&info("too late"));
    assert!(server.recv_line(Duration::from_millis(300)).is_none());
    assert_eq!(sink.count_containing("hook closed"), 1);
}

#[rstest]
fn overflow_drop_keeps_queued_records(sink: CollectingSink) {
    let server = LineServer::start();
    let mut config = test_config(&sink)
        .with_capacity(2)
        .with_overflow(OverflowPolicy::Drop);
    config.flush_interval = Duration::from_secs(60);
    let hook = BufferedUpstreamHook::new(&server.endpoint(), config).unwrap();
    for message in ["kept-1", "kept-2", "dropped-1", "dropped-2"] {
        hook.fire(&info(message));
    }
    assert_eq!(sink.count_containing("queue full; dropped 1 records"), 1);

    assert!(hook.close());
    let lines = server.collect(2, Duration::from_secs(2));
    assert_eq!(messages(&lines), ["kept-1", "kept-2"]);
    assert!(server.recv_line(Duration::from_millis(200)).is_none());
    assert_eq!(sink.count_containing("dropped 1 records in the last interval"), 1);
}

#[rstest]
fn overflow_timeout_gives_up(sink: CollectingSink) {
    let mut config = test_config(&sink)
        .with_capacity(1)
        .with_overflow(OverflowPolicy::Timeout(Duration::from_millis(50)));
    config.flush_interval = Duration::from_secs(60);
    let hook = BufferedUpstreamHook::new(&unused_addr().to_string(), config).unwrap();
    hook.fire(&info("queued"));
    let start = Instant::now();
    hook.fire(&info("waits then drops"));
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(sink.count_containing("queue full"), 1);
}

#[rstest]
fn trace_is_not_forwarded() {
    let hook = UnbufferedUpstreamHook::new(&unused_addr().to_string(), UpstreamConfig::default())
        .unwrap();
    assert!(!hook.accepts(LogLevel::Trace));
    assert!(hook.accepts(LogLevel::Panic));
    assert!(hook.accepts(LogLevel::Debug));
}

#[rstest]
fn unbuffered_writes_on_calling_thread(sink: CollectingSink) {
    let server = LineServer::start();
    let hook = UnbufferedUpstreamHook::new(&server.endpoint(), test_config(&sink)).unwrap();
    hook.fire(&info("direct-1"));
    hook.fire(&info("direct-2"));
    let lines = server.collect(2, Duration::from_secs(2));
    assert_eq!(messages(&lines), ["direct-1", "direct-2"]);
    assert_eq!(server.accepted(), 1);
}

#[rstest]
fn unbuffered_without_listener_returns_promptly(sink: CollectingSink) {
    let addr = unused_addr();
    let hook = UnbufferedUpstreamHook::new(&addr.to_string(), test_config(&sink)).unwrap();
    let start = Instant::now();
    hook.fire(&info("lost"));
    assert!(start.elapsed() < Duration::from_millis(1500));
    assert_eq!(sink.count_containing("failed to connect"), 1);

    // The dropped record is not replayed once a collector appears.
    let server = LineServer::bind(addr);
    hook.fire(&info("found"));
    let lines = server.collect(2, Duration::from_millis(500));
    assert_eq!(messages(&lines), ["found"]);
}

#[rstest]
fn unbuffered_stalled_collector_costs_one_local_timeout(sink: CollectingSink) {
    let server = StalledServer::start();
    let mut config = test_config(&sink);
    config.local_timeout = Duration::from_millis(300);
    let hook = UnbufferedUpstreamHook::new(&server.endpoint(), config).unwrap();

    let record = oversized();

    // Includes serialising the record on this thread.
    let start = Instant::now();
    hook.fire(&record);
    let elapsed = start.elapsed();
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    assert_eq!(sink.count_containing("failed to send"), 1);
}

#[rstest]
#[case("127.0.0.1", false)]
#[case("localhost", false)]
#[case("192.0.2.10", true)]
fn endpoint_selects_hook_kind(#[case] host: &str, #[case] buffered: bool) {
    let hook = hook_for_endpoint(&format!("{host}:5140"), UpstreamConfig::default()).unwrap();
    assert_eq!(hook.is_buffered(), buffered);
    assert_eq!(hook.shutdown_handle().is_some(), buffered);
    if let UpstreamHook::Buffered(inner) = &hook {
        assert!(inner.close());
    }
}

#[rstest]
fn malformed_endpoint_is_rejected() {
    assert!(hook_for_endpoint("collector", UpstreamConfig::default()).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn buffered_preserves_submission_order(
        batch in proptest::collection::vec("[a-z]{1,12}", 1..40)
    ) {
        let sink = CollectingSink::default();
        let server = LineServer::start();
        let hook = BufferedUpstreamHook::new(&server.endpoint(), test_config(&sink)).unwrap();
        for message in &batch {
            hook.fire(&info(message));
        }
        let lines = server.collect(batch.len(), Duration::from_secs(3));
        prop_assert_eq!(messages(&lines), batch);
    }
}
