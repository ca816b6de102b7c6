//! End-to-end behaviour of the public logger API.

mod test_utils;

use std::{
    io::{BufRead, BufReader},
    net::TcpListener,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use logrelay::{
    Hook, LABEL_COMPONENT, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerConfig,
    OutputFormat, UpstreamEndpoint, relay_info, relay_warn,
};
use rstest::rstest;
use serde_json::Value;
use test_utils::SharedBuf;

#[derive(Clone, Default)]
struct Recorder {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Hook for Recorder {
    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    fn fire(&self, record: &LogRecord) {
        self.records.lock().expect("recorder mutex").push(record.clone());
    }
}

fn text_logger(level: LogLevel) -> (Logger, SharedBuf) {
    let output = SharedBuf::default();
    let logger = LoggerBuilder::new()
        .with_level(level)
        .with_formatter(logrelay::formatter::TextFormatter)
        .with_output(output.clone())
        .build()
        .expect("logger");
    (logger, output)
}

#[rstest]
#[case(LogLevel::Error, 1)]
#[case(LogLevel::Warn, 2)]
#[case(LogLevel::Info, 3)]
#[case(LogLevel::Trace, 5)]
fn threshold_controls_output(#[case] level: LogLevel, #[case] expected: usize) {
    let (logger, output) = text_logger(level);
    logger.error("e");
    logger.warn("w");
    logger.info("i");
    logger.debug("d");
    logger.trace("t");
    assert_eq!(output.lines().len(), expected);
}

#[test]
fn every_call_is_counted() {
    let (logger, _) = text_logger(LogLevel::Error);
    let db = logger.with_field(LABEL_COMPONENT, "db");
    for _ in 0..3 {
        db.debug("query");
    }
    relay_warn!(db, "slow query took {}ms", 250);
    let rendered = logger.metrics().render().unwrap();
    assert!(rendered.contains("# TYPE logger_logs_total counter"));
    assert!(rendered.contains(r#"logger_logs_total{component="db",level="debug"} 3"#));
    assert!(rendered.contains(r#"logger_logs_total{component="db",level="warn"} 1"#));
}

#[test]
fn json_output_carries_fields() {
    let output = SharedBuf::default();
    let config = LoggerConfig {
        format: OutputFormat::Json,
        ..LoggerConfig::default()
    };
    let logger = LoggerBuilder::from_config(config)
        .with_output(output.clone())
        .build()
        .expect("logger");
    relay_info!(logger.with_field("user", "ann"), "signed in after {} tries", 2);
    let value: Value = serde_json::from_str(&output.lines()[0]).expect("json line");
    assert_eq!(value["level"], "info");
    assert_eq!(value["message"], "signed in after 2 tries");
    assert_eq!(value["user"], "ann");
    assert!(value["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
}

#[test]
fn hooks_see_merged_fields() {
    let recorder = Recorder::default();
    let (logger, _) = text_logger(LogLevel::Info);
    logger.add_hook(recorder.clone());
    logger
        .with_field(LABEL_COMPONENT, "Engine")
        .with_field("dirname", "test")
        .info("starting");
    let records = recorder.records.lock().expect("recorder mutex");
    assert_eq!(records[0].component().as_deref(), Some("Engine"));
    assert_eq!(records[0].fields["dirname"], "test");
}

#[test]
fn loopback_collector_receives_json_lines() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind collector");
    let endpoint = UpstreamEndpoint::parse(&listener.local_addr().expect("addr").to_string())
        .expect("endpoint");
    let collector = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("read timeout");
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).expect("read line");
        line
    });
    let (logger, _) = text_logger(LogLevel::Info);
    logger
        .set_upstream_endpoint(&endpoint.to_string())
        .expect("upstream");
    logger.with_field("order", 42).warn("payment retried");
    let line = collector.join().expect("collector thread");
    let value: Value = serde_json::from_str(line.trim_end()).expect("json line");
    assert_eq!(value["message"], "payment retried");
    assert_eq!(value["level"], "warn");
    assert_eq!(value["order"], 42);
}
