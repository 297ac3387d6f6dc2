//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and the engine_* macros.

use crate::error::Error;
use crate::galaxy3d::Engine;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::SystemTime;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Logger capturing entries so macro output can be inspected.
///
/// Only entries logged from the creating thread are kept: tests running
/// in parallel still log through the same global logger.
struct CaptureLogger {
    thread: ThreadId,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { thread: thread::current().id(), entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if thread::current().id() == self.thread {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "galaxy3d::PartitionOctree".to_string(),
        message: format!("{:?} message", severity),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug_names() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Warn), "Warn");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_clone_keeps_location() {
    let entry1 = entry(LogSeverity::Error, Some("partition_octree.rs"), Some(42));
    let entry2 = entry1.clone();

    assert_eq!(entry2.severity, LogSeverity::Error);
    assert_eq!(entry2.source, "galaxy3d::PartitionOctree");
    assert_eq!(entry2.file, Some("partition_octree.rs"));
    assert_eq!(entry2.line, Some(42));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger::new(LogSeverity::Trace);
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Both branches (with and without file:line) must not panic
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("camera.rs"), Some(7)));
    }
}

#[test]
fn test_default_logger_threshold() {
    let logger = DefaultLogger::default();
    assert_eq!(logger.min_severity(), LogSeverity::Info);
    assert!(!logger.accepts(LogSeverity::Trace));
    assert!(!logger.accepts(LogSeverity::Debug));
    assert!(logger.accepts(LogSeverity::Info));
    assert!(logger.accepts(LogSeverity::Error));

    let verbose = DefaultLogger::new(LogSeverity::Trace);
    assert!(verbose.accepts(LogSeverity::Trace));
}

#[test]
fn test_format_entry() {
    let line = DefaultLogger::format_entry(&entry(LogSeverity::Warn, None, None));
    assert!(line.contains("[WARN ] [galaxy3d::PartitionOctree] Warn message"));
    assert!(!line.contains("("));

    let line = DefaultLogger::format_entry(&entry(LogSeverity::Error, Some("camera.rs"), Some(7)));
    assert!(line.ends_with("Error message (camera.rs:7)"));
}

#[test]
fn test_severity_labels_have_same_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<CaptureLogger>();
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_warn_macro_routes_to_logger() {
    let (logger, entries) = CaptureLogger::new();
    Engine::set_logger(logger);

    crate::engine_warn!("galaxy3d::PartitionOctree", "'{}' not registered", 12);

    let entries = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Warn);
    assert_eq!(entries[0].message, "'12' not registered");
    assert!(entries[0].file.is_none());
}

#[test]
#[serial]
fn test_engine_error_macro_records_location() {
    let (logger, entries) = CaptureLogger::new();
    Engine::set_logger(logger);

    crate::engine_error!("galaxy3d::Camera", "degenerate projection");

    let entries = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert!(entries[0].file.is_some());
    assert!(entries[0].line.is_some());
}

#[test]
#[serial]
fn test_engine_err_macro_logs_and_builds_error() {
    let (logger, entries) = CaptureLogger::new();
    Engine::set_logger(logger);

    let err = crate::engine_err!(Error::InvalidConfiguration, "galaxy3d::Camera", "z_near {} <= 0", -1.0);

    let entries = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(err, Error::InvalidConfiguration("z_near -1 <= 0".to_string()));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "z_near -1 <= 0");
    assert_eq!(entries[0].source, "galaxy3d::Camera");
}
