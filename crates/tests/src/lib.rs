//! # Integration Tests
//!
//! Cross-crate tests.
//!
//! - config loading feeding the dispatcher
//! - detector -> sinks -> workers end to end on in-memory destinations
//! - failure isolation and shutdown completeness

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::OPEN_MARKER, "{");
        assert_eq!(contracts::CLOSE_MARKER, "}");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::{self, Write};
    use std::sync::Arc;

    use bulk_engine::BoundaryDetector;
    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::{
        Destination, Dispatcher, DispatcherBuilder, DispatcherConfig, MemoryBuffer, SinkHandle,
        WorkerState, WriteLock,
    };
    use rand::Rng;
    use tempfile::TempDir;

    struct DiskFull;

    impl Write for DiskFull {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Two in-memory sinks: `console` with 1 worker, `log` with `log_workers`
    fn memory_dispatcher(log_workers: usize) -> (Dispatcher, MemoryBuffer, MemoryBuffer) {
        let lock = WriteLock::new();
        let (console, console_buf) = Destination::memory("console");
        let (log, log_buf) = Destination::memory("log");
        let handles = vec![
            Arc::new(SinkHandle::spawn("console", console, 1, lock.clone()).unwrap()),
            Arc::new(SinkHandle::spawn("log", log, log_workers, lock.clone()).unwrap()),
        ];
        (Dispatcher::with_handles(handles, lock), console_buf, log_buf)
    }

    fn wire(dispatcher: &Dispatcher, batch_size: usize) -> BoundaryDetector {
        let mut detector = BoundaryDetector::new(batch_size);
        for subscriber in dispatcher.subscribers() {
            detector.subscribe(subscriber);
        }
        detector
    }

    fn sorted(mut lines: Vec<String>) -> Vec<String> {
        lines.sort();
        lines
    }

    /// End-to-end: commands -> detector -> two sinks -> workers -> destinations
    #[test]
    fn test_e2e_classic_session() {
        let (dispatcher, console, log) = memory_dispatcher(2);
        let mut detector = wire(&dispatcher, 3);

        let input = [
            "cmd1", "cmd2", "cmd3", "{", "cmd4", "cmd5", "{", "cmd6", "}", "cmd7", "}", "cmd8",
            "cmd9",
        ];
        for cmd in input {
            detector.submit(cmd);
        }
        drop(detector);

        let reports = dispatcher.shutdown();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.state == WorkerState::Stopped));

        let expected = vec![
            "bulk: cmd1, cmd2, cmd3".to_string(),
            "bulk: cmd4, cmd5, cmd6, cmd7".to_string(),
        ];
        // Single worker keeps the flush order
        assert_eq!(console.lines(), expected);
        // Two workers: same set, order not guaranteed
        assert_eq!(sorted(log.lines()), sorted(expected));
    }

    #[test]
    fn test_e2e_every_bulk_written_once_per_sink() {
        let (dispatcher, console, log) = memory_dispatcher(4);
        let mut detector = wire(&dispatcher, 5);
        let mut rng = rand::rng();

        let mut flushed = Vec::new();
        for i in 0..500 {
            let cmd = match rng.random_range(0..10) {
                0 => "{".to_string(),
                1 => "}".to_string(),
                _ => format!("c{i}"),
            };
            if let Some(bulk) = detector.submit(cmd) {
                flushed.push(bulk.as_str().to_string());
            }
        }
        if let Some(bulk) = detector.finish() {
            flushed.push(bulk.as_str().to_string());
        }
        drop(detector);

        dispatcher.shutdown();

        assert_eq!(console.lines(), flushed);
        assert_eq!(sorted(log.lines()), sorted(flushed.clone()));

        let stats = dispatcher.statistics();
        let log_bulks: u64 = stats[1].1.iter().map(|s| s.bulks_processed).sum();
        assert_eq!(log_bulks, flushed.len() as u64);
    }

    #[test]
    fn test_e2e_failing_sink_does_not_affect_others() {
        let lock = WriteLock::new();
        let (good, good_buf) = Destination::memory("good");
        let broken = Destination::new("broken", DiskFull);
        let handles = vec![
            Arc::new(SinkHandle::spawn("broken", broken, 2, lock.clone()).unwrap()),
            Arc::new(SinkHandle::spawn("good", good, 2, lock.clone()).unwrap()),
        ];
        let dispatcher = Dispatcher::with_handles(handles, lock);
        let mut detector = wire(&dispatcher, 1);

        for i in 0..20 {
            detector.submit(format!("c{i}"));
        }
        drop(detector);

        let reports = dispatcher.shutdown();
        let broken: Vec<_> = reports.iter().filter(|r| r.sink == "broken").collect();
        let good: Vec<_> = reports.iter().filter(|r| r.sink == "good").collect();

        assert!(broken.iter().all(|r| r.is_failed()));
        assert!(good.iter().all(|r| r.state == WorkerState::Stopped));
        assert_eq!(good_buf.lines().len(), 20);
    }

    #[test]
    fn test_e2e_shared_stream_has_whole_lines() {
        // Both sinks write into the same bytes, like two sinks on one terminal
        let lock = WriteLock::new();
        let shared = MemoryBuffer::default();
        let handles = vec![
            Arc::new(
                SinkHandle::spawn("a", Destination::new("a", shared.clone()), 3, lock.clone())
                    .unwrap(),
            ),
            Arc::new(
                SinkHandle::spawn("b", Destination::new("b", shared.clone()), 3, lock.clone())
                    .unwrap(),
            ),
        ];
        let dispatcher = Dispatcher::with_handles(handles, lock);
        let mut detector = wire(&dispatcher, 4);

        for i in 0..400 {
            detector.submit(format!("command-{i}"));
        }
        drop(detector);
        dispatcher.shutdown();

        let lines = shared.lines();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.starts_with("bulk: command-"), "torn line: {line:?}");
            assert_eq!(line.matches(", ").count(), 3, "torn line: {line:?}");
        }
    }

    #[test]
    fn test_e2e_config_to_file_sink() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_str().unwrap().replace('\\', "/");
        let toml = format!(
            r#"
[batch]
size = 2

[[sinks]]
name = "file"
sink_type = "file"
workers = 3
[sinks.params]
dir = "{dir}"
prefix = "run"
"#
        );

        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let dispatcher = DispatcherBuilder::new(DispatcherConfig {
            sinks: blueprint.sinks.clone(),
        })
        .build()
        .unwrap();
        let mut detector = wire(&dispatcher, blueprint.batch.size.unwrap());

        for cmd in ["a", "b", "c", "d", "e"] {
            detector.submit(cmd);
        }
        drop(detector);
        let reports = dispatcher.shutdown();
        assert_eq!(reports.len(), 3);

        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("run") && name.ends_with(".log"));

        let content = std::fs::read_to_string(&entries[0]).unwrap();
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        assert_eq!(
            sorted(lines),
            vec!["bulk: a, b".to_string(), "bulk: c, d".to_string()]
        );
    }

    #[test]
    fn test_e2e_load_counter_survives_completion() {
        let lock = WriteLock::new();
        let (dest, buffer) = Destination::memory("log");
        let handle = Arc::new(SinkHandle::spawn("log", dest, 3, lock.clone()).unwrap());
        let dispatcher = Dispatcher::with_handles(vec![Arc::clone(&handle)], lock);
        let mut detector = wire(&dispatcher, 1);

        for cmd in ["a", "b", "c"] {
            detector.submit(cmd);
        }
        while buffer.lines().len() < 3 {
            std::thread::yield_now();
        }
        detector.submit("d");
        assert_eq!(handle.pool().load_counts(), vec![2, 1, 1]);

        drop(detector);
        dispatcher.shutdown();
        assert_eq!(buffer.lines().len(), 4);
    }
}
