use std::sync::Arc;

use tempfile::TempDir;

use exstrings::{EngineConfig, Executor, MemoryStore, Reply, Subcommand, CONFIG_FILE_NAME};

use crate::common::*;

#[test]
fn executor_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[scan]\nbatch_size = 1\n\n[background]\nworkers = 1\n").unwrap();

    let config = EngineConfig::from_file(&path).unwrap();
    init_tracing();
    let executor = Executor::with_config(Arc::new(MemoryStore::new()), config).unwrap();
    assert_eq!(executor.config().scan.batch_size, 1);
    assert_eq!(executor.scheduler_stats().worker_count, 1);

    executor.host().set_string("a", "1");
    executor.host().set_string("b", "2");
    assert_eq!(
        run(&executor, "NGET *"),
        Reply::Array(vec![bulk("a"), bulk("1"), bulk("b"), bulk("2")])
    );
    assert_eq!(executor.host().call_count(Subcommand::Scan), 2);
}

#[test]
fn default_file_is_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    EngineConfig::write_default_if_missing(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, EngineConfig::default_toml());
    assert_eq!(EngineConfig::from_file(&path).unwrap(), EngineConfig::default());
}

#[test]
fn invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[scan]\nbatch_size = 0\n").unwrap();

    let err = EngineConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("scan.batch_size must be at least 1"));
}
