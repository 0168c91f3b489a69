use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use exstrings::{
    EngineConfig, Executor, Host, KeyType, MemoryStore, Reply, ScanConfig, Subcommand,
};

use crate::common::*;

/// Flat `[k1, v1, ...]` reply into (key, value) strings.
fn pairs_of(reply: &Reply) -> Vec<(String, String)> {
    let items = reply.as_array().unwrap_or_else(|| panic!("not an array: {:?}", reply));
    assert_eq!(items.len() % 2, 0);
    items
        .chunks_exact(2)
        .map(|pair| {
            let text = |r: &Reply| String::from_utf8_lossy(r.as_bytes().unwrap()).into_owned();
            (text(&pair[0]), text(&pair[1]))
        })
        .collect()
}

#[test]
fn ndel_sums_unlink_replies_across_batches() {
    let host = ScriptedHost::new()
        .script(
            Subcommand::Scan,
            [
                scan_reply("7", &["a", "b"]),
                scan_reply("3", &["c"]),
                scan_reply("0", &["d"]),
            ],
        )
        .script(
            Subcommand::Unlink,
            [Reply::Integer(2), Reply::Integer(1), Reply::Integer(1)],
        );
    let executor = executor_for(host);

    assert_eq!(run(&executor, "NDEL tmp:*"), Reply::Integer(4));

    let scans: Vec<Vec<String>> = executor
        .host()
        .calls()
        .into_iter()
        .filter(|(c, _)| *c == Subcommand::Scan)
        .map(|(_, args)| strings(&args))
        .collect();
    assert_eq!(
        scans,
        vec![
            vec!["0", "MATCH", "tmp:*", "COUNT", "50"],
            vec!["7", "MATCH", "tmp:*", "COUNT", "50"],
            vec!["3", "MATCH", "tmp:*", "COUNT", "50"],
        ]
    );
}

#[test]
fn empty_batches_do_not_stop_the_walk() {
    let host = ScriptedHost::new()
        .script(
            Subcommand::Scan,
            [
                scan_reply("5", &[]),
                scan_reply("9", &[]),
                scan_reply("0", &["k"]),
            ],
        )
        .script(Subcommand::Mget, [Reply::Array(vec![bulk("v")])]);
    let executor = executor_for(host);

    assert_eq!(
        run(&executor, "NGET *"),
        Reply::Array(vec![bulk("k"), bulk("v")])
    );
    assert_eq!(
        executor.host().call_names(),
        vec![Subcommand::Scan, Subcommand::Scan, Subcommand::Scan, Subcommand::Mget]
    );
}

#[test]
fn non_bulk_mget_value_is_a_protocol_error() {
    let host = ScriptedHost::new()
        .script(Subcommand::Scan, [scan_reply("0", &["a", "b"])])
        .script(
            Subcommand::Mget,
            [Reply::Array(vec![bulk("1"), Reply::Integer(2)])],
        );
    let executor = executor_for(host);

    let reply = run(&executor, "NGET.ATOMIC *");
    assert!(
        matches!(&reply, Reply::Error(e) if e.starts_with("ERR unexpected MGET reply")),
        "{:?}",
        reply
    );
}

#[test]
fn malformed_scan_reply_is_a_protocol_error() {
    let host = ScriptedHost::new().script(Subcommand::Scan, [Reply::Integer(0)]);
    let executor = executor_for(host);

    let reply = run(&executor, "NDEL *");
    assert!(
        matches!(&reply, Reply::Error(e) if e.starts_with("ERR unexpected SCAN reply")),
        "{:?}",
        reply
    );
}

// ============================================================================
// Keys vanishing between SCAN and MGET
// ============================================================================

/// MemoryStore that deletes a chosen key just before serving MGET.
struct VanishingHost {
    store: MemoryStore,
    victim: Mutex<Option<Vec<u8>>>,
}

impl Host for VanishingHost {
    type Guard<'a> = parking_lot::MutexGuard<'a, ()>;

    fn key_type(&self, key: &[u8]) -> KeyType {
        self.store.key_type(key)
    }

    fn call(&self, command: Subcommand, args: &[&[u8]]) -> Option<Reply> {
        if command == Subcommand::Mget {
            if let Some(victim) = self.victim.lock().take() {
                self.store.remove(&victim);
            }
        }
        self.store.call(command, args)
    }

    fn lock(&self) -> Self::Guard<'_> {
        self.store.lock()
    }
}

#[test]
fn key_deleted_between_scan_and_mget_is_skipped() {
    let store = MemoryStore::new();
    store.set_string("user:1", "a");
    store.set_string("user:2", "b");
    store.set_string("user:3", "c");
    let host = VanishingHost {
        store,
        victim: Mutex::new(Some(b"user:2".to_vec())),
    };
    let executor = executor_for(host);

    let reply = run(&executor, "NGET user:*");
    assert_eq!(
        pairs_of(&reply),
        vec![
            ("user:1".to_string(), "a".to_string()),
            ("user:3".to_string(), "c".to_string()),
        ]
    );
}

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn stable_keys_returned_once_under_concurrent_churn() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..60 {
        store.set_string(format!("stable:{:02}", i), i.to_string());
    }
    init_tracing();
    let executor = Executor::new(Arc::clone(&store)).unwrap();
    let stop = AtomicBool::new(false);

    let reply = std::thread::scope(|s| {
        s.spawn(|| {
            let mut n = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let key = format!("stable:{:02}~tmp", n % 60);
                store.set_string(&key, "x");
                store.remove(&key);
                n += 1;
            }
        });
        let reply = run(&executor, "NGET.NOATOMIC stable:* COUNT 4");
        stop.store(true, Ordering::Relaxed);
        reply
    });

    let stable: Vec<String> = pairs_of(&reply)
        .into_iter()
        .map(|(k, _)| k)
        .filter(|k| !k.ends_with("~tmp"))
        .collect();
    let expected: Vec<String> = (0..60).map(|i| format!("stable:{:02}", i)).collect();
    assert_eq!(stable, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn nget_and_ndel_see_every_match(
        keys in prop::collection::btree_map("[ab][a-c]{0,3}", "[a-z]{1,4}", 0..40),
        batch_size in 1usize..20,
    ) {
        let store = Arc::new(MemoryStore::new());
        for (k, v) in &keys {
            store.set_string(k, v);
        }
        let config = EngineConfig {
            scan: ScanConfig { batch_size },
            ..EngineConfig::default()
        };
        let executor = Executor::with_config(Arc::clone(&store), config).unwrap();

        let expected: BTreeMap<String, String> = keys
            .iter()
            .filter(|(k, _)| k.starts_with('a'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let collected: BTreeMap<String, String> =
            pairs_of(&run(&executor, "NGET a*")).into_iter().collect();
        prop_assert_eq!(&collected, &expected);

        let removed = run(&executor, "NDEL a*");
        prop_assert_eq!(removed, Reply::Integer(expected.len() as i64));
        prop_assert_eq!(store.len(), keys.len() - expected.len());
    }
}
