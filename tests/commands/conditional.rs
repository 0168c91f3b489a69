use exstrings::{KeyType, Reply, Subcommand};

use crate::common::*;

#[test]
fn setie_example_session() {
    let executor = memory_executor();
    executor.host().set_string("mykey", "old");

    assert_eq!(run(&executor, "SETIE mykey old new"), Reply::ok());
    assert_eq!(run(&executor, "SETIE mykey old newer"), Reply::Null);
    assert_eq!(executor.host().get_string("mykey"), Some(b"new".to_vec()));
}

#[test]
fn setie_issues_get_then_set_with_options() {
    let host = ScriptedHost::new()
        .with_key_type("k", KeyType::String)
        .script(Subcommand::Get, [bulk("old")])
        .script(Subcommand::Set, [Reply::ok()]);
    let executor = executor_for(host);

    assert_eq!(run(&executor, "SETIE k old new PX 500"), Reply::ok());

    let calls = executor.host().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, Subcommand::Get);
    assert_eq!(strings(&calls[0].1), vec!["k"]);
    assert_eq!(calls[1].0, Subcommand::Set);
    assert_eq!(strings(&calls[1].1), vec!["k", "new", "PX", "500"]);
}

#[test]
fn wrong_type_is_reported_before_any_call() {
    for key_type in [KeyType::List, KeyType::Hash, KeyType::Set, KeyType::ZSet, KeyType::Stream] {
        let host = ScriptedHost::new().with_key_type("k", key_type);
        let executor = executor_for(host);

        for line in ["SETIE k a b", "DELNE k a", "SETNXPUB k v c m", "DELIEPUB k a c m"] {
            assert_eq!(
                run(&executor, line),
                Reply::Error(
                    "WRONGTYPE Operation against a key holding the wrong kind of value".into()
                ),
                "{:?} {}",
                key_type,
                line
            );
        }
        assert!(executor.host().calls().is_empty());
    }
}

#[test]
fn non_bulk_get_reply_is_a_protocol_error() {
    let host = ScriptedHost::new()
        .with_key_type("k", KeyType::String)
        .script(Subcommand::Get, [Reply::Integer(7)]);
    let executor = executor_for(host);

    let reply = run(&executor, "DELIE k 7");
    assert!(
        matches!(&reply, Reply::Error(e) if e.starts_with("ERR unexpected GET reply")),
        "{:?}",
        reply
    );
    assert_eq!(executor.host().call_names(), vec![Subcommand::Get]);
}

#[test]
fn missing_set_reply_is_an_error() {
    let host = ScriptedHost::new();
    let executor = executor_for(host);

    assert_eq!(
        run(&executor, "SETNE k a b"),
        Reply::Error("ERR SET returned no reply".into())
    );
}
