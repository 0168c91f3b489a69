use exstrings::{Published, Reply, Subcommand};

use crate::common::*;

#[test]
fn msetmpub_two_sets_one_publish() {
    let host = ScriptedHost::new()
        .script(Subcommand::Mset, [Reply::ok()])
        .script(Subcommand::Publish, [Reply::Integer(3)]);
    let executor = executor_for(host);

    assert_eq!(
        run(&executor, "MSETMPUB 2 1 k1 v1 k2 v2 chan msg"),
        Reply::ok()
    );

    let calls = executor.host().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, Subcommand::Mset);
    assert_eq!(strings(&calls[0].1), vec!["k1", "v1", "k2", "v2"]);
    assert_eq!(calls[1].0, Subcommand::Publish);
    assert_eq!(strings(&calls[1].1), vec!["chan", "msg"]);
}

#[test]
fn setiepub_writes_with_mset_of_key_and_new_value() {
    let host = ScriptedHost::new()
        .with_key_type("k", exstrings::KeyType::String)
        .script(Subcommand::Get, [bulk("old")])
        .script(Subcommand::Mset, [Reply::ok()])
        .script(Subcommand::Publish, [Reply::Integer(0)]);
    let executor = executor_for(host);

    assert_eq!(run(&executor, "SETIEPUB k old new c m"), Reply::ok());
    let calls = executor.host().calls();
    assert_eq!(
        executor.host().call_names(),
        vec![Subcommand::Get, Subcommand::Mset, Subcommand::Publish]
    );
    assert_eq!(strings(&calls[1].1), vec!["k", "new"]);
}

#[test]
fn null_mset_reply_publishes_nothing() {
    let host = ScriptedHost::new().script(Subcommand::Mset, [Reply::Null]);
    let executor = executor_for(host);

    assert_eq!(run(&executor, "MSETPUB k v c m"), Reply::Null);
    assert_eq!(executor.host().call_names(), vec![Subcommand::Mset]);
}

#[test]
fn non_integer_unlink_reply_is_a_protocol_error() {
    let host = ScriptedHost::new().script(Subcommand::Unlink, [bulk("two")]);
    let executor = executor_for(host);

    let reply = run(&executor, "DELPUB a b c m");
    assert!(
        matches!(&reply, Reply::Error(e) if e.starts_with("ERR unexpected UNLINK reply")),
        "{:?}",
        reply
    );
    assert_eq!(executor.host().call_names(), vec![Subcommand::Unlink]);
}

#[test]
fn no_op_outcomes_never_publish() {
    let executor = memory_executor();
    let store = executor.host();
    store.set_string("present", "v");

    let no_ops = [
        ("SETXXPUB absent v c m", Reply::Null),
        ("SETNXPUB present v c m", Reply::Null),
        ("SETIEPUB present other new c m", Reply::Null),
        ("SETIEPUB absent v new c m", Reply::Null),
        ("SETNEPUB present v new c m", Reply::Null),
        ("DELPUB absent1 absent2 c m", Reply::Integer(0)),
        ("DELMPUB 2 1 absent1 absent2 c m", Reply::Integer(0)),
        ("DELIEPUB present other c m", Reply::Integer(0)),
        ("DELIEPUB absent v c m", Reply::Integer(0)),
        ("DELNEPUB present v c m", Reply::Integer(0)),
        ("DELNEPUB absent v c m", Reply::Integer(0)),
    ];
    for (line, expected) in no_ops {
        assert_eq!(run(&executor, line), expected, "{}", line);
    }

    assert!(store.published().is_empty());
    assert_eq!(store.call_count(Subcommand::Publish), 0);
    assert_eq!(store.get_string("present"), Some(b"v".to_vec()));
    assert_eq!(store.len(), 1);
}

#[test]
fn every_effective_mutation_publishes_after_writing() {
    let executor = memory_executor();
    let store = executor.host();

    let lines = [
        "MSETPUB a 1 c m1",
        "MSETMPUB 1 1 b 2 c m2",
        "SETNXPUB n 1 c m3",
        "SETXXPUB n 2 c m4",
        "SETIEPUB n 2 3 c m5",
        "SETNEPUB n x 4 c m6",
        "DELIEPUB n 4 c m7",
        "DELNEPUB a x c m8",
        "DELPUB b c m9",
    ];
    for line in lines {
        assert!(!run(&executor, line).is_error(), "{}", line);
    }

    let messages: Vec<Vec<u8>> = store.published().into_iter().map(|p| p.message).collect();
    let expected: Vec<Vec<u8>> = (1..=9).map(|i| format!("m{}", i).into_bytes()).collect();
    assert_eq!(messages, expected);
    assert!(store.is_empty());

    // Each publish directly follows the write it reports.
    let calls = store.calls();
    for (i, call) in calls.iter().enumerate() {
        if *call == Subcommand::Publish {
            assert!(matches!(calls[i - 1], Subcommand::Mset | Subcommand::Unlink));
        }
    }
    assert_eq!(
        store.published()[0],
        Published {
            channel: b"c".to_vec(),
            message: b"m1".to_vec()
        }
    );
}
