//! Replay output as a user sees it.

use stashkit::{Error, KeyValueClient, Operation, ReplayReport, Result, STORE_IDENTITY};

use crate::common::setup;

#[test]
fn replay_before_any_call() {
    let (_, cache) = setup();
    let report = cache.reporter().replay(STORE_IDENTITY).unwrap();
    assert!(matches!(report, ReplayReport::NeverCalled { .. }));

    let mut out = Vec::new();
    cache
        .reporter()
        .write_replay(STORE_IDENTITY, &mut out)
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Cache.store was never called.\n");
}

#[test]
fn replay_after_three_stores() {
    let (_, cache) = setup();
    let keys = [
        cache.store("foo").unwrap(),
        cache.store("bar").unwrap(),
        cache.store(42).unwrap(),
    ];

    let text = cache.reporter().replay(STORE_IDENTITY).unwrap().to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Cache.store was called 3 times:");
    assert_eq!(lines[1], format!("Cache.store(*(\"foo\",)) -> {}", keys[0]));
    assert_eq!(lines[2], format!("Cache.store(*(\"bar\",)) -> {}", keys[1]));
    assert_eq!(lines[3], format!("Cache.store(*(42,)) -> {}", keys[2]));
}

#[test]
fn replay_of_wrapped_operation_with_failures() {
    let (_, cache) = setup();
    let instr = cache.instrumentation();

    for n in [4_i64, -1, 9] {
        let _ = instr.run(
            Operation::new("Math.sqrt", move || -> Result<f64> {
                if n < 0 {
                    Err(Error::Backend(format!("negative input {}", n)))
                } else {
                    Ok((n as f64).sqrt())
                }
            })
            .arg(n.to_string()),
        );
    }

    assert_eq!(cache.call_count("Math.sqrt").unwrap(), 3);
    let text = cache.reporter().replay("Math.sqrt").unwrap().to_string();
    assert_eq!(
        text,
        "Math.sqrt was called 3 times:\n\
         Math.sqrt(*(4,)) -> 2\n\
         Math.sqrt(*(-1,)) -> <error: Backend error: negative input -1>\n\
         Math.sqrt(*(9,)) -> 3\n"
    );
}

#[test]
fn replay_tolerates_a_missing_output() {
    let (client, cache) = setup();
    cache.store("complete").unwrap();
    // A call that recorded its input and never finished
    client
        .append_to_list("Cache.store:inputs", b"(\"interrupted\",)")
        .unwrap();

    let report = cache.reporter().replay(STORE_IDENTITY).unwrap();
    assert_eq!(report.call_count(), 2);
    assert!(report
        .to_string()
        .ends_with("Cache.store(*(\"interrupted\",)) -> <unknown>\n"));
}
