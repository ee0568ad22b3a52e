//! Function memoization, end to end against a real checkpoint directory.

use std::sync::atomic::{AtomicUsize, Ordering};

use restash::{Frame, Value, drain_caveats, identity, memoize, recompute};
use serial_test::serial;

macro_rules! test {
    (miss: $call:expr, $result:expr) => {{
        let (hits, misses) =
            (restash::internal::hit_count(), restash::internal::miss_count());
        assert_eq!($call, $result);
        assert_eq!(restash::internal::hit_count(), hits);
        assert_eq!(restash::internal::miss_count(), misses + 1);
    }};
    (hit: $call:expr, $result:expr) => {{
        let (hits, misses) =
            (restash::internal::hit_count(), restash::internal::miss_count());
        assert_eq!($call, $result);
        assert_eq!(restash::internal::hit_count(), hits + 1);
        assert_eq!(restash::internal::miss_count(), misses);
    }};
}

/// Point the checkpoint directory at a fresh location.
fn fresh() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    restash::set_checkpoint_dir(dir.path());
    dir
}

/// Test basic hit/miss behavior.
#[test]
#[serial]
fn test_basic() {
    let _dir = fresh();

    #[memoize]
    fn greeting() -> String {
        format!("The world is {}", "big")
    }

    #[memoize]
    fn double(x: u32) -> u32 {
        2 * x
    }

    #[memoize]
    fn sum(a: i32, b: i32) -> i32 {
        a + b
    }

    test!(miss: greeting(), "The world is big");
    test!(hit: greeting(), "The world is big");
    test!(hit: greeting(), "The world is big");

    test!(miss: double(2), 4);
    test!(miss: double(4), 8);
    test!(hit: double(2), 4);

    test!(miss: sum(2, 3), 5);
    test!(miss: sum(3, 3), 6);
    test!(hit: sum(2, 3), 5);
    test!(miss: sum(3, 2), 5);
}

/// Test that a hit replays the persisted result without executing.
#[test]
#[serial]
fn test_hit_does_not_execute() {
    let _dir = fresh();

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    #[memoize]
    fn counted_sum(a: i32, b: i32) -> i32 {
        RUNS.fetch_add(1, Ordering::SeqCst);
        a + b
    }

    assert_eq!(counted_sum(2, 3), 5);
    assert_eq!(counted_sum(3, 3), 6);
    assert_eq!(counted_sum(2, 3), 5);
    assert_eq!(RUNS.load(Ordering::SeqCst), 2);
}

/// Test that ignored parameters do not discriminate calls.
#[test]
#[serial]
fn test_ignore() {
    let _dir = fresh();

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    #[memoize(ignore(a))]
    fn keyed_by_b(a: i32, b: i32) -> i32 {
        RUNS.fetch_add(1, Ordering::SeqCst);
        a + b
    }

    // The second call differs only in the ignored parameter, so it must
    // hit and replay the first result.
    test!(miss: keyed_by_b(2, 3), 5);
    test!(hit: keyed_by_b(3, 3), 5);
    test!(miss: keyed_by_b(3, 4), 7);
    assert_eq!(RUNS.load(Ordering::SeqCst), 2);
}

/// Test that a recompute scope re-executes and overwrites the entry.
#[test]
#[serial]
fn test_forced_recompute() {
    let _dir = fresh();

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    #[memoize]
    fn tenfold(x: i32) -> i32 {
        RUNS.fetch_add(1, Ordering::SeqCst);
        x * 10
    }

    test!(miss: tenfold(1), 10);
    test!(hit: tenfold(1), 10);
    recompute(|| {
        test!(miss: tenfold(1), 10);
    });
    assert_eq!(RUNS.load(Ordering::SeqCst), 2);
    test!(hit: tenfold(1), 10);
}

/// Test that int and float arguments never share a fingerprint.
#[test]
#[serial]
fn test_type_sensitivity() {
    let _dir = fresh();

    #[memoize]
    fn show<T: restash::Identity + std::fmt::Display>(x: T) -> String {
        format!("{x}")
    }

    test!(miss: show(2i64), "2");
    test!(miss: show(2.0f64), "2");
    test!(hit: show(2i64), "2");
    test!(hit: show(2.0f64), "2");
}

/// Test that tables are keyed by content, not memory layout.
#[test]
#[serial]
fn test_frame_arguments() {
    let _dir = fresh();

    #[memoize]
    fn row_count(frame: Frame) -> usize {
        frame.shape().0
    }

    let frame = Frame::parse_delimited("a,b\n1,2\n3,4\n", b',', true);
    test!(miss: row_count(frame.clone()), 2);
    test!(hit: row_count(frame.transpose().transpose()), 2);

    let mut changed = frame.clone();
    changed.set(0, 0, Value::Int(9));
    test!(miss: row_count(changed), 2);
}

/// Test that crafted string arguments cannot share a fingerprint.
#[test]
#[serial]
fn test_string_arguments_cannot_collide() {
    let _dir = fresh();

    #[memoize]
    fn join(a: String, b: String) -> String {
        format!("{a}|{b}")
    }

    // These two argument pairs would assemble into one fingerprint if the
    // per-argument identities were joined without length prefixes.
    test!(miss: join("xstr-b:y".into(), "y".into()), "xstr-b:y|y");
    test!(miss: join("x".into(), "ystr-b:y".into()), "x|ystr-b:y");
}

/// Test the caveat raised for function-typed arguments.
#[test]
#[serial]
fn test_function_argument_caveat() {
    let _dir = fresh();

    #[memoize]
    fn apply(op: fn(i64) -> i64, x: i64) -> i64 {
        op(x)
    }

    fn negate(x: i64) -> i64 {
        -x
    }

    drain_caveats();
    test!(miss: apply(negate, 3), -3);
    assert!(!drain_caveats().is_empty());
}

/// Test the derived identity of a plain struct.
#[test]
#[serial]
fn test_derived_identity() {
    #[derive(restash::Identity)]
    struct Params {
        seed: u64,
        label: String,
        #[identity(skip)]
        verbose: bool,
    }

    let loud = Params { seed: 7, label: "run".into(), verbose: true };
    let quiet = Params { seed: 7, label: "run".into(), verbose: false };

    let id = identity(&loud);
    assert!(id.contains("seed:4:7u64"));
    assert!(id.contains("label:6:runstr"));
    assert!(!id.contains("verbose"));
    assert_eq!(id, identity(&quiet));

    let other = Params { seed: 8, label: "run".into(), verbose: true };
    assert_ne!(id, identity(&other));
}

/// Test that entries survive across independent lookups of the same call.
#[test]
#[serial]
fn test_determinism_across_sessions() {
    let _dir = fresh();

    #[memoize]
    fn stable(x: u32) -> Vec<u32> {
        (0..x).collect()
    }

    // Simulates a rerun of the same script against the same directory.
    test!(miss: stable(4), vec![0, 1, 2, 3]);
    for _ in 0..3 {
        test!(hit: stable(4), vec![0, 1, 2, 3]);
    }
}
