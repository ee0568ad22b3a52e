//! Block memoization: skip-on-hit, output restoration, invalidation.

use restash::checkpoint;
use serial_test::serial;

/// Point the checkpoint directory at a fresh location.
fn fresh() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    restash::set_checkpoint_dir(dir.path());
    dir
}

/// Test that a replayed block yields the same bindings without running.
#[test]
#[serial]
fn test_idempotent_replay() {
    let _dir = fresh();

    let mut witnessed = vec![];
    for round in 0..2 {
        let x: i64;
        checkpoint! {
            watch(),
            produce(x),
            {
                witnessed.push(round);
                x = 1;
            }
        }
        assert_eq!(x, 1);
    }

    // The observable side effect must not recur on replay.
    assert_eq!(witnessed, [0]);
}

/// Test that changing a watched value invalidates the block.
#[test]
#[serial]
fn test_watch_invalidation() {
    let _dir = fresh();

    let mut bodies = 0;
    for seed in [1i64, 2, 1] {
        let y: i64;
        checkpoint! {
            watch(seed),
            produce(y),
            {
                bodies += 1;
                y = seed * 10;
            }
        }
        assert_eq!(y, seed * 10);
    }

    // The third round replays the first round's artifact.
    assert_eq!(bodies, 2);
}

/// Test producing into a field path.
#[test]
#[serial]
fn test_attribute_produce() {
    let _dir = fresh();

    #[derive(Default)]
    struct Model {
        bias: f64,
    }

    let mut ran = 0;
    for _ in 0..2 {
        let mut model = Model::default();
        checkpoint! {
            watch(),
            produce(model.bias),
            {
                ran += 1;
                model.bias = 0.5;
            }
        }
        assert_eq!(model.bias, 0.5);
    }

    assert_eq!(ran, 1);
}

/// Test watching through a field path.
#[test]
#[serial]
fn test_attribute_watch() {
    let _dir = fresh();

    struct Config {
        seed: u64,
    }

    let mut bodies = 0;
    for seed in [3u64, 4] {
        let config = Config { seed };
        let out: u64;
        checkpoint! {
            watch(config.seed),
            produce(out),
            {
                bodies += 1;
                out = config.seed + 1;
            }
        }
        assert_eq!(out, seed + 1);
    }

    assert_eq!(bodies, 2);
}

/// Test that every produced output gets its own artifact.
#[test]
#[serial]
fn test_multiple_outputs() {
    let _dir = fresh();

    let mut ran = 0;
    for _ in 0..2 {
        let head: String;
        let tail: Vec<u8>;
        checkpoint! {
            watch(),
            produce(head, tail),
            {
                ran += 1;
                head = "h".to_string();
                tail = vec![1, 2, 3];
            }
        }
        assert_eq!(head, "h");
        assert_eq!(tail, [1, 2, 3]);
    }

    assert_eq!(ran, 1);
}

/// Test that tags keep otherwise identical blocks apart.
#[test]
#[serial]
fn test_tag_disambiguation() {
    let _dir = fresh();

    let mut runs = 0;
    {
        let x: i32;
        checkpoint! {
            watch(),
            produce(x),
            tag = "first",
            {
                runs += 1;
                x = 1;
            }
        }
        assert_eq!(x, 1);
    }
    {
        let x: i32;
        checkpoint! {
            watch(),
            produce(x),
            tag = "second",
            {
                runs += 1;
                x = 1;
            }
        }
        assert_eq!(x, 1);
    }

    assert_eq!(runs, 2);
}

/// Test that edits to the body text invalidate the block.
#[test]
#[serial]
fn test_body_text_participates() {
    let _dir = fresh();

    let mut runs = 0;
    {
        let x: i32;
        checkpoint! {
            watch(),
            produce(x),
            {
                runs += 1;
                x = 1 + 0;
            }
        }
        assert_eq!(x, 1);
    }
    {
        let x: i32;
        checkpoint! {
            watch(),
            produce(x),
            {
                runs += 1;
                x = 0 + 1;
            }
        }
        assert_eq!(x, 1);
    }

    assert_eq!(runs, 2);
}
