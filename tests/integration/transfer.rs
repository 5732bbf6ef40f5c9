use crate::*;

use ferry_core::{digest_file, Digest};
use ferry_ctl::TransferOutcome;

/// End-to-end: a 10-byte file in 3 chunks arrives byte-identical, and the
/// digest comparison passes.
#[tokio::test]
async fn round_trip_three_chunks() {
    let server = TestServer::start(1).await;
    server.stage_file("ten.bin", b"0123456789");
    let out = server.output_dir.join("new_ten.bin");

    let outcome = server.fetch("ten.bin", 3, &out).await.unwrap();
    server.join().await;

    assert_eq!(
        outcome,
        TransferOutcome::Complete {
            digest: Digest::of_bytes(b"0123456789").to_hex()
        }
    );
    assert_eq!(std::fs::read(&out).unwrap(), b"0123456789");
}

/// chunk_count = 1: the whole file is one chunk and round-trips exactly.
#[tokio::test]
async fn round_trip_single_chunk() {
    let server = TestServer::start(1).await;
    let content = b"a single chunk carrying the entire file";
    server.stage_file("one.bin", content);
    let out = server.output_dir.join("new_one.bin");

    let outcome = server.fetch("one.bin", 1, &out).await.unwrap();
    server.join().await;

    assert!(matches!(outcome, TransferOutcome::Complete { .. }));
    assert_eq!(std::fs::read(&out).unwrap(), content);
}

/// A file big enough for real concurrency: 16 sender tasks interleave
/// their scheduling but every byte lands in the right place.
#[tokio::test]
async fn round_trip_large_file_many_chunks() {
    let server = TestServer::start(1).await;
    let content: Vec<u8> = (0..128 * 1024u32).map(|i| (i % 251) as u8).collect();
    let source = server.stage_file("big.bin", &content);
    let out = server.output_dir.join("new_big.bin");

    let outcome = server.fetch("big.bin", 16, &out).await.unwrap();
    server.join().await;

    assert!(matches!(outcome, TransferOutcome::Complete { .. }));
    assert_eq!(std::fs::read(&out).unwrap(), content);
    assert_eq!(
        digest_file(&source).unwrap(),
        digest_file(&out).unwrap(),
        "source and reassembled digests must agree"
    );
}

/// The daemon serves clients one after another on the same listener.
#[tokio::test]
async fn sequential_transfers_share_one_server() {
    let server = TestServer::start(2).await;
    server.stage_file("first.bin", b"first file contents");
    server.stage_file("second.bin", b"second file, different bytes");

    let out_a = server.output_dir.join("new_first.bin");
    let outcome_a = server.fetch("first.bin", 2, &out_a).await.unwrap();
    assert!(matches!(outcome_a, TransferOutcome::Complete { .. }));

    let out_b = server.output_dir.join("new_second.bin");
    let outcome_b = server.fetch("second.bin", 4, &out_b).await.unwrap();
    assert!(matches!(outcome_b, TransferOutcome::Complete { .. }));

    server.join().await;

    assert_eq!(std::fs::read(&out_a).unwrap(), b"first file contents");
    assert_eq!(std::fs::read(&out_b).unwrap(), b"second file, different bytes");
}

/// An unknown file fails closed: the server hangs up before any frame, and
/// the client reports every chunk missing rather than inventing data.
#[tokio::test]
async fn unknown_file_fails_closed() {
    let server = TestServer::start(1).await;
    let out = server.output_dir.join("new_ghost.bin");

    let outcome = server.fetch("ghost.bin", 3, &out).await.unwrap();
    server.join().await;

    assert_eq!(
        outcome,
        TransferOutcome::PartialLoss {
            missing_ids: vec![0, 1, 2]
        }
    );
    assert!(std::fs::read(&out).unwrap().is_empty());
}

/// A chunk count the planner cannot honor is rejected before any frame.
#[tokio::test]
async fn oversized_chunk_count_fails_closed() {
    let server = TestServer::start(1).await;
    server.stage_file("tiny.bin", b"abc");
    let out = server.output_dir.join("new_tiny.bin");

    let outcome = server.fetch("tiny.bin", 10, &out).await.unwrap();
    server.join().await;

    assert_eq!(
        outcome,
        TransferOutcome::PartialLoss {
            missing_ids: (0..10).collect()
        }
    );
}
