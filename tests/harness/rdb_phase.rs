//! RDB-phase flow: seed, mirror, verify.

use crate::common::{init_tracing, stores, MirrorGate};
use replcheck::harness::RdbPhaseRun;
use replcheck_core::{DataKind, KvStore, OutcomeStatus};
use replcheck_generator::{SeedGenerator, DEFAULT_PREFIX};
use replcheck_phase::NoopGate;
use replcheck_verify::{EquivalenceEngine, Summary, Verdict};

const TIMESTAMP: i64 = 1_700_000_000;

fn generator(count: u64) -> SeedGenerator {
    SeedGenerator::new(DEFAULT_PREFIX, count).with_timestamp(TIMESTAMP)
}

#[tokio::test]
async fn test_twenty_records_all_match() {
    init_tracing();
    let (source, target) = stores();
    let settle = MirrorGate::new(&source, &target, DEFAULT_PREFIX);

    let run = RdbPhaseRun {
        source: source.as_ref(),
        target: target.as_ref(),
        start_gate: &NoopGate,
        settle_gate: &settle,
        generator: generator(20),
        pre_clean: true,
    };
    let summary = run.run().await.unwrap();

    assert_eq!(summary.total, 20);
    assert_eq!(summary.matched, 20);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.verdict(), Verdict::Pass);
    assert_eq!(settle.waits(), 1);
}

#[tokio::test]
async fn test_seventh_key_dropped_is_the_only_failure() {
    init_tracing();
    let (source, target) = stores();
    let generator = generator(20);
    let dropped = generator.key_for(6);
    let settle = MirrorGate::new(&source, &target, DEFAULT_PREFIX).losing(dropped.clone());

    let run = RdbPhaseRun {
        source: source.as_ref(),
        target: target.as_ref(),
        start_gate: &NoopGate,
        settle_gate: &settle,
        generator,
        pre_clean: true,
    };
    let summary = run.run().await.unwrap();

    assert_eq!(summary.total, 20);
    assert_eq!(summary.matched, 19);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].key, dropped);
    assert_eq!(summary.failures[0].kind, DataKind::for_index(6));
    assert_eq!(summary.failures[0].status, OutcomeStatus::Missing);
    assert_eq!(summary.count(OutcomeStatus::Missing), 1);
    assert!((summary.loss_rate() - 0.05).abs() < 1e-9);
    assert_eq!(summary.verdict(), Verdict::Fail);
}

#[tokio::test]
async fn test_zero_records_passes() {
    let (source, target) = stores();
    let settle = MirrorGate::new(&source, &target, DEFAULT_PREFIX);

    let run = RdbPhaseRun {
        source: source.as_ref(),
        target: target.as_ref(),
        start_gate: &NoopGate,
        settle_gate: &settle,
        generator: generator(0),
        pre_clean: true,
    };
    let summary = run.run().await.unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.loss_rate(), 0.0);
    assert_eq!(summary.verdict(), Verdict::Pass);
}

#[tokio::test]
async fn test_verification_is_idempotent() {
    let (source, target) = stores();
    let generator = generator(12);
    let records = generator.inject(source.as_ref()).await.unwrap();
    source.replicate_to(&target, DEFAULT_PREFIX);
    target
        .set(&generator.key_for(0), b"diverged", None)
        .await
        .unwrap();

    let engine = EquivalenceEngine::new(source.as_ref(), target.as_ref());
    let first = Summary::from_outcomes(&engine.verify_all(&records).await);
    let second = Summary::from_outcomes(&engine.verify_all(&records).await);

    assert_eq!(first, second);
    assert_eq!(first.count(OutcomeStatus::ValueMismatch), 1);
}

#[tokio::test]
async fn test_type_change_and_store_fault_are_reported_per_key() {
    let (source, target) = stores();
    let generator = generator(6);
    let records = generator.inject(source.as_ref()).await.unwrap();
    source.replicate_to(&target, DEFAULT_PREFIX);

    // key_000 is a scalar; replace it with a list on the target.
    let scalar = generator.key_for(0);
    target.delete(std::slice::from_ref(&scalar)).await.unwrap();
    target
        .list_push_tail(&scalar, &[b"x".to_vec()])
        .await
        .unwrap();
    target.inject_fault(generator.key_for(1), "connection reset by peer");

    let engine = EquivalenceEngine::new(source.as_ref(), target.as_ref());
    let summary = Summary::from_outcomes(&engine.verify_all(&records).await);

    assert_eq!(summary.total, 6);
    assert_eq!(summary.matched, 4);
    assert_eq!(summary.failures[0].status, OutcomeStatus::TypeMismatch);
    assert_eq!(summary.failures[1].status, OutcomeStatus::Error);
    assert!(summary.failures[1].detail.contains("connection reset"));
}

#[tokio::test]
async fn test_generation_fault_is_fatal() {
    let (source, target) = stores();
    let generator = generator(20);
    source.inject_fault(generator.key_for(3), "OOM command not allowed");
    let settle = MirrorGate::new(&source, &target, DEFAULT_PREFIX);

    let run = RdbPhaseRun {
        source: source.as_ref(),
        target: target.as_ref(),
        start_gate: &NoopGate,
        settle_gate: &settle,
        generator,
        pre_clean: false,
    };
    let err = run.run().await.unwrap_err();

    assert!(format!("{err:#}").contains("Could not write test data"));
    assert_eq!(settle.waits(), 0);
}

#[tokio::test]
async fn test_pre_clean_and_cleanup() {
    let (source, target) = stores();
    let stale = format!("{DEFAULT_PREFIX}stale");
    target.set(&stale, b"left over", None).await.unwrap();
    target.set("unrelated", b"keep", None).await.unwrap();
    let settle = MirrorGate::new(&source, &target, DEFAULT_PREFIX);

    let run = RdbPhaseRun {
        source: source.as_ref(),
        target: target.as_ref(),
        start_gate: &NoopGate,
        settle_gate: &settle,
        generator: generator(6),
        pre_clean: true,
    };
    run.run().await.unwrap();
    assert!(!target.exists(&stale).await.unwrap());

    run.cleanup().await.unwrap();
    assert!(source.keys_with_prefix(DEFAULT_PREFIX).await.unwrap().is_empty());
    assert_eq!(
        target.keys_with_prefix("").await.unwrap(),
        vec!["unrelated".to_string()]
    );
}
