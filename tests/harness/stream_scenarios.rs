//! Stream scenario suite against mirrored and unmirrored targets.

use crate::common::{stores, BrokenGate, MirrorGate};
use replcheck::streams::{run_stream_suite, StreamScenario};
use replcheck_core::{KvStore, OutcomeStatus};
use replcheck_phase::NoopGate;
use replcheck_verify::Verdict;

const PREFIX: &str = "stream_test:";

#[tokio::test]
async fn test_suite_passes_when_target_mirrors_source() {
    let (source, target) = stores();
    let gate = MirrorGate::new(&source, &target, PREFIX);

    let summary = run_stream_suite(source.as_ref(), target.as_ref(), &gate, PREFIX)
        .await
        .unwrap();

    assert_eq!(summary.total, StreamScenario::ALL.len() as u64);
    assert_eq!(summary.verdict(), Verdict::Pass, "{:?}", summary.failures);
    assert_eq!(gate.waits(), StreamScenario::ALL.len());

    let ids: Vec<String> = target
        .stream_range(&StreamScenario::MinId.key(PREFIX))
        .await
        .unwrap()
        .iter()
        .map(|e| e.id.to_string())
        .collect();
    assert_eq!(ids.first().map(String::as_str), Some("5-0"));
}

#[tokio::test]
async fn test_unreplicated_streams_are_missing_except_trim_to_zero() {
    let (source, target) = stores();

    let summary = run_stream_suite(source.as_ref(), target.as_ref(), &NoopGate, PREFIX)
        .await
        .unwrap();

    assert_eq!(summary.verdict(), Verdict::Fail);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.count(OutcomeStatus::Missing), 5);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.key != StreamScenario::TrimToZero.key(PREFIX)));
}

#[tokio::test]
async fn test_suite_removes_leftovers_from_previous_runs() {
    let (source, target) = stores();
    let key = StreamScenario::AutoIds.key(PREFIX);
    target.set(&key, b"not a stream", None).await.unwrap();
    let gate = MirrorGate::new(&source, &target, PREFIX);

    let summary = run_stream_suite(source.as_ref(), target.as_ref(), &gate, PREFIX)
        .await
        .unwrap();

    assert_eq!(summary.verdict(), Verdict::Pass);
}

#[tokio::test]
async fn test_write_failure_is_recorded_and_suite_continues() {
    let (source, target) = stores();
    let faulted = StreamScenario::AutoIds.key(PREFIX);
    let gate = MirrorGate::new(&source, &target, PREFIX).faulting_source(faulted.clone());

    let summary = run_stream_suite(source.as_ref(), target.as_ref(), &gate, PREFIX)
        .await
        .unwrap();

    assert_eq!(summary.total, StreamScenario::ALL.len() as u64);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].key, faulted);
    assert_eq!(summary.failures[0].status, OutcomeStatus::Error);
    assert_eq!(gate.waits(), StreamScenario::ALL.len() - 1);
}

#[tokio::test]
async fn test_gate_failure_aborts_suite() {
    let (source, target) = stores();
    let result = run_stream_suite(source.as_ref(), target.as_ref(), &BrokenGate, PREFIX).await;
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("basic"));
}
