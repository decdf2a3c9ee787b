//! Tests for the buffered write path and batch training.

mod common;

use common::{factory, params, Recorder, RecordingModel};
use ml_state::{MlConfig, MlState, StateError};
use serde_json::json;
use std::sync::atomic::Ordering;

fn state_with_batch(n: usize) -> (MlState, std::sync::Arc<Recorder>) {
    let recorder = Recorder::new();
    let state = MlState::with_model(RecordingModel::boxed(&recorder), MlConfig::new(n).unwrap())
        .unwrap();
    (state, recorder)
}

#[test]
fn test_two_writes_with_batch_of_two_fit_once() {
    let (state, recorder) = state_with_batch(2);

    state.write(json!({"x": 1})).unwrap();
    assert_eq!(recorder.fit_count(), 0);
    assert_eq!(state.buffered(), 1);

    state.write(json!({"x": 2})).unwrap();
    assert_eq!(recorder.fit_count(), 1);
    assert_eq!(recorder.fit_batches()[0], vec![json!({"x": 1}), json!({"x": 2})]);
    assert_eq!(state.buffered(), 0);
}

#[test]
fn test_exactly_n_records_per_fit_in_call_order() {
    for n in [1usize, 3, 10] {
        let (state, recorder) = state_with_batch(n);
        for i in 0..(3 * n) {
            state.write(json!({ "i": i })).unwrap();
        }

        let batches = recorder.fit_batches();
        assert_eq!(batches.len(), 3, "batch size {n}");
        for (b, batch) in batches.iter().enumerate() {
            let expected: Vec<_> = (b * n..(b + 1) * n).map(|i| json!({ "i": i })).collect();
            assert_eq!(batch, &expected);
        }
        assert_eq!(state.buffered(), 0);
    }
}

#[test]
fn test_buffer_length_stays_below_batch_size() {
    let (state, _recorder) = state_with_batch(4);
    for i in 0..25 {
        state.write(json!(i)).unwrap();
        let buffered = state.buffered();
        assert!(buffered < 4, "buffered {buffered} after write {i}");
        assert_eq!(buffered, (i + 1) % 4);
    }
}

#[test]
fn test_default_batch_size_is_ten() {
    let recorder = Recorder::new();
    let state = MlState::create(&factory(recorder.clone()), params(json!({}))).unwrap();
    for i in 0..9 {
        state.write(json!(i)).unwrap();
    }
    assert_eq!(recorder.fit_count(), 0);
    state.write(json!(9)).unwrap();
    assert_eq!(recorder.fit_count(), 1);
    assert_eq!(recorder.fit_batches()[0].len(), 10);
}

#[test]
fn test_training_failure_surfaces_and_drops_batch() {
    let (state, recorder) = state_with_batch(3);
    recorder.fail_fit.store(true, Ordering::SeqCst);

    state.write(json!("a")).unwrap();
    state.write(json!("b")).unwrap();
    let err = state.write(json!("c")).unwrap_err();
    assert!(matches!(err, StateError::TrainingFailed { batch_size: 3, .. }));
    assert_eq!(state.buffered(), 0, "failed batch must not be requeued");

    recorder.fail_fit.store(false, Ordering::SeqCst);
    state.write(json!("d")).unwrap();
    state.write(json!("e")).unwrap();
    state.write(json!("f")).unwrap();

    let batches = recorder.fit_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1], vec![json!("d"), json!("e"), json!("f")]);
}

#[test]
fn test_diagnostics_in_fit_result_do_not_change_outcome() {
    let (state, recorder) = state_with_batch(2);
    recorder.set_fit_result(json!({"loss": 4.0, "accuracy": 1.8}));
    state.write(json!(1)).unwrap();
    assert!(state.write(json!(2)).is_ok());
}

#[test]
fn test_malformed_fit_results_are_not_errors() {
    let (state, recorder) = state_with_batch(1);
    for result in [
        json!(null),
        json!([1, 2, 3]),
        json!({"loss": 1.0}),
        json!({"loss": "n/a", "accuracy": 0.5}),
        json!({"loss": 1.0, "accuracy": {"top1": 0.5}}),
    ] {
        recorder.set_fit_result(result);
        assert!(state.write(json!({"x": 0})).is_ok());
    }
    assert_eq!(recorder.fit_count(), 5);
}

#[test]
fn test_explicit_fit_bypasses_buffer() {
    let (state, recorder) = state_with_batch(3);
    recorder.set_fit_result(json!({"ok": true}));
    state.write(json!("pending")).unwrap();

    let result = state.fit(vec![json!(1), json!(2)]).unwrap();
    assert_eq!(result, json!({"ok": true}));
    assert_eq!(recorder.fit_batches(), vec![vec![json!(1), json!(2)]]);
    assert_eq!(state.buffered(), 1, "explicit fit must not touch the buffer");
}

#[test]
fn test_fit_maps_wraps_maps_in_array() {
    let (state, recorder) = state_with_batch(3);
    state
        .fit_maps(vec![params(json!({"a": 1})), params(json!({"b": 2}))])
        .unwrap();
    assert_eq!(recorder.fit_batches(), vec![vec![json!({"a": 1}), json!({"b": 2})]]);
}

#[test]
fn test_explicit_fit_failure_is_delegate_error() {
    let (state, recorder) = state_with_batch(3);
    recorder.fail_fit.store(true, Ordering::SeqCst);
    let err = state.fit(vec![json!(1)]).unwrap_err();
    assert!(matches!(err, StateError::Delegate(_)));
}

#[test]
fn test_predict_returns_model_result_verbatim() {
    let (state, recorder) = state_with_batch(3);
    let result = state.predict(&json!({"features": [1, 2]})).unwrap();
    assert_eq!(result, json!({"prediction": {"features": [1, 2]}}));
    assert_eq!(recorder.predicts.lock().unwrap().len(), 1);
    assert_eq!(state.buffered(), 0);
}
